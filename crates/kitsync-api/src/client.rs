// Device cloud HTTP client
//
// Wraps `reqwest::Client` with account basic auth, `/ws/` URL
// construction, and reply checking. Endpoint groups (SCI, monitors) are
// inherent methods here and in `monitor.rs`.

use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::sci::{self, GatewayCommand, SciRequest, SciTarget};
use crate::transport::TransportConfig;

/// Raw HTTP client for the device cloud web services.
///
/// Every method returns the decoded JSON reply after checking it for
/// device-reported errors, so a returned `Ok` always means the request
/// was accepted end to end.
pub struct DeviceCloudClient {
    http: reqwest::Client,
    base_url: Url,
    username: String,
    password: SecretString,
    timeout_secs: u64,
}

impl DeviceCloudClient {
    /// Create a new client from a `TransportConfig`.
    ///
    /// `base_url` is the cloud root, e.g. `https://devicecloud.digi.com`.
    pub fn new(
        base_url: Url,
        username: String,
        password: SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self {
            http,
            base_url,
            username,
            password,
            timeout_secs: transport.timeout_secs(),
        })
    }

    /// Create a client with a pre-built `reqwest::Client`.
    pub fn with_client(
        http: reqwest::Client,
        base_url: Url,
        username: String,
        password: SecretString,
    ) -> Self {
        Self {
            http,
            base_url,
            username,
            password,
            timeout_secs: 0,
        }
    }

    /// The cloud base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The account user name used for basic auth.
    pub fn username(&self) -> &str {
        &self.username
    }

    // ── SCI ──────────────────────────────────────────────────────────

    /// Post an SCI request and return the checked JSON reply.
    pub async fn send_sci(&self, request: &SciRequest) -> Result<Value, Error> {
        let url = self.ws_url("sci")?;
        debug!(device = request.device_id(), "POST {url}");

        let body = request.to_xml();
        trace!(%body, "sci request");

        let builder = self
            .http
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/xml")
            .body(body);
        self.send(builder).await
    }

    /// Fetch the settings tree of the gateway or one of its radios.
    pub async fn get_settings(
        &self,
        device_id: &str,
        target: &SciTarget,
        cache: bool,
    ) -> Result<Map<String, Value>, Error> {
        let reply = self
            .send_sci(&SciRequest::query_settings(device_id, target, cache))
            .await?;
        sci::settings_from_reply(&reply, target)
    }

    /// Write `{group: {key: value}}` settings.
    pub async fn set_settings(
        &self,
        device_id: &str,
        target: &SciTarget,
        groups: &Map<String, Value>,
    ) -> Result<Value, Error> {
        let request = SciRequest::set_settings(device_id, target, groups)?;
        self.send_sci(&request).await
    }

    /// Change digital output levels using hex enable/level masks.
    pub async fn set_output(
        &self,
        device_id: &str,
        enable_mask: &str,
        level_mask: &str,
    ) -> Result<Value, Error> {
        self.send_sci(&SciRequest::set_output(device_id, enable_mask, level_mask))
            .await
    }

    /// Send base64-encoded data out of the device's serial port.
    pub async fn send_serial_data(&self, device_id: &str, data_base64: &str) -> Result<Value, Error> {
        self.send_sci(&SciRequest::send_serial(device_id, data_base64))
            .await
    }

    /// Send node commands through the gateway application.
    pub async fn send_gateway_commands(
        &self,
        device_id: &str,
        commands: &[GatewayCommand],
    ) -> Result<Value, Error> {
        let request = SciRequest::gateway_commands(device_id, commands)?;
        self.send_sci(&request).await
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// Build `{base}/ws/{path}`.
    pub(crate) fn ws_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        Ok(Url::parse(&format!("{base}/ws/{path}"))?)
    }

    // ── Request helpers ──────────────────────────────────────────────

    pub(crate) fn http_get(&self, url: Url) -> reqwest::RequestBuilder {
        self.http.get(url)
    }

    pub(crate) fn http_post(&self, url: Url) -> reqwest::RequestBuilder {
        self.http.post(url)
    }

    pub(crate) fn http_put(&self, url: Url) -> reqwest::RequestBuilder {
        self.http.put(url)
    }

    /// Attach auth and content negotiation, send, and check the reply.
    pub(crate) async fn send(&self, builder: reqwest::RequestBuilder) -> Result<Value, Error> {
        let resp = builder
            .basic_auth(&self.username, Some(self.password.expose_secret()))
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        self.parse_reply(resp).await
    }

    fn map_transport(&self, err: reqwest::Error) -> Error {
        if err.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout_secs,
            }
        } else {
            Error::Transport(err)
        }
    }

    /// Decode the JSON reply, mapping status codes and embedded errors.
    async fn parse_reply(&self, resp: reqwest::Response) -> Result<Value, Error> {
        let status = resp.status();

        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(Error::Authentication {
                message: "device cloud rejected the account credentials".into(),
            });
        }

        let body = resp.text().await.map_err(|e| self.map_transport(e))?;

        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                body,
            });
        }

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }

        let reply: Value = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        // The cloud reports device-side failures with HTTP 200.
        if sci::contains_error_key(&reply) {
            return Err(Error::DeviceReported { reply });
        }

        Ok(reply)
    }
}
