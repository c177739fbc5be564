#![allow(clippy::unwrap_used)]
// Integration tests for `DeviceCloudClient` using wiremock.

use pretty_assertions::assert_eq;
use secrecy::SecretString;
use serde_json::json;
use url::Url;
use wiremock::matchers::{basic_auth, body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use kitsync_api::{
    DeviceCloudClient, Error, GatewayCommand, MonitorSpec, MonitorTopic, SciTarget, XbeeQuery,
};

const DEVICE: &str = "00000000-00000000-00409DFF-FF000001";

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DeviceCloudClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = DeviceCloudClient::with_client(
        reqwest::Client::new(),
        base_url,
        "kit-user".into(),
        SecretString::from("kit-pass".to_string()),
    );
    (server, client)
}

fn radio_settings_reply(radio: serde_json::Value) -> serde_json::Value {
    json!({"sci_reply": {"send_message": {"device": {
        "@id": DEVICE,
        "rci_reply": {"do_command": {"query_setting": {"radio": radio}}}
    }}}})
}

// ── SCI tests ───────────────────────────────────────────────────────

#[tokio::test]
async fn test_get_radio_settings() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/ws/sci"))
        .and(basic_auth("kit-user", "kit-pass"))
        .and(header("accept", "application/json"))
        .and(body_string_contains(r#"<query_setting addr="00:13:A2:00:40:9F:6F:CB"/>"#))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(radio_settings_reply(json!({"dio0_config": "1"}))),
        )
        .mount(&server)
        .await;

    let settings = client
        .get_settings(DEVICE, &SciTarget::radio("00:13:A2:00:40:9F:6F:CB"), false)
        .await
        .unwrap();

    assert_eq!(
        serde_json::Value::Object(settings),
        json!({"radio": {"dio0_config": "1"}})
    );
}

#[tokio::test]
async fn test_embedded_error_is_device_reported() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/ws/sci"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "sci_reply": {"send_message": {"device": {"error": {"desc": "Device not connected"}}}}
        })))
        .mount(&server)
        .await;

    let result = client.set_output(DEVICE, "0x5", "0x1").await;
    assert!(
        matches!(result, Err(Error::DeviceReported { .. })),
        "expected DeviceReported, got: {result:?}"
    );
}

#[tokio::test]
async fn test_http_error_keeps_status_and_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/ws/sci"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad target"))
        .mount(&server)
        .await;

    let err = client.send_serial_data(DEVICE, "SGVsbG8h").await.unwrap_err();
    match err {
        Error::Http { status, body } => {
            assert_eq!(status, 400);
            assert_eq!(body, "bad target");
        }
        other => panic!("expected Http error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_unauthorized_is_authentication_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/ws/sci"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let result = client
        .get_settings(DEVICE, &SciTarget::Gateway, true)
        .await;
    assert!(matches!(result, Err(Error::Authentication { .. })));
}

#[tokio::test]
async fn test_gateway_commands_body() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/ws/sci"))
        .and(body_string_contains(r#"<do_command target="xbgw">"#))
        .and(body_string_contains(r#"name="DIO4">low</set_digital_output>"#))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"sci_reply": {}})))
        .expect(1)
        .mount(&server)
        .await;

    client
        .send_gateway_commands(
            DEVICE,
            &[GatewayCommand::SetDigitalOutput {
                addr: "00:13:A2:00:40:9F:6F:CB".into(),
                name: "DIO4".into(),
                high: false,
            }],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_unreachable_cloud_is_transport_error() {
    let client = DeviceCloudClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:1").unwrap(),
        "kit-user".into(),
        SecretString::from("kit-pass".to_string()),
    );

    let err = client.set_output(DEVICE, "0x1", "0x1").await.unwrap_err();
    assert!(err.is_unreachable(), "expected unreachable, got {err:?}");
}

// ── Monitor tests ───────────────────────────────────────────────────

#[tokio::test]
async fn test_list_monitors_with_condition() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/ws/Monitor"))
        .and(query_param(
            "condition",
            format!("monTopic='DataPoint/{DEVICE}' and monTransportUrl='https://kit.example.com/push'"),
        ))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultSize": "1",
            "items": [{"monId": "4242", "monTopic": format!("DataPoint/{DEVICE}")}]
        })))
        .mount(&server)
        .await;

    let list = client
        .list_monitors(
            &MonitorTopic::DataPoint {
                device_id: DEVICE.into(),
            },
            "https://kit.example.com/push",
        )
        .await
        .unwrap();

    assert_eq!(list.items.len(), 1);
    assert_eq!(list.items[0].id, "4242");
}

#[tokio::test]
async fn test_create_and_kick_monitor() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/ws/Monitor"))
        .and(body_string_contains("\"monTransportToken\":\"push-user:push-pass\""))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"location": "Monitor/77"})))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/ws/Monitor/77"))
        .respond_with(ResponseTemplate::new(200).set_body_string(""))
        .expect(1)
        .mount(&server)
        .await;

    let password = SecretString::from("push-pass".to_string());
    let created = client
        .create_monitor(&MonitorSpec {
            topic: MonitorTopic::DeviceCore,
            endpoint: "https://kit.example.com/push".into(),
            push_username: "push-user".into(),
            push_password: password.clone(),
            description: "kit monitor".into(),
        })
        .await
        .unwrap();
    assert_eq!(created["location"], "Monitor/77");

    let kicked = client.kick_monitor("77", "push-user", &password).await.unwrap();
    assert!(kicked.is_null());
}

// ── Radio inventory tests ───────────────────────────────────────────

#[tokio::test]
async fn test_list_xbees_runs_discovery() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/ws/XbeeCore"))
        .and(basic_auth("kit-user", "kit-pass"))
        .and(query_param("condition", format!("devConnectwareId='{DEVICE}'")))
        .and(query_param("cache", "false"))
        .and(query_param("clear", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultSize": "2",
            "items": [
                {"devConnectwareId": DEVICE, "xpExtAddr": "00:13:A2:00:11:22:33:43",
                 "xpNodeType": "0", "xpNetAddr": "0"},
                {"devConnectwareId": DEVICE, "xpExtAddr": "00:13:A2:00:11:22:33:44",
                 "xpNodeId": "MY XBEE", "xpNodeType": "1", "xpNetAddr": "1"}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let query = XbeeQuery {
        cache: false,
        clear: true,
        ..XbeeQuery::for_device(DEVICE)
    };
    let list = client.list_xbees(&query).await.unwrap();

    assert_eq!(list.items.len(), 2);
    assert_eq!(list.items[1].ext_addr, "00:13:A2:00:11:22:33:44");
    assert_eq!(list.items[1].node_id.as_deref(), Some("MY XBEE"));
}

#[tokio::test]
async fn test_list_xbees_error_element_is_device_reported() {
    let (server, client) = setup().await;

    Mock::given(method("GET"))
        .and(path("/ws/XbeeCore"))
        .and(query_param("cache", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "resultSize": "0",
            "items": [],
            "error": ["Device Not Connected"]
        })))
        .mount(&server)
        .await;

    let result = client.list_xbees(&XbeeQuery::for_device(DEVICE)).await;
    assert!(
        matches!(result, Err(Error::DeviceReported { .. })),
        "expected DeviceReported, got: {result:?}"
    );
}
