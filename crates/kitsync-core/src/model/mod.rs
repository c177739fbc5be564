// ── Domain model ──
//
// Value, identity, and configuration-tree types shared by the encoder,
// the diff engine, and the push router.

mod identity;
mod node;
mod tree;
mod value;

pub use identity::{DeviceId, RadioAddress};
pub use node::{Discovery, NodeRole, RadioNode};
pub use tree::{ConfigDelta, ConfigTree, Settings};
pub use value::SettingValue;
