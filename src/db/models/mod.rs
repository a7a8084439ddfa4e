//! Database models split into domain-specific modules.

use serde::{Deserialize, Deserializer};

pub mod item;
pub mod session;
pub mod user;

pub use item::*;
pub use session::*;
pub use user::*;

/// Request text with surrounding whitespace stripped
fn trimmed<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(|value| value.map(|s| s.trim().to_string()))
}
