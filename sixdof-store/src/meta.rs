use serde::{Deserialize, Serialize};

/// Metadata about a configuration file.
#[derive(Clone, Serialize, Deserialize)]
pub struct Meta {
    /// Display name of the vehicle type described by this file.
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
}
