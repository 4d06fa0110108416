use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimelineConfig {
    /// Number of posts requested per page.
    pub limit: u8,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self { limit: 30 }
    }
}
