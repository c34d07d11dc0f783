//! Store configuration.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::Error;

/// Environment variable selecting the `CreatePolicy` (`reject` | `reset`).
pub const ON_EXISTING_ENV: &str = "TRAVELER_GRAPH_ON_EXISTING";

/// What `create_profile` does when the id already has a profile.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreatePolicy {
    /// Fail with `Error::ProfileExists`; the existing profile is untouched.
    #[default]
    Reject,
    /// Replace the existing profile with a new empty one.
    Reset,
}

impl FromStr for CreatePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(CreatePolicy::Reject),
            "reset" => Ok(CreatePolicy::Reset),
            other => Err(Error::MalformedInput(format!("unknown create policy {other:?}"))),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub on_existing: CreatePolicy,
}

impl StoreConfig {
    pub fn with_policy(on_existing: CreatePolicy) -> Self {
        Self { on_existing }
    }

    /// Defaults, overridden by `TRAVELER_GRAPH_ON_EXISTING` when set.
    pub fn from_env() -> crate::Result<Self> {
        let mut config = Self::default();
        if let Ok(policy) = std::env::var(ON_EXISTING_ENV) {
            config.on_existing = policy.parse()?;
        }
        Ok(config)
    }
}
