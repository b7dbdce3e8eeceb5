use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What is known about background access to workout data.
///
/// The platform never confirms a grant, so there is no `Granted` state: data
/// paths treat an empty result as "nothing new", not as a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthAccess {
    #[default]
    Unknown,
    Requested,
    ConfirmedDenied,
}

impl HealthAccess {
    pub fn as_str(self) -> &'static str {
        match self {
            HealthAccess::Unknown => "unknown",
            HealthAccess::Requested => "requested",
            HealthAccess::ConfirmedDenied => "confirmed_denied",
        }
    }
}

impl fmt::Display for HealthAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthAccess {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "unknown" => Ok(HealthAccess::Unknown),
            "requested" => Ok(HealthAccess::Requested),
            "confirmed_denied" | "denied" => Ok(HealthAccess::ConfirmedDenied),
            _ => Err(format!("Unknown health access state: {}", s)),
        }
    }
}
