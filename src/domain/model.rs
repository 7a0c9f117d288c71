use crate::utils::error::{CrptError, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefillStrategy {
    /// The whole capacity comes back at once when a period ends.
    #[default]
    Intervally,
    /// Tokens come back one at a time, spread evenly across the period.
    Greedy,
}

impl RefillStrategy {
    pub const NAMES: [&'static str; 2] = ["intervally", "greedy"];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefillStrategy::Intervally => "intervally",
            RefillStrategy::Greedy => "greedy",
        }
    }
}

impl FromStr for RefillStrategy {
    type Err = CrptError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "intervally" => Ok(RefillStrategy::Intervally),
            "greedy" => Ok(RefillStrategy::Greedy),
            other => Err(CrptError::InvalidConfigValueError {
                field: "rate_limit.strategy".to_string(),
                value: other.to_string(),
                reason: format!("Allowed values: {}", Self::NAMES.join(", ")),
            }),
        }
    }
}

/// At most `capacity` requests per `refill_period`. A fresh bucket starts full.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bandwidth {
    pub capacity: u64,
    pub refill_period: Duration,
    pub strategy: RefillStrategy,
}

impl Bandwidth {
    pub fn intervally(capacity: u64, refill_period: Duration) -> Self {
        Self {
            capacity,
            refill_period,
            strategy: RefillStrategy::Intervally,
        }
    }

    pub fn greedy(capacity: u64, refill_period: Duration) -> Self {
        Self {
            capacity,
            refill_period,
            strategy: RefillStrategy::Greedy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: String,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
