//! Clearance tiers and their ordering.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TrackerError;

/// Sensitivity classification. Variant order is the clearance order:
/// `Public < Confidential < Secret < TopSecret`.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum Clearance {
    #[default]
    Public,
    Confidential,
    Secret,
    TopSecret,
}

impl Clearance {
    pub const ALL: [Clearance; 4] = [
        Clearance::Public,
        Clearance::Confidential,
        Clearance::Secret,
        Clearance::TopSecret,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Clearance::Public => "public",
            Clearance::Confidential => "confidential",
            Clearance::Secret => "secret",
            Clearance::TopSecret => "top_secret",
        }
    }

    /// Whether a holder of `self` may work on something classified `required`.
    pub fn permits(self, required: Clearance) -> bool {
        self >= required
    }

    /// Every tier at or above `self`.
    pub fn at_or_above(self) -> impl Iterator<Item = Clearance> {
        Clearance::ALL.into_iter().filter(move |c| *c >= self)
    }
}

impl fmt::Display for Clearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Clearance {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Clearance::ALL
            .into_iter()
            .find(|c| c.as_str() == s)
            .ok_or_else(|| TrackerError::Validation("Invalid clearance level".to_string()))
    }
}
