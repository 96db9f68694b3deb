//! The single place campaign/cohort status precedence is encoded (spec §9):
//! `NotEligible < NotActionable < Actionable`. Every aggregation elsewhere in
//! the crate reduces to `Iterator::max`/`Ord::max` over this type.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    NotEligible,
    NotActionable,
    Actionable,
}

impl Status {
    fn rank(self) -> u8 {
        match self {
            Status::NotEligible => 0,
            Status::NotActionable => 1,
            Status::Actionable => 2,
        }
    }
}

impl PartialOrd for Status {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Status {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Status::NotEligible => "NotEligible",
            Status::NotActionable => "NotActionable",
            Status::Actionable => "Actionable",
        };
        write!(f, "{s}")
    }
}
