//! The fixed set of discussion roles and their routing affinities

use crate::types::Topic;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One fixed role on the virtual advisory board.
///
/// The set is closed: roles are created at start-up and never destroyed,
/// and the supervisor matches on them exhaustively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Strategy lead and designated synthesizer
    Ceo,
    /// Technical lead
    Cto,
    /// Financial lead
    Cfo,
    /// Operations lead
    Coo,
}

impl Role {
    /// Fixed role order, used for stable iteration and tie-breaking
    pub const ALL: [Role; 4] = [Role::Ceo, Role::Cto, Role::Cfo, Role::Coo];

    /// Role that delivers the final report
    pub const SYNTHESIZER: Role = Role::Ceo;

    /// Display label
    pub fn label(&self) -> &'static str {
        match self {
            Role::Ceo => "CEO",
            Role::Cto => "CTO",
            Role::Cfo => "CFO",
            Role::Coo => "COO",
        }
    }

    /// First name the personas address each other by
    pub fn persona_name(&self) -> &'static str {
        match self {
            Role::Ceo => "Sarah",
            Role::Cto => "Mike",
            Role::Cfo => "Jennifer",
            Role::Coo => "Tom",
        }
    }

    /// One-line expertise summary used when prompting a generation backend
    pub fn focus(&self) -> &'static str {
        match self {
            Role::Ceo => "business strategy, vision, and market positioning",
            Role::Cto => "technical architecture, feasibility, and delivery",
            Role::Cfo => "finance, funding, and unit economics",
            Role::Coo => "operations, hiring, and execution",
        }
    }

    /// Role that owns a topical category for routing purposes
    pub fn owner_of(topic: Topic) -> Role {
        match topic {
            Topic::Technical => Role::Cto,
            Topic::Financial => Role::Cfo,
            Topic::Operations => Role::Coo,
            Topic::Strategy | Topic::Market => Role::Ceo,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}
