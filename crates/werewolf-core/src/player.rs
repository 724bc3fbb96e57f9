//! Player state.
//!
//! Players are created once at game start and only ever mutated in place:
//! the alive flag flips to false on death, and the seer's verdict annotation
//! is attached when that player gets inspected.

use crate::role::Role;
use serde::{Deserialize, Serialize};

/// A player's fixed numeric identity, 1..=10, stable for the game's duration
pub type SeatId = u8;

/// A single seat at the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Seat id (1..=10)
    pub seat: SeatId,
    /// Display name
    pub name: String,
    /// Role assigned at game start, immutable afterwards
    pub role: Role,
    /// False once dead; death is permanent within a game
    pub alive: bool,
    /// Sheriff election is not implemented; kept for serialized-state compatibility
    pub is_sheriff: bool,
    /// Verdict attached when the seer inspects this player ("是狼人" / "是好人")
    pub seer_verdict: Option<String>,
}

impl Player {
    /// Create a living player at the given seat
    pub fn new(seat: SeatId, name: String, role: Role) -> Self {
        Self {
            seat,
            name,
            role,
            alive: true,
            is_sheriff: false,
            seer_verdict: None,
        }
    }

    /// Whether this player sits with the werewolf faction
    pub fn is_werewolf(&self) -> bool {
        self.role.is_werewolf()
    }
}
