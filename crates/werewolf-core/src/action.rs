//! Actions dispatched into the reducer.
//!
//! Every state transition in the game goes through exactly one of these
//! action tags. Actions that are invalid in the current state are silently
//! ignored by the reducer rather than rejected.

use crate::game::Phase;
use crate::player::SeatId;
use crate::replay::{LogEntry, ReplayDraft};
use serde::{Deserialize, Serialize};

/// All actions understood by the reducer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameAction {
    // ==================== Lifecycle ====================
    /// Full reset: shuffle the role pool, seat the named players, clear
    /// every choice, vote, and audit trail
    StartGame {
        names: Vec<String>,
        /// Shuffle seed; `None` draws from entropy
        seed: Option<u64>,
    },
    /// Move to a phase, optionally appending narrative records
    SetPhase {
        phase: Phase,
        log: Option<String>,
        replay: Option<ReplayDraft>,
        highlight: Option<String>,
    },

    // ==================== Night Choices ====================
    /// Record the werewolves' kill target for tonight
    SetWerewolfTarget(Option<SeatId>),
    /// Record the seer's inspection target for tonight
    SetSeerTarget(Option<SeatId>),
    /// Record a witch potion; each potion works at most once per game
    WitchAction(WitchCommand),

    // ==================== Day Choices ====================
    /// Upsert one vote per living voter; casting again replaces the
    /// previous ballot
    PlayerVote {
        voter: SeatId,
        target: Option<SeatId>,
    },

    // ==================== Resolution ====================
    /// Commit the night: apply kills, saves, poison, and the seer reveal
    ResolveNight,
    /// Commit the vote: audit ballots, tally, eliminate or declare a tie
    ResolveVoting,
    /// Resolve a pending hunter shot; no-op when nothing is pending
    HunterShoot(Option<SeatId>),

    // ==================== Audit ====================
    /// Append one log/replay/highlight entry without advancing game logic
    AppendLog(LogEntry),
    /// Append several entries in order
    AppendLogBatch(Vec<LogEntry>),
    /// Replace the highlight list wholesale
    SetHighlights(Vec<String>),
}

/// The witch's two potions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WitchCommand {
    /// Spend the save potion on tonight's werewolf victim
    Save,
    /// Spend the poison on the given seat
    Poison(SeatId),
}
