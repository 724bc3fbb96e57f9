//! Rules engine for a 10-player Werewolf game.
//!
//! This crate provides the pure game core:
//! - Roles, factions, and the fixed role pool
//! - Player and game state as plain serializable data
//! - A reducer-style state machine: `(state, action) -> next state`
//! - Night, vote, and hunter-shot resolution with win-condition checks
//! - Append-only log, replay, and highlight audit trails
//!
//! # Architecture
//!
//! The engine is platform-agnostic and side-effect free apart from the
//! role shuffle at game start and the wall-clock timestamps stamped onto
//! replay events. It performs no I/O and knows nothing about pacing or
//! decision providers; a host drives it by dispatching [`GameAction`]
//! values and storing the returned snapshots.
//!
//! # Modules
//!
//! - [`role`]: role and faction tags, the fixed pool
//! - [`player`]: seat identity and per-player state
//! - [`action`]: the action vocabulary the reducer understands
//! - [`game`]: the state machine and resolution algorithms
//! - [`replay`]: structured audit records

pub mod action;
pub mod game;
pub mod player;
pub mod replay;
pub mod role;

// Re-export commonly used types
pub use action::{GameAction, WitchCommand};
pub use game::{
    tally_votes, winner_of, GameState, HunterPending, HunterTrigger, Phase, Vote, WitchState,
};
pub use player::{Player, SeatId};
pub use replay::{LogEntry, ReplayCategory, ReplayDraft, ReplayEvent};
pub use role::{role_pool, Faction, Role, SEAT_COUNT};
