//! Async host for a ten-player Werewolf game.
//!
//! Layers on top of `werewolf-core`:
//! - `host`: the [`GameHost`] orchestrator and its phase sequences
//! - `policy`: per-phase decision provider traits and deterministic fallbacks
//! - `observer`: lifecycle hooks for watching a run
//! - `tempo`: pacing control (delay, skip, pause/resume)
//! - `config`: tuning knobs with environment overrides
//!
//! The host never lets a failing decision provider stall a game: every
//! invocation degrades to a built-in fallback and the run continues.

pub mod config;
pub mod host;
pub mod observer;
pub mod policy;
pub mod tempo;

pub use config::{HostConfig, PostVoteConfig, TempoConfig};
pub use host::{GameHost, HostError};
pub use observer::{GameObserver, NoopObserver};
pub use policy::{
    Ballot, DecisionContext, DiscussionPolicy, FallbackPolicy, HunterContext, HunterPolicy,
    PolicyError, PolicyResult, PolicySet, PostVotePolicy, SeerPolicy, Speech, VotePolicy,
    VoteReaction, VoteSummary, WerewolfPolicy, WitchDecision, WitchPolicy,
};
pub use tempo::TempoController;
