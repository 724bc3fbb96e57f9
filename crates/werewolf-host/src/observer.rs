//! Lifecycle hooks for anything that wants to watch a game run.

use async_trait::async_trait;
use werewolf_core::GameState;

/// Callbacks fired at the edges of each phase sequence.
///
/// All hooks default to no-ops, so implementors only override what
/// they care about. Hooks run on the host task; keep them short.
#[async_trait]
pub trait GameObserver: Send + Sync {
    /// A night sequence is about to start
    async fn on_night_start(&self, _state: &GameState) {}

    /// A day sequence is about to start
    async fn on_day_start(&self, _state: &GameState) {}

    /// The game just ended; fired exactly once per finished run
    async fn on_game_over(&self, _state: &GameState) {}
}

/// Observer that ignores everything
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

#[async_trait]
impl GameObserver for NoopObserver {}
