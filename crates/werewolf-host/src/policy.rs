//! Per-phase decision providers and their deterministic fallbacks.
//!
//! Each decision point in the game is a trait; callers plug in real
//! providers (an AI bridge, a scripted player) per seat-group, and the
//! host substitutes [`FallbackPolicy`] whenever a provider fails. The
//! fallbacks are deliberately bland but always legal, so a game never
//! stalls on a bad provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use werewolf_core::{tally_votes, GameState, HunterTrigger, Player, Role, SeatId, Vote};

/// Why a provider failed to produce a usable decision
#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("Decision timed out")]
    Timeout,

    #[error("Decision backend failed: {0}")]
    Backend(String),

    #[error("Decision was malformed: {0}")]
    Invalid(String),
}

pub type PolicyResult<T> = Result<T, PolicyError>;

// ==================== Contexts ====================

/// Read-only snapshot handed to decision providers.
///
/// Providers can inspect everything but can only influence the game by
/// returning a decision value.
#[derive(Debug, Clone)]
pub struct DecisionContext {
    pub state: GameState,
    /// Living players, in seat order
    pub alive: Vec<Player>,
    pub day: u32,
}

impl DecisionContext {
    pub fn from_state(state: GameState) -> Self {
        let alive = state.players.iter().filter(|p| p.alive).cloned().collect();
        let day = state.day;
        Self { state, alive, day }
    }
}

/// Context for the hunter's reactive shot; `alive` excludes the hunter
#[derive(Debug, Clone)]
pub struct HunterContext {
    pub state: GameState,
    pub alive: Vec<Player>,
    pub day: u32,
    pub hunter: SeatId,
    pub trigger: HunterTrigger,
}

/// Standing of the vote while post-vote commentary runs
#[derive(Debug, Clone)]
pub struct VoteSummary {
    /// (target, votes) sorted by descending count
    pub counts: Vec<(SeatId, usize)>,
    /// Seat due for elimination if the vote stands
    pub leader: Option<SeatId>,
    pub tied: bool,
}

impl VoteSummary {
    pub fn from_votes(votes: &[Vote]) -> Self {
        let (counts, tied) = tally_votes(votes);
        let leader = if tied {
            None
        } else {
            counts.first().map(|&(seat, _)| seat)
        };
        Self {
            counts,
            leader,
            tied,
        }
    }
}

// ==================== Decision Values ====================

/// One discussion speech
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Speech {
    pub seat: SeatId,
    pub text: String,
    pub reasoning: Option<String>,
}

/// One ballot decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ballot {
    pub voter: SeatId,
    pub target: Option<SeatId>,
    pub reasoning: Option<String>,
}

/// What the witch wants to do tonight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitchDecision {
    /// Spend the save potion on tonight's victim
    pub save: bool,
    /// Spend the poison on this seat
    pub poison: Option<SeatId>,
}

/// Round-one post-vote reaction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteReaction {
    pub comment: Option<String>,
    /// Whether this seat wants another commentary round
    pub wants_continue: bool,
}

// ==================== Provider Traits ====================

#[async_trait]
pub trait WerewolfPolicy: Send + Sync {
    /// Pick tonight's kill target; `None` spares everyone
    async fn choose_kill(&self, ctx: &DecisionContext) -> PolicyResult<Option<SeatId>>;
}

#[async_trait]
pub trait SeerPolicy: Send + Sync {
    /// Pick tonight's inspection target
    async fn choose_inspect(&self, ctx: &DecisionContext) -> PolicyResult<Option<SeatId>>;
}

#[async_trait]
pub trait WitchPolicy: Send + Sync {
    async fn decide(&self, ctx: &DecisionContext) -> PolicyResult<WitchDecision>;
}

#[async_trait]
pub trait DiscussionPolicy: Send + Sync {
    /// One speech per living seat, in speaking order
    async fn speeches(&self, ctx: &DecisionContext) -> PolicyResult<Vec<Speech>>;
}

#[async_trait]
pub trait VotePolicy: Send + Sync {
    /// Everyone's ballots for this day
    async fn cast_votes(&self, ctx: &DecisionContext) -> PolicyResult<Vec<Ballot>>;
}

#[async_trait]
pub trait PostVotePolicy: Send + Sync {
    /// Round one: a forced reaction from one living seat
    async fn react(
        &self,
        seat: SeatId,
        ctx: &DecisionContext,
        summary: &VoteSummary,
    ) -> PolicyResult<VoteReaction>;

    /// Later rounds: an optional follow-up from one living seat
    async fn follow_up(
        &self,
        seat: SeatId,
        ctx: &DecisionContext,
        summary: &VoteSummary,
        round: usize,
    ) -> PolicyResult<Option<String>>;
}

#[async_trait]
pub trait HunterPolicy: Send + Sync {
    /// The dying hunter's shot; `None` holds fire
    async fn choose_shot(&self, ctx: &HunterContext) -> PolicyResult<Option<SeatId>>;
}

// ==================== Fallbacks ====================

/// Deterministic decisions used whenever a provider fails or is absent
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackPolicy;

impl FallbackPolicy {
    /// First living non-werewolf
    pub fn kill_target(ctx: &DecisionContext) -> Option<SeatId> {
        ctx.alive.iter().find(|p| !p.is_werewolf()).map(|p| p.seat)
    }

    /// First living seat other than the seer's own
    pub fn inspect_target(ctx: &DecisionContext) -> Option<SeatId> {
        let seer = ctx.state.find_role(Role::Seer).map(|p| p.seat);
        ctx.alive
            .iter()
            .find(|p| Some(p.seat) != seer)
            .map(|p| p.seat)
    }

    /// Keep both potions
    pub fn witch_decision(_ctx: &DecisionContext) -> WitchDecision {
        WitchDecision::default()
    }

    /// One noncommittal line per living seat
    pub fn speeches(ctx: &DecisionContext) -> Vec<Speech> {
        ctx.alive
            .iter()
            .map(|p| Speech {
                seat: p.seat,
                text: "我暂时没有头绪，先听听大家的想法".to_string(),
                reasoning: None,
            })
            .collect()
    }

    /// Everyone votes for the next living seat after their own
    pub fn votes(ctx: &DecisionContext) -> Vec<Ballot> {
        let seats: Vec<SeatId> = ctx.alive.iter().map(|p| p.seat).collect();
        seats
            .iter()
            .map(|&voter| Ballot {
                voter,
                target: next_living_after(&seats, voter),
                reasoning: None,
            })
            .collect()
    }

    /// Accept the tally, ask for no further rounds
    pub fn reaction(_ctx: &DecisionContext, _seat: SeatId) -> VoteReaction {
        VoteReaction {
            comment: Some("没有异议，按票型走".to_string()),
            wants_continue: false,
        }
    }

    /// Nothing further to add
    pub fn follow_up() -> Option<String> {
        None
    }

    /// Hold fire
    pub fn shot(_ctx: &HunterContext) -> Option<SeatId> {
        None
    }
}

/// Next seat after `from` in the living order, wrapping around
fn next_living_after(living: &[SeatId], from: SeatId) -> Option<SeatId> {
    if living.len() < 2 {
        return None;
    }
    let pos = living.iter().position(|&s| s == from)?;
    Some(living[(pos + 1) % living.len()])
}

#[async_trait]
impl WerewolfPolicy for FallbackPolicy {
    async fn choose_kill(&self, ctx: &DecisionContext) -> PolicyResult<Option<SeatId>> {
        Ok(Self::kill_target(ctx))
    }
}

#[async_trait]
impl SeerPolicy for FallbackPolicy {
    async fn choose_inspect(&self, ctx: &DecisionContext) -> PolicyResult<Option<SeatId>> {
        Ok(Self::inspect_target(ctx))
    }
}

#[async_trait]
impl WitchPolicy for FallbackPolicy {
    async fn decide(&self, ctx: &DecisionContext) -> PolicyResult<WitchDecision> {
        Ok(Self::witch_decision(ctx))
    }
}

#[async_trait]
impl DiscussionPolicy for FallbackPolicy {
    async fn speeches(&self, ctx: &DecisionContext) -> PolicyResult<Vec<Speech>> {
        Ok(Self::speeches(ctx))
    }
}

#[async_trait]
impl VotePolicy for FallbackPolicy {
    async fn cast_votes(&self, ctx: &DecisionContext) -> PolicyResult<Vec<Ballot>> {
        Ok(Self::votes(ctx))
    }
}

#[async_trait]
impl PostVotePolicy for FallbackPolicy {
    async fn react(
        &self,
        seat: SeatId,
        ctx: &DecisionContext,
        _summary: &VoteSummary,
    ) -> PolicyResult<VoteReaction> {
        Ok(Self::reaction(ctx, seat))
    }

    async fn follow_up(
        &self,
        _seat: SeatId,
        _ctx: &DecisionContext,
        _summary: &VoteSummary,
        _round: usize,
    ) -> PolicyResult<Option<String>> {
        Ok(Self::follow_up())
    }
}

#[async_trait]
impl HunterPolicy for FallbackPolicy {
    async fn choose_shot(&self, ctx: &HunterContext) -> PolicyResult<Option<SeatId>> {
        Ok(Self::shot(ctx))
    }
}

// ==================== Composition ====================

/// One provider per decision point; defaults to the built-in fallbacks
#[derive(Clone)]
pub struct PolicySet {
    pub werewolf: Arc<dyn WerewolfPolicy>,
    pub seer: Arc<dyn SeerPolicy>,
    pub witch: Arc<dyn WitchPolicy>,
    pub discussion: Arc<dyn DiscussionPolicy>,
    pub vote: Arc<dyn VotePolicy>,
    pub post_vote: Arc<dyn PostVotePolicy>,
    pub hunter: Arc<dyn HunterPolicy>,
}

impl Default for PolicySet {
    fn default() -> Self {
        let fallback = Arc::new(FallbackPolicy);
        Self {
            werewolf: fallback.clone(),
            seer: fallback.clone(),
            witch: fallback.clone(),
            discussion: fallback.clone(),
            vote: fallback.clone(),
            post_vote: fallback.clone(),
            hunter: fallback,
        }
    }
}
