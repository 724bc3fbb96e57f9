//! End-to-end runs of the host against the real engine.

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use werewolf_core::{Faction, GameState, Phase, ReplayCategory, Role, SeatId};
use werewolf_host::{
    Ballot, DecisionContext, DiscussionPolicy, GameHost, GameObserver, HostConfig, HostError,
    HunterContext, HunterPolicy, PolicyError, PolicyResult, PolicySet, PostVotePolicy, SeerPolicy,
    Speech, VotePolicy, VoteReaction, VoteSummary, WerewolfPolicy, WitchDecision, WitchPolicy,
};

fn names() -> Vec<String> {
    (1..=10).map(|n| format!("Player {n}")).collect()
}

fn fast_config() -> HostConfig {
    let mut config = HostConfig::default();
    config.tempo.step_delay = Duration::ZERO;
    config.tempo.poll_interval = Duration::from_millis(1);
    config
}

// ==================== Test Policies ====================

/// Fails every decision, forcing the fallback path everywhere
struct BrokenPolicy;

#[async_trait]
impl WerewolfPolicy for BrokenPolicy {
    async fn choose_kill(&self, _ctx: &DecisionContext) -> PolicyResult<Option<SeatId>> {
        Err(PolicyError::Backend("model unreachable".to_string()))
    }
}

#[async_trait]
impl SeerPolicy for BrokenPolicy {
    async fn choose_inspect(&self, _ctx: &DecisionContext) -> PolicyResult<Option<SeatId>> {
        Err(PolicyError::Backend("model unreachable".to_string()))
    }
}

#[async_trait]
impl WitchPolicy for BrokenPolicy {
    async fn decide(&self, _ctx: &DecisionContext) -> PolicyResult<WitchDecision> {
        Err(PolicyError::Backend("model unreachable".to_string()))
    }
}

#[async_trait]
impl DiscussionPolicy for BrokenPolicy {
    async fn speeches(&self, _ctx: &DecisionContext) -> PolicyResult<Vec<Speech>> {
        Err(PolicyError::Backend("model unreachable".to_string()))
    }
}

#[async_trait]
impl VotePolicy for BrokenPolicy {
    async fn cast_votes(&self, _ctx: &DecisionContext) -> PolicyResult<Vec<Ballot>> {
        Err(PolicyError::Backend("model unreachable".to_string()))
    }
}

#[async_trait]
impl PostVotePolicy for BrokenPolicy {
    async fn react(
        &self,
        _seat: SeatId,
        _ctx: &DecisionContext,
        _summary: &VoteSummary,
    ) -> PolicyResult<VoteReaction> {
        Err(PolicyError::Backend("model unreachable".to_string()))
    }

    async fn follow_up(
        &self,
        _seat: SeatId,
        _ctx: &DecisionContext,
        _summary: &VoteSummary,
        _round: usize,
    ) -> PolicyResult<Option<String>> {
        Err(PolicyError::Backend("model unreachable".to_string()))
    }
}

#[async_trait]
impl HunterPolicy for BrokenPolicy {
    async fn choose_shot(&self, _ctx: &HunterContext) -> PolicyResult<Option<SeatId>> {
        Err(PolicyError::Backend("model unreachable".to_string()))
    }
}

fn broken_policies() -> PolicySet {
    let broken = Arc::new(BrokenPolicy);
    PolicySet {
        werewolf: broken.clone(),
        seer: broken.clone(),
        witch: broken.clone(),
        discussion: broken.clone(),
        vote: broken.clone(),
        post_vote: broken.clone(),
        hunter: broken,
    }
}

/// Succeeds with empty decisions, so nobody ever dies
struct PassivePolicy;

#[async_trait]
impl WerewolfPolicy for PassivePolicy {
    async fn choose_kill(&self, _ctx: &DecisionContext) -> PolicyResult<Option<SeatId>> {
        Ok(None)
    }
}

#[async_trait]
impl SeerPolicy for PassivePolicy {
    async fn choose_inspect(&self, _ctx: &DecisionContext) -> PolicyResult<Option<SeatId>> {
        Ok(None)
    }
}

#[async_trait]
impl DiscussionPolicy for PassivePolicy {
    async fn speeches(&self, _ctx: &DecisionContext) -> PolicyResult<Vec<Speech>> {
        Ok(Vec::new())
    }
}

#[async_trait]
impl VotePolicy for PassivePolicy {
    async fn cast_votes(&self, _ctx: &DecisionContext) -> PolicyResult<Vec<Ballot>> {
        Ok(Vec::new())
    }
}

/// Counts invocations and always asks for more commentary rounds
#[derive(Default)]
struct ChattyPostVote {
    reactions: AtomicUsize,
    follow_ups: AtomicUsize,
}

#[async_trait]
impl PostVotePolicy for ChattyPostVote {
    async fn react(
        &self,
        _seat: SeatId,
        _ctx: &DecisionContext,
        _summary: &VoteSummary,
    ) -> PolicyResult<VoteReaction> {
        self.reactions.fetch_add(1, Ordering::SeqCst);
        Ok(VoteReaction {
            comment: Some("这票型有问题，我还想说两句".to_string()),
            wants_continue: true,
        })
    }

    async fn follow_up(
        &self,
        _seat: SeatId,
        _ctx: &DecisionContext,
        _summary: &VoteSummary,
        _round: usize,
    ) -> PolicyResult<Option<String>> {
        self.follow_ups.fetch_add(1, Ordering::SeqCst);
        Ok(Some("补充一句".to_string()))
    }
}

/// Wolves and voters fixated on the first seat to die
struct CorpseTargeter;

#[async_trait]
impl WerewolfPolicy for CorpseTargeter {
    async fn choose_kill(&self, ctx: &DecisionContext) -> PolicyResult<Option<SeatId>> {
        let first_dead = ctx.state.players.iter().find(|p| !p.alive).map(|p| p.seat);
        Ok(first_dead.or_else(|| ctx.alive.iter().find(|p| !p.is_werewolf()).map(|p| p.seat)))
    }
}

#[async_trait]
impl VotePolicy for CorpseTargeter {
    async fn cast_votes(&self, ctx: &DecisionContext) -> PolicyResult<Vec<Ballot>> {
        let first_dead = ctx.state.players.iter().find(|p| !p.alive).map(|p| p.seat);
        Ok(ctx
            .alive
            .iter()
            .map(|p| Ballot {
                voter: p.seat,
                target: first_dead,
                reasoning: None,
            })
            .collect())
    }
}

/// Voters that all turn on the hunter
struct HunterLyncher;

#[async_trait]
impl VotePolicy for HunterLyncher {
    async fn cast_votes(&self, ctx: &DecisionContext) -> PolicyResult<Vec<Ballot>> {
        let hunter = ctx
            .state
            .players
            .iter()
            .find(|p| p.role == Role::Hunter)
            .map(|p| p.seat);
        Ok(ctx
            .alive
            .iter()
            .map(|p| Ballot {
                voter: p.seat,
                target: hunter,
                reasoning: None,
            })
            .collect())
    }
}

/// Werewolves that hunt down the hunter on night one
struct HunterSeeker;

#[async_trait]
impl WerewolfPolicy for HunterSeeker {
    async fn choose_kill(&self, ctx: &DecisionContext) -> PolicyResult<Option<SeatId>> {
        Ok(ctx
            .state
            .players
            .iter()
            .find(|p| p.role == Role::Hunter)
            .map(|p| p.seat))
    }
}

/// A hunter that takes the first living werewolf with him
struct WolfShooter;

#[async_trait]
impl HunterPolicy for WolfShooter {
    async fn choose_shot(&self, ctx: &HunterContext) -> PolicyResult<Option<SeatId>> {
        Ok(ctx.alive.iter().find(|p| p.is_werewolf()).map(|p| p.seat))
    }
}

#[derive(Default)]
struct CountingObserver {
    nights: AtomicUsize,
    days: AtomicUsize,
    game_overs: AtomicUsize,
}

#[async_trait]
impl GameObserver for CountingObserver {
    async fn on_night_start(&self, _state: &GameState) {
        self.nights.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_day_start(&self, _state: &GameState) {
        self.days.fetch_add(1, Ordering::SeqCst);
    }

    async fn on_game_over(&self, _state: &GameState) {
        self.game_overs.fetch_add(1, Ordering::SeqCst);
    }
}

// ==================== Tests ====================

#[tokio::test]
async fn test_fallback_game_runs_to_werewolf_victory() {
    let host = GameHost::new(fast_config());
    host.start_game(names(), Some(42));
    host.run_full_cycle().await.unwrap();

    let state = host.snapshot();
    assert!(state.is_over());
    assert_eq!(state.winner, Some(Faction::Werewolves));
    assert_eq!(state.log.last().unwrap(), "游戏结束，狼人阵营获胜");

    // Host and engine split the narration between them
    assert!(state.log.iter().any(|l| l == "天黑请闭眼"));
    assert!(state.log.iter().any(|l| l.contains("天亮了")));
    assert!(state.log.iter().any(|l| l == "第 1 天，请大家睁眼"));

    // Healthy providers never trip the degraded path
    assert!(!state.log.iter().any(|l| l.contains("决策引擎离线")));
}

#[tokio::test]
async fn test_broken_providers_degrade_but_finish() {
    let host = GameHost::new(fast_config()).with_policies(broken_policies());
    host.start_game(names(), Some(7));
    host.run_full_cycle().await.unwrap();

    let state = host.snapshot();
    assert!(state.is_over());
    assert_eq!(state.winner, Some(Faction::Werewolves));
    assert!(state.log.iter().any(|l| l.contains("决策引擎离线")));
}

#[tokio::test]
async fn test_passive_game_hits_the_cycle_ceiling() {
    let mut config = fast_config();
    config.max_cycles = 2;
    let passive = Arc::new(PassivePolicy);
    let policies = PolicySet {
        werewolf: passive.clone(),
        discussion: passive.clone(),
        vote: passive,
        ..PolicySet::default()
    };
    let host = GameHost::new(config).with_policies(policies);
    host.start_game(names(), Some(7));

    let result = host.run_full_cycle().await;
    assert!(matches!(result, Err(HostError::MaxCyclesExceeded(2))));

    // Two full cycles bump the day counter at all four boundaries
    let state = host.snapshot();
    assert!(!state.is_over());
    assert_eq!(state.day, 4);
    assert!(state.log.iter().any(|l| l == "昨晚是平安夜，无人死亡"));
    assert!(state.log.iter().any(|l| l == "平票，无人出局"));
}

#[tokio::test]
async fn test_skipped_night_actions_are_still_recorded() {
    let passive = Arc::new(PassivePolicy);
    let policies = PolicySet {
        werewolf: passive.clone(),
        seer: passive,
        ..PolicySet::default()
    };
    let host = GameHost::new(fast_config()).with_policies(policies);
    host.start_game(names(), Some(7));
    host.run_night_sequence().await;

    // Sparing, skipping, and passing each leave a decision entry, same as
    // an affirmative choice would
    let state = host.snapshot();
    let decisions: Vec<&str> = state
        .replay
        .iter()
        .filter(|e| e.category == ReplayCategory::Decision)
        .map(|e| e.content.as_str())
        .collect();
    assert!(decisions.iter().any(|c| c.contains("狼人今晚放弃击杀")));
    assert!(decisions.iter().any(|c| c.contains("预言家放弃查验")));
    assert!(decisions.iter().any(|c| c.contains("女巫没有使用药剂")));

    // Night choices never leak into the public narration
    assert!(!state.log.iter().any(|l| l.contains("放弃击杀")));
    assert!(!state.log.iter().any(|l| l.contains("放弃查验")));
}

#[tokio::test]
async fn test_votes_for_a_dead_seat_cannot_stall_the_run() {
    let mut config = fast_config();
    config.max_cycles = 3;
    let stuck = Arc::new(CorpseTargeter);
    let policies = PolicySet {
        werewolf: stuck.clone(),
        vote: stuck,
        ..PolicySet::default()
    };
    let host = GameHost::new(config).with_policies(policies);
    host.start_game(names(), Some(7));

    let result = host.run_full_cycle().await;
    assert!(matches!(result, Err(HostError::MaxCyclesExceeded(3))));

    // Only the first night makes progress; every later target is a corpse
    let state = host.snapshot();
    assert!(!state.is_over());
    assert_eq!(state.players.iter().filter(|p| !p.alive).count(), 1);
    assert_eq!(state.day, 6);
    assert!(state.log.iter().any(|l| l.contains("已经死亡，无人出局")));
    assert!(!state.log.iter().any(|l| l == "平票，无人出局"));
}

#[tokio::test]
async fn test_post_vote_rounds_stay_bounded() {
    let chatty = Arc::new(ChattyPostVote::default());
    let policies = PolicySet {
        post_vote: chatty.clone(),
        ..PolicySet::default()
    };
    let host = GameHost::new(fast_config()).with_policies(policies);
    host.start_game(names(), Some(7));
    host.run_day_sequence().await;

    // Round one is forced for all ten seats; the cap allows exactly two
    // follow-up rounds no matter how much everyone wants to continue
    assert_eq!(chatty.reactions.load(Ordering::SeqCst), 10);
    assert_eq!(chatty.follow_ups.load(Ordering::SeqCst), 20);
}

#[tokio::test]
async fn test_hunter_shot_after_night_kill_returns_to_day() {
    let policies = PolicySet {
        werewolf: Arc::new(HunterSeeker),
        hunter: Arc::new(WolfShooter),
        ..PolicySet::default()
    };
    let host = GameHost::new(fast_config()).with_policies(policies);
    host.start_game(names(), Some(42));
    host.run_night_sequence().await;

    let state = host.snapshot();
    assert_eq!(state.phase, Phase::Day);
    assert_eq!(state.day, 1);
    assert!(state.hunter_pending.is_none());

    let hunter = state.players.iter().find(|p| p.role == Role::Hunter).unwrap();
    assert!(!hunter.alive);
    let dead_wolves = state
        .players
        .iter()
        .filter(|p| !p.alive && p.is_werewolf())
        .count();
    assert_eq!(dead_wolves, 1);
    assert!(state.log.iter().any(|l| l.contains("开枪带走了")));
    assert!(state.log.iter().any(|l| l == "枪声过后，天亮了"));
}

#[tokio::test]
async fn test_hunter_shot_after_vote_returns_to_night() {
    let policies = PolicySet {
        werewolf: Arc::new(PassivePolicy),
        vote: Arc::new(HunterLyncher),
        hunter: Arc::new(WolfShooter),
        ..PolicySet::default()
    };
    let host = GameHost::new(fast_config()).with_policies(policies);
    host.start_game(names(), Some(42));
    host.run_night_sequence().await;
    host.run_day_sequence().await;

    // The vote-path shot resumes at Night without a second day bump
    let state = host.snapshot();
    assert_eq!(state.phase, Phase::Night);
    assert_eq!(state.day, 2);
    assert!(state.hunter_pending.is_none());

    let dead_wolves = state
        .players
        .iter()
        .filter(|p| !p.alive && p.is_werewolf())
        .count();
    assert_eq!(dead_wolves, 1);
    assert!(state.log.iter().any(|l| l.contains("被投票出局（10 票）")));
    assert!(state.log.iter().any(|l| l == "枪声过后，天黑了"));
}

#[tokio::test]
async fn test_observer_sees_game_over_exactly_once() {
    let observer = Arc::new(CountingObserver::default());
    let host = GameHost::new(fast_config()).with_observer(observer.clone());
    host.start_game(names(), Some(42));
    host.run_full_cycle().await.unwrap();

    // Fallback werewolves reach parity on the fourth night
    assert_eq!(observer.nights.load(Ordering::SeqCst), 4);
    assert_eq!(observer.days.load(Ordering::SeqCst), 3);
    assert_eq!(observer.game_overs.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_subscriber_observes_the_final_state() {
    let host = GameHost::new(fast_config());
    let mut rx = host.subscribe();
    host.start_game(names(), Some(42));
    host.run_full_cycle().await.unwrap();

    let state = rx.wait_for(|s| s.is_over()).await.unwrap();
    assert_eq!(state.winner, Some(Faction::Werewolves));
}

#[tokio::test]
async fn test_pause_blocks_the_run_until_resume() {
    let host = Arc::new(GameHost::new(fast_config()));
    host.start_game(names(), Some(42));
    host.tempo().pause();

    let runner = host.clone();
    let handle = tokio::spawn(async move { runner.run_full_cycle().await });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!handle.is_finished());

    host.tempo().resume();
    let result = handle.await.unwrap();
    assert!(result.is_ok());
    assert!(host.snapshot().is_over());
}

#[tokio::test]
async fn test_stale_pause_is_force_resumed() {
    let mut config = fast_config();
    config.tempo.pause_timeout = Duration::from_millis(50);
    let host = GameHost::new(config);
    host.start_game(names(), Some(42));
    host.tempo().pause();

    // Nobody ever resumes; the watchdog must unblock the run by itself
    let result = timeout(Duration::from_secs(5), host.run_full_cycle()).await;
    assert!(result.unwrap().is_ok());
    assert!(host.snapshot().is_over());
}

#[tokio::test]
async fn test_skip_races_through_real_delays() {
    let host = GameHost::new(HostConfig::default());
    host.start_game(names(), Some(42));
    host.tempo().set_skip(true);

    // Default pacing would take minutes; skip must finish in moments
    let result = timeout(Duration::from_secs(5), host.run_full_cycle()).await;
    assert!(result.unwrap().is_ok());
}
