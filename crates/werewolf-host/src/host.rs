//! The asynchronous game host.
//!
//! [`GameHost`] owns one game. State lives in a watch channel holding the
//! latest [`GameState`] snapshot; every dispatch clones the snapshot, runs
//! it through the pure reducer, and publishes the replacement. The phase
//! sequences narrate the game in the host's voice, ask the configured
//! decision providers for each choice, and substitute deterministic
//! fallbacks whenever a provider fails, so a bad provider can never stall
//! or crash a run.

use crate::config::HostConfig;
use crate::observer::{GameObserver, NoopObserver};
use crate::policy::{
    DecisionContext, FallbackPolicy, HunterContext, PolicyError, PolicySet, Speech, VoteSummary,
};
use crate::tempo::TempoController;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};
use uuid::Uuid;
use werewolf_core::{
    GameAction, GameState, LogEntry, Phase, ReplayCategory, ReplayDraft, Role, SeatId,
    WitchCommand,
};

/// Upper bound on waiting for the follow-up phase after a hunter shot
const PHASE_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Error)]
pub enum HostError {
    #[error("Game not started")]
    GameNotStarted,

    #[error("No winner after {0} day/night cycles")]
    MaxCyclesExceeded(usize),
}

/// Drives one game from seating to game over.
pub struct GameHost {
    pub id: Uuid,
    store: watch::Sender<GameState>,
    policies: PolicySet,
    observer: Arc<dyn GameObserver>,
    tempo: TempoController,
    config: HostConfig,
}

impl GameHost {
    pub fn new(config: HostConfig) -> Self {
        let (store, _) = watch::channel(GameState::new());
        Self {
            id: Uuid::new_v4(),
            store,
            policies: PolicySet::default(),
            observer: Arc::new(NoopObserver),
            tempo: TempoController::new(config.tempo.clone()),
            config,
        }
    }

    pub fn with_policies(mut self, policies: PolicySet) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_observer(mut self, observer: Arc<dyn GameObserver>) -> Self {
        self.observer = observer;
        self
    }

    // ==================== Store ====================

    /// Latest state snapshot
    pub fn snapshot(&self) -> GameState {
        self.store.borrow().clone()
    }

    /// Receiver observing every state replacement
    pub fn subscribe(&self) -> watch::Receiver<GameState> {
        self.store.subscribe()
    }

    pub fn tempo(&self) -> &TempoController {
        &self.tempo
    }

    /// Run one action through the reducer and publish the result
    pub fn dispatch(&self, action: GameAction) {
        let next = self.snapshot().apply(action);
        self.store.send_replace(next);
    }

    // ==================== Engine Pass-throughs ====================

    pub fn start_game(&self, names: Vec<String>, seed: Option<u64>) {
        info!(host = %self.id, players = names.len(), "starting a new game");
        self.dispatch(GameAction::StartGame { names, seed });
    }

    /// Bare phase transition without narration
    pub fn set_phase(&self, phase: Phase) {
        self.dispatch(GameAction::SetPhase {
            phase,
            log: None,
            replay: None,
            highlight: None,
        });
    }

    pub fn set_werewolf_target(&self, target: Option<SeatId>) {
        self.dispatch(GameAction::SetWerewolfTarget(target));
    }

    pub fn set_seer_target(&self, target: Option<SeatId>) {
        self.dispatch(GameAction::SetSeerTarget(target));
    }

    pub fn witch_action(&self, command: WitchCommand) {
        self.dispatch(GameAction::WitchAction(command));
    }

    pub fn cast_vote(&self, voter: SeatId, target: Option<SeatId>) {
        self.dispatch(GameAction::PlayerVote { voter, target });
    }

    pub fn resolve_night(&self) {
        self.dispatch(GameAction::ResolveNight);
    }

    pub fn resolve_voting(&self) {
        self.dispatch(GameAction::ResolveVoting);
    }

    pub fn hunter_shoot(&self, target: Option<SeatId>) {
        self.dispatch(GameAction::HunterShoot(target));
    }

    pub fn append_log(&self, entry: LogEntry) {
        self.dispatch(GameAction::AppendLog(entry));
    }

    pub fn append_log_batch(&self, entries: Vec<LogEntry>) {
        self.dispatch(GameAction::AppendLogBatch(entries));
    }

    pub fn set_highlights(&self, highlights: Vec<String>) {
        self.dispatch(GameAction::SetHighlights(highlights));
    }

    // ==================== Narration ====================

    /// Move to a phase and announce it in the log and replay
    fn announce(&self, phase: Phase, line: impl Into<String>) {
        let line = line.into();
        self.dispatch(GameAction::SetPhase {
            phase,
            log: Some(line.clone()),
            replay: Some(ReplayDraft::new(ReplayCategory::Phase, line)),
            highlight: None,
        });
    }

    /// Publish one speech as a log line plus a speech replay event
    fn say(&self, phase: Phase, speech: &Speech) {
        let name = self.snapshot().name_of(speech.seat);
        let mut draft =
            ReplayDraft::new(ReplayCategory::Speech, speech.text.clone()).with_actor(speech.seat);
        if let Some(reasoning) = &speech.reasoning {
            draft = draft.with_reasoning(reasoning.clone());
        }
        self.dispatch(GameAction::SetPhase {
            phase,
            log: Some(format!("{name}：{text}", text = speech.text)),
            replay: Some(draft),
            highlight: None,
        });
    }

    /// Record a decision in the replay without touching the public log
    fn record_decision(&self, draft: ReplayDraft) {
        self.dispatch(GameAction::AppendLog(LogEntry::replay(draft)));
    }

    /// Note a failed provider and fall back; the game keeps moving
    fn note_degraded(&self, stage: &str, err: &PolicyError) {
        warn!(stage, error = %err, "decision provider failed, using fallback");
        let line = format!("决策引擎离线（{stage}），使用默认策略");
        self.dispatch(GameAction::AppendLog(
            LogEntry::line(line.clone())
                .with_replay(ReplayDraft::new(ReplayCategory::System, line)),
        ));
    }

    // ==================== Phase Sequences ====================

    /// Run one full night: werewolves, then seer and witch if alive, then
    /// the resolution and any hunter shot it triggers.
    pub async fn run_night_sequence(&self) {
        self.announce(Phase::Night, "天黑请闭眼");
        self.tempo.wait_for_tempo().await;
        self.observer.on_night_start(&self.snapshot()).await;

        self.announce(Phase::WerewolfAction, "狼人请睁眼，选择今晚要击杀的目标");
        self.tempo.wait_for_tempo().await;
        let ctx = DecisionContext::from_state(self.snapshot());
        let target = match self.policies.werewolf.choose_kill(&ctx).await {
            Ok(target) => target,
            Err(err) => {
                self.note_degraded("狼人决策", &err);
                FallbackPolicy::kill_target(&ctx)
            }
        };
        let content = match target {
            Some(seat) => format!("狼人选择击杀 {}", ctx.state.name_of(seat)),
            None => "狼人今晚放弃击杀".to_string(),
        };
        self.record_decision(ReplayDraft::new(ReplayCategory::Decision, content));
        self.set_werewolf_target(target);

        if self.snapshot().role_alive(Role::Seer) {
            self.announce(Phase::SeerAction, "预言家请睁眼，选择今晚要查验的目标");
            self.tempo.wait_for_tempo().await;
            let ctx = DecisionContext::from_state(self.snapshot());
            let target = match self.policies.seer.choose_inspect(&ctx).await {
                Ok(target) => target,
                Err(err) => {
                    self.note_degraded("预言家决策", &err);
                    FallbackPolicy::inspect_target(&ctx)
                }
            };
            if target.is_none() {
                let mut draft =
                    ReplayDraft::new(ReplayCategory::Decision, "预言家放弃查验".to_string());
                if let Some(seer) = ctx.state.find_role(Role::Seer) {
                    draft = draft.with_actor(seer.seat);
                }
                self.record_decision(draft);
            }
            // An actual reveal is recorded by the night resolution
            self.set_seer_target(target);
        }

        if self.snapshot().role_alive(Role::Witch) {
            self.announce(Phase::WitchAction, "女巫请睁眼");
            self.tempo.wait_for_tempo().await;
            let ctx = DecisionContext::from_state(self.snapshot());
            let decision = match self.policies.witch.decide(&ctx).await {
                Ok(decision) => decision,
                Err(err) => {
                    self.note_degraded("女巫决策", &err);
                    FallbackPolicy::witch_decision(&ctx)
                }
            };
            let witch_seat = ctx.state.find_role(Role::Witch).map(|p| p.seat);
            if decision.save {
                let mut draft =
                    ReplayDraft::new(ReplayCategory::Decision, "女巫使用了解药".to_string());
                if let Some(seat) = witch_seat {
                    draft = draft.with_actor(seat);
                }
                self.record_decision(draft);
                self.witch_action(WitchCommand::Save);
            }
            if let Some(target) = decision.poison {
                let mut draft = ReplayDraft::new(
                    ReplayCategory::Decision,
                    format!("女巫对 {} 使用了毒药", ctx.state.name_of(target)),
                );
                if let Some(seat) = witch_seat {
                    draft = draft.with_actor(seat);
                }
                self.record_decision(draft);
                self.witch_action(WitchCommand::Poison(target));
            }
            if !decision.save && decision.poison.is_none() {
                let mut draft =
                    ReplayDraft::new(ReplayCategory::Decision, "女巫没有使用药剂".to_string());
                if let Some(seat) = witch_seat {
                    draft = draft.with_actor(seat);
                }
                self.record_decision(draft);
            }
        }

        self.resolve_night();
        self.tempo.wait_for_tempo().await;

        if self.snapshot().phase == Phase::HunterAction {
            self.run_hunter_stage().await;
        }
    }

    /// Run one full day: discussion, voting, bounded post-vote commentary,
    /// then the resolution and any hunter shot it triggers.
    pub async fn run_day_sequence(&self) {
        let day = self.snapshot().day;
        self.announce(Phase::Day, format!("第 {day} 天，请大家睁眼"));
        self.tempo.wait_for_tempo().await;
        self.observer.on_day_start(&self.snapshot()).await;

        self.announce(Phase::Discussion, "进入讨论环节，请依次发言");
        self.tempo.wait_for_tempo().await;
        let ctx = DecisionContext::from_state(self.snapshot());
        let speeches = match self.policies.discussion.speeches(&ctx).await {
            Ok(speeches) => speeches,
            Err(err) => {
                self.note_degraded("讨论", &err);
                FallbackPolicy::speeches(&ctx)
            }
        };
        for speech in &speeches {
            self.say(Phase::Discussion, speech);
            self.tempo.wait_for_tempo().await;
        }

        self.announce(Phase::Voting, "请大家投票");
        self.tempo.wait_for_tempo().await;
        let ctx = DecisionContext::from_state(self.snapshot());
        let ballots = match self.policies.vote.cast_votes(&ctx).await {
            Ok(ballots) => ballots,
            Err(err) => {
                self.note_degraded("投票", &err);
                FallbackPolicy::votes(&ctx)
            }
        };
        for ballot in &ballots {
            let content = match ballot.target {
                Some(target) => format!(
                    "{} 决定投给 {}",
                    ctx.state.name_of(ballot.voter),
                    ctx.state.name_of(target)
                ),
                None => format!("{} 决定弃票", ctx.state.name_of(ballot.voter)),
            };
            let mut draft =
                ReplayDraft::new(ReplayCategory::Decision, content).with_actor(ballot.voter);
            if let Some(reasoning) = &ballot.reasoning {
                draft = draft.with_reasoning(reasoning.clone());
            }
            self.record_decision(draft);
            self.cast_vote(ballot.voter, ballot.target);
        }

        self.run_post_vote_rounds().await;

        self.resolve_voting();
        self.tempo.wait_for_tempo().await;

        if self.snapshot().phase == Phase::HunterAction {
            self.run_hunter_stage().await;
        }
    }

    /// Bounded commentary on the standing vote before it resolves.
    ///
    /// Round one is a forced reaction from every living seat. Later rounds
    /// only run while enough seats keep contributing, and never past the
    /// configured cap no matter what providers return.
    async fn run_post_vote_rounds(&self) {
        let state = self.snapshot();
        let summary = VoteSummary::from_votes(&state.votes);
        let ctx = DecisionContext::from_state(state);

        let mut continuing = 0usize;
        for player in &ctx.alive {
            let reaction = match self
                .policies
                .post_vote
                .react(player.seat, &ctx, &summary)
                .await
            {
                Ok(reaction) => reaction,
                Err(err) => {
                    self.note_degraded("投票后讨论", &err);
                    FallbackPolicy::reaction(&ctx, player.seat)
                }
            };
            if let Some(comment) = reaction.comment {
                self.say(
                    Phase::Voting,
                    &Speech {
                        seat: player.seat,
                        text: comment,
                        reasoning: None,
                    },
                );
                self.tempo.wait_for_tempo().await;
            }
            if reaction.wants_continue {
                continuing += 1;
            }
        }
        if continuing < self.config.post_vote.min_participants {
            return;
        }

        for round in 2..=self.config.post_vote.max_rounds {
            let mut spoke = 0usize;
            for player in &ctx.alive {
                let follow = match self
                    .policies
                    .post_vote
                    .follow_up(player.seat, &ctx, &summary, round)
                    .await
                {
                    Ok(follow) => follow,
                    Err(err) => {
                        self.note_degraded("投票后讨论", &err);
                        FallbackPolicy::follow_up()
                    }
                };
                if let Some(text) = follow {
                    self.say(
                        Phase::Voting,
                        &Speech {
                            seat: player.seat,
                            text,
                            reasoning: None,
                        },
                    );
                    self.tempo.wait_for_tempo().await;
                    spoke += 1;
                }
            }
            if spoke < self.config.post_vote.min_participants {
                return;
            }
        }
    }

    /// Resolve a pending hunter shot, then wait (bounded) for the engine
    /// to land on the recorded follow-up phase.
    async fn run_hunter_stage(&self) {
        let state = self.snapshot();
        let pending = match state.hunter_pending {
            Some(pending) => pending,
            None => return,
        };

        if state.player(pending.seat).is_none() {
            // Unresolvable seat; discharge the pending shot as a no-op
            self.hunter_shoot(None);
            return;
        }

        let ctx = HunterContext {
            alive: state
                .players
                .iter()
                .filter(|p| p.alive && p.seat != pending.seat)
                .cloned()
                .collect(),
            day: state.day,
            hunter: pending.seat,
            trigger: pending.trigger,
            state,
        };
        let shot = match self.policies.hunter.choose_shot(&ctx).await {
            Ok(shot) => shot,
            Err(err) => {
                self.note_degraded("猎人决策", &err);
                FallbackPolicy::shot(&ctx)
            }
        };
        self.hunter_shoot(shot);
        self.tempo.wait_for_tempo().await;

        if self.snapshot().is_over() {
            return;
        }
        let next = pending.next_phase;
        let mut rx = self.subscribe();
        let wait = rx.wait_for(|s| s.phase == next || s.is_over());
        // The wait result borrows `rx`, so consume it before `rx` drops
        if tokio::time::timeout(PHASE_WAIT_TIMEOUT, wait).await.is_err() {
            warn!(phase = ?next, "follow-up phase never arrived after the hunter shot");
        }
    }

    // ==================== Full Cycle ====================

    /// Alternate night and day sequences until someone wins.
    ///
    /// Refuses to run before a game has been started. The cycle ceiling
    /// exists so a rules bug cannot spin this loop forever.
    pub async fn run_full_cycle(&self) -> Result<(), HostError> {
        if self.snapshot().players.is_empty() {
            return Err(HostError::GameNotStarted);
        }
        if self.snapshot().is_over() {
            return Ok(());
        }

        for cycle in 1..=self.config.max_cycles {
            debug!(cycle, "starting day/night cycle");
            self.tempo.wait_while_paused().await;
            self.run_night_sequence().await;
            if self.finish_if_over().await {
                return Ok(());
            }
            self.tempo.wait_while_paused().await;
            self.run_day_sequence().await;
            if self.finish_if_over().await {
                return Ok(());
            }
        }
        Err(HostError::MaxCyclesExceeded(self.config.max_cycles))
    }

    /// Notify the observer and report true once the game has ended
    async fn finish_if_over(&self) -> bool {
        let state = self.snapshot();
        if !state.is_over() {
            return false;
        }
        info!(host = %self.id, winner = ?state.winner, day = state.day, "game over");
        self.observer.on_game_over(&state).await;
        true
    }
}
