//! The game state machine.
//!
//! A single pure reducer maps (state, action) to the next state. The state
//! is replaced wholesale on every transition; callers clone the current
//! snapshot, apply an action, and store the result. The reducer never
//! panics on invalid input: an action that makes no sense in the current
//! state leaves the state unchanged.

use crate::action::{GameAction, WitchCommand};
use crate::player::{Player, SeatId};
use crate::replay::{now_ms, LogEntry, ReplayCategory, ReplayDraft, ReplayEvent};
use crate::role::{role_pool, Faction, Role};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Death cause shown in the night summary
const CAUSE_WOLF: &str = "狼人击杀";
/// Death cause shown in the night summary
const CAUSE_POISON: &str = "女巫毒杀";

/// The phase cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    /// Fresh game, roles dealt, no night has run yet
    RoleAssignment,
    Night,
    WerewolfAction,
    SeerAction,
    WitchAction,
    Day,
    Discussion,
    Voting,
    /// A dead hunter owes the table a shot
    HunterAction,
    /// Terminal and absorbing
    GameOver,
}

/// What killed the hunter, which decides where play resumes after the shot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HunterTrigger {
    /// Died to the night resolution; play resumes at Day
    Night,
    /// Voted out during the day; play resumes at Night
    Day,
}

/// A hunter shot owed but not yet resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HunterPending {
    pub seat: SeatId,
    pub trigger: HunterTrigger,
    /// Phase to enter once the shot is resolved
    pub next_phase: Phase,
}

/// The witch's potion state. The two used-flags persist for the whole
/// game; the two targets are per-night sub-choices.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WitchState {
    pub save_used: bool,
    pub poison_used: bool,
    pub save_target: Option<SeatId>,
    pub poison_target: Option<SeatId>,
}

/// One ballot; `target: None` is an abstention
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: SeatId,
    pub target: Option<SeatId>,
}

/// Win condition over a player list, alive seats only.
///
/// Zero living werewolves hands the game to the villagers. Werewolves win
/// once they are at least as many as the living good seats while at least
/// one werewolf still stands. Anything else means the game goes on.
pub fn winner_of(players: &[Player]) -> Option<Faction> {
    let wolves = players.iter().filter(|p| p.alive && p.is_werewolf()).count();
    let good = players.iter().filter(|p| p.alive && !p.is_werewolf()).count();
    if wolves == 0 {
        Some(Faction::Villagers)
    } else if wolves >= good {
        Some(Faction::Werewolves)
    } else {
        None
    }
}

/// Tally cast ballots: abstentions are excluded, targets are sorted by
/// descending count (seat id breaks ties for a stable order), and the
/// returned flag says whether the top of the tally is tied.
pub fn tally_votes(votes: &[Vote]) -> (Vec<(SeatId, usize)>, bool) {
    let mut counts: BTreeMap<SeatId, usize> = BTreeMap::new();
    for vote in votes {
        if let Some(target) = vote.target {
            *counts.entry(target).or_insert(0) += 1;
        }
    }
    let mut sorted: Vec<(SeatId, usize)> = counts.into_iter().collect();
    sorted.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
    let tied = sorted.len() >= 2 && sorted[0].1 == sorted[1].1;
    (sorted, tied)
}

/// The single source of truth for one game
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameState {
    pub players: Vec<Player>,
    /// Starts at 0, bumps once per night-to-day and day-to-night boundary
    pub day: u32,
    pub phase: Phase,
    pub winner: Option<Faction>,
    /// Tonight's recorded werewolf kill choice
    pub werewolf_target: Option<SeatId>,
    /// Tonight's recorded seer inspection choice
    pub seer_target: Option<SeatId>,
    pub witch: WitchState,
    /// At most one ballot per voter; re-casting replaces
    pub votes: Vec<Vote>,
    pub hunter_pending: Option<HunterPending>,
    /// Human-readable narrative, append-only
    pub log: Vec<String>,
    /// Structured audit trail, append-only
    pub replay: Vec<ReplayEvent>,
    /// Log lines marked as narratively significant
    pub highlights: Vec<String>,
    /// Last assigned replay event id
    pub replay_seq: u64,
}

impl Default for GameState {
    fn default() -> Self {
        Self {
            players: Vec::new(),
            day: 0,
            phase: Phase::RoleAssignment,
            winner: None,
            werewolf_target: None,
            seer_target: None,
            witch: WitchState::default(),
            votes: Vec::new(),
            hunter_pending: None,
            log: Vec::new(),
            replay: Vec::new(),
            highlights: Vec::new(),
            replay_seq: 0,
        }
    }
}

impl GameState {
    /// Empty pre-game state
    pub fn new() -> Self {
        Self::default()
    }

    // ==================== Accessors ====================

    /// Player at the given seat
    pub fn player(&self, seat: SeatId) -> Option<&Player> {
        self.players.iter().find(|p| p.seat == seat)
    }

    fn player_mut(&mut self, seat: SeatId) -> Option<&mut Player> {
        self.players.iter_mut().find(|p| p.seat == seat)
    }

    /// All living players, in seat order
    pub fn alive_players(&self) -> Vec<&Player> {
        self.players.iter().filter(|p| p.alive).collect()
    }

    /// Seat ids of all living players, in seat order
    pub fn living_seats(&self) -> Vec<SeatId> {
        self.players
            .iter()
            .filter(|p| p.alive)
            .map(|p| p.seat)
            .collect()
    }

    /// First player holding the given role
    pub fn find_role(&self, role: Role) -> Option<&Player> {
        self.players.iter().find(|p| p.role == role)
    }

    /// Whether any living player holds the given role
    pub fn role_alive(&self, role: Role) -> bool {
        self.players.iter().any(|p| p.alive && p.role == role)
    }

    /// Whether the game has reached its terminal phase
    pub fn is_over(&self) -> bool {
        self.phase == Phase::GameOver
    }

    /// Display name for a seat, "{seat} 号" for unknown seats
    pub fn name_of(&self, seat: SeatId) -> String {
        self.player(seat)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("{seat} 号"))
    }

    fn alive_at(&self, seat: SeatId) -> bool {
        self.player(seat).map_or(false, |p| p.alive)
    }

    // ==================== Reducer ====================

    /// Apply one action and return the next state.
    ///
    /// `GameOver` absorbs every action except a full restart.
    #[must_use]
    pub fn apply(mut self, action: GameAction) -> GameState {
        if self.phase == Phase::GameOver && !matches!(action, GameAction::StartGame { .. }) {
            return self;
        }

        match action {
            // ==================== Lifecycle ====================
            GameAction::StartGame { names, seed } => self.start_game(&names, seed),
            GameAction::SetPhase {
                phase,
                log,
                replay,
                highlight,
            } => self.set_phase(phase, log, replay, highlight),

            // ==================== Night Choices ====================
            GameAction::SetWerewolfTarget(target) => self.werewolf_target = target,
            GameAction::SetSeerTarget(target) => self.seer_target = target,
            GameAction::WitchAction(cmd) => self.witch_action(cmd),

            // ==================== Day Choices ====================
            GameAction::PlayerVote { voter, target } => self.player_vote(voter, target),

            // ==================== Resolution ====================
            GameAction::ResolveNight => self.resolve_night(),
            GameAction::ResolveVoting => self.resolve_voting(),
            GameAction::HunterShoot(target) => self.hunter_shoot(target),

            // ==================== Audit ====================
            GameAction::AppendLog(entry) => self.append_entry(entry),
            GameAction::AppendLogBatch(entries) => {
                for entry in entries {
                    self.append_entry(entry);
                }
            }
            GameAction::SetHighlights(list) => self.highlights = list,
        }

        self
    }

    // ==================== Lifecycle ====================

    fn start_game(&mut self, names: &[String], seed: Option<u64>) {
        let mut pool = role_pool();
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        pool.shuffle(&mut rng);

        self.players = pool
            .into_iter()
            .enumerate()
            .map(|(i, role)| {
                let seat = (i + 1) as SeatId;
                let name = names
                    .get(i)
                    .map(|n| n.trim())
                    .filter(|n| !n.is_empty())
                    .map_or_else(|| format!("Player {seat}"), str::to_string);
                Player::new(seat, name, role)
            })
            .collect();

        self.day = 0;
        self.phase = Phase::RoleAssignment;
        self.winner = None;
        self.werewolf_target = None;
        self.seer_target = None;
        self.witch = WitchState::default();
        self.votes.clear();
        self.hunter_pending = None;
        self.log.clear();
        self.replay.clear();
        self.highlights.clear();
        self.replay_seq = 0;

        self.push_line("新的一局游戏开始，身份已分配");
        self.push_replay(ReplayDraft::new(
            ReplayCategory::System,
            "新的一局游戏开始，身份已分配",
        ));
    }

    fn set_phase(
        &mut self,
        phase: Phase,
        log: Option<String>,
        replay: Option<ReplayDraft>,
        highlight: Option<String>,
    ) {
        self.phase = phase;
        if let Some(line) = log {
            self.push_line(line);
        }
        if let Some(draft) = replay {
            self.push_replay(draft);
        }
        if let Some(text) = highlight {
            self.highlights.push(text);
        }
    }

    // ==================== Night Choices ====================

    fn witch_action(&mut self, cmd: WitchCommand) {
        match cmd {
            WitchCommand::Save => {
                if self.witch.save_used {
                    return;
                }
                self.witch.save_used = true;
                // The save covers whoever the wolves had picked at this moment
                self.witch.save_target = self.werewolf_target;
            }
            WitchCommand::Poison(target) => {
                if self.witch.poison_used {
                    return;
                }
                self.witch.poison_used = true;
                self.witch.poison_target = Some(target);
            }
        }
    }

    // ==================== Day Choices ====================

    fn player_vote(&mut self, voter: SeatId, target: Option<SeatId>) {
        if !self.alive_at(voter) {
            return;
        }
        if let Some(vote) = self.votes.iter_mut().find(|v| v.voter == voter) {
            vote.target = target;
        } else {
            self.votes.push(Vote { voter, target });
        }
    }

    // ==================== Resolution ====================

    fn resolve_night(&mut self) {
        // Pending deaths keyed by victim, each with its list of causes.
        // A victim can carry both a kill and a poison in the same night.
        let mut pending: BTreeMap<SeatId, Vec<&'static str>> = BTreeMap::new();

        if let Some(target) = self.werewolf_target {
            if self.alive_at(target) {
                pending.entry(target).or_default().push(CAUSE_WOLF);
            }
        }

        // The save removes the kill outright when the targets line up
        if let (Some(saved), Some(killed)) = (self.witch.save_target, self.werewolf_target) {
            if saved == killed {
                pending.remove(&killed);
            }
        }

        if let Some(target) = self.witch.poison_target {
            if self.alive_at(target) {
                pending.entry(target).or_default().push(CAUSE_POISON);
            }
        }

        // Seer reveal: information only, recorded in the replay but kept
        // out of the public log
        if let Some(target) = self.seer_target {
            if let Some(verdict) = self.player(target).map(|p| p.role.inspect_verdict()) {
                if let Some(p) = self.player_mut(target) {
                    p.seer_verdict = Some(verdict.to_string());
                }
                let content = format!("预言家查验了 {}：{}", self.name_of(target), verdict);
                let mut draft = ReplayDraft::new(ReplayCategory::Decision, content);
                if let Some(seer) = self.find_role(Role::Seer) {
                    draft = draft.with_actor(seer.seat);
                }
                self.push_replay(draft);
            }
        }

        // Commit the deaths
        let mut hunter_died = None;
        for &seat in pending.keys() {
            if let Some(p) = self.player_mut(seat) {
                p.alive = false;
                if p.role == Role::Hunter {
                    hunter_died = Some(seat);
                }
            }
        }

        // One combined summary line, or the peaceful-night line
        if pending.is_empty() {
            self.push_line("昨晚是平安夜，无人死亡");
            self.push_replay(ReplayDraft::new(
                ReplayCategory::Action,
                "昨晚是平安夜，无人死亡",
            ));
        } else {
            let victims = pending
                .iter()
                .map(|(seat, causes)| format!("{}（{}）", self.name_of(*seat), causes.join("、")))
                .collect::<Vec<_>>()
                .join("、");
            let line = format!("昨晚死亡：{victims}");
            self.push_line(line.clone());
            self.push_replay(ReplayDraft::new(ReplayCategory::Action, line.clone()));
            self.highlights.push(line);
        }

        // Hand the game to the winner, the hunter, or the day
        if let Some(winner) = winner_of(&self.players) {
            self.finish_game(winner);
        } else if let Some(seat) = hunter_died {
            self.hunter_pending = Some(HunterPending {
                seat,
                trigger: HunterTrigger::Night,
                next_phase: Phase::Day,
            });
            self.phase = Phase::HunterAction;
            let line = format!("{} 是猎人，等待开枪", self.name_of(seat));
            self.push_line(line.clone());
            self.push_replay(ReplayDraft::new(ReplayCategory::System, line));
        } else {
            self.phase = Phase::Day;
            self.day += 1;
            self.push_line("天亮了");
            self.push_replay(ReplayDraft::new(ReplayCategory::Phase, "天亮了"));
        }

        // Per-night sub-choices reset; the witch's used-flags persist
        self.werewolf_target = None;
        self.seer_target = None;
        self.witch.save_target = None;
        self.witch.poison_target = None;
    }

    fn resolve_voting(&mut self) {
        // Audit every cast ballot before tallying
        let votes = self.votes.clone();
        for vote in &votes {
            let line = match vote.target {
                Some(target) => {
                    format!("{} 投给 {}", self.name_of(vote.voter), self.name_of(target))
                }
                None => format!("{} 弃票", self.name_of(vote.voter)),
            };
            self.push_line(line.clone());
            self.push_replay(ReplayDraft::new(ReplayCategory::Action, line).with_actor(vote.voter));
        }

        let (counts, tied) = tally_votes(&votes);
        let top = if tied { None } else { counts.first().copied() };

        // Exactly one outcome line per resolution: an elimination, the
        // tie line, or the dead-target line
        let mut hunter_died = None;
        match top {
            Some((seat, count)) if self.alive_at(seat) => {
                if let Some(p) = self.player_mut(seat) {
                    p.alive = false;
                    if p.role == Role::Hunter {
                        hunter_died = Some(seat);
                    }
                }
                let line = format!("{} 被投票出局（{count} 票）", self.name_of(seat));
                self.push_line(line.clone());
                self.push_replay(
                    ReplayDraft::new(ReplayCategory::Action, line.clone()).with_actor(seat),
                );
                self.highlights.push(line);
            }
            // Ballots can pile onto a seat that died before the resolution
            Some((seat, _)) => {
                let line = format!("得票最多的 {} 已经死亡，无人出局", self.name_of(seat));
                self.push_line(line.clone());
                self.push_replay(ReplayDraft::new(ReplayCategory::Action, line));
            }
            None => {
                self.push_line("平票，无人出局");
                self.push_replay(ReplayDraft::new(ReplayCategory::Action, "平票，无人出局"));
            }
        }

        if let Some(winner) = winner_of(&self.players) {
            self.finish_game(winner);
        } else if let Some(seat) = hunter_died {
            self.hunter_pending = Some(HunterPending {
                seat,
                trigger: HunterTrigger::Day,
                next_phase: Phase::Night,
            });
            self.phase = Phase::HunterAction;
            // The day-to-night bump happens here even with a shot pending
            self.day += 1;
            self.votes.clear();
            let line = format!("{} 是猎人，等待开枪", self.name_of(seat));
            self.push_line(line.clone());
            self.push_replay(ReplayDraft::new(ReplayCategory::System, line));
        } else {
            self.phase = Phase::Night;
            self.day += 1;
            self.votes.clear();
            self.push_line("天黑了");
            self.push_replay(ReplayDraft::new(ReplayCategory::Phase, "天黑了"));
        }
    }

    fn hunter_shoot(&mut self, target: Option<SeatId>) {
        let pending = match self.hunter_pending {
            Some(p) => p,
            None => return,
        };
        let hunter_name = self.name_of(pending.seat);

        match target {
            Some(victim) if self.alive_at(victim) => {
                if let Some(p) = self.player_mut(victim) {
                    p.alive = false;
                }
                let line = format!("猎人 {} 开枪带走了 {}", hunter_name, self.name_of(victim));
                self.push_line(line.clone());
                self.push_replay(
                    ReplayDraft::new(ReplayCategory::Action, line.clone())
                        .with_actor(pending.seat),
                );
                self.highlights.push(line);
            }
            Some(_) => {
                let line = format!("猎人 {hunter_name} 的目标无效，未带走任何人");
                self.push_line(line.clone());
                self.push_replay(
                    ReplayDraft::new(ReplayCategory::System, line).with_actor(pending.seat),
                );
            }
            None => {
                let line = format!("猎人 {hunter_name} 选择不开枪");
                self.push_line(line.clone());
                self.push_replay(
                    ReplayDraft::new(ReplayCategory::Decision, line).with_actor(pending.seat),
                );
            }
        }

        if let Some(winner) = winner_of(&self.players) {
            self.finish_game(winner);
        } else {
            self.phase = pending.next_phase;
            if pending.trigger == HunterTrigger::Night {
                // Completes the night-to-day bump the hunter stage deferred
                self.day += 1;
                self.push_line("枪声过后，天亮了");
                self.push_replay(ReplayDraft::new(ReplayCategory::Phase, "枪声过后，天亮了"));
            } else {
                self.push_line("枪声过后，天黑了");
                self.push_replay(ReplayDraft::new(ReplayCategory::Phase, "枪声过后，天黑了"));
            }
            self.hunter_pending = None;
        }
    }

    /// Terminal transition: record the winner, clear every pending choice,
    /// and emit the summary. Any still-pending hunter shot is discarded;
    /// game over takes precedence.
    fn finish_game(&mut self, winner: Faction) {
        self.winner = Some(winner);
        self.phase = Phase::GameOver;
        self.werewolf_target = None;
        self.seer_target = None;
        self.witch.save_target = None;
        self.witch.poison_target = None;
        self.votes.clear();
        self.hunter_pending = None;

        let line = format!("游戏结束，{}获胜", winner.display_name());
        self.push_line(line.clone());
        self.push_replay(ReplayDraft::new(ReplayCategory::Summary, line.clone()));
        self.highlights.push(line);
    }

    // ==================== Audit ====================

    fn append_entry(&mut self, entry: LogEntry) {
        if let Some(line) = entry.line {
            self.push_line(line);
        }
        if let Some(draft) = entry.replay {
            self.push_replay(draft);
        }
        if let Some(text) = entry.highlight {
            self.highlights.push(text);
        }
    }

    fn push_line(&mut self, line: impl Into<String>) {
        self.log.push(line.into());
    }

    fn push_replay(&mut self, draft: ReplayDraft) {
        self.replay_seq += 1;
        self.replay.push(ReplayEvent {
            id: self.replay_seq,
            phase: self.phase,
            category: draft.category,
            day: self.day,
            actor_id: draft.actor_id,
            content: draft.content,
            reasoning: draft.reasoning,
            extra: draft.extra,
            timestamp_ms: now_ms(),
        });
    }
}
