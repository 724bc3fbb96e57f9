//! Host configuration.

use std::time::Duration;

/// Pacing knobs for the tempo controller
#[derive(Debug, Clone)]
pub struct TempoConfig {
    /// Inter-step delay between orchestrator steps
    pub step_delay: Duration,
    /// How long a pause may hold the loop before it force-resumes
    pub pause_timeout: Duration,
    /// Wait slice size; a pause engaged mid-wait takes effect within one slice
    pub poll_interval: Duration,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(800),
            pause_timeout: Duration::from_secs(30),
            poll_interval: Duration::from_millis(50),
        }
    }
}

/// Bounds for the post-vote commentary rounds.
///
/// Tuning constants rather than game rules, so they stay configurable.
#[derive(Debug, Clone)]
pub struct PostVoteConfig {
    /// Hard cap on rounds, regardless of what providers ask for
    pub max_rounds: usize,
    /// Minimum seats wanting more before another round runs
    pub min_participants: usize,
}

impl Default for PostVoteConfig {
    fn default() -> Self {
        Self {
            max_rounds: 3,
            min_participants: 2,
        }
    }
}

/// Top-level host configuration
#[derive(Debug, Clone)]
pub struct HostConfig {
    /// Full-cycle iteration ceiling; hitting it signals a rules bug
    pub max_cycles: usize,
    pub post_vote: PostVoteConfig,
    pub tempo: TempoConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            max_cycles: 50,
            post_vote: PostVoteConfig::default(),
            tempo: TempoConfig::default(),
        }
    }
}

impl HostConfig {
    /// Defaults overridden by environment variables, for the demo binary
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Some(max) = env_parse("WEREWOLF_MAX_CYCLES") {
            config.max_cycles = max;
        }
        if let Some(ms) = env_parse("WEREWOLF_STEP_DELAY_MS") {
            config.tempo.step_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = env_parse("WEREWOLF_PAUSE_TIMEOUT_MS") {
            config.tempo.pause_timeout = Duration::from_millis(ms);
        }
        if let Some(rounds) = env_parse("WEREWOLF_POST_VOTE_ROUNDS") {
            config.post_vote.max_rounds = rounds;
        }
        config
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HostConfig::default();
        assert_eq!(config.max_cycles, 50);
        assert_eq!(config.post_vote.max_rounds, 3);
        assert_eq!(config.post_vote.min_participants, 2);
        assert_eq!(config.tempo.pause_timeout, Duration::from_secs(30));
    }
}
