//! Server configuration, read once from the environment at startup.

/// How RESET_GAME treats already-connected audience members.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Keep connections and registrations; stats start over from zero.
    KeepAudience,
    /// Close every audience socket and forget the registrations.
    ClearAudience,
}

/// How a vote-count tie between positions is broken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TieBreak {
    /// The position that received its first vote earliest wins.
    FirstVote,
    /// The smallest position in row-major order wins.
    Position,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Length of each audience voting round, in seconds.
    pub vote_seconds: u32,
    pub reset_policy: ResetPolicy,
    pub tie_break: TieBreak,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            vote_seconds: 90,
            reset_policy: ResetPolicy::KeepAudience,
            tie_break: TieBreak::FirstVote,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let port = std::env::var("PORT")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.port);

        let vote_seconds = std::env::var("VOTE_SECONDS")
            .ok()
            .and_then(|v| v.parse().ok())
            .filter(|&secs| secs > 0)
            .unwrap_or(defaults.vote_seconds);

        let reset_policy = match std::env::var("RESET_POLICY") {
            Ok(raw) => match raw.to_lowercase().as_str() {
                "keep" => ResetPolicy::KeepAudience,
                "clear" => ResetPolicy::ClearAudience,
                other => {
                    tracing::warn!("Unknown RESET_POLICY '{}', using 'keep'", other);
                    defaults.reset_policy
                }
            },
            Err(_) => defaults.reset_policy,
        };

        let tie_break = match std::env::var("TIE_BREAK") {
            Ok(raw) => match raw.to_lowercase().as_str() {
                "first-vote" => TieBreak::FirstVote,
                "position" => TieBreak::Position,
                other => {
                    tracing::warn!("Unknown TIE_BREAK '{}', using 'first-vote'", other);
                    defaults.tie_break
                }
            },
            Err(_) => defaults.tie_break,
        };

        tracing::info!(
            "Config: port={}, vote_seconds={}, reset_policy={:?}, tie_break={:?}",
            port,
            vote_seconds,
            reset_policy,
            tie_break
        );

        Self {
            port,
            vote_seconds,
            reset_policy,
            tie_break,
        }
    }
}
