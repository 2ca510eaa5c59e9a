//! Anti-automation challenge solver collaborator.
//!
//! The forum sits behind an anti-bot challenge. Solving it is out of scope
//! for this crate; the solver is an opaque collaborator that takes the
//! caller's user agent and hands back a cookie plus the user agent the
//! session must present from then on.

use anyhow::Result;
use async_trait::async_trait;

/// Output of a successful challenge solve.
#[derive(Debug, Clone)]
pub struct ChallengeOutcome {
    /// Cookie string to append to the session cookie header.
    pub cookie: String,
    /// User agent the session must use for subsequent requests.
    pub user_agent: String,
}

/// A solver for the forum's anti-automation challenge.
#[async_trait]
pub trait ChallengeSolver: Send + Sync {
    async fn solve(&self, user_agent: &str) -> Result<ChallengeOutcome>;
}

/// Solver that performs no challenge work: returns an empty cookie and the
/// caller's user agent unchanged. Used when the forum instance has no
/// challenge in front of it, and in tests.
pub struct PassthroughSolver;

#[async_trait]
impl ChallengeSolver for PassthroughSolver {
    async fn solve(&self, user_agent: &str) -> Result<ChallengeOutcome> {
        Ok(ChallengeOutcome {
            cookie: String::new(),
            user_agent: user_agent.to_string(),
        })
    }
}
