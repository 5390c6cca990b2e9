//! Orchestration phases
//!
//! Each agentic operation walks READ → GENERATE → WRITE with at most one
//! conflict retry. [`PhaseTracker`] enforces the transition table and the
//! single-retry budget so an orchestrator bug surfaces as an error instead of
//! a silent extra write.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Orchestration phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Building the MR and resolving its CID
    Reading,
    /// Waiting on the provider (or heuristic)
    Generating,
    /// Conditional write in flight
    Writing,
    /// First write conflicted; about to re-read
    ConflictRetrying,
    /// Terminal success
    Succeeded,
    /// Terminal failure
    Failed,
}

impl Phase {
    /// Check if phase is terminal
    #[inline]
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Reading => "reading",
            Self::Generating => "generating",
            Self::Writing => "writing",
            Self::ConflictRetrying => "conflict_retrying",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Phase machine violations
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    /// Transition not in the table
    #[error("illegal phase transition {from} -> {to}")]
    IllegalTransition {
        /// Current phase
        from: Phase,
        /// Requested phase
        to: Phase,
    },

    /// A second conflict retry was requested
    #[error("conflict retry budget exhausted")]
    RetryExhausted,
}

/// Validates a phase transition
///
/// # Errors
/// - `IllegalTransition` if `to` is not reachable from `from`
pub fn validate_transition(from: Phase, to: Phase) -> Result<(), PhaseError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(PhaseError::IllegalTransition { from, to })
    }
}

/// Phases reachable from `from`
///
/// A re-read after a conflict may go straight to `Writing` (summaries are not
/// regenerated) or end the operation when the fresh state already holds the
/// result.
#[must_use]
pub fn allowed_transitions(from: Phase) -> Vec<Phase> {
    use Phase::{ConflictRetrying, Failed, Generating, Reading, Succeeded, Writing};
    match from {
        Reading => vec![Generating, Writing, Succeeded, Failed],
        Generating => vec![Writing, Succeeded, Failed],
        Writing => vec![Succeeded, ConflictRetrying, Failed],
        ConflictRetrying => vec![Reading, Failed],
        Succeeded | Failed => vec![],
    }
}

/// Tracks one orchestrated operation
#[derive(Debug, Clone)]
pub struct PhaseTracker {
    operation: &'static str,
    phase: Phase,
    retried: bool,
}

impl PhaseTracker {
    /// Start in `Reading`
    #[must_use]
    pub fn new(operation: &'static str) -> Self {
        Self {
            operation,
            phase: Phase::Reading,
            retried: false,
        }
    }

    /// Current phase
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Whether the single conflict retry was used
    #[inline]
    #[must_use]
    pub fn retried(&self) -> bool {
        self.retried
    }

    /// Attempt number of the current write (1 or 2)
    #[inline]
    #[must_use]
    pub fn attempt(&self) -> u8 {
        if self.retried {
            2
        } else {
            1
        }
    }

    /// Move to `to`
    ///
    /// # Errors
    /// - `IllegalTransition` if the table forbids it
    /// - `RetryExhausted` on a second `ConflictRetrying`
    pub fn advance(&mut self, to: Phase) -> Result<(), PhaseError> {
        validate_transition(self.phase, to)?;
        if to == Phase::ConflictRetrying {
            if self.retried {
                return Err(PhaseError::RetryExhausted);
            }
            self.retried = true;
        }
        tracing::trace!(
            operation = self.operation,
            from = %self.phase,
            phase = %to,
            "phase transition"
        );
        self.phase = to;
        Ok(())
    }

    /// Move to `Failed` from any non-terminal phase
    pub fn fail(&mut self) {
        if !self.phase.is_terminal() {
            tracing::trace!(operation = self.operation, from = %self.phase, "phase failed");
            self.phase = Phase::Failed;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_is_allowed() {
        let mut t = PhaseTracker::new("test");
        t.advance(Phase::Generating).unwrap();
        t.advance(Phase::Writing).unwrap();
        t.advance(Phase::Succeeded).unwrap();
        assert!(t.phase().is_terminal());
        assert_eq!(t.attempt(), 1);
    }

    #[test]
    fn retry_reenters_reading_once() {
        let mut t = PhaseTracker::new("test");
        t.advance(Phase::Generating).unwrap();
        t.advance(Phase::Writing).unwrap();
        t.advance(Phase::ConflictRetrying).unwrap();
        t.advance(Phase::Reading).unwrap();
        t.advance(Phase::Writing).unwrap();
        assert_eq!(t.attempt(), 2);
        assert_eq!(
            t.advance(Phase::ConflictRetrying),
            Err(PhaseError::RetryExhausted)
        );
    }

    #[test]
    fn fail_is_sticky_only_before_success() {
        let mut t = PhaseTracker::new("test");
        t.fail();
        assert_eq!(t.phase(), Phase::Failed);

        let mut t = PhaseTracker::new("test");
        t.advance(Phase::Succeeded).unwrap();
        t.fail();
        assert_eq!(t.phase(), Phase::Succeeded);
    }

    #[test]
    fn terminal_phases_have_no_exits() {
        assert!(allowed_transitions(Phase::Succeeded).is_empty());
        assert!(allowed_transitions(Phase::Failed).is_empty());
        assert!(validate_transition(Phase::Failed, Phase::Reading).is_err());
    }

    #[test]
    fn cannot_skip_reading_after_conflict() {
        assert_eq!(
            validate_transition(Phase::ConflictRetrying, Phase::Writing),
            Err(PhaseError::IllegalTransition {
                from: Phase::ConflictRetrying,
                to: Phase::Writing,
            })
        );
    }
}
