//! Lifecycle state machine.

use std::fmt;

use crate::error::AgentError;

/// Agent lifecycle states, in the only order they may be entered.
///
/// `Running` and `AwaitingShutdown` overlap in time: the RPC server keeps
/// serving while the controller waits for the shutdown command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    New,
    Initialized,
    Running,
    AwaitingShutdown,
    Stopped,
}

impl LifecycleState {
    /// Move to `next`, which must come strictly after the current state.
    ///
    /// `Stopped` is reachable from any earlier state; every other state
    /// only from its immediate predecessor.
    pub fn advance(&mut self, next: LifecycleState) -> Result<(), AgentError> {
        let allowed = match next {
            LifecycleState::New => false,
            LifecycleState::Initialized => *self == LifecycleState::New,
            LifecycleState::Running => *self == LifecycleState::Initialized,
            LifecycleState::AwaitingShutdown => *self == LifecycleState::Running,
            LifecycleState::Stopped => *self < LifecycleState::Stopped,
        };

        if !allowed {
            return Err(AgentError::InvalidTransition { from: *self, to: next });
        }
        tracing::debug!(from = %self, to = %next, "Lifecycle transition");
        *self = next;
        Ok(())
    }
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            LifecycleState::New => "NEW",
            LifecycleState::Initialized => "INITIALIZED",
            LifecycleState::Running => "RUNNING",
            LifecycleState::AwaitingShutdown => "AWAITING_SHUTDOWN",
            LifecycleState::Stopped => "STOPPED",
        };
        f.write_str(name)
    }
}
