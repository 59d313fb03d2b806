use crate::Fault;

/// Run-loop lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum RunState {
    /// Not executing; `start` moves to `Running`.
    #[default]
    Stopped,
    /// Executing one instruction per step.
    Running,
    /// Stopped by a fault; `start` or `reset` clears it.
    Faulted(Fault),
}

impl RunState {
    /// Fault that ended the last run, if any.
    #[must_use]
    pub const fn fault(self) -> Option<Fault> {
        match self {
            Self::Faulted(cause) => Some(cause),
            Self::Stopped | Self::Running => None,
        }
    }

    /// `true` only in `Running`.
    #[must_use]
    pub const fn is_running(self) -> bool {
        matches!(self, Self::Running)
    }
}
