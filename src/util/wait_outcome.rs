use crate::util::DomeStatus;

/// How a bounded wait loop ended
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum WaitOutcome {
    Reached,
    Aborted,
    TimedOut,
}

impl WaitOutcome {
    pub fn is_reached(&self) -> bool {
        matches!(self, Self::Reached)
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    pub fn as_status(&self) -> DomeStatus {
        match self {
            WaitOutcome::Reached => DomeStatus::Ok,
            WaitOutcome::Aborted => DomeStatus::Aborted,
            WaitOutcome::TimedOut => DomeStatus::Timeout,
        }
    }
}
