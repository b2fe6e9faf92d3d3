use crate::util::*;

/// Notifications for the automation framework
#[derive(Debug, Clone, PartialEq)]
pub enum DomeEvent {
    SlewBegin { target: Degrees },
    SlewComplete { az: Degrees, status: DomeStatus },
    SyncBegin,
    SyncComplete,
}

impl DomeEvent {
    pub fn is_slew_complete(&self) -> bool {
        matches!(self, Self::SlewComplete { .. })
    }
}
