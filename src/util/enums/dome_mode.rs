use num_enum::IntoPrimitive;

/// Who owns the dome azimuth
#[derive(Debug, Eq, PartialEq, Copy, Clone, Default)]
pub enum DomeMode {
    /// Azimuth is commanded directly by this driver
    #[default]
    Stand,
    /// The controller slaves the azimuth to the telescope
    Track,
}

impl DomeMode {
    pub fn is_tracking(&self) -> bool {
        matches!(self, Self::Track)
    }

    pub fn sync_mode(&self) -> SyncMode {
        match self {
            DomeMode::Stand => SyncMode::Stand,
            DomeMode::Track => SyncMode::Track,
        }
    }
}

/// Values written to POINTING.SETUP.DOME.SYNCMODE
#[derive(Debug, Eq, PartialEq, Copy, Clone, IntoPrimitive)]
#[repr(i64)]
pub enum SyncMode {
    Stand = 0,
    Track = 4,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_mode_codes() {
        assert_eq!(i64::from(DomeMode::Stand.sync_mode()), 0);
        assert_eq!(i64::from(DomeMode::Track.sync_mode()), 4);
    }
}
