use serde::{Deserialize, Serialize};
use std::time::Duration;

/* Config */
#[derive(Default, Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub tpl_settings: TplSettings,
    pub dome_settings: DomeSettings,
}

/* TPL Connection Settings */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TplSettings {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    /// Time allowed for a single GET to be answered
    pub timeout_millis: u32,
    pub connect_tries: u32,
}

impl Default for TplSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 65432,
            user: "admin".to_string(),
            password: "admin".to_string(),
            timeout_millis: 5000,
            connect_tries: 5,
        }
    }
}

impl TplSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_millis as u64)
    }
}

/* Dome Settings */
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomeSettings {
    pub max_slew_time_secs: u64,
    pub poll_interval_millis: u64,
    /// Keep-alive period
    pub max_idle_time_secs: u64,
    pub aperture_codes: ApertureCodes,
}

impl Default for DomeSettings {
    fn default() -> Self {
        Self {
            max_slew_time_secs: 300,
            poll_interval_millis: 1000,
            max_idle_time_secs: 90,
            aperture_codes: ApertureCodes::default(),
        }
    }
}

impl DomeSettings {
    pub fn max_slew_time(&self) -> Duration {
        Duration::from_secs(self.max_slew_time_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_millis)
    }

    pub fn max_idle_time(&self) -> Duration {
        Duration::from_secs(self.max_idle_time_secs)
    }
}

/* Aperture Target Codes */
/// Values written to AUXILIARY.DOME.TARGETPOS. These depend on the controller firmware.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApertureCodes {
    pub closed: i64,
    pub slit_open: i64,
    pub flap_open: i64,
    /// Lowers the flap but leaves the slit open
    pub flap_closed: i64,
}

impl Default for ApertureCodes {
    fn default() -> Self {
        Self {
            closed: 0,
            slit_open: 2,
            flap_open: 4,
            flap_closed: 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.dome_settings.max_slew_time(), Duration::from_secs(300));
        assert_eq!(config.dome_settings.max_idle_time(), Duration::from_secs(90));
        assert_eq!(config.dome_settings.aperture_codes.slit_open, 2);
        assert_eq!(config.dome_settings.aperture_codes.flap_open, 4);
        assert_eq!(config.tpl_settings.timeout(), Duration::from_secs(5));
    }
}
