use std::fmt;

use async_trait::async_trait;

use crate::util::*;

/// Object paths on the dome controller
pub mod paths {
    pub const DOME_CURRPOS: &str = "POSITION.INSTRUMENTAL.DOME[0].CURRPOS";
    pub const DOME_TARGETPOS: &str = "POSITION.INSTRUMENTAL.DOME[0].TARGETPOS";
    pub const DOME_OFFSET: &str = "POSITION.INSTRUMENTAL.DOME[0].OFFSET";
    pub const SYNCMODE: &str = "POINTING.SETUP.DOME.SYNCMODE";
    pub const MAX_DEVIATION: &str = "POINTING.SETUP.DOME.MAX_DEVIATION";
    pub const MOTION_STATE: &str = "TELESCOPE.MOTION_STATE";
    pub const APERTURE_TARGETPOS: &str = "AUXILIARY.DOME.TARGETPOS";
    pub const OPEN_MASK: &str = "AUXILIARY.DOME.OPEN_MASK";
    pub const SERVER_DEVICE: &str = "SERVER.INFO.DEVICE";
    pub const SERVER_UPTIME: &str = "SERVER.UPTIME";
}

/// Handle of an asynchronous write. Completion is tracked by the link.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct CommandId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum TplValue {
    Number(f64),
    Text(String),
}

impl TplValue {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TplValue::Number(v) => Some(*v),
            TplValue::Text(s) => s.trim().parse().ok(),
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_f64().map(|v| v.round() as i64)
    }
}

impl From<f64> for TplValue {
    fn from(v: f64) -> Self {
        TplValue::Number(v)
    }
}

impl From<i64> for TplValue {
    fn from(v: i64) -> Self {
        TplValue::Number(v as f64)
    }
}

impl From<&str> for TplValue {
    fn from(s: &str) -> Self {
        TplValue::Text(s.to_string())
    }
}

impl fmt::Display for TplValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TplValue::Number(v) => write!(f, "{}", v),
            TplValue::Text(s) => write!(f, "\"{}\"", s),
        }
    }
}

/// Connection to the remote dome controller
#[async_trait]
pub trait DeviceLink: Send + Sync {
    /// None when the controller has no value for the object
    async fn read(&self, path: &str) -> DomeResult<Option<TplValue>>;

    /// Returns as soon as the write is issued
    async fn write_async(&self, path: &str, value: TplValue) -> DomeResult<CommandId>;

    /// Errors when the controller rejected the command
    async fn is_complete(&self, cmd: CommandId) -> DomeResult<bool>;

    /// Stops tracking a command whose completion nobody will poll
    async fn forget(&self, cmd: CommandId);

    async fn probe_live(&self) -> bool;

    async fn read_f64(&self, path: &str) -> DomeResult<Option<f64>> {
        Ok(self.read(path).await?.and_then(|v| v.as_f64()))
    }

    async fn read_i64(&self, path: &str) -> DomeResult<Option<i64>> {
        Ok(self.read(path).await?.and_then(|v| v.as_i64()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_value_conversions() {
        assert_eq!(TplValue::from(4i64).as_i64(), Some(4));
        assert_eq!(TplValue::from(" 11 ").as_i64(), Some(11));
        assert_eq!(TplValue::from("ASTELCO DOME").as_f64(), None);
        assert_eq!(TplValue::from(2.0).to_string(), "2");
        assert_eq!(TplValue::from(90.25).to_string(), "90.25");
        assert_eq!(TplValue::from("x").to_string(), "\"x\"");
    }
}
