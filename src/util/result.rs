use crate::astro_math::Degrees;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::{fmt, result};

pub type DomeResult<T> = result::Result<T, DomeError>;

#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum DomeErrorType {
    /// Direct slew attempted while the remote system owns the azimuth
    ModeConflict = 0x501,
    /// Aperture element commanded into a position it can't safely reach
    InvalidPosition = 0x502,
    InvalidOperation = 0x503,
    /// Liveness probe failed
    LinkUnavailable = 0x504,
    Timeout = 0x505,
    Aborted = 0x506,
    /// Transport or protocol failure talking to the controller
    Link = 0x507,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DomeError {
    pub error_type: DomeErrorType,
    pub error_message: String,
}

impl DomeError {
    pub fn from_msg(error_type: DomeErrorType, message: String) -> DomeError {
        DomeError {
            error_type,
            error_message: message,
        }
    }

    pub fn link_unavailable() -> DomeError {
        Self::from_msg(
            DomeErrorType::LinkUnavailable,
            "Device link is not alive".to_string(),
        )
    }

    pub fn error_number(&self) -> i32 {
        self.error_type as i32
    }

    pub fn is(&self, error_type: DomeErrorType) -> bool {
        self.error_type == error_type
    }
}

impl Display for DomeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:#x} {:?}: {}",
            self.error_number(),
            self.error_type,
            self.error_message
        )
    }
}

impl Error for DomeError {}

impl From<std::io::Error> for DomeError {
    fn from(e: std::io::Error) -> Self {
        Self::from_msg(DomeErrorType::Link, e.to_string())
    }
}

pub fn check_az(az: Degrees) -> DomeResult<()> {
    if az.is_finite() {
        Ok(())
    } else {
        Err(DomeError::from_msg(
            DomeErrorType::InvalidPosition,
            format!("Azimuth {} is not valid", az),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_includes_number_and_type() {
        let e = DomeError::from_msg(DomeErrorType::ModeConflict, "dome is tracking".to_string());
        assert_eq!(e.to_string(), "0x501 ModeConflict: dome is tracking");
        assert!(e.is(DomeErrorType::ModeConflict));
    }

    #[test]
    fn test_check_az() {
        assert!(check_az(359.9).is_ok());
        assert!(check_az(-20.).is_ok());
        assert!(check_az(f64::NAN).unwrap_err().is(DomeErrorType::InvalidPosition));
    }
}
