use std::fmt;

/// Terminal status of a dome movement, as reported to the framework
#[derive(Debug, Eq, PartialEq, Copy, Clone)]
pub enum DomeStatus {
    Ok,
    Aborted,
    Timeout,
}

impl fmt::Display for DomeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DomeStatus::Ok => "OK",
            DomeStatus::Aborted => "ABORTED",
            DomeStatus::Timeout => "TIMEOUT",
        };
        f.write_str(s)
    }
}
