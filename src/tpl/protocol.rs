//! Line format of the TPL2 protocol, the subset needed to read and write objects.

use crate::dome_control::TplValue;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum CommandStatus {
    /// Accepted by the server, replies will follow
    Ok,
    Complete,
    Error,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Command {
        id: u32,
        status: CommandStatus,
    },
    Data {
        id: u32,
        object: String,
        value: TplValue,
    },
    Event {
        id: u32,
        kind: String,
        text: String,
    },
    Unknown(String),
}

impl Reply {
    pub fn id(&self) -> Option<u32> {
        match self {
            Reply::Command { id, .. } | Reply::Data { id, .. } | Reply::Event { id, .. } => {
                Some(*id)
            }
            Reply::Unknown(_) => None,
        }
    }
}

pub fn format_auth(user: &str, password: &str) -> String {
    format!("AUTH PLAIN \"{}\" \"{}\"\n", user, password)
}

pub fn format_get(id: u32, object: &str) -> String {
    format!("{} GET {}\n", id, object)
}

pub fn format_set(id: u32, object: &str, value: &TplValue) -> String {
    format!("{} SET {}={}\n", id, object, value)
}

pub fn is_greeting(line: &str) -> bool {
    line.trim_start().starts_with("TPL2")
}

pub fn is_auth_ok(line: &str) -> bool {
    line.trim_start().starts_with("AUTH OK")
}

/// Quoted values become text, anything else is tried as a number first
pub fn parse_value(raw: &str) -> TplValue {
    let raw = raw.trim();
    if raw.len() >= 2 && raw.starts_with('"') && raw.ends_with('"') {
        return TplValue::Text(raw[1..raw.len() - 1].to_string());
    }
    match raw.parse::<f64>() {
        Ok(v) => TplValue::Number(v),
        Err(_) => TplValue::Text(raw.to_string()),
    }
}

pub fn parse_reply(line: &str) -> Reply {
    let line = line.trim_end_matches(['\r', '\n']);
    let unknown = || Reply::Unknown(line.to_string());

    let mut parts = line.trim_start().splitn(3, ' ');
    let id = match parts.next().and_then(|id| id.parse::<u32>().ok()) {
        Some(id) => id,
        None => return unknown(),
    };
    let kind = parts.next().unwrap_or("");
    let rest = parts.next().unwrap_or("").trim();

    match kind {
        "COMMAND" => {
            let status = match rest.split_whitespace().next() {
                Some("OK") => CommandStatus::Ok,
                Some("COMPLETE") => CommandStatus::Complete,
                Some("ERROR") => CommandStatus::Error,
                _ => return unknown(),
            };
            Reply::Command { id, status }
        }
        "DATA" => {
            let assignment = match rest.strip_prefix("INLINE ") {
                Some(a) => a,
                None => return unknown(),
            };
            match assignment.split_once('=') {
                Some((object, value)) => Reply::Data {
                    id,
                    object: object.trim().to_string(),
                    value: parse_value(value),
                },
                None => unknown(),
            }
        }
        "EVENT" => {
            let (kind, text) = rest.split_once(' ').unwrap_or((rest, ""));
            Reply::Event {
                id,
                kind: kind.to_string(),
                text: text.trim().to_string(),
            }
        }
        _ => unknown(),
    }
}
