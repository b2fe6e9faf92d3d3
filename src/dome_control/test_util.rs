use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::dome::AstelcoDome;
use super::events::DomeEvent;
use super::link::{paths, CommandId, DeviceLink, TplValue};
use crate::config::DomeSettings;
use crate::util::*;

type Reaction = Box<dyn Fn(&TplValue) -> Vec<(Duration, &'static str, TplValue)> + Send>;

struct SimState {
    values: HashMap<String, TplValue>,
    scheduled: Vec<(Instant, String, TplValue)>,
    /// Completion time of each issued command, None if it never completes
    commands: Vec<Option<Instant>>,
    writes: Vec<(String, TplValue)>,
    forgotten: Vec<CommandId>,
    complete_after: Option<Duration>,
    reactions: HashMap<String, Reaction>,
}

impl SimState {
    fn apply_due(&mut self) {
        let now = Instant::now();
        let (due, pending): (Vec<_>, Vec<_>) =
            self.scheduled.drain(..).partition(|(at, _, _)| *at <= now);
        self.scheduled = pending;
        for (_, path, value) in due {
            self.values.insert(path, value);
        }
    }
}

/// In-memory controller. Writes land immediately, reactions registered per path schedule
/// further telemetry changes relative to the write.
pub(in crate::dome_control) struct SimulatedLink {
    state: Mutex<SimState>,
    live: AtomicBool,
    failing: AtomicBool,
}

impl SimulatedLink {
    pub fn new() -> Arc<Self> {
        let mut values = HashMap::new();
        values.insert(paths::DOME_CURRPOS.to_string(), TplValue::Number(0.));
        values.insert(paths::DOME_TARGETPOS.to_string(), TplValue::Number(0.));
        values.insert(paths::DOME_OFFSET.to_string(), TplValue::Number(0.));
        values.insert(paths::SYNCMODE.to_string(), TplValue::Number(0.));
        values.insert(paths::MAX_DEVIATION.to_string(), TplValue::Number(1.));
        values.insert(paths::MOTION_STATE.to_string(), TplValue::Number(11.));
        values.insert(paths::OPEN_MASK.to_string(), TplValue::Number(0.));
        values.insert(paths::SERVER_DEVICE.to_string(), "SIMULATED DOME".into());
        values.insert(paths::SERVER_UPTIME.to_string(), TplValue::Number(3600.));

        Arc::new(Self {
            state: Mutex::new(SimState {
                values,
                scheduled: Vec::new(),
                commands: Vec::new(),
                writes: Vec::new(),
                forgotten: Vec::new(),
                complete_after: Some(Duration::from_secs(1)),
                reactions: HashMap::new(),
            }),
            live: AtomicBool::new(true),
            failing: AtomicBool::new(false),
        })
    }

    pub fn set(&self, path: &str, value: impl Into<TplValue>) {
        let mut state = self.state.lock().unwrap();
        state.values.insert(path.to_string(), value.into());
    }

    pub fn clear(&self, path: &str) {
        self.state.lock().unwrap().values.remove(path);
    }

    pub fn set_live(&self, live: bool) {
        self.live.store(live, Ordering::SeqCst);
    }

    /// Makes every read fail as a transport error would
    pub fn fail_reads(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn complete_after(&self, delay: Option<Duration>) {
        self.state.lock().unwrap().complete_after = delay;
    }

    pub fn on_write<F>(&self, path: &str, reaction: F)
    where
        F: Fn(&TplValue) -> Vec<(Duration, &'static str, TplValue)> + Send + 'static,
    {
        let mut state = self.state.lock().unwrap();
        state
            .reactions
            .insert(path.to_string(), Box::new(reaction));
    }

    pub fn writes(&self) -> Vec<(String, TplValue)> {
        self.state.lock().unwrap().writes.clone()
    }

    pub fn forgotten(&self) -> Vec<CommandId> {
        self.state.lock().unwrap().forgotten.clone()
    }

    pub fn writes_to(&self, path: &str) -> Vec<TplValue> {
        self.writes()
            .into_iter()
            .filter(|(p, _)| p == path)
            .map(|(_, v)| v)
            .collect()
    }
}

#[async_trait]
impl DeviceLink for SimulatedLink {
    async fn read(&self, path: &str) -> DomeResult<Option<TplValue>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomeError::from_msg(
                DomeErrorType::Link,
                format!("Simulated failure reading {}", path),
            ));
        }
        let mut state = self.state.lock().unwrap();
        state.apply_due();
        Ok(state.values.get(path).cloned())
    }

    async fn write_async(&self, path: &str, value: TplValue) -> DomeResult<CommandId> {
        let mut state = self.state.lock().unwrap();
        state.apply_due();
        let now = Instant::now();

        state.writes.push((path.to_string(), value.clone()));
        state.values.insert(path.to_string(), value.clone());

        let changes = match state.reactions.get(path) {
            Some(reaction) => reaction(&value),
            None => Vec::new(),
        };
        for (delay, p, v) in changes {
            state.scheduled.push((now + delay, p.to_string(), v));
        }

        let complete_at = state.complete_after.map(|d| now + d);
        state.commands.push(complete_at);
        Ok(CommandId(state.commands.len() as u32 - 1))
    }

    async fn is_complete(&self, cmd: CommandId) -> DomeResult<bool> {
        let state = self.state.lock().unwrap();
        Ok(match state.commands.get(cmd.0 as usize) {
            Some(Some(at)) => *at <= Instant::now(),
            _ => false,
        })
    }

    async fn forget(&self, cmd: CommandId) {
        self.state.lock().unwrap().forgotten.push(cmd);
    }

    async fn probe_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }
}

pub(in crate::dome_control) fn create_dome(link: &Arc<SimulatedLink>) -> AstelcoDome {
    AstelcoDome::new(link.clone(), DomeSettings::default())
}

pub(in crate::dome_control) fn drain_events(
    rx: &mut broadcast::Receiver<DomeEvent>,
) -> Vec<DomeEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
