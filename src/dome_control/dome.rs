use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::events::DomeEvent;
use super::link::{paths, DeviceLink};
use super::waiters::WaitBudget;
use crate::config::DomeSettings;
use crate::util::*;

const EVENT_CAPACITY: usize = 32;

/// Best-effort cache of the last telemetry read. The controller is authoritative.
#[derive(Debug, Default, Clone)]
pub struct DomeState {
    pub azimuth: Degrees,
    pub azimuth_offset: Degrees,
    pub mode: DomeMode,
    pub slit_open: bool,
    pub flap_open: bool,
    pub slewing: bool,
}

pub struct AstelcoDome {
    pub(in crate::dome_control) link: Arc<dyn DeviceLink>,
    pub(in crate::dome_control) settings: DomeSettings,
    pub(in crate::dome_control) state: RwLock<DomeState>,
    /// Serializes every operation that commands the controller
    pub(in crate::dome_control) op_lock: Mutex<()>,
    pub(in crate::dome_control) abort: AbortFlag,
    pub(in crate::dome_control) slit_moving: AtomicBool,
    pub(in crate::dome_control) flap_moving: AtomicBool,
    events: broadcast::Sender<DomeEvent>,
}

impl AstelcoDome {
    pub fn new(link: Arc<dyn DeviceLink>, settings: DomeSettings) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        AstelcoDome {
            link,
            settings,
            state: RwLock::new(DomeState::default()),
            op_lock: Mutex::new(()),
            abort: AbortFlag::new(),
            slit_moving: AtomicBool::new(false),
            flap_moving: AtomicBool::new(false),
            events,
        }
    }

    /// Checks the link and loads the initial telemetry
    pub async fn start(&self) -> DomeResult<()> {
        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        match self.link.read(paths::SERVER_DEVICE).await? {
            Some(device) => info!("Connected to {}", device),
            None => warn!("Controller did not report a device name"),
        }

        let az = self.get_az().await?;
        let offset = self.get_az_offset().await?;
        let mask = self.read_open_mask().await?;
        let mode = self.get_mode().await?;

        info!(
            "Dome at {:.2} (offset {:.2}), mode {:?}, slit open: {}, flap open: {}",
            az,
            offset,
            mode,
            super::status::is_slit_open(mask),
            super::status::is_flap_open(mask)
        );
        Ok(())
    }

    pub async fn stop(&self) -> DomeResult<()> {
        if self.state.read().await.slewing || self.is_slewing().await? {
            info!("Stopping, aborting slew in progress");
            self.abort_slew();
        }
        Ok(())
    }

    /// Keeps the connection to the controller alive. Everything else is done by the controller.
    pub async fn control(&self) -> DomeResult<()> {
        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        match self.link.read_f64(paths::SERVER_UPTIME).await? {
            Some(uptime) => match chrono::Duration::try_seconds(uptime as i64) {
                Some(uptime) => debug!("[control] controller uptime {}", uptime),
                None => warn!("[control] controller reports uptime of {} s", uptime),
            },
            None => debug!("[control] controller uptime unknown"),
        }
        Ok(())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomeEvent> {
        self.events.subscribe()
    }

    pub async fn get_state(&self) -> DomeState {
        self.state.read().await.clone()
    }

    pub(in crate::dome_control) fn emit(&self, event: DomeEvent) {
        debug!("{:?}", event);
        // No subscribers is fine
        let _ = self.events.send(event);
    }

    pub(in crate::dome_control) async fn ensure_link_alive(&self) -> DomeResult<()> {
        if self.link.probe_live().await {
            Ok(())
        } else {
            warn!("Device link failed its liveness check");
            Err(DomeError::link_unavailable())
        }
    }

    pub(in crate::dome_control) fn budget(&self, deadline: Instant) -> WaitBudget<'_> {
        WaitBudget {
            deadline,
            interval: self.settings.poll_interval(),
            abort: Some(&self.abort),
        }
    }

    pub(in crate::dome_control) fn deadline(&self) -> Instant {
        Instant::now() + self.settings.max_slew_time()
    }

    pub(in crate::dome_control) fn moving_flag(&self, element: ApertureElement) -> &AtomicBool {
        match element {
            ApertureElement::Slit => &self.slit_moving,
            ApertureElement::Flap => &self.flap_moving,
        }
    }

    pub(in crate::dome_control) fn is_moving(&self, element: ApertureElement) -> bool {
        self.moving_flag(element).load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_util::*;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_start_loads_telemetry() {
        let link = SimulatedLink::new();
        link.set(paths::DOME_CURRPOS, 123.5);
        link.set(paths::DOME_OFFSET, -1.5);
        link.set(paths::OPEN_MASK, 0b110i64);
        link.set(paths::SYNCMODE, 4i64);
        let dome = create_dome(&link);

        dome.start().await.unwrap();

        let state = dome.get_state().await;
        assert_float_absolute_eq!(state.azimuth, 123.5, 1E-9);
        assert_float_absolute_eq!(state.azimuth_offset, -1.5, 1E-9);
        assert_eq!(state.mode, DomeMode::Track);
        assert!(state.slit_open);
        assert!(state.flap_open);
        assert!(link.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_fails_without_link() {
        let link = SimulatedLink::new();
        link.set_live(false);
        let dome = create_dome(&link);

        let err = dome.start().await.unwrap_err();
        assert!(err.is(DomeErrorType::LinkUnavailable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_keeps_alive_without_writing() {
        let link = SimulatedLink::new();
        let dome = create_dome(&link);

        dome.control().await.unwrap();
        assert!(link.writes().is_empty());

        link.set_live(false);
        assert!(dome
            .control()
            .await
            .unwrap_err()
            .is(DomeErrorType::LinkUnavailable));
    }

    #[tokio::test(start_paused = true)]
    async fn test_control_tolerates_absurd_uptime() {
        let link = SimulatedLink::new();
        let dome = create_dome(&link);

        for uptime in [1E300, -1E300, f64::NAN] {
            link.set(paths::SERVER_UPTIME, uptime);
            dome.control().await.unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_aborts_running_slew() {
        let link = SimulatedLink::new();
        link.set(paths::MOTION_STATE, 3i64);
        let dome = create_dome(&link);

        dome.stop().await.unwrap();
        assert!(dome.abort.is_set());
    }
}
