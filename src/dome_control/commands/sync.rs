use tracing::{debug, info, warn};

use crate::astro_math::AngularPosition;
use crate::dome_control::events::DomeEvent;
use crate::dome_control::link::paths;
use crate::dome_control::waiters::{ArrivalWaiter, Waiter};
use crate::dome_control::AstelcoDome;
use crate::util::*;

impl AstelcoDome {
    /// Waits until a tracking dome has caught up with the telescope.
    /// In stand mode nothing moves on its own, so the dome counts as synchronized.
    pub async fn sync_with_telescope(&self) -> DomeResult<()> {
        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        self.emit(DomeEvent::SyncBegin);
        let result = self.run_sync().await;
        self.emit(DomeEvent::SyncComplete);

        result
    }

    async fn run_sync(&self) -> DomeResult<()> {
        if !self.get_mode().await?.is_tracking() {
            debug!("Dome is standing, nothing to synchronize");
            return Ok(());
        }

        self.abort.clear();
        let deadline = self.deadline();

        let target_az = self
            .link
            .read_f64(paths::DOME_TARGETPOS)
            .await?
            .ok_or_else(|| {
                DomeError::from_msg(
                    DomeErrorType::Link,
                    format!("{} is not available", paths::DOME_TARGETPOS),
                )
            })?;
        let target = AngularPosition::dome(target_az);
        let max_deviation = self.max_deviation().await?;

        info!("Waiting for dome to reach {:.2}", target_az);
        let waiter = ArrivalWaiter {
            target,
            tolerance: 2. * max_deviation,
        };

        match waiter.wait(self, &self.budget(deadline)).await? {
            WaitOutcome::Reached => {
                info!("Dome synchronized with telescope");
                Ok(())
            }
            WaitOutcome::Aborted => Err(DomeError::from_msg(
                DomeErrorType::Aborted,
                "Dome synchronization aborted".to_string(),
            )),
            WaitOutcome::TimedOut => {
                let separation = self.current_position().await?.separation(&target);
                if separation <= 4. * max_deviation {
                    warn!(
                        "Dome synchronization timed out {:.2} deg from target, accepting",
                        separation
                    );
                    Ok(())
                } else {
                    Err(DomeError::from_msg(
                        DomeErrorType::Timeout,
                        format!(
                            "Dome synchronization timed out {:.2} deg from target",
                            separation
                        ),
                    ))
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use tokio::time::Instant;

    use crate::dome_control::link::TplValue;
    use crate::dome_control::test_util::*;

    use super::*;

    fn tracking_link(current: f64, target: f64) -> Arc<SimulatedLink> {
        let link = SimulatedLink::new();
        link.set(paths::SYNCMODE, 4i64);
        link.set(paths::DOME_CURRPOS, current);
        link.set(paths::DOME_TARGETPOS, target);
        link
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_standing_is_immediate() {
        let link = SimulatedLink::new();
        link.set(paths::DOME_CURRPOS, 10.);
        link.set(paths::DOME_TARGETPOS, 200.);
        let dome = create_dome(&link);
        let mut events = dome.subscribe();

        dome.sync_with_telescope().await.unwrap();

        assert_eq!(
            drain_events(&mut events),
            vec![DomeEvent::SyncBegin, DomeEvent::SyncComplete]
        );
        assert!(link.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_waits_for_tracking_dome() {
        let link = tracking_link(100., 120.);
        let dome = Arc::new(create_dome(&link));
        let mut events = dome.subscribe();

        let task = {
            let dome = dome.clone();
            tokio::spawn(async move { dome.sync_with_telescope().await })
        };
        tokio::time::sleep(Duration::from_millis(3500)).await;
        assert!(!task.is_finished());
        link.set(paths::DOME_CURRPOS, 119.2);

        task.await.unwrap().unwrap();
        assert_eq!(
            drain_events(&mut events),
            vec![DomeEvent::SyncBegin, DomeEvent::SyncComplete]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_accepts_degraded_tolerance() {
        let link = tracking_link(123., 120.);
        let dome = create_dome(&link);

        dome.sync_with_telescope().await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_times_out() {
        let link = tracking_link(130., 120.);
        let dome = create_dome(&link);
        let mut events = dome.subscribe();

        let err = dome.sync_with_telescope().await.unwrap_err();

        assert!(err.is(DomeErrorType::Timeout));
        assert_eq!(
            drain_events(&mut events),
            vec![DomeEvent::SyncBegin, DomeEvent::SyncComplete]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_abort_during_sync() {
        let link = tracking_link(60., 120.);
        let dome = Arc::new(create_dome(&link));
        let mut events = dome.subscribe();

        let task = {
            let dome = dome.clone();
            tokio::spawn(async move { dome.sync_with_telescope().await })
        };
        tokio::time::sleep(Duration::from_millis(2500)).await;
        let aborted_at = Instant::now();
        dome.abort_slew();

        let err = task.await.unwrap().unwrap_err();
        assert!(err.is(DomeErrorType::Aborted));
        assert!(aborted_at.elapsed() <= Duration::from_secs(1));
        assert_eq!(
            drain_events(&mut events),
            vec![DomeEvent::SyncBegin, DomeEvent::SyncComplete]
        );
        assert!(link.writes().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sync_tolerance_tracks_device() {
        let link = tracking_link(129., 120.);
        link.set(paths::MAX_DEVIATION, TplValue::Number(5.));
        let dome = create_dome(&link);

        dome.sync_with_telescope().await.unwrap();
    }
}
