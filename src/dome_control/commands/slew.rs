use tokio::time::Instant;
use tracing::{info, warn};

use crate::astro_math::AngularPosition;
use crate::dome_control::events::DomeEvent;
use crate::dome_control::link::paths;
use crate::dome_control::waiters::{ArrivalWaiter, CommandWaiter, Waiter};
use crate::dome_control::AstelcoDome;
use crate::util::*;

impl AstelcoDome {
    /// Slews the dome to an azimuth and waits for it to arrive.
    /// Only allowed in stand mode; in track mode the controller owns the azimuth.
    /// Timeouts and aborts are reported through the returned status.
    pub async fn slew_to_az(&self, az: Degrees) -> DomeResult<DomeStatus> {
        check_az(az)?;

        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        if self.get_mode().await?.is_tracking() {
            warn!("Dome is in track mode, slew is controlled by the controller");
            return Err(DomeError::from_msg(
                DomeErrorType::ModeConflict,
                "Can't slew while the dome is tracking".to_string(),
            ));
        }

        info!("Slewing to {:.2}", az);
        self.abort.clear();
        let deadline = self.deadline();
        self.get_az().await?;

        self.state.write().await.slewing = true;
        self.emit(DomeEvent::SlewBegin { target: az });

        let result = self.run_slew(az, deadline).await;

        self.state.write().await.slewing = false;
        let final_az = match self.get_az().await {
            Ok(az) => az,
            Err(_) => self.state.read().await.azimuth,
        };
        let status = match &result {
            Ok(status) => *status,
            Err(e) => {
                warn!("Slew failed: {}", e);
                DomeStatus::Aborted
            }
        };
        self.emit(DomeEvent::SlewComplete {
            az: final_az,
            status,
        });

        result
    }

    async fn run_slew(&self, az: Degrees, deadline: Instant) -> DomeResult<DomeStatus> {
        let cmd = self
            .link
            .write_async(paths::DOME_TARGETPOS, az.into())
            .await?;
        let budget = self.budget(deadline);

        match CommandWaiter(cmd).settle(self, &budget).await? {
            WaitOutcome::Reached => {}
            WaitOutcome::Aborted => {
                self.hold_at_last_az().await?;
                return Ok(DomeStatus::Aborted);
            }
            WaitOutcome::TimedOut => {
                warn!("Dome slew command was not completed in time");
                return Ok(DomeStatus::Timeout);
            }
        }

        let waiter = ArrivalWaiter {
            target: AngularPosition::dome(az),
            tolerance: 2. * self.max_deviation().await?,
        };
        let outcome = waiter.wait(self, &budget).await?;
        match outcome {
            WaitOutcome::Reached => info!("Dome arrived at {:.2}", az),
            WaitOutcome::Aborted => self.hold_at_last_az().await?,
            WaitOutcome::TimedOut => warn!("Dome slew timed out"),
        }
        Ok(outcome.as_status())
    }

    /// Best-effort stop: retarget the dome to where it was last seen. Completion is not awaited.
    async fn hold_at_last_az(&self) -> DomeResult<()> {
        let last_az = self.state.read().await.azimuth;
        info!("Slew aborted, holding dome at {:.2}", last_az);
        let cmd = self
            .link
            .write_async(paths::DOME_TARGETPOS, last_az.into())
            .await?;
        self.link.forget(cmd).await;
        Ok(())
    }

    /// Requests the running operation to stop. Observed on its next poll.
    pub fn abort_slew(&self) {
        self.abort.set();
    }
}
