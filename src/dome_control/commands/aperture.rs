use std::sync::atomic::Ordering;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::dome_control::link::paths;
use crate::dome_control::status;
use crate::dome_control::waiters::{ApertureWaiter, CommandWaiter, Waiter};
use crate::dome_control::AstelcoDome;
use crate::util::*;

impl AstelcoDome {
    pub async fn open_slit(&self) -> DomeResult<DomeStatus> {
        // Fail fast instead of queueing behind the running move
        if self.is_moving(ApertureElement::Slit) {
            return Err(DomeError::from_msg(
                DomeErrorType::InvalidOperation,
                "Slit already opening".to_string(),
            ));
        }

        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        if self.is_slit_open().await? {
            info!("Slit already opened");
            return Ok(DomeStatus::Ok);
        }

        info!("Opening slit");
        self.abort.clear();
        let code = self.settings.aperture_codes.slit_open;
        self.move_aperture(ApertureElement::Slit, code, true).await
    }

    /// The flap can only be raised once the slit is open
    pub async fn open_flap(&self) -> DomeResult<DomeStatus> {
        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        let mask = self.read_open_mask().await?;
        if !status::is_slit_open(mask) {
            return Err(DomeError::from_msg(
                DomeErrorType::InvalidPosition,
                "Can't open the flap while the slit is closed".to_string(),
            ));
        }
        if status::is_flap_open(mask) {
            info!("Flap already opened");
            return Ok(DomeStatus::Ok);
        }

        info!("Opening flap");
        self.abort.clear();
        let deadline = self.deadline();
        let code = self.settings.aperture_codes.flap_open;

        self.flap_moving.store(true, Ordering::SeqCst);
        let result = self.raise_flap(code, deadline).await;
        self.flap_moving.store(false, Ordering::SeqCst);

        result
    }

    async fn raise_flap(&self, code: i64, deadline: Instant) -> DomeResult<DomeStatus> {
        let cmd = self
            .link
            .write_async(paths::APERTURE_TARGETPOS, code.into())
            .await?;
        let outcome = CommandWaiter(cmd)
            .settle(self, &self.budget(deadline))
            .await?;
        if !outcome.is_reached() {
            return Ok(outcome.as_status());
        }

        // A completed command is no proof the flap actually moved
        if self.is_flap_open().await? {
            info!("Flap opened");
            Ok(DomeStatus::Ok)
        } else {
            warn!("Flap command completed but the flap is not open");
            Ok(DomeStatus::Aborted)
        }
    }

    /// Closing the slit also brings the flap down
    pub async fn close_slit(&self) -> DomeResult<DomeStatus> {
        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        let mask = self.read_open_mask().await?;
        if !status::is_slit_open(mask) {
            info!("Slit already closed");
            return Ok(DomeStatus::Ok);
        }
        if status::is_flap_open(mask) {
            warn!("Flap is open, closing the slit will also close the flap");
        }

        info!("Closing slit");
        self.abort.clear();
        let code = self.settings.aperture_codes.closed;
        self.move_aperture(ApertureElement::Slit, code, false).await
    }

    pub async fn close_flap(&self) -> DomeResult<DomeStatus> {
        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        if !self.is_flap_open().await? {
            info!("Flap already closed");
            return Ok(DomeStatus::Ok);
        }

        info!("Closing flap");
        self.abort.clear();
        let code = self.settings.aperture_codes.flap_closed;
        self.move_aperture(ApertureElement::Flap, code, false).await
    }

    /// Writes the target code, waits for the command and then for the open bit to match.
    /// The element is flagged as moving for the duration.
    async fn move_aperture(
        &self,
        element: ApertureElement,
        code: i64,
        open: bool,
    ) -> DomeResult<DomeStatus> {
        let deadline = self.deadline();
        let moving = self.moving_flag(element);
        moving.store(true, Ordering::SeqCst);

        let result = self.drive_aperture(element, code, open, deadline).await;
        moving.store(false, Ordering::SeqCst);

        let outcome = result?;
        match outcome {
            WaitOutcome::Reached => info!("{} {}", element, if open { "opened" } else { "closed" }),
            WaitOutcome::Aborted => warn!("{} move aborted", element),
            WaitOutcome::TimedOut => warn!("{} move timed out", element),
        }
        Ok(outcome.as_status())
    }

    async fn drive_aperture(
        &self,
        element: ApertureElement,
        code: i64,
        open: bool,
        deadline: Instant,
    ) -> DomeResult<WaitOutcome> {
        let cmd = self
            .link
            .write_async(paths::APERTURE_TARGETPOS, code.into())
            .await?;
        let budget = self.budget(deadline);

        let outcome = CommandWaiter(cmd).settle(self, &budget).await?;
        if !outcome.is_reached() {
            return Ok(outcome);
        }
        ApertureWaiter { element, open }.wait(self, &budget).await
    }
}
