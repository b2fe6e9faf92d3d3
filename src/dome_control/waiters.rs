use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, MissedTickBehavior};

use super::dome::AstelcoDome;
use super::link::CommandId;
use crate::astro_math::AngularPosition;
use crate::util::*;

/// Bounds of a wait loop. The deadline is fixed when the operation starts.
pub struct WaitBudget<'a> {
    pub deadline: Instant,
    pub interval: Duration,
    pub abort: Option<&'a AbortFlag>,
}

#[async_trait]
pub trait Waiter: Sync {
    async fn check(&self, dome: &AstelcoDome) -> DomeResult<bool>;

    /// Polls until the check passes, an abort is requested or the deadline passes,
    /// tested in that order on every tick.
    async fn wait(&self, dome: &AstelcoDome, budget: &WaitBudget<'_>) -> DomeResult<WaitOutcome> {
        let mut check_interval = time::interval(budget.interval);
        check_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            check_interval.tick().await;
            if self.check(dome).await? {
                return Ok(WaitOutcome::Reached);
            }
            if budget.abort.map_or(false, AbortFlag::is_set) {
                return Ok(WaitOutcome::Aborted);
            }
            if Instant::now() > budget.deadline {
                return Ok(WaitOutcome::TimedOut);
            }
        }
    }
}

/// Waits for the controller to report a command as complete
pub struct CommandWaiter(pub CommandId);

impl CommandWaiter {
    /// Like `wait`, but hands the command back to the link when it is given up on
    pub async fn settle(
        &self,
        dome: &AstelcoDome,
        budget: &WaitBudget<'_>,
    ) -> DomeResult<WaitOutcome> {
        let outcome = self.wait(dome, budget).await;
        if !matches!(outcome, Ok(WaitOutcome::Reached)) {
            dome.link.forget(self.0).await;
        }
        outcome
    }
}

#[async_trait]
impl Waiter for CommandWaiter {
    async fn check(&self, dome: &AstelcoDome) -> DomeResult<bool> {
        dome.link.is_complete(self.0).await
    }
}

/// Waits for the dome aperture to come within tolerance of a position
pub struct ArrivalWaiter {
    pub target: AngularPosition,
    pub tolerance: Degrees,
}
#[async_trait]
impl Waiter for ArrivalWaiter {
    async fn check(&self, dome: &AstelcoDome) -> DomeResult<bool> {
        let current = dome.current_position().await?;
        Ok(current.separation(&self.target) <= self.tolerance)
    }
}

/// Waits for the physical open bit of an aperture element
pub struct ApertureWaiter {
    pub element: ApertureElement,
    pub open: bool,
}
#[async_trait]
impl Waiter for ApertureWaiter {
    async fn check(&self, dome: &AstelcoDome) -> DomeResult<bool> {
        let mask = dome.read_open_mask().await?;
        Ok(super::status::is_open(mask, self.element) == self.open)
    }
}
