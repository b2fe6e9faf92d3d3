use tracing::{debug, warn};

use crate::dome_control::link::paths;
use crate::dome_control::status;
use crate::dome_control::waiters::{CommandWaiter, WaitBudget};
use crate::dome_control::AstelcoDome;
use crate::util::*;

impl AstelcoDome {
    /// Hands azimuth control to this driver
    pub async fn stand(&self) -> DomeResult<()> {
        self.set_mode(DomeMode::Stand).await
    }

    /// Lets the controller slave the dome to the telescope
    pub async fn track(&self) -> DomeResult<()> {
        self.set_mode(DomeMode::Track).await
    }

    /// Always asks the controller, it can change mode on its own
    pub async fn get_mode(&self) -> DomeResult<DomeMode> {
        let code = self.link.read_i64(paths::SYNCMODE).await?.unwrap_or(0);
        let mode = status::mode(code);
        self.state.write().await.mode = mode;
        Ok(mode)
    }

    async fn set_mode(&self, mode: DomeMode) -> DomeResult<()> {
        let _op = self.op_lock.lock().await;
        self.ensure_link_alive().await?;

        debug!("[mode] {:?}", mode);
        let code: i64 = mode.sync_mode().into();
        let cmd = self.link.write_async(paths::SYNCMODE, code.into()).await?;

        // Mode changes are not abortable
        let budget = WaitBudget {
            deadline: self.deadline(),
            interval: self.settings.poll_interval(),
            abort: None,
        };
        if CommandWaiter(cmd).settle(self, &budget).await?.is_timed_out() {
            return Err(DomeError::from_msg(
                DomeErrorType::Timeout,
                format!("Controller did not complete the switch to {:?}", mode),
            ));
        }

        let current = self.get_mode().await?;
        if current != mode {
            warn!("Requested {:?} but the controller reports {:?}", mode, current);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::dome_control::link::TplValue;
    use crate::dome_control::test_util::*;

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_track_and_stand() {
        let link = SimulatedLink::new();
        let dome = create_dome(&link);

        dome.track().await.unwrap();
        assert_eq!(dome.get_state().await.mode, DomeMode::Track);
        assert_eq!(dome.get_mode().await.unwrap(), DomeMode::Track);

        dome.stand().await.unwrap();
        assert_eq!(dome.get_state().await.mode, DomeMode::Stand);

        assert_eq!(
            link.writes_to(paths::SYNCMODE),
            vec![TplValue::Number(4.), TplValue::Number(0.)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_get_mode_rereads_device() {
        let link = SimulatedLink::new();
        let dome = create_dome(&link);
        dome.stand().await.unwrap();

        // Controller switches by itself
        link.set(paths::SYNCMODE, 1i64);
        assert_eq!(dome.get_mode().await.unwrap(), DomeMode::Track);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mode_change_times_out() {
        let link = SimulatedLink::new();
        link.complete_after(None);
        let dome = create_dome(&link);

        let err = dome.track().await.unwrap_err();
        assert!(err.is(DomeErrorType::Timeout));
        assert!(dome.op_lock.try_lock().is_ok());
    }
}
