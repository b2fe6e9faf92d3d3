pub use dome::{AstelcoDome, DomeState};
pub use events::DomeEvent;
pub use link::{paths, CommandId, DeviceLink, TplValue};

use crate::astro_math::AngularPosition;
use crate::util::*;

mod commands {
    pub mod aperture;
    pub mod mode;
    pub mod slew;
    pub mod sync;
}
mod dome;
mod events;
mod link;
pub mod status;
#[cfg(test)]
pub(in crate::dome_control) mod test_util;
mod waiters;

impl AstelcoDome {
    /// Current dome azimuth. Keeps the last known value when the controller reports none.
    pub async fn get_az(&self) -> DomeResult<Degrees> {
        let reading = self.link.read_f64(paths::DOME_CURRPOS).await?;
        let mut state = self.state.write().await;
        if let Some(az) = reading {
            state.azimuth = az;
        }
        Ok(state.azimuth)
    }

    pub async fn get_az_offset(&self) -> DomeResult<Degrees> {
        let reading = self.link.read_f64(paths::DOME_OFFSET).await?;
        let mut state = self.state.write().await;
        if let Some(offset) = reading {
            state.azimuth_offset = offset;
        }
        Ok(state.azimuth_offset)
    }

    /// True while the controller reports any motion
    pub async fn is_slewing(&self) -> DomeResult<bool> {
        let code = self.link.read_i64(paths::MOTION_STATE).await?.unwrap_or(0);
        Ok(status::is_slewing(code))
    }

    pub async fn is_slit_open(&self) -> DomeResult<bool> {
        Ok(status::is_slit_open(self.read_open_mask().await?))
    }

    pub async fn is_flap_open(&self) -> DomeResult<bool> {
        Ok(status::is_flap_open(self.read_open_mask().await?))
    }

    pub async fn get_aperture_position(
        &self,
        element: ApertureElement,
    ) -> DomeResult<AperturePosition> {
        if self.is_moving(element) {
            return Ok(AperturePosition::Moving);
        }
        let mask = self.read_open_mask().await?;
        Ok(AperturePosition::from_open(status::is_open(mask, element)))
    }

    pub(in crate::dome_control) async fn read_open_mask(&self) -> DomeResult<i64> {
        let mask = self.link.read_i64(paths::OPEN_MASK).await?.unwrap_or(0);
        let mut state = self.state.write().await;
        state.slit_open = status::is_slit_open(mask);
        state.flap_open = status::is_flap_open(mask);
        Ok(mask)
    }

    pub(in crate::dome_control) async fn current_position(&self) -> DomeResult<AngularPosition> {
        Ok(AngularPosition::dome(self.get_az().await?))
    }

    /// Tolerance the controller itself allows between dome and telescope
    pub(in crate::dome_control) async fn max_deviation(&self) -> DomeResult<Degrees> {
        self.link
            .read_f64(paths::MAX_DEVIATION)
            .await?
            .map(f64::abs)
            .ok_or_else(|| {
                DomeError::from_msg(
                    DomeErrorType::Link,
                    format!("{} is not available", paths::MAX_DEVIATION),
                )
            })
    }
}

#[cfg(test)]
mod tests {
    use super::test_util::*;
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_get_az_keeps_last_known() {
        let link = SimulatedLink::new();
        let dome = create_dome(&link);
        link.clear(paths::DOME_CURRPOS);
        assert_eq!(dome.get_az().await.unwrap(), 0.);

        link.set(paths::DOME_CURRPOS, 42.);
        assert_eq!(dome.get_az().await.unwrap(), 42.);

        link.clear(paths::DOME_CURRPOS);
        assert_eq!(dome.get_az().await.unwrap(), 42.);
    }

    #[tokio::test(start_paused = true)]
    async fn test_queries_reread_device() {
        let link = SimulatedLink::new();
        let dome = create_dome(&link);

        assert!(!dome.is_slit_open().await.unwrap());
        link.set(paths::OPEN_MASK, 0b010i64);
        assert!(dome.is_slit_open().await.unwrap());
        assert!(!dome.is_flap_open().await.unwrap());
        link.set(paths::OPEN_MASK, 0b110i64);
        assert!(dome.is_flap_open().await.unwrap());
        assert_eq!(
            dome.get_aperture_position(ApertureElement::Flap)
                .await
                .unwrap(),
            AperturePosition::Open
        );

        assert!(!dome.is_slewing().await.unwrap());
        link.set(paths::MOTION_STATE, 7i64);
        assert!(dome.is_slewing().await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_max_deviation_is_an_error() {
        let link = SimulatedLink::new();
        link.clear(paths::MAX_DEVIATION);
        let dome = create_dome(&link);
        assert!(dome
            .max_deviation()
            .await
            .unwrap_err()
            .is(DomeErrorType::Link));
    }
}
