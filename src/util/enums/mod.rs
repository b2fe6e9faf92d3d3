pub mod aperture;
pub mod dome_mode;
pub mod dome_status;

pub use aperture::*;
pub use dome_mode::*;
pub use dome_status::*;

pub use crate::astro_math::{Degrees, Radians};
