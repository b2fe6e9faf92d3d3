//! Maps raw controller telemetry onto logical dome states.

use crate::util::*;

/// The only TELESCOPE.MOTION_STATE code meaning everything has settled
pub const SETTLED_MOTION_STATE: i64 = 11;

/// Unknown codes count as moving
pub fn is_slewing(motion_state: i64) -> bool {
    motion_state != SETTLED_MOTION_STATE
}

pub fn mode(sync_mode: i64) -> DomeMode {
    if sync_mode != 0 {
        DomeMode::Track
    } else {
        DomeMode::Stand
    }
}

pub fn is_open(open_mask: i64, element: ApertureElement) -> bool {
    open_mask & element.open_bit() != 0
}

pub fn is_slit_open(open_mask: i64) -> bool {
    is_open(open_mask, ApertureElement::Slit)
}

pub fn is_flap_open(open_mask: i64) -> bool {
    is_open(open_mask, ApertureElement::Flap)
}
