pub use abort_flag::*;
pub use enums::*;
pub use result::*;
pub use wait_outcome::*;

mod abort_flag;
mod enums;
mod result;
mod wait_outcome;
