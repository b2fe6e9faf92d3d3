#[macro_use]
extern crate assert_float_eq;

pub mod astro_math;
pub mod config;
pub mod dome_control;
pub mod tpl;
pub mod util;
