// Entry points for embedders: logging setup and the control surface.

pub mod controls;
pub mod logging;
