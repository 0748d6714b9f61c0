//! Records reported by time-clock devices

mod attendance;
mod info;
mod user;

pub use attendance::*;
pub use info::*;
pub use user::*;
