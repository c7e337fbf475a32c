#![forbid(unsafe_code)]

pub mod insights;
pub mod model;
pub mod schedule;
pub mod selector;
pub mod streaks;
pub mod time;

pub use time::Clock;
