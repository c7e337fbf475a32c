#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod scheduler_service;

pub use study_core::Clock;

pub use config::{ScheduleConfig, SchedulerConfig, StoreConfig};
pub use error::{ConfigError, ServiceError};
pub use scheduler_service::SchedulerService;
