#![forbid(unsafe_code)]

pub mod repository;
pub mod sqlite;
pub mod tabular;

pub use repository::{InMemoryRepository, SessionRepository, Storage, StorageError};
