// Public modules
pub mod archive;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod install;
pub mod ledger;
pub mod manager;
pub mod models;
pub mod repository;

// Re-export commonly used types
pub use error::RelgetError;
pub use ledger::{InstalledBinary, Ledger, LedgerDocument};
pub use manager::{Manager, ManagerOptions, UpdateOutcome};
pub use models::*;
pub use repository::RepositoryRef;
