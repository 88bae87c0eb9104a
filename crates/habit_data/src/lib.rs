//! Table storage, backup reconciliation and the dashboard service that ties
//! the stored tables to the calendar engine.

pub mod backup;
pub mod error;
pub mod loader;
pub mod pagination;
pub mod service;
pub mod store;

pub use crate::backup::{Backup, ImportReport, TableReport};
pub use crate::error::{DataError, Result};
pub use crate::service::{DashboardService, DashboardServiceBuilder};
pub use crate::store::{JsonDirStore, MemoryStore, Record, TableStore};
