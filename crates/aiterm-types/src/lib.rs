pub mod api;
pub mod events;
pub mod executor;
pub mod history;

pub use api::*;
pub use events::*;
pub use executor::Executor;
pub use history::{HistoryEntry, HistoryKind, SystemStatus};
