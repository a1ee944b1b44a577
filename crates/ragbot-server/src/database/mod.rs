pub mod catalog;
pub mod history;
pub mod models;
pub mod pool;
pub mod session;

pub use history::HistoryStore;
pub use models::*;
pub use pool::DbPool;
pub use session::SessionTracker;
