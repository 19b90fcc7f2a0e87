//! Authentication service repositories

pub mod user;

// Re-export for convenience
pub use user::{PgUserStore, StoreError, UserStore};
