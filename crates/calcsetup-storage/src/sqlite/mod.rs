//! SQLite-backed storage implementation.

mod gradebook;
mod items;
mod rules;
pub mod schema;
mod store;

pub use gradebook::{CategoryRecord, CourseRecord, Gradebook};
pub use store::SqliteStore;
