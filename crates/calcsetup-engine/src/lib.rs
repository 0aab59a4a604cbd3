//! The rule engine for grade calculation setup.
//!
//! A request resolves the rule attached to a category, loads the category's
//! items, applies the rule's actions, renders its formula and accepts bulk
//! edits. Every operation takes its repositories explicitly; there is no
//! global state.

pub mod apply;
pub mod calc;
pub mod category;
pub mod columns;
pub mod error;
pub mod notice;
pub mod resolve;
pub mod update;

#[cfg(test)]
pub(crate) mod fixtures;

pub use apply::{AppliedResult, RuleEngine};
pub use category::GradeCategory;
pub use columns::ColumnView;
pub use error::EngineError;
pub use notice::{Notice, NoticeLevel};
pub use resolve::{RuleChoice, RuleStore};
pub use update::{UpdateOutcome, update_items};
