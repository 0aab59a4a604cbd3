//! Storage backend for the grade calculation setup tool.
//!
//! Provides the [`ItemRepository`] and [`RuleRepository`] traits and a SQLite
//! implementation ([`SqliteStore`]).

pub mod error;
pub mod sqlite;
pub mod traits;

// Re-exports for convenience.
pub use error::StorageError;
pub use sqlite::{CategoryRecord, CourseRecord, Gradebook, SqliteStore};
pub use traits::{ItemRepository, RuleRepository};

// ---------------------------------------------------------------------------
// Repository trait implementations for SqliteStore
// ---------------------------------------------------------------------------

use calcsetup_core::item::Item;
use calcsetup_core::rule::RuleRecord;

use crate::error::Result;

impl ItemRepository for SqliteStore {
    fn get_item(&self, id: i64) -> Result<Item> {
        self.get_item_impl(id)
    }

    fn get_course_item(&self, course_id: i64) -> Result<Item> {
        self.get_course_item_impl(course_id)
    }

    fn get_category_items(&self, course_id: i64, category_id: i64) -> Result<Vec<Item>> {
        self.get_category_items_impl(course_id, category_id)
    }

    fn get_course_items(&self, course_id: i64) -> Result<Vec<Item>> {
        self.get_course_items_impl(course_id)
    }

    fn update_item(&self, item: &Item) -> Result<()> {
        self.update_item_impl(item)
    }
}

impl RuleRepository for SqliteStore {
    fn get_rule_by_idnumber(&self, idnumber: &str) -> Result<RuleRecord> {
        self.get_rule_by_idnumber_impl(idnumber)
    }

    fn get_rule(&self, id: i64) -> Result<RuleRecord> {
        self.get_rule_impl(id)
    }

    fn list_rules(&self, include_hidden: bool) -> Result<Vec<RuleRecord>> {
        self.list_rules_impl(include_hidden)
    }

    fn save_rule(&self, rule: &RuleRecord) -> Result<i64> {
        self.save_rule_impl(rule)
    }

    fn delete_rule(&self, id: i64) -> Result<()> {
        self.delete_rule_impl(id)
    }

    fn set_rule_visible(&self, id: i64, visible: bool) -> Result<()> {
        self.set_rule_visible_impl(id, visible)
    }
}
