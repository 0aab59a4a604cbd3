//! Repository traits -- the public API for grade item and rule persistence.
//!
//! The engine depends on these traits rather than on [`SqliteStore`] so that
//! a different gradebook backend can be substituted.
//!
//! [`SqliteStore`]: crate::SqliteStore

use calcsetup_core::item::Item;
use calcsetup_core::rule::RuleRecord;

use crate::error::Result;

/// Access to grade items.
pub trait ItemRepository: Send + Sync {
    /// Fetches a single grade item by id.
    fn get_item(&self, id: i64) -> Result<Item>;

    /// Fetches the course total item of a course.
    fn get_course_item(&self, course_id: i64) -> Result<Item>;

    /// Items with `grademax > 0` and `gradetype > 0` that are direct children
    /// of `category_id` (activities and child category totals) or that
    /// represent the category itself. Joined context columns are populated.
    fn get_category_items(&self, course_id: i64, category_id: i64) -> Result<Vec<Item>>;

    /// Every grade item of a course, in sortorder.
    fn get_course_items(&self, course_id: i64) -> Result<Vec<Item>>;

    /// Writes every native column of `item` back to its row and stamps
    /// `timemodified`.
    fn update_item(&self, item: &Item) -> Result<()>;
}

/// Access to stored rules.
pub trait RuleRepository: Send + Sync {
    /// Fetches a rule by its unique idnumber.
    fn get_rule_by_idnumber(&self, idnumber: &str) -> Result<RuleRecord>;

    /// Fetches a rule by database id.
    fn get_rule(&self, id: i64) -> Result<RuleRecord>;

    /// Lists rules ordered by name. Hidden rules are included only when asked.
    fn list_rules(&self, include_hidden: bool) -> Result<Vec<RuleRecord>>;

    /// Inserts a rule, or updates the existing rule with the same idnumber.
    /// Returns the rule id.
    fn save_rule(&self, rule: &RuleRecord) -> Result<i64>;

    /// Deletes a rule by id.
    fn delete_rule(&self, id: i64) -> Result<()>;

    /// Shows or hides a rule in pickers.
    fn set_rule_visible(&self, id: i64, visible: bool) -> Result<()>;
}
