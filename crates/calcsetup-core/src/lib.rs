//! Core types for the grade calculation setup tool.
//!
//! Grade items, their custom property codec, the core field table, rules and
//! the loose comparison every write decision goes through.

pub mod compare;
pub mod enums;
pub mod fields;
pub mod item;
pub mod iteminfo;
pub mod rule;
pub mod validation;

pub use enums::{DisplayType, GradeType, ItemType};
pub use fields::{CoreFields, FieldDescriptor, FieldOption, Validation, core_fields};
pub use item::{Item, ItemBuilder, ItemError};
pub use rule::{Action, ColumnDescriptor, Rule, RuleError, RuleRecord, Title};
pub use validation::ConstraintViolation;
