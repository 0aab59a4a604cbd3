//! Engine error type.

use calcsetup_core::item::ItemError;
use calcsetup_core::rule::RuleError;
use calcsetup_formula::types::{FormulaError, TemplateError};
use calcsetup_storage::StorageError;

/// Errors that abort an engine operation.
///
/// Rejected writes are not errors; they are reported as warning
/// [`Notice`](crate::Notice)s and processing continues.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Rule(#[from] RuleError),

    #[error(transparent)]
    Item(#[from] ItemError),

    #[error("invalid calculation template: {0}")]
    Template(#[from] TemplateError),

    #[error("category {category_id} not found in course {course_id}")]
    CategoryNotFound { course_id: i64, category_id: i64 },

    #[error("invalid calculation: {0}")]
    InvalidFormula(#[from] FormulaError),

    #[error("grade item {0} not found")]
    ItemNotFound(i64),
}

pub type Result<T> = std::result::Result<T, EngineError>;
