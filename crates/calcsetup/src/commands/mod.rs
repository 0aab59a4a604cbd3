//! Command handlers, one module per subcommand.

pub mod apply;
pub mod calc;
pub mod category;
pub mod completion;
pub mod fields;
pub mod gradebook;
pub mod init;
pub mod rules;
pub mod update;
pub mod validate;

use anyhow::Result;

use calcsetup_engine::GradeCategory;
use calcsetup_storage::ItemRepository;

use crate::cli::CategorySelector;

/// Loads the category a command operates on.
pub(crate) fn load_category(
    repo: &dyn ItemRepository,
    selector: &CategorySelector,
) -> Result<GradeCategory> {
    Ok(GradeCategory::load(repo, selector.course, selector.category)?)
}
