//! Generating, checking and storing category calculations.

use std::collections::HashSet;

use tracing::info;

use calcsetup_core::item::Item;
use calcsetup_core::rule::Rule;
use calcsetup_formula::render::{self, strip_whitespace};
use calcsetup_formula::validate::check_formula;
use calcsetup_storage::{ItemRepository, StorageError};

use crate::category::GradeCategory;
use crate::error::{EngineError, Result};

/// Renders the rule's formula for a category. Whitespace is preserved so
/// the result can be shown as a preview.
pub fn render_category(rule: &Rule, category: &GradeCategory) -> Result<String> {
    let (anchor, items) = category.template_data();
    Ok(render::render(&rule.calc, &anchor, &items)?)
}

fn load_item(repo: &dyn ItemRepository, course_id: i64, item_id: i64) -> Result<Item> {
    let item = repo.get_item(item_id).map_err(|e| match e {
        StorageError::NotFound { .. } => EngineError::ItemNotFound(item_id),
        other => other.into(),
    })?;
    if item.courseid != course_id {
        return Err(EngineError::ItemNotFound(item_id));
    }
    Ok(item)
}

fn check_calculation(repo: &dyn ItemRepository, item: &Item, formula: &str) -> Result<()> {
    let idnumbers: HashSet<String> = repo
        .get_course_items(item.courseid)?
        .into_iter()
        .filter(|other| other.id != item.id && !other.idnumber.is_empty())
        .map(|other| other.idnumber)
        .collect();
    check_formula(formula, &idnumbers, Some(&item.idnumber))?;
    Ok(())
}

/// Whether `formula` is an acceptable calculation for the item.
///
/// Structural problems give `Ok(false)`; only a missing item or a
/// repository failure is an error.
pub fn validate_formula(
    repo: &dyn ItemRepository,
    course_id: i64,
    item_id: i64,
    formula: &str,
) -> Result<bool> {
    let item = load_item(repo, course_id, item_id)?;
    match check_calculation(repo, &item, formula) {
        Ok(()) => Ok(true),
        Err(EngineError::InvalidFormula(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Strips whitespace from a rendered preview, checks it and stores it as
/// the item's calculation. Returns the stored formula.
pub fn save_calculation(
    repo: &dyn ItemRepository,
    course_id: i64,
    item_id: i64,
    preview: &str,
) -> Result<String> {
    let formula = strip_whitespace(preview);
    let mut item = load_item(repo, course_id, item_id)?;
    check_calculation(repo, &item, &formula)?;

    item.calculation = formula.clone();
    item.dirty = true;
    repo.update_item(&item)?;
    info!(item_id, calculation = %formula, "calculation saved");
    Ok(formula)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::RuleEngine;
    use crate::fixtures::{self, COURSE};
    use calcsetup_core::enums::DisplayType;
    use calcsetup_core::fields::core_fields;
    use calcsetup_formula::types::FormulaError;
    use pretty_assertions::assert_eq;

    #[test]
    fn renders_minimum_for_achievement() {
        let store = fixtures::store();
        let category = GradeCategory::load(&store, COURSE, None).unwrap();
        let mut engine = RuleEngine::new(&store, &store, core_fields(DisplayType::Real));
        let rule = engine.resolve(&category, Some("achievement")).unwrap();

        insta::assert_snapshot!(
            render_category(&rule, &category).unwrap(),
            @"=MIN([[a1]],[[a2]],[[labs]])"
        );
    }

    #[test]
    fn pass_or_zero_uses_category_totals() {
        let store = fixtures::store();
        let category = GradeCategory::load(&store, COURSE, None).unwrap();
        let mut engine = RuleEngine::new(&store, &store, core_fields(DisplayType::Real));
        let rule = engine.resolve(&category, Some("passorzero")).unwrap();

        let preview = render_category(&rule, &category).unwrap();
        insta::assert_snapshot!(
            strip_whitespace(&preview),
            @"=IF(OR([[a1]]<50,[[a2]]<5,[[labs]]<0),0,100*SUM([[a1]]/100+[[a2]]/10+[[labs]]/50)/3)"
        );
    }

    #[test]
    fn null_rule_renders_empty() {
        let store = fixtures::store();
        let category = GradeCategory::load(&store, COURSE, None).unwrap();
        assert_eq!(render_category(&Rule::none(), &category).unwrap(), "");
    }

    #[test]
    fn validation_results() {
        let store = fixtures::store();
        assert!(validate_formula(&store, COURSE, 1, "=MIN([[a1]], [[a2]])").unwrap());
        assert!(!validate_formula(&store, COURSE, 1, "MIN([[a1]])").unwrap());
        assert!(!validate_formula(&store, COURSE, 1, "=[[a1]]+[[nope]]").unwrap());
        assert!(!validate_formula(&store, COURSE, 1, "=[[course]]*2").unwrap());
        assert!(!validate_formula(&store, COURSE, 1, "=(([[a1]])").unwrap());
        assert!(matches!(
            validate_formula(&store, COURSE, 99, "=1"),
            Err(EngineError::ItemNotFound(99))
        ));
        assert!(matches!(
            validate_formula(&store, 3, 1, "=1"),
            Err(EngineError::ItemNotFound(1))
        ));
    }

    #[test]
    fn save_strips_and_stores() {
        let store = fixtures::store();
        let stored = save_calculation(&store, COURSE, 4, "= SUM( [[l1]] ,\n [[a1]] )").unwrap();
        assert_eq!(stored, "=SUM([[l1]],[[a1]])");
        assert_eq!(store.get_item_impl(4).unwrap().calculation, stored);
    }

    #[test]
    fn save_rejects_invalid() {
        let store = fixtures::store();
        let err = save_calculation(&store, COURSE, 4, "=[[labs]]+1").unwrap_err();
        assert!(matches!(
            err,
            EngineError::InvalidFormula(FormulaError::SelfReference(_))
        ));
        assert_eq!(store.get_item_impl(4).unwrap().calculation, "");
    }
}
