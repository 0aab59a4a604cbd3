//! Bulk edits submitted from a category's summary table.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use calcsetup_core::compare::loose_eq;
use calcsetup_core::fields::CoreFields;
use calcsetup_core::item::Item;
use calcsetup_core::rule::ColumnDescriptor;
use calcsetup_core::validation::check_write;
use calcsetup_storage::ItemRepository;

use crate::error::Result;
use crate::notice::Notice;

/// What [`update_items`] did.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UpdateOutcome {
    pub count_changed: usize,
    /// Ids of the items that were persisted.
    pub changed_items: Vec<i64>,
    pub notices: Vec<Notice>,
}

/// Splits a form key `<property>_<itemId>` at its last underscore.
pub fn parse_key(key: &str) -> Option<(&str, i64)> {
    let (property, id) = key.rsplit_once('_')?;
    if property.is_empty() {
        return None;
    }
    Some((property, id.parse().ok()?))
}

/// Applies submitted values to `items` and persists the ones that changed.
///
/// Only properties named by `descriptors` are accepted; a descriptor that is
/// not editable, or a core field that is locked, rejects the write with a
/// warning. Values loosely equal to the current one are not writes. Each
/// changed item is saved once, after all of its keys are processed.
pub fn update_items(
    repo: &dyn ItemRepository,
    fields: &CoreFields,
    form: &[(String, String)],
    descriptors: &[ColumnDescriptor],
    items: &mut [Item],
) -> Result<UpdateOutcome> {
    let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
    let mut notices = Vec::new();

    for (key, raw) in form {
        let Some((property, item_id)) = parse_key(key) else {
            debug!(key = %key, "ignoring malformed form key");
            continue;
        };
        let Some(descriptor) = descriptors.iter().find(|d| d.property == property) else {
            debug!(key = %key, "ignoring property without a column");
            continue;
        };
        let Some(index) = items.iter().position(|item| item.id == item_id) else {
            debug!(key = %key, "ignoring unknown item");
            continue;
        };

        let value = Value::from(raw.as_str());
        if let Err(violation) = check_write(fields, property, &value, Some(descriptor.editable)) {
            warn!(key = %key, %violation, "edit rejected");
            notices.push(Notice::warning(violation.to_string()));
            continue;
        }

        let item = &mut items[index];
        let current = item.property(property).unwrap_or(Value::Null);
        if loose_eq(&current, &value) {
            continue;
        }
        if let Err(err) = item.set_property(property, value) {
            warn!(key = %key, %err, "edit rejected");
            notices.push(Notice::warning(err.to_string()));
            continue;
        }
        *counts.entry(index).or_default() += 1;
    }

    let mut outcome = UpdateOutcome::default();
    for (index, count) in counts {
        let item = &mut items[index];
        item.dirty = true;
        repo.update_item(item)?;
        outcome.count_changed += count;
        outcome.changed_items.push(item.id);
        notices.push(Notice::properties_changed(count, item.display_name()));
    }

    if outcome.changed_items.is_empty() {
        let name = items.first().map(Item::display_name).unwrap_or_default();
        notices.push(Notice::properties_changed(0, name));
    }

    outcome.notices = notices;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::GradeCategory;
    use crate::fixtures::{self, COURSE};
    use calcsetup_core::enums::DisplayType;
    use calcsetup_core::fields::core_fields;
    use pretty_assertions::assert_eq;

    fn form(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn descriptors() -> Vec<ColumnDescriptor> {
        vec![
            ColumnDescriptor::new("gradepass", true),
            ColumnDescriptor::new("itemgroup", true),
            ColumnDescriptor::new("grademax", false),
            ColumnDescriptor::new("sortorder", true),
        ]
    }

    fn messages(outcome: &UpdateOutcome) -> Vec<&str> {
        outcome.notices.iter().map(|n| n.message.as_str()).collect()
    }

    #[test]
    fn keys_split_at_last_underscore() {
        assert_eq!(parse_key("gradepass_12"), Some(("gradepass", 12)));
        assert_eq!(parse_key("my_custom_prop_3"), Some(("my_custom_prop", 3)));
        assert_eq!(parse_key("gradepass_x"), None);
        assert_eq!(parse_key("gradepass"), None);
        assert_eq!(parse_key("_3"), None);
    }

    #[test]
    fn writes_and_persists_once_per_item() {
        let store = fixtures::store();
        let mut category = GradeCategory::load(&store, COURSE, None).unwrap();
        let fields = core_fields(DisplayType::Real);

        let outcome = update_items(
            &store,
            &fields,
            &form(&[
                ("gradepass_2", "40"),
                ("itemgroup_2", "core"),
                ("gradepass_3", "5.0"),
                ("unknown_2", "x"),
                ("gradepass_99", "1"),
            ]),
            &descriptors(),
            category.all_items_mut(),
        )
        .unwrap();

        assert_eq!(outcome.count_changed, 2);
        assert_eq!(outcome.changed_items, vec![2]);
        assert_eq!(
            messages(&outcome),
            vec!["2 properties set / changed on item Essay."]
        );

        let essay = store.get_item_impl(2).unwrap();
        assert_eq!(essay.gradepass, 40.0);
        assert!(essay.iteminfo.contains(r#""itemgroup":"core""#));
    }

    #[test]
    fn constraint_violations_are_warnings() {
        let store = fixtures::store();
        let mut category = GradeCategory::load(&store, COURSE, None).unwrap();
        let fields = core_fields(DisplayType::Real);

        let outcome = update_items(
            &store,
            &fields,
            &form(&[
                ("grademax_2", "10"),
                ("sortorder_2", "9"),
                ("gradepass_2", "half"),
                ("gradepass_3", "6"),
            ]),
            &descriptors(),
            category.all_items_mut(),
        )
        .unwrap();

        assert_eq!(
            messages(&outcome),
            vec![
                "The property 'grademax' cannot be updated.",
                "The property 'sortorder' cannot be updated.",
                "The value 'half' is not of the expected type",
                "1 properties set / changed on item Quiz.",
            ]
        );
        assert_eq!(store.get_item_impl(2).unwrap().grademax, 100.0);
    }

    #[test]
    fn idempotent_resubmission() {
        let store = fixtures::store();
        let fields = core_fields(DisplayType::Real);
        let submitted = form(&[("gradepass_2", "40"), ("gradepass_3", "6")]);

        let mut category = GradeCategory::load(&store, COURSE, None).unwrap();
        let first =
            update_items(&store, &fields, &submitted, &descriptors(), category.all_items_mut())
                .unwrap();
        assert_eq!(first.count_changed, 2);

        let mut category = GradeCategory::load(&store, COURSE, None).unwrap();
        let second =
            update_items(&store, &fields, &submitted, &descriptors(), category.all_items_mut())
                .unwrap();
        assert_eq!(second.count_changed, 0);
        assert!(second.changed_items.is_empty());
        assert_eq!(
            messages(&second),
            vec!["0 properties set / changed on item Biology 101."]
        );
    }
}
