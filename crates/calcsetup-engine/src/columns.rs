//! Column and field metadata for editing front ends.
//!
//! A rule descriptor says which property a column shows and whether it is
//! editable; the core field table adds lock state, validation and options.

use serde::Serialize;
use serde_json::Value;

use calcsetup_core::compare::{as_number, loose_eq, value_to_string};
use calcsetup_core::fields::{CoreFields, FieldOption, Validation};
use calcsetup_core::item::Item;
use calcsetup_core::rule::ColumnDescriptor;
use calcsetup_core::validation::RESERVED_PROPERTIES;

/// Decimals used when neither the item nor the configuration sets any.
pub const DEFAULT_DECIMALS: i64 = 2;

/// A rule column merged with its core descriptor.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnView {
    pub property: String,
    pub label: String,
    /// Locked in the core table, or not editable in the rule.
    pub locked: bool,
    pub validation: Validation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
    #[serde(skip)]
    default_decimals: i64,
}

impl ColumnView {
    pub fn new(descriptor: &ColumnDescriptor, fields: &CoreFields, default_decimals: i64) -> Self {
        let property = descriptor.property.as_str();
        let core = fields.get(property);
        let locked = core.is_some_and(|c| c.locked)
            || !descriptor.editable
            || Item::is_context_property(property)
            || RESERVED_PROPERTIES.contains(&property);

        Self {
            property: descriptor.property.clone(),
            label: descriptor.label(),
            locked,
            validation: core.map(|c| c.validation).unwrap_or_default(),
            options: core.map(|c| c.options.clone()).unwrap_or_default(),
            default_decimals,
        }
    }

    /// Form key for this column on `item_id`: `<property>_<itemId>`.
    pub fn input_name(&self, item_id: i64) -> String {
        format!("{}_{}", self.property, item_id)
    }

    /// The value as shown in a cell. Numbers of number-validated columns
    /// use the item's decimals.
    pub fn cell_value(&self, item: &Item) -> String {
        let value = item.property(&self.property).unwrap_or(Value::Null);
        if self.validation == Validation::Number {
            if let Some(n) = as_number(&value) {
                let decimals = item.decimals.unwrap_or(self.default_decimals).clamp(0, 5);
                return format!("{n:.*}", decimals as usize);
            }
        }
        value_to_string(&value)
    }

    /// The option name for a raw value of an enumerated column.
    pub fn option_label(&self, value: &str) -> Option<&str> {
        let value = Value::from(value);
        self.options
            .iter()
            .find(|o| loose_eq(&Value::from(o.val.as_str()), &value))
            .map(|o| o.name.as_str())
    }

    /// The cell text with option values replaced by their names.
    pub fn display_value(&self, item: &Item) -> String {
        let raw = self.cell_value(item);
        match self.option_label(&raw) {
            Some(label) => label.to_string(),
            None => raw,
        }
    }
}

/// Views for every descriptor, in order.
pub fn column_views(
    descriptors: &[ColumnDescriptor],
    fields: &CoreFields,
    default_decimals: i64,
) -> Vec<ColumnView> {
    descriptors
        .iter()
        .map(|d| ColumnView::new(d, fields, default_decimals))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use calcsetup_core::enums::DisplayType;
    use calcsetup_core::fields::core_fields;
    use calcsetup_core::item::ItemBuilder;
    use calcsetup_core::rule::Title;
    use pretty_assertions::assert_eq;

    fn view(property: &str, editable: bool) -> ColumnView {
        ColumnView::new(
            &ColumnDescriptor::new(property, editable),
            &core_fields(DisplayType::Real),
            DEFAULT_DECIMALS,
        )
    }

    #[test]
    fn effective_lock() {
        assert!(!view("gradepass", true).locked);
        assert!(view("gradepass", false).locked);
        assert!(view("sortorder", true).locked);
        assert!(view("grademax_total", true).locked);
        assert!(!view("itemgroup", true).locked);
    }

    #[test]
    fn input_name_and_label() {
        let column = ColumnView::new(
            &ColumnDescriptor::new("itemgroup", true).with_title(Title::Text("Group".into())),
            &core_fields(DisplayType::Real),
            DEFAULT_DECIMALS,
        );
        assert_eq!(column.input_name(12), "itemgroup_12");
        assert_eq!(column.label, "Group");
        assert_eq!(view("gradepass", true).label, "gradepass");
    }

    #[test]
    fn numbers_use_item_decimals() {
        let item = ItemBuilder::new(1, "Essay").gradepass(50.0).build();
        assert_eq!(view("gradepass", true).cell_value(&item), "50.00");

        let item = ItemBuilder::new(1, "Essay").gradepass(7.26).decimals(1).build();
        assert_eq!(view("gradepass", true).cell_value(&item), "7.3");

        let item = ItemBuilder::new(1, "Essay").idnumber("a1").build();
        assert_eq!(view("idnumber", true).cell_value(&item), "a1");
        assert_eq!(view("scaleid", true).cell_value(&item), "");
    }

    #[test]
    fn options_resolve_loosely() {
        let column = view("gradetype", true);
        assert_eq!(column.option_label("2"), Some("Scale"));
        assert_eq!(column.option_label("2.00"), Some("Scale"));
        assert_eq!(column.option_label("9"), None);

        let item = ItemBuilder::new(1, "Essay").gradetype(1).build();
        assert_eq!(column.display_value(&item), "Value");
        assert_eq!(view("display", true).display_value(&item), "Default (Real)");
    }
}
