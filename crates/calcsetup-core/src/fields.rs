//! The core field descriptor table.
//!
//! Describes every built-in grade item property: whether it may be written,
//! how submitted values are validated and which options an editor offers.
//! The table is rebuilt per call because the `display` options depend on the
//! course default display type.

use serde::{Deserialize, Serialize};

use crate::enums::{DisplayType, GradeType};

/// How a submitted value is validated before it is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Validation {
    #[default]
    None,
    Number,
}

/// A selectable value for an enumerated property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldOption {
    pub val: String,
    pub name: String,
}

impl FieldOption {
    pub fn new(val: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            val: val.into(),
            name: name.into(),
        }
    }
}

/// Constraint metadata for one core property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldDescriptor {
    pub property: &'static str,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub locked: bool,
    #[serde(skip_serializing_if = "is_no_validation")]
    pub validation: Validation,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<FieldOption>,
}

fn is_no_validation(v: &Validation) -> bool {
    *v == Validation::None
}

impl FieldDescriptor {
    fn locked(property: &'static str) -> Self {
        Self {
            property,
            locked: true,
            validation: Validation::None,
            options: Vec::new(),
        }
    }

    fn free(property: &'static str) -> Self {
        Self {
            property,
            locked: false,
            validation: Validation::None,
            options: Vec::new(),
        }
    }

    fn number(property: &'static str) -> Self {
        Self {
            property,
            locked: false,
            validation: Validation::Number,
            options: Vec::new(),
        }
    }

    fn with_options(mut self, options: Vec<FieldOption>) -> Self {
        self.options = options;
        self
    }

    /// Returns the option label for a stored value, if the property is
    /// enumerated and the value is one of its options.
    pub fn option_name(&self, val: &str) -> Option<&str> {
        self.options
            .iter()
            .find(|o| crate::compare::loose_eq(&o.val.as_str().into(), &val.into()))
            .map(|o| o.name.as_str())
    }
}

/// The full descriptor table, in Moodle column order.
#[derive(Debug, Clone)]
pub struct CoreFields {
    fields: Vec<FieldDescriptor>,
}

impl CoreFields {
    /// Looks up the descriptor for `property`.
    pub fn get(&self, property: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.property == property)
    }

    /// Returns `true` if `property` is a core field that must never be written.
    pub fn is_locked(&self, property: &str) -> bool {
        self.get(property).is_some_and(|f| f.locked)
    }

    /// Validation mode for `property`. Unknown properties are unvalidated.
    pub fn validation(&self, property: &str) -> Validation {
        self.get(property)
            .map(|f| f.validation)
            .unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter()
    }

    /// Only the descriptors that may be edited.
    pub fn editable_only(&self) -> Vec<&FieldDescriptor> {
        self.fields.iter().filter(|f| !f.locked).collect()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Builds the descriptor table for a course whose default display type is
/// `default_display`.
pub fn core_fields(default_display: DisplayType) -> CoreFields {
    let mut display_options = vec![FieldOption::new(
        DisplayType::CourseDefault.code().to_string(),
        format!("Default ({})", default_display.name()),
    )];
    display_options.extend(
        DisplayType::ALL
            .iter()
            .filter(|d| **d != DisplayType::CourseDefault)
            .map(|d| FieldOption::new(d.code().to_string(), d.name())),
    );

    let gradetype_options = GradeType::ALL
        .iter()
        .map(|g| FieldOption::new(g.code().to_string(), g.name()))
        .collect();

    let hidden_options = vec![FieldOption::new("0", "No"), FieldOption::new("1", "Yes")];

    let fields = vec![
        FieldDescriptor::locked("id"),
        FieldDescriptor::locked("courseid"),
        FieldDescriptor::locked("categoryid"),
        FieldDescriptor::locked("itemname"),
        FieldDescriptor::locked("itemtype"),
        FieldDescriptor::locked("itemmodule"),
        FieldDescriptor::locked("iteminstance"),
        FieldDescriptor::locked("itemnumber"),
        FieldDescriptor::free("iteminfo"),
        FieldDescriptor::free("idnumber"),
        FieldDescriptor::free("calculation"),
        FieldDescriptor::number("gradetype").with_options(gradetype_options),
        FieldDescriptor::number("grademax"),
        FieldDescriptor::number("grademin"),
        FieldDescriptor::number("scaleid"),
        FieldDescriptor::number("outcomeid"),
        FieldDescriptor::number("gradepass"),
        FieldDescriptor::number("multfactor"),
        FieldDescriptor::number("plusfactor"),
        FieldDescriptor::number("aggregationcoef"),
        FieldDescriptor::number("aggregationcoef2"),
        FieldDescriptor::locked("sortorder"),
        FieldDescriptor::free("display").with_options(display_options),
        FieldDescriptor::number("decimals"),
        FieldDescriptor::number("hidden").with_options(hidden_options),
        FieldDescriptor::locked("locked"),
        FieldDescriptor::locked("locktime"),
        FieldDescriptor::free("needsupdate"),
        FieldDescriptor::number("weightoverride"),
        FieldDescriptor::locked("timecreated"),
        FieldDescriptor::locked("timemodified"),
        FieldDescriptor::free("itemgroup"),
    ];

    CoreFields { fields }
}
