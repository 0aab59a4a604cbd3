//! Write constraints shared by rule actions and bulk edits.

use serde_json::Value;

use crate::compare::{is_numeric_value, value_to_string};
use crate::fields::{CoreFields, Validation};
use crate::item::Item;

/// Names that exist only in template data and can never be stored.
pub const RESERVED_PROPERTIES: &[&str] = &["last", "items", "category"];

/// A rejected write. Recovered by the caller and reported as a warning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConstraintViolation {
    #[error("The property '{0}' cannot be updated.")]
    Locked(String),

    #[error("The value '{0}' is not of the expected type")]
    WrongType(String),
}

/// Checks whether `value` may be written to `property`.
///
/// `editable` is the column-level flag of a rule descriptor, if the write
/// comes through one; `Some(false)` locks the property regardless of the
/// core table.
pub fn check_write(
    fields: &CoreFields,
    property: &str,
    value: &Value,
    editable: Option<bool>,
) -> Result<(), ConstraintViolation> {
    if RESERVED_PROPERTIES.contains(&property)
        || Item::is_context_property(property)
        || fields.is_locked(property)
        || editable == Some(false)
    {
        return Err(ConstraintViolation::Locked(property.to_owned()));
    }
    if fields.validation(property) == Validation::Number && !is_numeric_value(value) {
        return Err(ConstraintViolation::WrongType(value_to_string(value)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::enums::DisplayType;
    use crate::fields::core_fields;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn locked_core_field_rejected() {
        let fields = core_fields(DisplayType::Real);
        assert_eq!(
            check_write(&fields, "sortorder", &json!(1), None),
            Err(ConstraintViolation::Locked("sortorder".into()))
        );
        assert_eq!(
            ConstraintViolation::Locked("sortorder".into()).to_string(),
            "The property 'sortorder' cannot be updated."
        );
    }

    #[test]
    fn reserved_and_context_names_rejected() {
        let fields = core_fields(DisplayType::Real);
        for name in ["last", "items", "category", "grademax_total", "fullname"] {
            assert!(check_write(&fields, name, &json!("x"), None).is_err(), "{name}");
        }
    }

    #[test]
    fn non_editable_column_rejected() {
        let fields = core_fields(DisplayType::Real);
        assert!(check_write(&fields, "grademax", &json!(5), Some(false)).is_err());
        assert!(check_write(&fields, "grademax", &json!(5), Some(true)).is_ok());
    }

    #[test]
    fn number_validation() {
        let fields = core_fields(DisplayType::Real);
        assert_eq!(
            check_write(&fields, "gradepass", &json!("abc"), None),
            Err(ConstraintViolation::WrongType("abc".into()))
        );
        assert_eq!(
            ConstraintViolation::WrongType("abc".into()).to_string(),
            "The value 'abc' is not of the expected type"
        );
        assert!(check_write(&fields, "gradepass", &json!("2.5"), None).is_ok());
        assert!(check_write(&fields, "itemgroup", &json!("abc"), None).is_ok());
    }
}
