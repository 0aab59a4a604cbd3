//! Rules: named bundles of columns, editable fields, update actions and a
//! formula template.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Identifier rule pickers send for "no rule".
pub const NO_RULE: &str = "norule";

/// Fields shown for a category that has no rule.
pub const STANDARD_FIELDS: &str =
    r#"[{"title":{"identifier":"maxgrade","component":"core_grades"},"property":"grademax"}]"#;

/// Maps the picker's `norule` to the empty identifier of the null rule.
pub fn normalize_idnumber(idnumber: &str) -> &str {
    let idnumber = idnumber.trim();
    if idnumber == NO_RULE { "" } else { idnumber }
}

/// Error type for rule decoding.
#[derive(Debug, thiserror::Error)]
pub enum RuleError {
    #[error("rule '{idnumber}' has invalid {field} JSON: {source}")]
    InvalidJson {
        idnumber: String,
        field: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// A column or field title: literal text or a language string reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Title {
    Text(String),
    Lang {
        identifier: String,
        #[serde(default, skip_serializing_if = "String::is_empty")]
        component: String,
    },
}

impl fmt::Display for Title {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Lang { identifier, .. } => f.write_str(identifier),
        }
    }
}

/// One column of the summary table, or one editable field of the anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Title>,
    pub property: String,
    #[serde(default)]
    pub editable: bool,
}

impl ColumnDescriptor {
    pub fn new(property: impl Into<String>, editable: bool) -> Self {
        Self {
            title: None,
            property: property.into(),
            editable,
        }
    }

    pub fn with_title(mut self, title: Title) -> Self {
        self.title = Some(title);
        self
    }

    /// Header text; the property name when no title is set.
    pub fn label(&self) -> String {
        match &self.title {
            Some(title) => title.to_string(),
            None => self.property.clone(),
        }
    }
}

fn default_when() -> String {
    "all".to_string()
}

/// Sets `set` to `to` on every child whose `when` property loosely equals
/// `val`. `when == "all"` matches every child. `op` is informational.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub set: String,
    #[serde(default)]
    pub to: Value,
    #[serde(default = "default_when")]
    pub when: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub op: String,
    #[serde(default)]
    pub val: Value,
}

impl Action {
    pub fn matches_all(&self) -> bool {
        self.when == "all"
    }
}

/// A rule row as stored, with its lists still JSON-encoded.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RuleRecord {
    pub id: i64,
    pub name: String,
    pub idnumber: String,
    pub descr: String,
    pub visible: bool,
    pub calc: String,
    pub actions: String,
    pub fields: String,
    pub cols: String,
}

fn default_true() -> bool {
    true
}

/// A decoded rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Rule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    #[serde(default)]
    pub idnumber: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub descr: String,
    #[serde(default = "default_true")]
    pub visible: bool,
    #[serde(default, rename = "cols", alias = "columns")]
    pub columns: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub fields: Vec<ColumnDescriptor>,
    #[serde(default)]
    pub actions: Vec<Action>,
    #[serde(default)]
    pub calc: String,
}

fn decode_list<T: serde::de::DeserializeOwned>(
    idnumber: &str,
    field: &'static str,
    text: &str,
) -> Result<Vec<T>, RuleError> {
    let text = text.trim();
    if text.is_empty() || text == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(text).map_err(|source| RuleError::InvalidJson {
        idnumber: idnumber.to_owned(),
        field,
        source,
    })
}

impl Rule {
    /// The null rule: nothing to apply, only the standard fields.
    pub fn none() -> Self {
        Self {
            id: None,
            idnumber: String::new(),
            name: String::new(),
            descr: "No rule applied".to_string(),
            visible: true,
            columns: Vec::new(),
            fields: serde_json::from_str(STANDARD_FIELDS).unwrap_or_default(),
            actions: Vec::new(),
            calc: String::new(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.idnumber.is_empty()
    }

    /// Decodes the JSON list columns of a stored record.
    pub fn from_record(record: &RuleRecord) -> Result<Self, RuleError> {
        let idnumber = record.idnumber.as_str();
        Ok(Self {
            id: Some(record.id),
            idnumber: record.idnumber.clone(),
            name: record.name.clone(),
            descr: record.descr.clone(),
            visible: record.visible,
            columns: decode_list(idnumber, "cols", &record.cols)?,
            fields: decode_list(idnumber, "fields", &record.fields)?,
            actions: decode_list(idnumber, "actions", &record.actions)?,
            calc: record.calc.clone(),
        })
    }

    /// Encodes the rule for storage.
    pub fn to_record(&self) -> Result<RuleRecord, serde_json::Error> {
        Ok(RuleRecord {
            id: self.id.unwrap_or_default(),
            name: self.name.clone(),
            idnumber: self.idnumber.clone(),
            descr: self.descr.clone(),
            visible: self.visible,
            calc: self.calc.clone(),
            actions: serde_json::to_string(&self.actions)?,
            fields: serde_json::to_string(&self.fields)?,
            cols: serde_json::to_string(&self.columns)?,
        })
    }
}

fn lang(identifier: &str, component: &str) -> Title {
    Title::Lang {
        identifier: identifier.to_owned(),
        component: component.to_owned(),
    }
}

fn equals(set: &str, to: &str, when: &str, val: &str) -> Action {
    Action {
        set: set.to_owned(),
        to: Value::from(to),
        when: when.to_owned(),
        op: "equals".to_owned(),
        val: Value::from(val),
    }
}

const PASS_OR_ZERO_CALC: &str = "=IF(
  OR(
{{#items}}
    [[{{idnumber}}]]<{{gradepass}}{{^last}},{{/last}}
{{/items}}
  ),
  0,
  {{category.grademax}}*SUM(
{{#items}}
    [[{{idnumber}}]]/{{grademax}}{{^last}}+{{/last}}
{{/items}}
  )/{{category.item_count}}
)";

/// The rules a fresh database is seeded with.
pub fn default_rules() -> Vec<Rule> {
    let gradepass_field = ColumnDescriptor::new("gradepass", true)
        .with_title(lang("gradepass", "core_grades"));

    let achievement = Rule {
        id: None,
        idnumber: "achievement".to_string(),
        name: "Achievement".to_string(),
        descr: "Assignments are graded on the achievement scale; the category \
                takes the lowest result."
            .to_string(),
        visible: true,
        columns: vec![
            ColumnDescriptor::new("idnumber", true).with_title(lang("idnumber", "")),
            gradepass_field.clone(),
            ColumnDescriptor::new("scaleid", false).with_title(lang("scale", "")),
            ColumnDescriptor::new("grademax", false)
                .with_title(lang("grademax", "core_grades")),
        ],
        fields: vec![gradepass_field.clone()],
        actions: vec![
            equals("gradetype", "2", "itemmodule", "assign"),
            equals("scaleid", "2", "gradetype", "2"),
            equals("gradepass", "2", "scaleid", "2"),
        ],
        calc: "=MIN({{#items}}[[{{idnumber}}]]{{^last}},{{/last}}{{/items}})".to_string(),
    };

    let pass_or_zero = Rule {
        id: None,
        idnumber: "passorzero".to_string(),
        name: "Pass or zero".to_string(),
        descr: "Every item must be passed; otherwise the category total is zero."
            .to_string(),
        visible: true,
        columns: vec![
            ColumnDescriptor::new("idnumber", true).with_title(lang("idnumber", "")),
            gradepass_field.clone(),
            ColumnDescriptor::new("grademax", false)
                .with_title(lang("grademax", "core_grades")),
            ColumnDescriptor::new("itemgroup", true).with_title(Title::Text("Group".into())),
        ],
        fields: vec![gradepass_field],
        actions: Vec::new(),
        calc: PASS_OR_ZERO_CALC.to_string(),
    };

    vec![achievement, pass_or_zero]
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn record(actions: &str) -> RuleRecord {
        RuleRecord {
            id: 3,
            idnumber: "r1".into(),
            name: "R1".into(),
            visible: true,
            actions: actions.into(),
            ..RuleRecord::default()
        }
    }

    #[test]
    fn blank_lists_decode_empty() {
        let rule = Rule::from_record(&record("")).unwrap();
        assert_eq!(rule.id, Some(3));
        assert!(rule.actions.is_empty());
        assert!(rule.columns.is_empty());
        assert!(rule.fields.is_empty());
    }

    #[test]
    fn actions_decode_with_mixed_scalars() {
        let rule = Rule::from_record(&record(
            r#"[{"set":"gradepass","to":2,"when":"scaleid","op":"equals","val":"2"},{"set":"hidden","to":true}]"#,
        ))
        .unwrap();
        assert_eq!(rule.actions[0].to, json!(2));
        assert_eq!(rule.actions[0].val, json!("2"));
        assert!(rule.actions[1].matches_all());
    }

    #[test]
    fn invalid_json_is_a_hard_error() {
        let err = Rule::from_record(&record("[{")).unwrap_err();
        let RuleError::InvalidJson { idnumber, field, .. } = err;
        assert_eq!(idnumber, "r1");
        assert_eq!(field, "actions");
    }

    #[test]
    fn title_accepts_text_or_lang() {
        let cols: Vec<ColumnDescriptor> = serde_json::from_str(
            r#"[{"title":"Group","property":"itemgroup","editable":true},
                {"title":{"identifier":"scale"},"property":"scaleid"}]"#,
        )
        .unwrap();
        assert_eq!(cols[0].label(), "Group");
        assert_eq!(cols[1].label(), "scale");
        assert!(!cols[1].editable);
    }

    #[test]
    fn null_rule_has_standard_fields() {
        let rule = Rule::none();
        assert!(rule.is_none());
        assert_eq!(rule.fields.len(), 1);
        assert_eq!(rule.fields[0].property, "grademax");
        assert_eq!(rule.fields[0].label(), "maxgrade");
    }

    #[test]
    fn norule_normalizes_to_empty() {
        assert_eq!(normalize_idnumber("norule"), "");
        assert_eq!(normalize_idnumber(" achievement "), "achievement");
    }

    #[test]
    fn record_roundtrip_keeps_lists() {
        let rules = default_rules();
        let record = rules[0].to_record().unwrap();
        let back = Rule::from_record(&record).unwrap();
        assert_eq!(back.actions, rules[0].actions);
        assert_eq!(back.columns, rules[0].columns);
    }
}
