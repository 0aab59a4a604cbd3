//! Rule resolution.
//!
//! A category names its rule through the `rule` key of its anchor item's
//! custom property block. A request may also name a rule explicitly, which
//! takes precedence. Anything that does not resolve falls back to the null
//! rule.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use calcsetup_core::compare::value_to_string;
use calcsetup_core::item::Item;
use calcsetup_core::rule::{NO_RULE, Rule, normalize_idnumber};
use calcsetup_storage::RuleRepository;

use crate::error::Result;

/// Custom property of the anchor item that holds the rule idnumber.
pub const RULE_PROPERTY: &str = "rule";

/// The idnumber stored on an anchor item, or `""`.
pub fn stored_rule(anchor: &Item) -> String {
    anchor
        .iteminfo_data()
        .and_then(|data| data.get(RULE_PROPERTY).cloned())
        .or_else(|| anchor.property(RULE_PROPERTY))
        .map(|value| value_to_string(&value))
        .unwrap_or_default()
}

/// One entry of a rule picker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleChoice {
    pub id: i64,
    pub idnumber: String,
    pub name: String,
    pub selected: bool,
}

/// Resolves rules for the duration of one request, memoizing lookups.
pub struct RuleStore<'r> {
    repo: &'r dyn RuleRepository,
    cache: HashMap<String, Rule>,
}

impl<'r> RuleStore<'r> {
    pub fn new(repo: &'r dyn RuleRepository) -> Self {
        Self {
            repo,
            cache: HashMap::new(),
        }
    }

    /// Looks up a rule by idnumber. Empty, `norule` and unknown idnumbers
    /// give the null rule; undecodable JSON is an error.
    pub fn get(&mut self, idnumber: &str) -> Result<Rule> {
        let idnumber = normalize_idnumber(idnumber);
        if idnumber.is_empty() {
            return Ok(Rule::none());
        }
        if let Some(rule) = self.cache.get(idnumber) {
            return Ok(rule.clone());
        }

        let rule = match self.repo.get_rule_by_idnumber(idnumber) {
            Ok(record) => Rule::from_record(&record)?,
            Err(e) if e.is_not_found() => {
                debug!(idnumber, "rule not found, using the null rule");
                Rule::none()
            }
            Err(e) => return Err(e.into()),
        };
        self.cache.insert(idnumber.to_owned(), rule.clone());
        Ok(rule)
    }

    /// The explicitly requested rule if one is given, else the anchor's.
    pub fn resolve(&mut self, explicit: Option<&str>, anchor: &Item) -> Result<Rule> {
        match explicit.map(str::trim).filter(|s| !s.is_empty()) {
            Some(idnumber) => self.get(idnumber),
            None => self.get(&stored_rule(anchor)),
        }
    }

    /// Visible rules for a picker, led by the synthetic "no rule" entry.
    pub fn choices(&self, selected: &str) -> Result<Vec<RuleChoice>> {
        let selected = normalize_idnumber(selected);
        let mut choices = vec![RuleChoice {
            id: 0,
            idnumber: NO_RULE.to_string(),
            name: "No rule applied".to_string(),
            selected: selected.is_empty(),
        }];
        for record in self.repo.list_rules(false)? {
            choices.push(RuleChoice {
                selected: record.idnumber == selected,
                id: record.id,
                idnumber: record.idnumber,
                name: record.name,
            });
        }
        Ok(choices)
    }
}

/// Value written to the anchor to record `idnumber` as its rule.
pub(crate) fn rule_value(idnumber: &str) -> Value {
    Value::from(normalize_idnumber(idnumber))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;
    use crate::fixtures;
    use calcsetup_core::item::ItemBuilder;
    use calcsetup_core::rule::RuleRecord;
    use calcsetup_storage::SqliteStore;
    use pretty_assertions::assert_eq;

    fn anchor_with_rule(rule: &str) -> Item {
        let mut item = ItemBuilder::new(1, "Course").build();
        item.set_iteminfo_property(RULE_PROPERTY, Value::from(rule))
            .unwrap();
        item
    }

    #[test]
    fn nonexistent_rule_resolves_to_default() {
        let store = fixtures::store();
        let mut rules = RuleStore::new(&store);
        let rule = rules.get("doesnotexist").unwrap();
        assert!(rule.is_none());
        assert_eq!(rule, Rule::none());
        assert_eq!(rule.fields[0].property, "grademax");
    }

    #[test]
    fn norule_and_blank_resolve_to_default() {
        let store = fixtures::store();
        let mut rules = RuleStore::new(&store);
        assert!(rules.get("norule").unwrap().is_none());
        assert!(rules.get("  ").unwrap().is_none());
    }

    #[test]
    fn explicit_wins_over_stored() {
        let store = fixtures::store();
        let mut rules = RuleStore::new(&store);
        let anchor = anchor_with_rule("achievement");

        assert_eq!(rules.resolve(None, &anchor).unwrap().idnumber, "achievement");
        assert_eq!(
            rules.resolve(Some("passorzero"), &anchor).unwrap().idnumber,
            "passorzero"
        );
        assert_eq!(rules.resolve(Some(""), &anchor).unwrap().idnumber, "achievement");
        assert!(rules.resolve(Some("norule"), &anchor).unwrap().is_none());
    }

    #[test]
    fn stored_rule_read_from_iteminfo() {
        let mut anchor = ItemBuilder::new(1, "Course")
            .iteminfo(r#"notes {{gradereportcalcsetup}}{"rule":"passorzero"}{{/gradereportcalcsetup}}"#)
            .build();
        assert_eq!(stored_rule(&anchor), "passorzero");
        anchor.merge_iteminfo();
        assert_eq!(stored_rule(&anchor), "passorzero");
        assert_eq!(stored_rule(&ItemBuilder::new(2, "x").build()), "");
    }

    #[test]
    fn invalid_json_is_hard_failure() {
        let store = SqliteStore::open_in_memory().unwrap();
        store
            .save_rule_impl(&RuleRecord {
                idnumber: "broken".into(),
                name: "Broken".into(),
                visible: true,
                actions: "[{".into(),
                ..RuleRecord::default()
            })
            .unwrap();
        let mut rules = RuleStore::new(&store);
        assert!(matches!(rules.get("broken"), Err(EngineError::Rule(_))));
    }

    #[test]
    fn lookups_are_memoized() {
        let store = fixtures::store();
        let mut rules = RuleStore::new(&store);
        let first = rules.get("achievement").unwrap();

        let mut record = store.get_rule_by_idnumber_impl("achievement").unwrap();
        record.name = "Renamed".into();
        store.save_rule_impl(&record).unwrap();

        assert_eq!(rules.get("achievement").unwrap(), first);
        assert_eq!(RuleStore::new(&store).get("achievement").unwrap().name, "Renamed");
    }

    #[test]
    fn picker_choices() {
        let store = fixtures::store();
        let rules = RuleStore::new(&store);

        let choices = rules.choices("passorzero").unwrap();
        let ids: Vec<&str> = choices.iter().map(|c| c.idnumber.as_str()).collect();
        assert_eq!(ids, vec!["norule", "achievement", "passorzero"]);
        assert!(!choices[0].selected);
        assert!(choices[2].selected);

        let choices = rules.choices("").unwrap();
        assert!(choices[0].selected);
    }
}
