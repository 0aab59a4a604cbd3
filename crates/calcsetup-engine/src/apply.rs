//! Applying a rule to a category.

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use calcsetup_core::compare::loose_eq;
use calcsetup_core::fields::CoreFields;
use calcsetup_core::rule::{Action, Rule, normalize_idnumber};
use calcsetup_core::validation::check_write;
use calcsetup_storage::{ItemRepository, RuleRepository};

use crate::category::GradeCategory;
use crate::error::Result;
use crate::notice::Notice;
use crate::resolve::{RULE_PROPERTY, RuleStore, rule_value};

/// What [`RuleEngine::apply`] did.
#[derive(Debug, Clone, Serialize)]
pub struct AppliedResult {
    /// Whether anything was written, including the rule pointer.
    pub changed: bool,
    /// Number of item properties changed by actions.
    pub count_changed: usize,
    pub rule_updated: bool,
    pub rule: Rule,
    pub notices: Vec<Notice>,
}

/// Resolves and applies rules for one request.
pub struct RuleEngine<'r> {
    items: &'r dyn ItemRepository,
    rules: RuleStore<'r>,
    fields: CoreFields,
}

impl<'r> RuleEngine<'r> {
    pub fn new(
        items: &'r dyn ItemRepository,
        rules: &'r dyn RuleRepository,
        fields: CoreFields,
    ) -> Self {
        Self {
            items,
            rules: RuleStore::new(rules),
            fields,
        }
    }

    pub fn fields(&self) -> &CoreFields {
        &self.fields
    }

    pub fn rules(&mut self) -> &mut RuleStore<'r> {
        &mut self.rules
    }

    /// The rule in effect for `category`, or the explicitly requested one.
    pub fn resolve(&mut self, category: &GradeCategory, explicit: Option<&str>) -> Result<Rule> {
        self.rules.resolve(explicit, category.anchor())
    }

    /// Attaches `requested` to the category and runs its actions over the
    /// children.
    ///
    /// Actions run in declared order and each sees the writes of the ones
    /// before it. A rejected action is reported as a warning and the rest
    /// still run. The anchor itself is never a target.
    pub fn apply(&mut self, category: &mut GradeCategory, requested: &str) -> Result<AppliedResult> {
        let requested = normalize_idnumber(requested).to_owned();
        let rule = self.rules.get(&requested)?;
        let mut notices = Vec::new();

        let rule_updated = requested != normalize_idnumber(&category.stored_rule());
        if rule_updated {
            let anchor = category.anchor_mut();
            anchor.set_iteminfo_property(RULE_PROPERTY, rule_value(&requested))?;
            anchor.dirty = true;
            self.items.update_item(anchor)?;
            info!(item_id = anchor.id, rule = %requested, "rule attached to category");
            notices.push(Notice::success("Rule updated"));
        }

        let mut counts = vec![0usize; category.items().len()];
        for action in &rule.actions {
            if let Err(violation) = check_write(&self.fields, &action.set, &action.to, None) {
                warn!(set = %action.set, %violation, "action skipped");
                notices.push(Notice::warning(violation.to_string()));
                continue;
            }
            self.run_action(action, category, &mut counts, &mut notices)?;
        }

        let count_changed: usize = counts.iter().sum();
        for (item, count) in category.items().iter().zip(&counts) {
            if *count > 0 {
                notices.push(Notice::properties_changed(*count, item.display_name()));
            }
        }
        if count_changed == 0 && !rule_updated {
            notices.push(Notice::info("No rule changes made."));
        }

        Ok(AppliedResult {
            changed: rule_updated || count_changed > 0,
            count_changed,
            rule_updated,
            rule,
            notices,
        })
    }

    fn run_action(
        &self,
        action: &Action,
        category: &mut GradeCategory,
        counts: &mut [usize],
        notices: &mut Vec<Notice>,
    ) -> Result<()> {
        debug!(set = %action.set, when = %action.when, "applying action");
        for (item, count) in category.items_mut().iter_mut().zip(counts.iter_mut()) {
            if !action.matches_all() {
                let current = item.property(&action.when).unwrap_or(Value::Null);
                if !loose_eq(&current, &action.val) {
                    continue;
                }
            }
            let current = item.property(&action.set).unwrap_or(Value::Null);
            if loose_eq(&current, &action.to) {
                continue;
            }

            if let Err(err) = item.set_property(&action.set, action.to.clone()) {
                warn!(item_id = item.id, set = %action.set, %err, "action rejected for item");
                notices.push(Notice::warning(err.to_string()));
                continue;
            }
            debug!(item_id = item.id, set = %action.set, "property changed");
            item.dirty = true;
            self.items.update_item(item)?;
            *count += 1;
        }
        Ok(())
    }
}
