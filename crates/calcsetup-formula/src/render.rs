//! Rendering a rule's `calc` template against a category.

use serde_json::{Map, Value};

use calcsetup_core::compare::value_to_string;

use crate::template::Template;
use crate::types::TemplateError;

/// Property that partitions items into template groups.
pub const GROUP_PROPERTY: &str = "itemgroup";

const GROUP_PREFIX: &str = "group-";

/// Builds the template context for an anchor and its children.
///
/// The context holds the anchor's own properties, `items` (children in
/// order, the final one flagged `last`), `category` (the anchor plus
/// `item_count`) and one `group-<name>` list per distinct `itemgroup`.
/// Group lists are independent copies with their own `last` flag.
pub fn build_context(anchor: &Map<String, Value>, items: &[Map<String, Value>]) -> Value {
    let mut context = anchor.clone();

    let mut category = anchor.clone();
    category.insert("item_count".into(), Value::from(items.len()));

    context.insert("items".into(), mark_last(items.to_vec()));
    context.insert("category".into(), Value::Object(category));

    for (name, members) in group_items(items) {
        context.insert(group_key(&name), mark_last(members));
    }

    Value::Object(context)
}

/// Renders `template` for the anchor and children. Whitespace is preserved.
pub fn render(
    template: &str,
    anchor: &Map<String, Value>,
    items: &[Map<String, Value>],
) -> Result<String, TemplateError> {
    let template = Template::parse(template)?;
    Ok(template.render(&build_context(anchor, items)))
}

/// Removes every whitespace character.
pub fn strip_whitespace(s: &str) -> String {
    s.chars().filter(|c| !c.is_whitespace()).collect()
}

fn mark_last(mut items: Vec<Map<String, Value>>) -> Value {
    let count = items.len();
    for (i, item) in items.iter_mut().enumerate() {
        item.insert("last".into(), Value::Bool(i + 1 == count));
    }
    Value::Array(items.into_iter().map(Value::Object).collect())
}

/// Partitions items by group name, in order of first appearance.
fn group_items(items: &[Map<String, Value>]) -> Vec<(String, Vec<Map<String, Value>>)> {
    let mut groups: Vec<(String, Vec<Map<String, Value>>)> = Vec::new();
    for item in items {
        let name = item.get(GROUP_PROPERTY).map(value_to_string).unwrap_or_default();
        let name = name.trim();
        if name.is_empty() {
            continue;
        }
        match groups.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, members)) => members.push(item.clone()),
            None => groups.push((name.to_string(), vec![item.clone()])),
        }
    }
    groups
}

fn group_key(name: &str) -> String {
    if name.starts_with(GROUP_PREFIX) {
        name.to_string()
    } else {
        format!("{GROUP_PREFIX}{name}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn obj(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("not an object: {other}"),
        }
    }

    fn anchor() -> Map<String, Value> {
        obj(json!({"id": 1, "itemname": "Unit 1", "grademax": 100.0}))
    }

    #[test]
    fn minimum_of_items() {
        let items = vec![
            obj(json!({"idnumber": "a1"})),
            obj(json!({"idnumber": "a2"})),
            obj(json!({"idnumber": "a3"})),
        ];
        let out = render(
            "=MIN({{#items}}[[{{idnumber}}]]{{^last}},{{/last}}{{/items}})",
            &anchor(),
            &items,
        )
        .unwrap();
        assert_eq!(out, "=MIN([[a1]],[[a2]],[[a3]])");
    }

    #[test]
    fn groups_mark_their_own_last() {
        let items = vec![
            obj(json!({"idnumber": "a1", "itemgroup": "x"})),
            obj(json!({"idnumber": "b1", "itemgroup": "y"})),
            obj(json!({"idnumber": "a2", "itemgroup": "x"})),
            obj(json!({"idnumber": "c1", "itemgroup": ""})),
            obj(json!({"idnumber": "d1"})),
        ];
        let out = render(
            "{{#group-x}}[[{{idnumber}}]]{{^last}}+{{/last}}{{/group-x}}",
            &anchor(),
            &items,
        )
        .unwrap();
        assert_eq!(out, "[[a1]]+[[a2]]");

        let context = build_context(&anchor(), &items);
        assert_eq!(context["items"][2]["last"], json!(false));
        assert_eq!(context["items"][4]["last"], json!(true));
        assert_eq!(context["group-y"][0]["last"], json!(true));
        assert!(context.get("group-").is_none());
    }

    #[test]
    fn dotted_group_names_are_reachable() {
        let items = vec![
            obj(json!({"idnumber": "a1", "itemgroup": "unit.1"})),
            obj(json!({"idnumber": "a2", "itemgroup": "unit.1"})),
        ];
        let out = render(
            "{{#group-unit.1}}[[{{idnumber}}]]{{^last}},{{/last}}{{/group-unit.1}}",
            &anchor(),
            &items,
        )
        .unwrap();
        assert_eq!(out, "[[a1]],[[a2]]");
    }

    #[test]
    fn group_prefix_not_doubled() {
        let items = vec![obj(json!({"idnumber": "a1", "itemgroup": "group-core"}))];
        let context = build_context(&anchor(), &items);
        assert!(context.get("group-core").is_some());
        assert!(context.get("group-group-core").is_none());
    }

    #[test]
    fn category_exposes_anchor_and_count() {
        let items = vec![obj(json!({"idnumber": "a1"})), obj(json!({"idnumber": "a2"}))];
        let out = render(
            "{{category.itemname}}:{{category.item_count}}:{{grademax}}",
            &anchor(),
            &items,
        )
        .unwrap();
        assert_eq!(out, "Unit 1:2:100");
    }

    #[test]
    fn no_items_renders_empty_loop() {
        let out = render("=SUM({{#items}}[[{{idnumber}}]]{{/items}})", &anchor(), &[]).unwrap();
        assert_eq!(out, "=SUM()");
    }

    #[test]
    fn pass_or_zero_formula() {
        let rule = calcsetup_core::rule::default_rules()
            .into_iter()
            .find(|r| r.idnumber == "passorzero")
            .unwrap();
        let items = vec![
            obj(json!({"idnumber": "a1", "gradepass": 50.0, "grademax": 100.0})),
            obj(json!({"idnumber": "a2", "gradepass": 5.0, "grademax": 10.0})),
        ];
        let preview = render(&rule.calc, &anchor(), &items).unwrap();
        assert_eq!(
            preview,
            "=IF(\n  OR(\n    [[a1]]<50,\n    [[a2]]<5\n  ),\n  0,\n  100*SUM(\n    [[a1]]/100+\n    [[a2]]/10\n  )/2\n)"
        );
        insta::assert_snapshot!(
            strip_whitespace(&preview),
            @"=IF(OR([[a1]]<50,[[a2]]<5),0,100*SUM([[a1]]/100+[[a2]]/10)/2)"
        );
    }

    #[test]
    fn strip_whitespace_removes_everything() {
        assert_eq!(strip_whitespace(" = MIN ( [[a]] ,\n\t[[b]] ) "), "=MIN([[a]],[[b]])");
    }
}
