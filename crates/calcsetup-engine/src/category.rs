//! A grade category and its gradable children, loaded as one batch.

use serde_json::{Map, Value};
use tracing::debug;

use calcsetup_core::enums::ItemType;
use calcsetup_core::item::Item;
use calcsetup_storage::{ItemRepository, StorageError};

use crate::error::{EngineError, Result};
use crate::resolve;

/// The anchor item of a category followed by its children in sortorder.
#[derive(Debug, Clone)]
pub struct GradeCategory {
    course_id: i64,
    category_id: i64,
    /// Never empty; index 0 is the anchor.
    items: Vec<Item>,
}

impl GradeCategory {
    /// Loads a category. `None` selects the course's root category.
    ///
    /// Only items with `grademax > 0` and `gradetype > 0` are included.
    pub fn load(
        repo: &dyn ItemRepository,
        course_id: i64,
        category_id: Option<i64>,
    ) -> Result<Self> {
        let not_found = |category_id| EngineError::CategoryNotFound {
            course_id,
            category_id,
        };

        let category_id = match category_id {
            Some(id) => id,
            None => {
                let course_item = repo.get_course_item(course_id).map_err(|e| match e {
                    StorageError::NotFound { .. } => not_found(0),
                    other => other.into(),
                })?;
                course_item.iteminstance.ok_or_else(|| not_found(0))?
            }
        };

        let mut items = repo.get_category_items(course_id, category_id)?;
        if items.is_empty() {
            return Err(not_found(category_id));
        }
        items.sort_by_key(|item| item.sortorder);

        for item in &mut items {
            if item.itemtype == ItemType::Course {
                item.fullname = item.coursename.clone();
            }
            item.merge_iteminfo();
        }

        let (grademax, coef) = items[1..].iter().fold((0.0, 0.0), |(max, coef), item| {
            (max + item.grademax, coef + item.aggregationcoef)
        });
        items[0].grademax_total = Some(grademax);
        items[0].aggregationcoef_total = Some(coef);

        debug!(
            course_id,
            category_id,
            children = items.len() - 1,
            "category loaded"
        );
        Ok(Self {
            course_id,
            category_id,
            items,
        })
    }

    pub fn course_id(&self) -> i64 {
        self.course_id
    }

    pub fn category_id(&self) -> i64 {
        self.category_id
    }

    /// The item representing the category itself.
    pub fn anchor(&self) -> &Item {
        &self.items[0]
    }

    pub fn anchor_mut(&mut self) -> &mut Item {
        &mut self.items[0]
    }

    /// The children, excluding the anchor.
    pub fn items(&self) -> &[Item] {
        &self.items[1..]
    }

    pub fn items_mut(&mut self) -> &mut [Item] {
        &mut self.items[1..]
    }

    /// Anchor first, then the children.
    pub fn all_items(&self) -> &[Item] {
        &self.items
    }

    pub fn all_items_mut(&mut self) -> &mut [Item] {
        &mut self.items
    }

    /// The idnumber of the rule recorded on the anchor, or `""`.
    pub fn stored_rule(&self) -> String {
        resolve::stored_rule(self.anchor())
    }

    /// Template data for the anchor and for each child.
    pub fn template_data(&self) -> (Map<String, Value>, Vec<Map<String, Value>>) {
        let anchor = self.anchor().to_template_data();
        let items = self.items().iter().map(Item::to_template_data).collect();
        (anchor, items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, COURSE, LABS, ROOT};
    use calcsetup_core::item::ItemBuilder;
    use calcsetup_storage::{Gradebook, SqliteStore};
    use pretty_assertions::assert_eq;

    fn ids(items: &[Item]) -> Vec<i64> {
        items.iter().map(|i| i.id).collect()
    }

    #[test]
    fn root_category_by_default() {
        let store = fixtures::store();
        let category = GradeCategory::load(&store, COURSE, None).unwrap();
        assert_eq!(category.category_id(), ROOT);
        assert_eq!(category.anchor().id, 1);
        assert_eq!(ids(category.items()), vec![2, 3, 4]);
        assert_eq!(category.anchor().fullname, "Biology 101");
        assert_eq!(category.anchor().display_name(), "Biology 101");
    }

    #[test]
    fn sub_category_anchor_is_its_category_item() {
        let store = fixtures::store();
        let category = GradeCategory::load(&store, COURSE, Some(LABS)).unwrap();
        assert_eq!(category.anchor().id, 4);
        assert_eq!(category.anchor().fullname, "Labs");
        assert_eq!(ids(category.items()), vec![5]);
    }

    #[test]
    fn grademax_total_sums_children() {
        let store = fixtures::store();
        let category = GradeCategory::load(&store, COURSE, None).unwrap();
        assert_eq!(category.anchor().grademax_total, Some(160.0));
        assert_eq!(category.anchor().aggregationcoef_total, Some(0.0));
        assert_eq!(category.items()[0].grademax_total, None);
    }

    #[test]
    fn grademax_total_zero_without_children() {
        let store = SqliteStore::open_in_memory().unwrap();
        let gradebook = Gradebook::new()
            .course(7, "Empty")
            .category(70, 7, None, "Empty")
            .item(
                ItemBuilder::new(1, "")
                    .courseid(7)
                    .itemtype(ItemType::Course)
                    .iteminstance(70)
                    .build(),
            );
        store.import_gradebook(&gradebook).unwrap();

        let category = GradeCategory::load(&store, 7, None).unwrap();
        assert!(category.items().is_empty());
        assert_eq!(category.anchor().grademax_total, Some(0.0));
    }

    #[test]
    fn children_sorted_by_sortorder() {
        let store = SqliteStore::open_in_memory().unwrap();
        let gradebook = Gradebook::new()
            .course(7, "C")
            .category(70, 7, None, "C")
            .item(
                ItemBuilder::new(1, "")
                    .courseid(7)
                    .itemtype(ItemType::Course)
                    .iteminstance(70)
                    .sortorder(1)
                    .build(),
            )
            .item(ItemBuilder::new(2, "Late").courseid(7).categoryid(70).sortorder(9).build())
            .item(ItemBuilder::new(3, "Early").courseid(7).categoryid(70).sortorder(2).build());
        store.import_gradebook(&gradebook).unwrap();

        let category = GradeCategory::load(&store, 7, None).unwrap();
        assert_eq!(ids(category.items()), vec![3, 2]);
    }

    #[test]
    fn custom_properties_merged() {
        let store = SqliteStore::open_in_memory().unwrap();
        let gradebook = Gradebook::new()
            .course(7, "C")
            .category(70, 7, None, "C")
            .item(
                ItemBuilder::new(1, "")
                    .courseid(7)
                    .itemtype(ItemType::Course)
                    .iteminstance(70)
                    .iteminfo(r#"{{gradereportcalcsetup}}{"rule":"passorzero"}{{/gradereportcalcsetup}}"#)
                    .build(),
            )
            .item(
                ItemBuilder::new(2, "Lab")
                    .courseid(7)
                    .categoryid(70)
                    .iteminfo(r#"{{gradereportcalcsetup}}{"itemgroup":"labs","grademax":1}{{/gradereportcalcsetup}}"#)
                    .build(),
            );
        store.import_gradebook(&gradebook).unwrap();

        let category = GradeCategory::load(&store, 7, None).unwrap();
        assert_eq!(category.stored_rule(), "passorzero");
        let lab = &category.items()[0];
        assert_eq!(lab.property("itemgroup"), Some(Value::from("labs")));
        assert_eq!(lab.grademax, 100.0);
    }

    #[test]
    fn unknown_category_is_error() {
        let store = fixtures::store();
        assert!(matches!(
            GradeCategory::load(&store, COURSE, Some(99)),
            Err(EngineError::CategoryNotFound {
                course_id: COURSE,
                category_id: 99
            })
        ));
        assert!(matches!(
            GradeCategory::load(&store, 42, None),
            Err(EngineError::CategoryNotFound { course_id: 42, .. })
        ));
    }
}
