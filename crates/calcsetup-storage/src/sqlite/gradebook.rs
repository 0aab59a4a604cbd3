//! Bulk import of a course gradebook (courses, categories and items).
//!
//! The reference store has no gradebook of its own; it is filled from a JSON
//! export or from fixtures built with [`Gradebook`]'s builder methods.

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::info;

use calcsetup_core::item::Item;

use crate::error::{Result, StorageError};
use crate::sqlite::items::insert_item_on_conn;
use crate::sqlite::store::SqliteStore;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CourseRecord {
    pub id: i64,
    #[serde(default)]
    pub fullname: String,
    #[serde(default)]
    pub shortname: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: i64,
    pub courseid: i64,
    #[serde(default)]
    pub parent: Option<i64>,
    /// Root categories have depth 1. Derived from `parent` when absent.
    #[serde(default)]
    pub depth: Option<i64>,
    #[serde(default)]
    pub fullname: String,
}

/// A gradebook export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Gradebook {
    #[serde(default)]
    pub courses: Vec<CourseRecord>,
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
    #[serde(default)]
    pub items: Vec<Item>,
}

impl Gradebook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn course(mut self, id: i64, fullname: impl Into<String>) -> Self {
        self.courses.push(CourseRecord {
            id,
            fullname: fullname.into(),
            shortname: String::new(),
        });
        self
    }

    pub fn category(
        mut self,
        id: i64,
        courseid: i64,
        parent: Option<i64>,
        fullname: impl Into<String>,
    ) -> Self {
        self.categories.push(CategoryRecord {
            id,
            courseid,
            parent,
            depth: None,
            fullname: fullname.into(),
        });
        self
    }

    pub fn item(mut self, item: Item) -> Self {
        self.items.push(item);
        self
    }
}

/// Resolves a category's depth from its parent chain.
fn category_depth(categories: &[CategoryRecord], category: &CategoryRecord) -> Result<i64> {
    let mut depth = 1;
    let mut parent = category.parent;
    while let Some(parent_id) = parent {
        if depth > categories.len() as i64 {
            return Err(StorageError::validation(format!(
                "grade category {} has a cyclic parent chain",
                category.id
            )));
        }
        let record = categories
            .iter()
            .find(|c| c.id == parent_id)
            .ok_or_else(|| {
                StorageError::validation(format!(
                    "grade category {} has unknown parent {parent_id}",
                    category.id
                ))
            })?;
        depth += 1;
        parent = record.parent;
    }
    Ok(depth)
}

fn import_on_conn(conn: &Connection, gradebook: &Gradebook) -> Result<()> {
    for course in &gradebook.courses {
        conn.execute(
            "INSERT INTO course (id, fullname, shortname) VALUES (?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET fullname = excluded.fullname,
                                           shortname = excluded.shortname",
            params![course.id, course.fullname, course.shortname],
        )?;
    }
    for category in &gradebook.categories {
        let depth = match category.depth {
            Some(depth) => depth,
            None => category_depth(&gradebook.categories, category)?,
        };
        conn.execute(
            "INSERT INTO grade_categories (id, courseid, parent, depth, fullname)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET courseid = excluded.courseid,
                                           parent = excluded.parent,
                                           depth = excluded.depth,
                                           fullname = excluded.fullname",
            params![
                category.id,
                category.courseid,
                category.parent,
                depth,
                category.fullname
            ],
        )?;
    }
    for item in &gradebook.items {
        if item.id > 0 {
            conn.execute("DELETE FROM grade_items WHERE id = ?1", params![item.id])?;
        }
        insert_item_on_conn(conn, item)?;
    }
    Ok(())
}

impl SqliteStore {
    /// Imports a gradebook in one transaction. Rows with an existing id are
    /// replaced.
    pub fn import_gradebook(&self, gradebook: &Gradebook) -> Result<()> {
        let conn = self.lock_conn()?;
        let tx = conn
            .unchecked_transaction()
            .map_err(|e| StorageError::Internal(format!("failed to begin: {e}")))?;
        import_on_conn(&tx, gradebook)?;
        tx.commit()
            .map_err(|e| StorageError::Internal(format!("failed to commit: {e}")))?;

        info!(
            courses = gradebook.courses.len(),
            categories = gradebook.categories.len(),
            items = gradebook.items.len(),
            "gradebook imported"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn depth_follows_parents() {
        let gb = Gradebook::new()
            .category(1, 1, None, "root")
            .category(2, 1, Some(1), "a")
            .category(3, 1, Some(2), "b");
        assert_eq!(category_depth(&gb.categories, &gb.categories[2]).unwrap(), 3);
    }

    #[test]
    fn unknown_parent_rejected() {
        let store = SqliteStore::open_in_memory().unwrap();
        let gb = Gradebook::new()
            .course(1, "C")
            .category(2, 1, Some(99), "orphan");
        let err = store.import_gradebook(&gb).unwrap_err();
        assert!(matches!(err, StorageError::Validation { .. }));
    }

    #[test]
    fn import_from_json() {
        let gb: Gradebook = serde_json::from_str(
            r#"{
                "courses": [{"id": 1, "fullname": "Chemistry"}],
                "categories": [{"id": 5, "courseid": 1, "fullname": "Chemistry"}],
                "items": [
                    {"id": 1, "courseid": 1, "itemtype": "course", "iteminstance": 5, "sortorder": 1},
                    {"id": 2, "courseid": 1, "categoryid": 5, "itemname": "Quiz", "itemmodule": "quiz", "sortorder": 2}
                ]
            }"#,
        )
        .unwrap();
        let store = SqliteStore::open_in_memory().unwrap();
        store.import_gradebook(&gb).unwrap();
        store.import_gradebook(&gb).unwrap();

        let quiz = store.get_item_impl(2).unwrap();
        assert_eq!(quiz.itemname, "Quiz");
        assert_eq!(quiz.itemdepth, Some(1));
        assert_eq!(store.get_course_items_impl(1).unwrap().len(), 2);
    }
}
