//! Grade item operations for [`SqliteStore`].

use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, Row, params, params_from_iter};
use serde_json::Value;
use tracing::{debug, info};

use calcsetup_core::enums::ItemType;
use calcsetup_core::item::{Item, NATIVE_PROPERTIES};

use crate::error::{Result, StorageError, not_found_or};
use crate::sqlite::store::SqliteStore;

// ---------------------------------------------------------------------------
// Query building
// ---------------------------------------------------------------------------

/// SELECT clause with every native column plus the joined context.
///
/// Only course and category items represent a category, so the `gc` join is
/// restricted to them; for activities `iteminstance` is a module instance id.
fn item_select() -> String {
    let native = NATIVE_PROPERTIES
        .iter()
        .map(|c| format!("gi.{c} AS {c}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "SELECT {native},
                gc.depth AS depth, gc2.depth AS itemdepth, gc.id AS thiscatid,
                gc.fullname AS fullname, c.fullname AS coursename
         FROM grade_items gi
         LEFT JOIN grade_categories gc
                ON gc.id = gi.iteminstance AND gi.itemtype IN ('course', 'category')
         LEFT JOIN grade_categories gc2 ON gc2.id = gi.categoryid
         LEFT JOIN course c ON c.id = gi.courseid"
    )
}

fn to_sql_value(value: Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(b)),
        Value::Number(n) => match n.as_i64() {
            Some(i) => SqlValue::Integer(i),
            None => SqlValue::Real(n.as_f64().unwrap_or_default()),
        },
        Value::String(s) => SqlValue::Text(s),
        other => SqlValue::Text(other.to_string()),
    }
}

fn native_value(item: &Item, column: &str) -> SqlValue {
    to_sql_value(item.property(column).unwrap_or(Value::Null))
}

// ---------------------------------------------------------------------------
// Row scanning
// ---------------------------------------------------------------------------

/// Deserialises a row produced by [`item_select`] into an [`Item`].
pub(crate) fn scan_item(row: &Row<'_>) -> rusqlite::Result<Item> {
    let itemtype: String = row.get("itemtype")?;
    Ok(Item {
        id: row.get("id")?,
        courseid: row.get("courseid")?,
        categoryid: row.get("categoryid")?,
        itemname: row.get("itemname")?,
        itemtype: ItemType::from(itemtype),
        itemmodule: row.get("itemmodule")?,
        iteminstance: row.get("iteminstance")?,
        itemnumber: row.get("itemnumber")?,
        idnumber: row.get("idnumber")?,
        iteminfo: row.get("iteminfo")?,
        calculation: row.get("calculation")?,
        gradetype: row.get("gradetype")?,
        grademax: row.get("grademax")?,
        grademin: row.get("grademin")?,
        scaleid: row.get("scaleid")?,
        outcomeid: row.get("outcomeid")?,
        gradepass: row.get("gradepass")?,
        multfactor: row.get("multfactor")?,
        plusfactor: row.get("plusfactor")?,
        aggregationcoef: row.get("aggregationcoef")?,
        aggregationcoef2: row.get("aggregationcoef2")?,
        sortorder: row.get("sortorder")?,
        display: row.get("display")?,
        decimals: row.get("decimals")?,
        hidden: row.get("hidden")?,
        locked: row.get("locked")?,
        locktime: row.get("locktime")?,
        needsupdate: row.get("needsupdate")?,
        weightoverride: row.get("weightoverride")?,
        timecreated: row.get("timecreated")?,
        timemodified: row.get("timemodified")?,
        depth: row.get("depth")?,
        itemdepth: row.get("itemdepth")?,
        thiscatid: row.get("thiscatid")?,
        fullname: row.get::<_, Option<String>>("fullname")?.unwrap_or_default(),
        coursename: row.get::<_, Option<String>>("coursename")?.unwrap_or_default(),
        ..Item::default()
    })
}

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

pub(crate) fn get_item_on_conn(conn: &Connection, id: i64) -> Result<Item> {
    let sql = format!("{} WHERE gi.id = ?1", item_select());
    conn.query_row(&sql, params![id], scan_item)
        .map_err(not_found_or("grade item", id))
}

pub(crate) fn insert_item_on_conn(conn: &Connection, item: &Item) -> Result<i64> {
    let columns: Vec<&str> = NATIVE_PROPERTIES
        .iter()
        .copied()
        .filter(|c| *c != "id" || item.id > 0)
        .collect();
    let placeholders = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO grade_items ({}) VALUES ({placeholders})",
        columns.join(", ")
    );
    let values = columns.iter().map(|c| native_value(item, c));
    conn.execute(&sql, params_from_iter(values))?;
    Ok(conn.last_insert_rowid())
}

pub(crate) fn update_item_on_conn(conn: &Connection, item: &Item, now: i64) -> Result<()> {
    let columns: Vec<&str> = NATIVE_PROPERTIES
        .iter()
        .copied()
        .filter(|c| *c != "id")
        .collect();
    let assignments = columns
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{c} = ?{}", i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE grade_items SET {assignments} WHERE id = ?{}",
        columns.len() + 1
    );

    let mut values: Vec<SqlValue> = columns
        .iter()
        .map(|c| {
            if *c == "timemodified" {
                SqlValue::Integer(now)
            } else {
                native_value(item, c)
            }
        })
        .collect();
    values.push(SqlValue::Integer(item.id));

    let changed = conn.execute(&sql, params_from_iter(values))?;
    if changed == 0 {
        return Err(StorageError::not_found("grade item", item.id));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    /// Fetches a single grade item with its joined context.
    pub fn get_item_impl(&self, id: i64) -> Result<Item> {
        let conn = self.lock_conn()?;
        get_item_on_conn(&conn, id)
    }

    /// Fetches the course total item.
    pub fn get_course_item_impl(&self, course_id: i64) -> Result<Item> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "{} WHERE gi.courseid = ?1 AND gi.itemtype = 'course'",
            item_select()
        );
        conn.query_row(&sql, params![course_id], scan_item)
            .map_err(not_found_or("course item", course_id))
    }

    /// Gradable items in or representing a category.
    pub fn get_category_items_impl(&self, course_id: i64, category_id: i64) -> Result<Vec<Item>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "{} WHERE gi.courseid = ?1
                 AND gi.grademax > 0
                 AND gi.gradetype > 0
                 AND (gc.parent = ?2 OR gi.categoryid = ?2 OR gc.id = ?2)
               ORDER BY gi.sortorder, gi.id",
            item_select()
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![course_id, category_id], scan_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        debug!(course_id, category_id, count = items.len(), "loaded category items");
        Ok(items)
    }

    /// Every grade item of a course.
    pub fn get_course_items_impl(&self, course_id: i64) -> Result<Vec<Item>> {
        let conn = self.lock_conn()?;
        let sql = format!(
            "{} WHERE gi.courseid = ?1 ORDER BY gi.sortorder, gi.id",
            item_select()
        );
        let mut stmt = conn.prepare(&sql)?;
        let items = stmt
            .query_map(params![course_id], scan_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(items)
    }

    /// Persists every native column of `item`.
    pub fn update_item_impl(&self, item: &Item) -> Result<()> {
        let conn = self.lock_conn()?;
        update_item_on_conn(&conn, item, chrono::Utc::now().timestamp())?;
        info!(item_id = item.id, itemname = %item.itemname, "grade item updated");
        Ok(())
    }

    /// Inserts a grade item. An `id` of 0 lets SQLite assign one.
    pub fn insert_item(&self, item: &Item) -> Result<i64> {
        let conn = self.lock_conn()?;
        insert_item_on_conn(&conn, item)
    }
}
