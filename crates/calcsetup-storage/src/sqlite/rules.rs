//! Rule CRUD operations for [`SqliteStore`].

use rusqlite::{Connection, Row, params};
use tracing::{debug, info};

use calcsetup_core::rule::RuleRecord;

use crate::error::{Result, StorageError, is_unique_violation, not_found_or};
use crate::sqlite::store::SqliteStore;

const RULE_COLUMNS: &str = "id, name, idnumber, descr, visible, calc, actions, fields, cols";

fn scan_rule(row: &Row<'_>) -> rusqlite::Result<RuleRecord> {
    Ok(RuleRecord {
        id: row.get("id")?,
        name: row.get("name")?,
        idnumber: row.get("idnumber")?,
        descr: row.get("descr")?,
        visible: row.get::<_, i64>("visible")? != 0,
        calc: row.get("calc")?,
        actions: row.get("actions")?,
        fields: row.get("fields")?,
        cols: row.get("cols")?,
    })
}

fn check_idnumber(rule: &RuleRecord) -> Result<()> {
    if rule.idnumber.trim().is_empty() {
        return Err(StorageError::validation("rule idnumber is required"));
    }
    if rule.idnumber == calcsetup_core::rule::NO_RULE {
        return Err(StorageError::validation(format!(
            "'{}' is reserved",
            calcsetup_core::rule::NO_RULE
        )));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Connection-level helpers
// ---------------------------------------------------------------------------

/// Inserts a rule unless one with the same idnumber exists. Returns whether
/// a row was inserted.
pub(crate) fn insert_rule_if_absent_on_conn(conn: &Connection, rule: &RuleRecord) -> Result<bool> {
    let inserted = conn.execute(
        "INSERT OR IGNORE INTO calcsetup_rules
             (name, idnumber, descr, visible, calc, actions, fields, cols)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            rule.name,
            rule.idnumber,
            rule.descr,
            rule.visible,
            rule.calc,
            rule.actions,
            rule.fields,
            rule.cols
        ],
    )?;
    Ok(inserted > 0)
}

pub(crate) fn get_rule_by_idnumber_on_conn(conn: &Connection, idnumber: &str) -> Result<RuleRecord> {
    let sql = format!("SELECT {RULE_COLUMNS} FROM calcsetup_rules WHERE idnumber = ?1");
    conn.query_row(&sql, params![idnumber], scan_rule)
        .map_err(not_found_or("rule", idnumber))
}

// ---------------------------------------------------------------------------
// SqliteStore methods
// ---------------------------------------------------------------------------

impl SqliteStore {
    pub fn get_rule_by_idnumber_impl(&self, idnumber: &str) -> Result<RuleRecord> {
        let conn = self.lock_conn()?;
        get_rule_by_idnumber_on_conn(&conn, idnumber)
    }

    pub fn get_rule_impl(&self, id: i64) -> Result<RuleRecord> {
        let conn = self.lock_conn()?;
        let sql = format!("SELECT {RULE_COLUMNS} FROM calcsetup_rules WHERE id = ?1");
        conn.query_row(&sql, params![id], scan_rule)
            .map_err(not_found_or("rule", id))
    }

    pub fn list_rules_impl(&self, include_hidden: bool) -> Result<Vec<RuleRecord>> {
        let conn = self.lock_conn()?;
        let filter = if include_hidden { "" } else { "WHERE visible = 1" };
        let sql = format!("SELECT {RULE_COLUMNS} FROM calcsetup_rules {filter} ORDER BY name, id");
        let mut stmt = conn.prepare(&sql)?;
        let rules = stmt
            .query_map([], scan_rule)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rules)
    }

    /// Upserts by idnumber. A rule carrying an `id` that belongs to another
    /// idnumber renames that rule, which fails if the new idnumber is taken.
    pub fn save_rule_impl(&self, rule: &RuleRecord) -> Result<i64> {
        check_idnumber(rule)?;
        let conn = self.lock_conn()?;

        let existing_id = if rule.id > 0 {
            Some(rule.id)
        } else {
            match get_rule_by_idnumber_on_conn(&conn, &rule.idnumber) {
                Ok(found) => Some(found.id),
                Err(e) if e.is_not_found() => None,
                Err(e) => return Err(e),
            }
        };

        let result = match existing_id {
            Some(id) => conn
                .execute(
                    "UPDATE calcsetup_rules
                        SET name = ?1, idnumber = ?2, descr = ?3, visible = ?4,
                            calc = ?5, actions = ?6, fields = ?7, cols = ?8
                      WHERE id = ?9",
                    params![
                        rule.name,
                        rule.idnumber,
                        rule.descr,
                        rule.visible,
                        rule.calc,
                        rule.actions,
                        rule.fields,
                        rule.cols,
                        id
                    ],
                )
                .map(|changed| (id, changed)),
            None => conn
                .execute(
                    "INSERT INTO calcsetup_rules
                         (name, idnumber, descr, visible, calc, actions, fields, cols)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        rule.name,
                        rule.idnumber,
                        rule.descr,
                        rule.visible,
                        rule.calc,
                        rule.actions,
                        rule.fields,
                        rule.cols
                    ],
                )
                .map(|changed| (conn.last_insert_rowid(), changed)),
        };

        match result {
            Ok((id, 0)) => Err(StorageError::not_found("rule", id)),
            Ok((id, _)) => {
                info!(id, idnumber = %rule.idnumber, "rule saved");
                Ok(id)
            }
            Err(e) if is_unique_violation(&e) => {
                Err(StorageError::duplicate("rule", rule.idnumber.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn delete_rule_impl(&self, id: i64) -> Result<()> {
        let conn = self.lock_conn()?;
        let changed = conn.execute("DELETE FROM calcsetup_rules WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StorageError::not_found("rule", id));
        }
        info!(id, "rule deleted");
        Ok(())
    }

    pub fn set_rule_visible_impl(&self, id: i64, visible: bool) -> Result<()> {
        let conn = self.lock_conn()?;
        let changed = conn.execute(
            "UPDATE calcsetup_rules SET visible = ?1 WHERE id = ?2",
            params![visible, id],
        )?;
        if changed == 0 {
            return Err(StorageError::not_found("rule", id));
        }
        debug!(id, visible, "rule visibility changed");
        Ok(())
    }
}
