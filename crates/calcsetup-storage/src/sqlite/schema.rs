//! DDL statements and migrations for the SQLite schema.
//!
//! The gradebook tables mirror the Moodle columns the tool reads and writes.
//! Rule lists (`actions`, `fields`, `cols`) are JSON text. Booleans are
//! stored as INTEGER (0/1).

/// Current schema version. Bumped whenever DDL or migrations change.
pub const CURRENT_SCHEMA_VERSION: i32 = 1;

/// Core DDL statements executed during `init_schema`.
pub const SCHEMA_STATEMENTS: &[&str] = &[
    // -- Courses -------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS course (
        id        INTEGER PRIMARY KEY,
        fullname  TEXT NOT NULL DEFAULT '',
        shortname TEXT NOT NULL DEFAULT ''
    )
    "#,
    // -- Grade categories ----------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS grade_categories (
        id       INTEGER PRIMARY KEY,
        courseid INTEGER NOT NULL,
        parent   INTEGER,
        depth    INTEGER NOT NULL DEFAULT 1,
        path     TEXT NOT NULL DEFAULT '',
        fullname TEXT NOT NULL DEFAULT '',
        FOREIGN KEY (courseid) REFERENCES course(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_grade_categories_course ON grade_categories(courseid)",
    "CREATE INDEX IF NOT EXISTS idx_grade_categories_parent ON grade_categories(parent)",
    // -- Grade items ---------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS grade_items (
        id               INTEGER PRIMARY KEY,
        courseid         INTEGER NOT NULL,
        categoryid       INTEGER,
        itemname         TEXT NOT NULL DEFAULT '',
        itemtype         TEXT NOT NULL DEFAULT 'mod',
        itemmodule       TEXT NOT NULL DEFAULT '',
        iteminstance     INTEGER,
        itemnumber       INTEGER,
        iteminfo         TEXT NOT NULL DEFAULT '',
        idnumber         TEXT NOT NULL DEFAULT '',
        calculation      TEXT NOT NULL DEFAULT '',
        gradetype        INTEGER NOT NULL DEFAULT 1,
        grademax         REAL NOT NULL DEFAULT 100,
        grademin         REAL NOT NULL DEFAULT 0,
        scaleid          INTEGER,
        outcomeid        INTEGER,
        gradepass        REAL NOT NULL DEFAULT 0,
        multfactor       REAL NOT NULL DEFAULT 1,
        plusfactor       REAL NOT NULL DEFAULT 0,
        aggregationcoef  REAL NOT NULL DEFAULT 0,
        aggregationcoef2 REAL NOT NULL DEFAULT 0,
        sortorder        INTEGER NOT NULL DEFAULT 0,
        display          INTEGER NOT NULL DEFAULT 0,
        decimals         INTEGER,
        hidden           INTEGER NOT NULL DEFAULT 0,
        locked           INTEGER NOT NULL DEFAULT 0,
        locktime         INTEGER NOT NULL DEFAULT 0,
        needsupdate      INTEGER NOT NULL DEFAULT 0,
        weightoverride   INTEGER NOT NULL DEFAULT 0,
        timecreated      INTEGER NOT NULL DEFAULT 0,
        timemodified     INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY (courseid) REFERENCES course(id) ON DELETE CASCADE
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_grade_items_course ON grade_items(courseid)",
    "CREATE INDEX IF NOT EXISTS idx_grade_items_category ON grade_items(categoryid)",
    "CREATE INDEX IF NOT EXISTS idx_grade_items_idnumber ON grade_items(courseid, idnumber)",
    // -- Rules ---------------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS calcsetup_rules (
        id       INTEGER PRIMARY KEY AUTOINCREMENT,
        name     TEXT NOT NULL DEFAULT '',
        idnumber TEXT NOT NULL,
        descr    TEXT NOT NULL DEFAULT '',
        visible  INTEGER NOT NULL DEFAULT 1,
        calc     TEXT NOT NULL DEFAULT '',
        actions  TEXT NOT NULL DEFAULT '[]',
        fields   TEXT NOT NULL DEFAULT '[]',
        cols     TEXT NOT NULL DEFAULT '[]'
    )
    "#,
    "CREATE UNIQUE INDEX IF NOT EXISTS idx_calcsetup_rules_idnumber ON calcsetup_rules(idnumber)",
    // -- Config table --------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS config (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
    // -- Metadata table ------------------------------------------------------
    r#"
    CREATE TABLE IF NOT EXISTS metadata (
        key   TEXT PRIMARY KEY,
        value TEXT NOT NULL
    )
    "#,
];
