//! Shared gradebook for engine tests.
//!
//! Course 2 has a root category 10 holding two activities and a "Labs"
//! sub-category (11) with one activity of its own.

use calcsetup_core::enums::ItemType;
use calcsetup_core::item::ItemBuilder;
use calcsetup_storage::{Gradebook, SqliteStore};

pub(crate) const COURSE: i64 = 2;
pub(crate) const ROOT: i64 = 10;
pub(crate) const LABS: i64 = 11;

pub(crate) fn gradebook() -> Gradebook {
    Gradebook::new()
        .course(COURSE, "Biology 101")
        .category(ROOT, COURSE, None, "Biology 101")
        .category(LABS, COURSE, Some(ROOT), "Labs")
        .item(
            ItemBuilder::new(1, "")
                .courseid(COURSE)
                .itemtype(ItemType::Course)
                .iteminstance(ROOT)
                .idnumber("course")
                .sortorder(1)
                .build(),
        )
        .item(
            ItemBuilder::new(2, "Essay")
                .courseid(COURSE)
                .categoryid(ROOT)
                .itemmodule("assign")
                .idnumber("a1")
                .gradepass(50.0)
                .sortorder(2)
                .build(),
        )
        .item(
            ItemBuilder::new(3, "Quiz")
                .courseid(COURSE)
                .categoryid(ROOT)
                .itemmodule("quiz")
                .idnumber("a2")
                .grademax(10.0)
                .gradepass(5.0)
                .sortorder(3)
                .build(),
        )
        .item(
            ItemBuilder::new(4, "")
                .courseid(COURSE)
                .categoryid(ROOT)
                .itemtype(ItemType::Category)
                .iteminstance(LABS)
                .idnumber("labs")
                .grademax(50.0)
                .sortorder(4)
                .build(),
        )
        .item(
            ItemBuilder::new(5, "Lab 1")
                .courseid(COURSE)
                .categoryid(LABS)
                .itemmodule("assign")
                .idnumber("l1")
                .grademax(20.0)
                .sortorder(5)
                .build(),
        )
}

/// An in-memory store with the gradebook imported and default rules seeded.
pub(crate) fn store() -> SqliteStore {
    let store = SqliteStore::open_in_memory().unwrap();
    store.seed_default_rules().unwrap();
    store.import_gradebook(&gradebook()).unwrap();
    store
}
