//! Formula generation for grade categories.
//!
//! A rule's `calc` is a logic-less template. Rendering it against a category
//! and its items produces a gradebook calculation such as
//! `=MIN([[a1]],[[a2]])`, which is then checked against the calculation
//! grammar before it is stored.

pub mod render;
pub mod template;
pub mod types;
pub mod validate;
