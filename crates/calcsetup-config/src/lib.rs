//! Configuration management for the grade calculation setup tool.
//!
//! This crate handles discovering and loading `calcsetup.yaml`, layering
//! environment overrides on top, and providing typed access to the values.

pub mod config;
pub mod discover;
