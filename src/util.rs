//! Shared utility modules used across shadow-search components.

pub mod path;
