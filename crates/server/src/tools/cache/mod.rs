//! Cache inspection tools.

pub mod list;

pub use list::list_impl;
