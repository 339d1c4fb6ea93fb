//! Small stand-alone helpers.

pub mod arr;
pub mod cdn;
pub mod classes;
pub mod date;
pub mod file;
pub mod query;
pub mod request;
