//! Runtime implementation for `canonlr` parse tables.

pub mod definition;
pub mod parser;
