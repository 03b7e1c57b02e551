//! A canonical LR(1) parser table generator.

pub mod automaton;
pub mod driver;
pub mod first_sets;
pub mod grammar;
pub mod item;
pub mod syntax;
pub mod table;
pub mod types;
pub mod util;
