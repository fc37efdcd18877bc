//! Turn free-form shopping list text into categorized, sorted grocery items.
//!
//! Names come either from local delimiter splitting or from a text-completion
//! service; both go through the same keyword classifier and sort-key assigner.

pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod parser;
pub mod service;

pub use error::ParseError;
pub use model::{Category, Item, ShoppingList};
pub use parser::{classify, ListParser, ParseConfig, ParseOutcome};
