pub mod aggregator;
pub mod category;
pub mod engine;
pub mod export;
pub mod identity;
pub mod quantity;
pub mod shopping_list;
pub mod units;

pub use crate::domain::model::{AggregatedEntry, ParsedQuantity, ShoppingList};
pub use crate::domain::ports::{RecipeSource, SynonymSource};
pub use crate::utils::error::Result;
