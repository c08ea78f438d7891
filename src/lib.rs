pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use config::{cli::JsonRecipeFile, toml_config::EngineConfig};
pub use core::{
    aggregator::Aggregator, engine::ShoppingListEngine, export::OutputFormat, identity::IdentityResolver,
    quantity::QuantityParser, shopping_list::ShoppingListBuilder, units::UnitTable,
};
pub use domain::model::{
    AggregatedEntry, RawIngredientLine, RecipeIngredients, ShoppingList, ShoppingListRequest, UnitFamily, UnitToken,
};
pub use utils::error::{Result, ShopListError};
