pub mod cli;
pub mod toml_config;

#[cfg(feature = "cli")]
use crate::core::export::OutputFormat;
#[cfg(feature = "cli")]
use crate::utils::error::Result;
#[cfg(feature = "cli")]
use crate::utils::validation::{validate_path, validate_servings_target, Validate};
#[cfg(feature = "cli")]
use clap::Parser;

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "shoplist")]
#[command(about = "Merge recipe ingredient lists into one shopping list")]
pub struct CliConfig {
    #[arg(long, help = "JSON file with a recipe array or a full request object")]
    pub recipes: String,

    #[arg(long, help = "TOML file overriding unit, synonym and category tables")]
    pub config: Option<String>,

    #[arg(long, allow_negative_numbers = true, help = "Scale every recipe to this many servings")]
    pub servings: Option<i64>,

    #[arg(long, help = "Name of the generated list")]
    pub name: Option<String>,

    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    #[arg(long, help = "Write the list to this file instead of stdout")]
    pub output: Option<String>,

    #[arg(long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, help = "Log CPU and memory usage per phase")]
    pub monitor: bool,

    #[arg(long, help = "Emit logs as JSON")]
    pub log_json: bool,
}

#[cfg(feature = "cli")]
impl Validate for CliConfig {
    fn validate(&self) -> Result<()> {
        validate_path("recipes", &self.recipes)?;
        if let Some(config) = &self.config {
            validate_path("config", config)?;
        }
        if let Some(output) = &self.output {
            validate_path("output", output)?;
        }
        if let Some(servings) = self.servings {
            validate_servings_target(servings)?;
        }
        Ok(())
    }
}
