use crate::config::toml_config::EngineConfig;
use crate::core::aggregator::Aggregator;
use crate::core::identity::IdentityResolver;
use crate::core::quantity::QuantityParser;
use crate::core::shopping_list::ShoppingListBuilder;
use crate::domain::model::{RawIngredientLine, RecipeIngredients, ServingsTarget, ShoppingList, ShoppingListRequest};
use crate::domain::ports::RecipeSource;
use crate::utils::error::{Result, ShopListError};
use crate::utils::monitor::SystemMonitor;
use crate::utils::validation::Validate;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::sync::Arc;

/// 驗證請求 -> 彙總 -> 組裝清單
pub struct ShoppingListEngine {
    aggregator: Aggregator,
    builder: ShoppingListBuilder,
    max_recipes: usize,
    monitor: SystemMonitor,
}

impl ShoppingListEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        Self::new_with_monitoring(config, false)
    }

    pub fn new_with_monitoring(config: &EngineConfig, monitor_enabled: bool) -> Result<Self> {
        config.validate()?;

        let units = Arc::new(config.unit_table()?);
        let parser = QuantityParser::new(units, config.parser_vocabulary());
        let lexicon = config.lexicon();
        let synonyms = config.synonym_table(&lexicon);
        let categorizer = config.categorizer(&lexicon);
        tracing::debug!("📚 Loaded {} synonym spellings", synonyms.len());

        let resolver = IdentityResolver::new(lexicon, Arc::new(synonyms));
        Ok(Self {
            aggregator: Aggregator::new(parser, resolver, config.aggregator_settings()),
            builder: ShoppingListBuilder::new(categorizer),
            max_recipes: config.max_recipes(),
            monitor: SystemMonitor::new(monitor_enabled),
        })
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    pub fn builder(&self) -> &ShoppingListBuilder {
        &self.builder
    }

    pub fn generate(&self, request: &ShoppingListRequest) -> Result<ShoppingList> {
        self.generate_at(request, Utc::now())
    }

    pub fn generate_at(&self, request: &ShoppingListRequest, generated_at: DateTime<Utc>) -> Result<ShoppingList> {
        // 份數與食譜數量屬於呼叫端契約，在彙總開始前就拒絕
        let target = request.servings_target.map(ServingsTarget::try_from).transpose()?;
        let recipes = self.select_recipes(&request.recipes)?;

        tracing::info!(
            "🛒 Generating shopping list from {} recipes (target servings: {})",
            recipes.len(),
            target.map(|t| t.get().to_string()).unwrap_or_else(|| "none".to_string())
        );
        self.monitor.log_phase("select", recipes.len());

        let lines: Vec<RawIngredientLine> = recipes.iter().flat_map(|recipe| recipe.lines()).collect();
        let entries = self.aggregator.aggregate(&lines, target);
        self.monitor.log_phase("aggregate", lines.len());

        let list = self.builder.build_at(entries, generated_at, request.name.clone());
        self.monitor.log_phase("build", list.entries.len());
        if !list.unscaled_recipe_ids.is_empty() {
            tracing::warn!(
                "🔶 Recipes without servings were not scaled: {:?}",
                list.unscaled_recipe_ids
            );
        }
        self.monitor.log_final_stats();

        Ok(list)
    }

    /// 從食譜來源取得所有食譜後產生清單
    pub fn generate_from_source(
        &self,
        source: &dyn RecipeSource,
        servings_target: Option<i64>,
        name: Option<String>,
    ) -> Result<ShoppingList> {
        let request = ShoppingListRequest {
            name,
            recipes: source.load_recipes()?,
            servings_target,
        };
        self.generate(&request)
    }

    /// 相同 id 只保留第一次出現的食譜
    fn select_recipes<'a>(&self, recipes: &'a [RecipeIngredients]) -> Result<Vec<&'a RecipeIngredients>> {
        let mut seen = HashSet::new();
        let mut selected = Vec::with_capacity(recipes.len());
        for recipe in recipes {
            if seen.insert(recipe.id) {
                selected.push(recipe);
            } else {
                tracing::debug!("Skipping duplicate recipe id {}", recipe.id);
            }
        }

        if selected.is_empty() {
            return Err(ShopListError::InvalidRequest {
                message: "at least one recipe is required".to_string(),
            });
        }
        if selected.len() > self.max_recipes {
            return Err(ShopListError::InvalidRequest {
                message: format!(
                    "{} recipes selected, at most {} are allowed",
                    selected.len(),
                    self.max_recipes
                ),
            });
        }

        Ok(selected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recipe(id: i64, servings: Option<u32>, ingredients: &[&str]) -> RecipeIngredients {
        RecipeIngredients {
            id,
            title: Some(format!("Recipe {}", id)),
            servings,
            ingredients: ingredients.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn engine() -> ShoppingListEngine {
        ShoppingListEngine::new(&EngineConfig::default()).unwrap()
    }

    #[test]
    fn test_generate_end_to_end() {
        let request = ShoppingListRequest {
            name: None,
            recipes: vec![
                recipe(1, Some(4), &["2 cups rice", "1 cup butter"]),
                recipe(2, Some(2), &["200 g butter", "salt to taste"]),
            ],
            servings_target: Some(8),
        };
        let list = engine().generate(&request).unwrap();

        let rice = list.find("rice");
        assert_eq!(rice.len(), 1);
        assert_eq!(rice[0].display_quantity.as_deref(), Some("2"));
        assert_eq!(rice[0].unit_label, "pints");
        assert!(list.find("butter")[0].ambiguous);
        assert_eq!(list.needs_attention().count(), 2);
        assert!(list.name.starts_with("Shopping List "));
        assert!(list.unscaled_recipe_ids.is_empty());
    }

    #[test]
    fn test_invalid_servings_target_is_rejected() {
        let request = ShoppingListRequest {
            name: None,
            recipes: vec![recipe(1, Some(4), &["2 cups rice"])],
            servings_target: Some(0),
        };
        let err = engine().generate(&request).unwrap_err();
        assert!(matches!(err, ShopListError::InvalidServingsTarget { value: 0 }));
    }

    #[test]
    fn test_recipe_count_limits() {
        let empty = ShoppingListRequest::default();
        assert!(matches!(
            engine().generate(&empty).unwrap_err(),
            ShopListError::InvalidRequest { .. }
        ));

        let too_many = ShoppingListRequest {
            recipes: (0..51).map(|id| recipe(id, None, &["1 egg"])).collect(),
            ..Default::default()
        };
        assert!(matches!(
            engine().generate(&too_many).unwrap_err(),
            ShopListError::InvalidRequest { .. }
        ));
    }

    #[test]
    fn test_duplicate_recipes_are_collapsed() {
        let request = ShoppingListRequest {
            recipes: vec![recipe(1, None, &["2 eggs"]), recipe(1, None, &["2 eggs"])],
            ..Default::default()
        };
        let list = engine().generate(&request).unwrap();
        let eggs = list.find("egg");
        assert_eq!(eggs[0].source_lines.len(), 1);
        assert_eq!(eggs[0].display_quantity.as_deref(), Some("2"));
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = EngineConfig::from_toml_str("[aggregation]\nmax_recipes = 0").unwrap();
        assert!(ShoppingListEngine::new(&config).is_err());
    }
}
