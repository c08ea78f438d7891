use crate::core::aggregator::AggregatorSettings;
use crate::core::category::{self, Categorizer};
use crate::core::identity::{builtin_synonyms, Lexicon, SynonymEntry, SynonymTable};
use crate::core::quantity::ParserVocabulary;
use crate::core::units::{builtin_definitions, UnitTable};
use crate::domain::amount::{self, Amount};
use crate::domain::model::{UnitFamily, UnitToken};
use crate::utils::error::{Result, ShopListError};
use crate::utils::validation::{validate_non_empty_string, validate_positive_number, validate_range, Validate};
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

pub const MAX_DISPLAY_PRECISION: u32 = 6;

/// 引擎設定；每個區段都可省略，省略時使用內建表格
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub parser: ParserConfig,
    /// `[units.cup]`、`[units.fl_oz]` ...
    pub units: BTreeMap<String, UnitOverride>,
    pub display: DisplayConfig,
    pub synonyms: Vec<SynonymEntry>,
    pub identity: IdentityConfig,
    pub categories: CategoryConfig,
    pub aggregation: AggregationConfig,
}

/// 有設定時整份取代內建字彙
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub quantity_words: Option<Vec<String>>,
    pub vague_measures: Option<Vec<String>>,
    pub note_phrases: Option<Vec<String>>,
    pub connectors: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UnitOverride {
    pub factor: Option<FactorValue>,
    /// 附加在內建拼法之後
    pub aliases: Vec<String>,
    pub singular: Option<String>,
    pub plural: Option<String>,
}

/// `factor = 236.588` 或 `factor = "236.588"`（字串可寫成分數 "1/3"）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FactorValue {
    Number(f64),
    Text(String),
}

impl FactorValue {
    pub fn to_amount(&self) -> Option<Amount> {
        match self {
            Self::Number(value) => amount::from_f64(*value),
            Self::Text(text) => match text.trim().split_once('/') {
                Some((numer, denom)) => amount::parse_fraction(numer.trim(), denom.trim()),
                None => amount::parse_decimal(text),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub precision: u32,
    /// 體積顯示單位，例如 ["l", "cup", "ml"]
    pub volume: Option<Vec<String>>,
    pub weight: Option<Vec<String>>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            precision: 2,
            volume: None,
            weight: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    pub descriptors: Option<Vec<String>>,
    pub invariant_words: Option<Vec<String>>,
    /// 附加在內建不規則複數之後（"leaves" = "leaf"）
    pub irregular_plurals: BTreeMap<String, String>,
    pub replace_builtin_synonyms: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub order: Option<Vec<String>>,
    pub items: BTreeMap<String, Vec<String>>,
    pub replace_builtin: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    pub parallel_threshold: usize,
    pub max_recipes: usize,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            parallel_threshold: 256,
            max_recipes: 50,
        }
    }
}

impl EngineConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ShopListError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        // 處理環境變數替換
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| ShopListError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${SHOPLIST_PRECISION})，未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        use regex::Regex;
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| ShopListError::ConfigError {
            message: format!("invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn parser_vocabulary(&self) -> ParserVocabulary {
        let builtin = ParserVocabulary::default();
        ParserVocabulary {
            quantity_words: self.parser.quantity_words.clone().unwrap_or(builtin.quantity_words),
            vague_measures: self.parser.vague_measures.clone().unwrap_or(builtin.vague_measures),
            note_phrases: self.parser.note_phrases.clone().unwrap_or(builtin.note_phrases),
            connectors: self.parser.connectors.clone().unwrap_or(builtin.connectors),
        }
    }

    /// 內建單位表套用 `[units.*]` 與 `[display]` 的覆寫
    pub fn unit_table(&self) -> Result<UnitTable> {
        let mut definitions = builtin_definitions();
        for (key, unit) in &self.units {
            let token = unit_token("units", key)?;
            let Some(definition) = definitions.iter_mut().find(|d| d.token == token) else {
                continue;
            };
            if let Some(factor) = &unit.factor {
                definition.factor = parse_factor(key, factor)?;
            }
            definition
                .aliases
                .extend(unit.aliases.iter().map(|a| a.trim().to_lowercase()));
            if let Some(singular) = &unit.singular {
                definition.singular = singular.clone();
            }
            if let Some(plural) = &unit.plural {
                definition.plural = plural.clone();
            }
        }

        let mut ladders = BTreeMap::new();
        for (family, configured) in [
            (UnitFamily::Volume, &self.display.volume),
            (UnitFamily::Weight, &self.display.weight),
        ] {
            if let Some(keys) = configured {
                let field = format!("display.{}", family);
                let tokens = keys
                    .iter()
                    .map(|key| unit_token(&field, key))
                    .collect::<Result<Vec<_>>>()?;
                ladders.insert(family, tokens);
            }
        }

        Ok(UnitTable::new(definitions, ladders))
    }

    pub fn lexicon(&self) -> Lexicon {
        let builtin = Lexicon::default();
        let descriptors = match &self.identity.descriptors {
            Some(words) => words.clone(),
            None => builtin.descriptors(),
        };
        let invariants = match &self.identity.invariant_words {
            Some(words) => words.clone(),
            None => builtin.invariants(),
        };
        let irregular = builtin
            .irregular_plurals()
            .into_iter()
            .chain(self.identity.irregular_plurals.clone());
        Lexicon::new(descriptors, invariants, irregular)
    }

    /// 同義詞：內建表在前，設定檔項目在後（後者覆蓋前者）
    pub fn synonym_table(&self, lexicon: &Lexicon) -> SynonymTable {
        let mut entries = if self.identity.replace_builtin_synonyms {
            Vec::new()
        } else {
            builtin_synonyms()
        };
        entries.extend(self.synonyms.iter().cloned());
        SynonymTable::from_entries(&entries, lexicon)
    }

    pub fn categorizer(&self, lexicon: &Lexicon) -> Categorizer {
        let mut items = if self.categories.replace_builtin {
            BTreeMap::new()
        } else {
            category::builtin_items()
        };
        for (section, extra) in &self.categories.items {
            items
                .entry(section.trim().to_lowercase())
                .or_insert_with(Vec::new)
                .extend(extra.iter().cloned());
        }
        let order = self
            .categories
            .order
            .clone()
            .unwrap_or_else(category::builtin_order);
        Categorizer::new(order, items, lexicon)
    }

    pub fn aggregator_settings(&self) -> AggregatorSettings {
        AggregatorSettings {
            parallel_threshold: self.aggregation.parallel_threshold,
            display_precision: self.display.precision,
        }
    }

    pub fn max_recipes(&self) -> usize {
        self.aggregation.max_recipes
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        for (key, unit) in &self.units {
            unit_token("units", key)?;
            if let Some(factor) = &unit.factor {
                parse_factor(key, factor)?;
            }
        }

        validate_range("display.precision", self.display.precision, 0, MAX_DISPLAY_PRECISION)?;

        for (family, configured) in [
            (UnitFamily::Volume, &self.display.volume),
            (UnitFamily::Weight, &self.display.weight),
        ] {
            let field = format!("display.{}", family);
            for key in configured.iter().flatten() {
                let token = unit_token(&field, key)?;
                if token.family() != family {
                    return Err(ShopListError::InvalidConfigValueError {
                        field,
                        value: key.clone(),
                        reason: format!("'{}' is a {} unit", key, token.family()),
                    });
                }
            }
        }

        for (index, entry) in self.synonyms.iter().enumerate() {
            validate_non_empty_string(&format!("synonyms[{}].key", index), &entry.key)?;
        }

        validate_positive_number("aggregation.max_recipes", self.aggregation.max_recipes, 1)?;
        validate_positive_number("aggregation.parallel_threshold", self.aggregation.parallel_threshold, 1)?;

        Ok(())
    }
}

impl Validate for EngineConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

fn unit_token(field: &str, key: &str) -> Result<UnitToken> {
    UnitToken::from_key(key.trim()).ok_or_else(|| ShopListError::InvalidConfigValueError {
        field: field.to_string(),
        value: key.to_string(),
        reason: format!(
            "Unknown unit. Valid units: {}",
            UnitToken::ALL.map(|t| t.key()).join(", ")
        ),
    })
}

fn parse_factor(key: &str, factor: &FactorValue) -> Result<Amount> {
    match factor.to_amount() {
        Some(value) if !value.is_zero() => Ok(value),
        _ => Err(ShopListError::InvalidConfigValueError {
            field: format!("units.{}.factor", key),
            value: match factor {
                FactorValue::Number(n) => n.to_string(),
                FactorValue::Text(t) => t.clone(),
            },
            reason: "Factor must be a positive number".to_string(),
        }),
    }
}
