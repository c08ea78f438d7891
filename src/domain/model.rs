use crate::domain::amount::{self, Amount};
use crate::utils::error::Result;
use crate::utils::validation::validate_servings_target;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

pub type RecipeId = i64;

/// 食譜中的一行原始食材文字，讀入後不再修改
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawIngredientLine {
    pub text: String,
    pub recipe_id: RecipeId,
    #[serde(default)]
    pub recipe_title: Option<String>,
    #[serde(default)]
    pub recipe_servings: Option<u32>,
}

impl RawIngredientLine {
    pub fn new(text: impl Into<String>, recipe_id: RecipeId, recipe_servings: Option<u32>) -> Self {
        Self {
            text: text.into(),
            recipe_id,
            recipe_title: None,
            recipe_servings,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.recipe_title = Some(title.into());
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitFamily {
    Volume,
    Weight,
    Count,
    Unmatched,
}

impl UnitFamily {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Volume => "volume",
            Self::Weight => "weight",
            Self::Count => "count",
            Self::Unmatched => "unmatched",
        }
    }

    /// 加總用的基準單位：Volume 為 ml，Weight 為 g
    pub fn base_unit(self) -> Option<UnitToken> {
        match self {
            Self::Volume => Some(UnitToken::Ml),
            Self::Weight => Some(UnitToken::G),
            Self::Count | Self::Unmatched => None,
        }
    }
}

impl fmt::Display for UnitFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 可辨識的單位（封閉集合）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitToken {
    Tsp,
    Tbsp,
    Cup,
    Ml,
    L,
    FlOz,
    Pint,
    Quart,
    Gallon,
    G,
    Kg,
    Oz,
    Lb,
}

impl UnitToken {
    pub const ALL: [UnitToken; 13] = [
        Self::Tsp,
        Self::Tbsp,
        Self::Cup,
        Self::Ml,
        Self::L,
        Self::FlOz,
        Self::Pint,
        Self::Quart,
        Self::Gallon,
        Self::G,
        Self::Kg,
        Self::Oz,
        Self::Lb,
    ];

    pub fn family(self) -> UnitFamily {
        match self {
            Self::Tsp
            | Self::Tbsp
            | Self::Cup
            | Self::Ml
            | Self::L
            | Self::FlOz
            | Self::Pint
            | Self::Quart
            | Self::Gallon => UnitFamily::Volume,
            Self::G | Self::Kg | Self::Oz | Self::Lb => UnitFamily::Weight,
        }
    }

    /// 設定檔中使用的名稱，例如 `[units.fl_oz]`
    pub fn key(self) -> &'static str {
        match self {
            Self::Tsp => "tsp",
            Self::Tbsp => "tbsp",
            Self::Cup => "cup",
            Self::Ml => "ml",
            Self::L => "l",
            Self::FlOz => "fl_oz",
            Self::Pint => "pint",
            Self::Quart => "quart",
            Self::Gallon => "gallon",
            Self::G => "g",
            Self::Kg => "kg",
            Self::Oz => "oz",
            Self::Lb => "lb",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|token| token.key() == key)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedQuantity {
    pub amount: Option<Amount>,
    pub unit: Option<UnitToken>,
    pub name: String,
    pub modifier: Option<String>,
}

impl ParsedQuantity {
    /// 無法解析時的降級結果：整行當作名稱
    pub fn unparsed(line: &str) -> Self {
        Self {
            amount: None,
            unit: None,
            name: line.trim().to_string(),
            modifier: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalIngredient {
    pub identity_key: String,
    pub display_name: String,
}

impl CanonicalIngredient {
    pub fn new(identity_key: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            identity_key: identity_key.into(),
            display_name: display_name.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AmbiguityReason {
    /// 同一食材同時出現體積與重量等不同單位族
    CrossUnitFamily,
    /// 沒有數量（"salt to taste"）
    MissingQuantity,
    /// 數量過大，無法精確縮放或加總
    AmountOutOfRange,
}

impl AmbiguityReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::CrossUnitFamily => "cross_unit_family",
            Self::MissingQuantity => "missing_quantity",
            Self::AmountOutOfRange => "amount_out_of_range",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedEntry {
    pub identity_key: String,
    pub display_name: String,
    /// 基準單位（ml / g / 個）下的精確總量；ambiguous 時為 None
    #[serde(serialize_with = "amount::serialize_optional")]
    pub total_amount: Option<Amount>,
    /// 以 `unit_label` 表示的總量
    #[serde(serialize_with = "amount::serialize_optional")]
    pub display_amount: Option<Amount>,
    pub display_quantity: Option<String>,
    pub unit_family: UnitFamily,
    pub unit_label: String,
    pub source_lines: Vec<RawIngredientLine>,
    pub modifiers: Vec<String>,
    pub ambiguous: bool,
    pub ambiguity: Option<AmbiguityReason>,
    pub unscaled: bool,
    pub category: Option<String>,
}

impl AggregatedEntry {
    pub fn recipe_ids(&self) -> BTreeSet<RecipeId> {
        self.source_lines.iter().map(|line| line.recipe_id).collect()
    }

    /// 來源食譜名稱（去重，保留輸入順序）
    pub fn recipe_titles(&self) -> Vec<&str> {
        let mut titles: Vec<&str> = Vec::new();
        for title in self.source_lines.iter().filter_map(|l| l.recipe_title.as_deref()) {
            if !titles.contains(&title) {
                titles.push(title);
            }
        }
        titles
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListSection {
    pub category: String,
    /// `ShoppingList::entries` 的索引
    pub entries: Vec<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShoppingList {
    pub name: String,
    pub entries: Vec<AggregatedEntry>,
    pub generated_at: DateTime<Utc>,
    pub recipe_ids: BTreeSet<RecipeId>,
    pub unscaled_recipe_ids: BTreeSet<RecipeId>,
    pub sections: Vec<ListSection>,
}

impl ShoppingList {
    /// 需要使用者自行確認的項目
    pub fn needs_attention(&self) -> impl Iterator<Item = &AggregatedEntry> {
        self.entries.iter().filter(|e| e.ambiguous)
    }

    pub fn sections(&self) -> Vec<(&str, Vec<&AggregatedEntry>)> {
        self.sections
            .iter()
            .map(|section| {
                let entries = section
                    .entries
                    .iter()
                    .filter_map(|&i| self.entries.get(i))
                    .collect();
                (section.category.as_str(), entries)
            })
            .collect()
    }

    pub fn find(&self, identity_key: &str) -> Vec<&AggregatedEntry> {
        self.entries
            .iter()
            .filter(|e| e.identity_key == identity_key)
            .collect()
    }
}

/// 已由食譜儲存層取出的一份食譜
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeIngredients {
    pub id: RecipeId,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub servings: Option<u32>,
    pub ingredients: Vec<String>,
}

impl RecipeIngredients {
    pub fn lines(&self) -> impl Iterator<Item = RawIngredientLine> + '_ {
        self.ingredients.iter().map(move |text| RawIngredientLine {
            text: text.clone(),
            recipe_id: self.id,
            recipe_title: self.title.clone(),
            recipe_servings: self.servings,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShoppingListRequest {
    #[serde(default)]
    pub name: Option<String>,
    pub recipes: Vec<RecipeIngredients>,
    #[serde(default)]
    pub servings_target: Option<i64>,
}

/// 已驗證的目標份數（>= 1）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServingsTarget(u32);

impl ServingsTarget {
    pub fn get(self) -> u32 {
        self.0
    }
}

impl TryFrom<i64> for ServingsTarget {
    type Error = crate::utils::error::ShopListError;

    fn try_from(value: i64) -> Result<Self> {
        validate_servings_target(value).map(Self)
    }
}
