use crate::domain::model::{CanonicalIngredient, RecipeIngredients};
use crate::utils::error::Result;
use std::collections::{BTreeMap, HashMap};

/// 名稱 -> 標準食材的對照來源。
///
/// 傳入的名稱已經過小寫、去複數等正規化；回傳 None 代表表中沒有這個名稱。
pub trait SynonymSource: Send + Sync {
    fn lookup(&self, normalized_name: &str) -> Option<CanonicalIngredient>;
}

impl SynonymSource for HashMap<String, CanonicalIngredient> {
    fn lookup(&self, normalized_name: &str) -> Option<CanonicalIngredient> {
        self.get(normalized_name).cloned()
    }
}

impl SynonymSource for BTreeMap<String, CanonicalIngredient> {
    fn lookup(&self, normalized_name: &str) -> Option<CanonicalIngredient> {
        self.get(normalized_name).cloned()
    }
}

/// 食譜儲存層：提供使用者選定的食譜
pub trait RecipeSource {
    fn load_recipes(&self) -> Result<Vec<RecipeIngredients>>;
}
