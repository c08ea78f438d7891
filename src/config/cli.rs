use crate::domain::model::{RecipeIngredients, ShoppingListRequest};
use crate::domain::ports::RecipeSource;
use crate::utils::error::Result;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// 食譜檔可以是食譜陣列，也可以是完整的請求物件
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipeFile {
    Request(ShoppingListRequest),
    Recipes(Vec<RecipeIngredients>),
}

/// 以本機 JSON 檔案作為食譜來源
#[derive(Debug, Clone)]
pub struct JsonRecipeFile {
    path: PathBuf,
}

impl JsonRecipeFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load_request(&self) -> Result<ShoppingListRequest> {
        let content = fs::read_to_string(&self.path)?;
        let request = match serde_json::from_str::<RecipeFile>(&content)? {
            RecipeFile::Request(request) => request,
            RecipeFile::Recipes(recipes) => ShoppingListRequest {
                recipes,
                ..Default::default()
            },
        };
        tracing::debug!(
            "📥 Loaded {} recipes from {}",
            request.recipes.len(),
            self.path.display()
        );
        Ok(request)
    }
}

impl RecipeSource for JsonRecipeFile {
    fn load_recipes(&self) -> Result<Vec<RecipeIngredients>> {
        Ok(self.load_request()?.recipes)
    }
}

/// 寫出結果檔，必要時建立上層目錄
pub fn write_output(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, content)?;
    Ok(())
}
