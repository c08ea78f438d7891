//! 食材身分解析：把自由文字的食材名稱對應到標準的 identity key。
//!
//! 步驟：小寫與空白整理 -> 去複數 -> 查同義詞表 -> 去掉描述詞後再查一次 -> 以正規化字串為 key。

use crate::domain::model::CanonicalIngredient;
use crate::domain::ports::SynonymSource;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

const BUILTIN_DESCRIPTORS: &[&str] = &[
    "fresh", "dried", "frozen", "canned", "organic", "raw", "cooked", "chopped", "diced",
    "sliced", "minced", "grated", "ground", "whole", "extra", "large", "small", "medium",
];

const BUILTIN_INVARIANTS: &[&str] = &[
    "molasses", "hummus", "couscous", "asparagus", "swiss", "grits", "greens", "series",
    "species", "bitters",
];

const BUILTIN_IRREGULAR: &[(&str, &str)] = &[
    ("leaves", "leaf"),
    ("loaves", "loaf"),
    ("halves", "half"),
    ("knives", "knife"),
    ("cookies", "cookie"),
    ("calves", "calf"),
];

/// 字彙規則：描述詞、不變形的字、不規則複數
#[derive(Debug, Clone)]
pub struct Lexicon {
    descriptors: HashSet<String>,
    invariants: HashSet<String>,
    irregular: HashMap<String, String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::new(
            BUILTIN_DESCRIPTORS.iter().map(|s| s.to_string()),
            BUILTIN_INVARIANTS.iter().map(|s| s.to_string()),
            BUILTIN_IRREGULAR.iter().map(|(p, s)| (p.to_string(), s.to_string())),
        )
    }
}

impl Lexicon {
    pub fn new(
        descriptors: impl IntoIterator<Item = String>,
        invariants: impl IntoIterator<Item = String>,
        irregular: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        Self {
            descriptors: descriptors.into_iter().map(|d| d.trim().to_lowercase()).collect(),
            invariants: invariants.into_iter().map(|w| w.trim().to_lowercase()).collect(),
            irregular: irregular
                .into_iter()
                .map(|(p, s)| (p.trim().to_lowercase(), s.trim().to_lowercase()))
                .collect(),
        }
    }

    pub fn descriptors(&self) -> Vec<String> {
        sorted(self.descriptors.iter().cloned())
    }

    pub fn invariants(&self) -> Vec<String> {
        sorted(self.invariants.iter().cloned())
    }

    pub fn irregular_plurals(&self) -> Vec<(String, String)> {
        sorted(self.irregular.iter().map(|(p, s)| (p.clone(), s.clone())))
    }

    /// 小寫、標點轉空白、合併空白，並將最後一個字轉成單數
    pub fn normalize(&self, name: &str) -> String {
        let cleaned: String = name
            .to_lowercase()
            .chars()
            .map(|c| match c {
                '-' | '_' | '/' => ' ',
                c if c.is_alphanumeric() || c.is_whitespace() || c == '\'' || c == '&' => c,
                _ => ' ',
            })
            .collect();
        let words: Vec<&str> = cleaned.split_whitespace().collect();
        self.singularize_words(&words)
    }

    /// 移除描述詞（"large eggs" -> "eggs"）；沒有可移除的字或移除後為空時回傳 None
    pub fn strip_descriptors(&self, normalized: &str) -> Option<String> {
        let words: Vec<&str> = normalized.split(' ').collect();
        let kept: Vec<&str> = words
            .iter()
            .copied()
            .filter(|w| !self.descriptors.contains(*w))
            .collect();
        if kept.is_empty() || kept.len() == words.len() {
            return None;
        }
        Some(self.singularize_words(&kept))
    }

    fn singularize_words(&self, words: &[&str]) -> String {
        let Some((last, rest)) = words.split_last() else {
            return String::new();
        };
        let phrase = words.join(" ");
        if self.invariants.contains(&phrase) {
            return phrase;
        }
        let mut out: Vec<String> = rest.iter().map(|w| w.to_string()).collect();
        out.push(self.singularize(last));
        out.join(" ")
    }

    /// 去掉結尾的 "s" / "es"；例外表中的字不處理
    pub fn singularize(&self, word: &str) -> String {
        if let Some(singular) = self.irregular.get(word) {
            return singular.clone();
        }
        if self.invariants.contains(word) || word.chars().count() <= 3 {
            return word.to_string();
        }
        if word.ends_with("ss") || word.ends_with("us") || word.ends_with("is") {
            return word.to_string();
        }
        if let Some(stem) = word.strip_suffix("ies").filter(|stem| stem.chars().count() >= 2) {
            return format!("{}y", stem);
        }
        for suffix in ["oes", "xes", "zes", "ches", "shes", "sses"] {
            if word.ends_with(suffix) {
                return word[..word.len() - 2].to_string();
            }
        }
        match word.strip_suffix('s') {
            Some(stem) => stem.to_string(),
            None => word.to_string(),
        }
    }
}

fn sorted<T: Ord>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut items: Vec<T> = items.collect();
    items.sort();
    items
}

/// 設定檔中的同義詞項目
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SynonymEntry {
    pub key: String,
    #[serde(default)]
    pub display: Option<String>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl SynonymEntry {
    pub fn new(key: &str, aliases: &[&str]) -> Self {
        Self {
            key: key.to_string(),
            display: None,
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

pub fn builtin_synonyms() -> Vec<SynonymEntry> {
    vec![
        SynonymEntry::new("green onion", &["scallion", "spring onion"]),
        SynonymEntry::new("bell pepper", &["sweet pepper", "capsicum"]),
        SynonymEntry::new("cilantro", &["coriander leaves", "fresh coriander", "chinese parsley"]),
        SynonymEntry::new("heavy cream", &["heavy whipping cream", "double cream", "thick cream"]),
        SynonymEntry::new("ground beef", &["minced beef", "beef mince", "hamburger meat"]),
        SynonymEntry::new("soy sauce", &["shoyu", "light soy sauce", "dark soy sauce"]),
        SynonymEntry::new("tomato paste", &["tomato puree", "concentrated tomato"]),
        SynonymEntry::new("chicken broth", &["chicken stock", "chicken bouillon"]),
        SynonymEntry::new("vegetable broth", &["vegetable stock", "veggie broth"]),
    ]
}

/// 由設定資料建立的同義詞表
#[derive(Debug, Clone, Default)]
pub struct SynonymTable {
    entries: HashMap<String, CanonicalIngredient>,
}

impl SynonymTable {
    /// 後面的項目覆蓋前面相同拼法的對應
    pub fn from_entries(entries: &[SynonymEntry], lexicon: &Lexicon) -> Self {
        let mut table = HashMap::new();
        for entry in entries {
            let key = lexicon.normalize(&entry.key);
            if key.is_empty() {
                continue;
            }
            let canonical = CanonicalIngredient::new(
                key.clone(),
                entry.display.clone().unwrap_or_else(|| entry.key.trim().to_string()),
            );
            table.insert(key, canonical.clone());
            for alias in &entry.aliases {
                let alias = lexicon.normalize(alias);
                if !alias.is_empty() {
                    table.insert(alias, canonical.clone());
                }
            }
        }
        Self { entries: table }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 依 identity key 排序的對照內容，方便檢視
    pub fn surface_forms(&self) -> BTreeMap<&str, &str> {
        self.entries
            .iter()
            .map(|(surface, canonical)| (surface.as_str(), canonical.identity_key.as_str()))
            .collect()
    }
}

impl SynonymSource for SynonymTable {
    fn lookup(&self, normalized_name: &str) -> Option<CanonicalIngredient> {
        self.entries.get(normalized_name).cloned()
    }
}

#[derive(Clone)]
pub struct IdentityResolver {
    lexicon: Lexicon,
    synonyms: Arc<dyn SynonymSource>,
}

impl std::fmt::Debug for IdentityResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityResolver")
            .field("lexicon", &self.lexicon)
            .finish_non_exhaustive()
    }
}

impl Default for IdentityResolver {
    fn default() -> Self {
        let lexicon = Lexicon::default();
        let synonyms = SynonymTable::from_entries(&builtin_synonyms(), &lexicon);
        Self::new(lexicon, Arc::new(synonyms))
    }
}

impl IdentityResolver {
    pub fn new(lexicon: Lexicon, synonyms: Arc<dyn SynonymSource>) -> Self {
        Self { lexicon, synonyms }
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn resolve(&self, name: &str) -> CanonicalIngredient {
        let display_name = name.split_whitespace().collect::<Vec<_>>().join(" ");
        let normalized = self.lexicon.normalize(name);

        if let Some(canonical) = self.synonyms.lookup(&normalized) {
            return canonical;
        }

        // 表中查不到時，去掉描述詞再試一次（"chopped scallions" -> "scallion"）
        let identity_key = match self.lexicon.strip_descriptors(&normalized) {
            Some(stripped) => {
                if let Some(canonical) = self.synonyms.lookup(&stripped) {
                    return canonical;
                }
                stripped
            }
            None => normalized,
        };

        CanonicalIngredient {
            identity_key,
            display_name,
        }
    }
}
