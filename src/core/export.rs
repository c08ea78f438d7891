//! 購物清單輸出格式：純文字、JSON、CSV、TSV

use crate::domain::amount;
use crate::domain::model::{AggregatedEntry, AmbiguityReason, ShoppingList};
use crate::utils::error::{Result, ShopListError};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
    Tsv,
}

impl OutputFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Text => "text",
            Self::Json => "json",
            Self::Csv => "csv",
            Self::Tsv => "tsv",
        };
        f.write_str(name)
    }
}

pub fn render(list: &ShoppingList, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(to_text(list)),
        OutputFormat::Json => to_json(list),
        OutputFormat::Csv => to_delimited(list, b','),
        OutputFormat::Tsv => to_delimited(list, b'\t'),
    }
}

/// "1.5 cups flour"、"3 egg"；ambiguous 項目只有名稱
pub fn entry_label(entry: &AggregatedEntry) -> String {
    let mut parts: Vec<&str> = Vec::with_capacity(3);
    if let Some(quantity) = entry.display_quantity.as_deref() {
        parts.push(quantity);
    }
    if !entry.unit_label.is_empty() {
        parts.push(&entry.unit_label);
    }
    parts.push(&entry.display_name);
    parts.join(" ")
}

pub fn to_text(list: &ShoppingList) -> String {
    let mut out = String::new();
    out.push_str(&list.name);
    out.push('\n');
    out.push_str(&format!("Generated: {}\n", list.generated_at.format("%Y-%m-%d %H:%M UTC")));
    out.push_str(&format!("Recipes: {}\n", join_ids(list.recipe_ids.iter())));
    if !list.unscaled_recipe_ids.is_empty() {
        out.push_str(&format!(
            "Not scaled (no servings declared): {}\n",
            join_ids(list.unscaled_recipe_ids.iter())
        ));
    }

    for (category, entries) in list.sections() {
        let resolved: Vec<&AggregatedEntry> = entries.into_iter().filter(|e| !e.ambiguous).collect();
        if resolved.is_empty() {
            continue;
        }
        out.push_str(&format!("\n[{}]\n", category));
        for entry in resolved {
            out.push_str(&format!("  - {}", entry_label(entry)));
            if !entry.modifiers.is_empty() {
                out.push_str(&format!(" ({})", entry.modifiers.join("; ")));
            }
            let titles = entry.recipe_titles();
            if !titles.is_empty() {
                out.push_str(&format!(" [{}]", titles.join(", ")));
            }
            out.push('\n');
        }
    }

    let attention: Vec<&AggregatedEntry> = list.needs_attention().collect();
    if !attention.is_empty() {
        out.push_str("\nNeeds your attention\n");
        for entry in attention {
            let reason = match entry.ambiguity {
                Some(AmbiguityReason::CrossUnitFamily) => "units cannot be combined",
                Some(AmbiguityReason::MissingQuantity) => "no quantity given",
                Some(AmbiguityReason::AmountOutOfRange) => "amounts too large to add up",
                None => "unresolved",
            };
            let sources: Vec<&str> = entry.source_lines.iter().map(|l| l.text.as_str()).collect();
            out.push_str(&format!(
                "  ! {} [{}]: {}\n",
                entry.display_name,
                reason,
                sources.join(" | ")
            ));
        }
    }

    out
}

pub fn to_json(list: &ShoppingList) -> Result<String> {
    Ok(serde_json::to_string_pretty(list)?)
}

const COLUMNS: [&str; 12] = [
    "category",
    "name",
    "identity_key",
    "quantity",
    "unit",
    "unit_family",
    "base_amount",
    "ambiguous",
    "reason",
    "recipe_ids",
    "recipes",
    "sources",
];

pub fn to_delimited(list: &ShoppingList, delimiter: u8) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new());
    writer.write_record(COLUMNS)?;

    for entry in &list.entries {
        let recipe_ids: Vec<String> = entry.recipe_ids().iter().map(|id| id.to_string()).collect();
        let sources: Vec<&str> = entry.source_lines.iter().map(|l| l.text.as_str()).collect();
        let base_amount = entry
            .total_amount
            .map(|total| amount::format_amount(total, 4))
            .unwrap_or_default();

        writer.write_record([
            entry.category.as_deref().unwrap_or_default(),
            entry.display_name.as_str(),
            entry.identity_key.as_str(),
            entry.display_quantity.as_deref().unwrap_or_default(),
            entry.unit_label.as_str(),
            entry.unit_family.as_str(),
            base_amount.as_str(),
            if entry.ambiguous { "true" } else { "false" },
            entry.ambiguity.map(AmbiguityReason::as_str).unwrap_or_default(),
            recipe_ids.join(";").as_str(),
            entry.recipe_titles().join(";").as_str(),
            sources.join(" | ").as_str(),
        ])?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| ShopListError::IoError(e.into_error()))?;
    String::from_utf8(bytes).map_err(|e| ShopListError::ProcessingError {
        message: format!("delimited output is not valid UTF-8: {}", e),
    })
}

fn join_ids<'a>(ids: impl Iterator<Item = &'a i64>) -> String {
    ids.map(|id| id.to_string()).collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::aggregator::Aggregator;
    use crate::core::shopping_list::ShoppingListBuilder;
    use crate::domain::model::RawIngredientLine;
    use chrono::{TimeZone, Utc};

    fn sample_list() -> ShoppingList {
        let lines = vec![
            RawIngredientLine::new("1 cup flour", 1, Some(2)).with_title("Bread"),
            RawIngredientLine::new("8 tbsp flour", 2, Some(2)).with_title("Gravy"),
            RawIngredientLine::new("2 onions, diced", 1, Some(2)).with_title("Bread"),
            RawIngredientLine::new("salt to taste", 2, Some(2)),
        ];
        let entries = Aggregator::default().aggregate(&lines, None);
        let generated_at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();
        ShoppingListBuilder::default().build_at(entries, generated_at, Some("Weekly".to_string()))
    }

    #[test]
    fn test_text_rendering() {
        let text = to_text(&sample_list());
        assert!(text.starts_with("Weekly\n"));
        assert!(text.contains("Recipes: 1, 2"));
        assert!(text.contains("[produce]\n  - 2 onions (diced) [Bread]"));
        assert!(text.contains("[pantry]\n  - 1.5 cups flour [Bread, Gravy]"));
        assert!(text.contains("Needs your attention\n  ! salt [no quantity given]: salt to taste"));
    }

    #[test]
    fn test_json_rendering() {
        let json = to_json(&sample_list()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "Weekly");
        assert_eq!(value["entries"].as_array().unwrap().len(), 3);
        assert_eq!(value["entries"][2]["ambiguity"], "missing_quantity");
    }

    #[test]
    fn test_csv_and_tsv_rendering() {
        let list = sample_list();
        let csv_text = render(&list, OutputFormat::Csv).unwrap();
        let mut lines = csv_text.lines();
        assert_eq!(lines.next(), Some(COLUMNS.join(",").as_str()));
        assert_eq!(csv_text.lines().count(), 4);
        assert!(csv_text.contains("pantry,flour,flour,1.5,cups,volume,354.8824,false,,1;2,Bread;Gravy,1 cup flour | 8 tbsp flour"));

        let tsv_text = render(&list, OutputFormat::Tsv).unwrap();
        assert!(tsv_text.starts_with("category\tname\t"));
        assert!(tsv_text.contains("pantry\tsalt\tsalt\t\t\tunmatched\t\ttrue\tmissing_quantity"));
    }
}
