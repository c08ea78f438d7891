//! 購物清單組裝：排序、分區、彙整食譜編號。

use crate::core::category::Categorizer;
use crate::domain::model::{AggregatedEntry, ListSection, RecipeId, ShoppingList};
use chrono::{DateTime, Utc};
use std::cmp::Ordering;
use std::collections::BTreeSet;

pub const DEFAULT_LIST_NAME: &str = "Shopping List";

#[derive(Debug, Clone, Default)]
pub struct ShoppingListBuilder {
    categorizer: Categorizer,
}

impl ShoppingListBuilder {
    pub fn new(categorizer: Categorizer) -> Self {
        Self { categorizer }
    }

    pub fn categorizer(&self) -> &Categorizer {
        &self.categorizer
    }

    pub fn build(&self, entries: Vec<AggregatedEntry>) -> ShoppingList {
        self.build_at(entries, Utc::now(), None)
    }

    /// 與 [`build`](Self::build) 相同，但時間與名稱由呼叫端指定，輸出完全可重現
    pub fn build_at(
        &self,
        mut entries: Vec<AggregatedEntry>,
        generated_at: DateTime<Utc>,
        name: Option<String>,
    ) -> ShoppingList {
        for entry in &mut entries {
            entry.category = Some(self.categorizer.categorize(&entry.identity_key).to_string());
        }
        entries.sort_by(compare_entries);

        let mut recipe_ids = BTreeSet::new();
        let mut unscaled_recipe_ids: BTreeSet<RecipeId> = BTreeSet::new();
        for entry in &entries {
            recipe_ids.extend(entry.recipe_ids());
            if entry.unscaled {
                unscaled_recipe_ids.extend(
                    entry
                        .source_lines
                        .iter()
                        .filter(|line| line.recipe_servings.unwrap_or(0) == 0)
                        .map(|line| line.recipe_id),
                );
            }
        }

        let sections = self.sections(&entries);
        let name = name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("{} {}", DEFAULT_LIST_NAME, generated_at.format("%Y-%m-%d")));

        tracing::info!(
            "📝 Built '{}' with {} entries in {} sections",
            name,
            entries.len(),
            sections.len()
        );

        ShoppingList {
            name,
            entries,
            generated_at,
            recipe_ids,
            unscaled_recipe_ids,
            sections,
        }
    }

    fn sections(&self, entries: &[AggregatedEntry]) -> Vec<ListSection> {
        self.categorizer
            .order()
            .iter()
            .filter_map(|category| {
                let indices: Vec<usize> = entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.category.as_deref() == Some(category.as_str()))
                    .map(|(i, _)| i)
                    .collect();
                (!indices.is_empty()).then(|| ListSection {
                    category: category.clone(),
                    entries: indices,
                })
            })
            .collect()
    }
}

/// 可加總的項目在前（依單位族、名稱），需要確認的項目在後（依名稱）
fn compare_entries(a: &AggregatedEntry, b: &AggregatedEntry) -> Ordering {
    a.ambiguous
        .cmp(&b.ambiguous)
        .then_with(|| {
            if a.ambiguous {
                Ordering::Equal
            } else {
                a.unit_family.cmp(&b.unit_family)
            }
        })
        .then_with(|| a.display_name.to_lowercase().cmp(&b.display_name.to_lowercase()))
        .then_with(|| a.display_name.cmp(&b.display_name))
        .then_with(|| a.identity_key.cmp(&b.identity_key))
        .then_with(|| a.ambiguity.cmp(&b.ambiguity))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{AmbiguityReason, RawIngredientLine, UnitFamily};
    use chrono::TimeZone;
    use num_rational::Ratio;

    fn entry(key: &str, family: UnitFamily, ambiguous: bool, recipe_id: RecipeId) -> AggregatedEntry {
        AggregatedEntry {
            identity_key: key.to_string(),
            display_name: key.to_string(),
            total_amount: (!ambiguous).then(|| Ratio::from_integer(1)),
            display_amount: None,
            display_quantity: None,
            unit_family: if ambiguous { UnitFamily::Unmatched } else { family },
            unit_label: String::new(),
            source_lines: vec![RawIngredientLine::new(key, recipe_id, Some(2))],
            modifiers: Vec::new(),
            ambiguous,
            ambiguity: ambiguous.then_some(AmbiguityReason::MissingQuantity),
            unscaled: false,
            category: None,
        }
    }

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_sort_order() {
        let entries = vec![
            entry("salt", UnitFamily::Unmatched, true, 1),
            entry("onion", UnitFamily::Count, false, 1),
            entry("flour", UnitFamily::Weight, false, 2),
            entry("milk", UnitFamily::Volume, false, 2),
            entry("basil", UnitFamily::Unmatched, true, 3),
            entry("apple", UnitFamily::Count, false, 3),
        ];
        let list = ShoppingListBuilder::default().build_at(entries, fixed_time(), None);
        let keys: Vec<&str> = list.entries.iter().map(|e| e.identity_key.as_str()).collect();
        assert_eq!(keys, vec!["milk", "flour", "apple", "onion", "basil", "salt"]);
        assert_eq!(list.recipe_ids, BTreeSet::from([1, 2, 3]));
        assert_eq!(list.needs_attention().count(), 2);
    }

    #[test]
    fn test_build_is_deterministic() {
        let entries = vec![
            entry("Tomato", UnitFamily::Count, false, 1),
            entry("tomato", UnitFamily::Count, false, 2),
            entry("garlic", UnitFamily::Count, false, 1),
        ];
        let mut reversed = entries.clone();
        reversed.reverse();
        let builder = ShoppingListBuilder::default();
        assert_eq!(
            builder.build_at(entries, fixed_time(), None),
            builder.build_at(reversed, fixed_time(), None)
        );
    }

    #[test]
    fn test_categories_and_sections() {
        let entries = vec![
            entry("milk", UnitFamily::Volume, false, 1),
            entry("onion", UnitFamily::Count, false, 1),
            entry("mystery spice", UnitFamily::Count, false, 1),
        ];
        let list = ShoppingListBuilder::default().build_at(entries, fixed_time(), None);
        let sections: Vec<(&str, Vec<&str>)> = list
            .sections()
            .into_iter()
            .map(|(category, entries)| {
                (category, entries.iter().map(|e| e.identity_key.as_str()).collect())
            })
            .collect();
        assert_eq!(
            sections,
            vec![
                ("produce", vec!["onion"]),
                ("dairy", vec!["milk"]),
                ("other", vec!["mystery spice"]),
            ]
        );
    }

    #[test]
    fn test_default_and_custom_name() {
        let builder = ShoppingListBuilder::default();
        let list = builder.build_at(Vec::new(), fixed_time(), None);
        assert_eq!(list.name, "Shopping List 2024-03-09");
        let list = builder.build_at(Vec::new(), fixed_time(), Some("  Weekend ".to_string()));
        assert_eq!(list.name, "Weekend");
        let list = builder.build_at(Vec::new(), fixed_time(), Some("   ".to_string()));
        assert_eq!(list.name, "Shopping List 2024-03-09");
    }

    #[test]
    fn test_unscaled_recipe_ids() {
        let mut flagged = entry("rice", UnitFamily::Volume, false, 1);
        flagged.unscaled = true;
        flagged.source_lines.push(RawIngredientLine::new("1 cup rice", 5, None));
        let list = ShoppingListBuilder::default().build_at(vec![flagged], fixed_time(), None);
        assert_eq!(list.unscaled_recipe_ids, BTreeSet::from([5]));
        assert_eq!(list.recipe_ids, BTreeSet::from([1, 5]));
    }
}
