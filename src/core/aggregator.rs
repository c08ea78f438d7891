//! 聚合器：解析 → 單位正規化 → 身分解析 → 依 (identity_key, unit_family) 分組加總。
//!
//! 資料路徑上不會回傳錯誤；無法加總的行一律變成 ambiguous 項目。

use crate::core::identity::IdentityResolver;
use crate::core::quantity::QuantityParser;
use crate::domain::amount::{self, Amount};
use crate::domain::model::{
    AggregatedEntry, AmbiguityReason, CanonicalIngredient, ParsedQuantity, RawIngredientLine, ServingsTarget,
    UnitFamily,
};
use num_rational::Ratio;
use num_traits::CheckedMul;
use rayon::prelude::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorSettings {
    /// 行數達到此值時改用 rayon 平行解析
    pub parallel_threshold: usize,
    /// 顯示用小數位數
    pub display_precision: u32,
}

impl Default for AggregatorSettings {
    fn default() -> Self {
        Self {
            parallel_threshold: 256,
            display_precision: 2,
        }
    }
}

/// 單行的分析結果；`index` 保留輸入順序
#[derive(Debug, Clone)]
struct LineAnalysis {
    index: usize,
    line: RawIngredientLine,
    parsed: ParsedQuantity,
    identity: CanonicalIngredient,
    family: UnitFamily,
    base_amount: Option<Amount>,
    unscaled: bool,
    /// 有數量但縮放或換算時溢位
    out_of_range: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    parser: QuantityParser,
    resolver: IdentityResolver,
    settings: AggregatorSettings,
}

impl Aggregator {
    pub fn new(parser: QuantityParser, resolver: IdentityResolver, settings: AggregatorSettings) -> Self {
        Self {
            parser,
            resolver,
            settings,
        }
    }

    pub fn parser(&self) -> &QuantityParser {
        &self.parser
    }

    pub fn resolver(&self) -> &IdentityResolver {
        &self.resolver
    }

    pub fn settings(&self) -> AggregatorSettings {
        self.settings
    }

    pub fn aggregate(&self, lines: &[RawIngredientLine], target: Option<ServingsTarget>) -> Vec<AggregatedEntry> {
        let analyses: Vec<LineAnalysis> = if lines.len() >= self.settings.parallel_threshold {
            tracing::debug!("🔀 Parsing {} lines in parallel", lines.len());
            lines
                .par_iter()
                .enumerate()
                .map(|(index, line)| self.analyze(index, line, target))
                .collect()
        } else {
            lines
                .iter()
                .enumerate()
                .map(|(index, line)| self.analyze(index, line, target))
                .collect()
        };

        // 合併階段單執行緒進行；BTreeMap 讓輸出順序與 hash 無關
        let mut quantified: BTreeMap<String, BTreeMap<UnitFamily, Vec<LineAnalysis>>> = BTreeMap::new();
        let mut missing: BTreeMap<String, Vec<LineAnalysis>> = BTreeMap::new();
        let mut out_of_range: BTreeMap<String, Vec<LineAnalysis>> = BTreeMap::new();
        for analysis in analyses {
            let key = analysis.identity.identity_key.clone();
            if analysis.out_of_range {
                out_of_range.entry(key).or_default().push(analysis);
            } else if analysis.base_amount.is_some() {
                quantified
                    .entry(key)
                    .or_default()
                    .entry(analysis.family)
                    .or_default()
                    .push(analysis);
            } else {
                missing.entry(key).or_default().push(analysis);
            }
        }

        let mut entries = Vec::with_capacity(quantified.len() + missing.len());
        for (key, families) in quantified {
            if let Some(mut group) = out_of_range.remove(&key) {
                group.extend(families.into_values().flatten());
                group.sort_by_key(|a| a.index);
                entries.push(self.out_of_range_entry(&key, group));
            } else if families.len() == 1 {
                for (family, group) in families {
                    entries.push(self.summed_entry(&key, family, group));
                }
            } else {
                let found: Vec<&str> = families.keys().map(|f| f.as_str()).collect();
                tracing::debug!("⚠️ '{}' appears in several unit families: {}", key, found.join(", "));
                let mut group: Vec<LineAnalysis> = families.into_values().flatten().collect();
                group.sort_by_key(|a| a.index);
                entries.push(self.ambiguous_entry(&key, group, AmbiguityReason::CrossUnitFamily));
            }
        }
        for (key, group) in out_of_range {
            entries.push(self.out_of_range_entry(&key, group));
        }
        for (key, group) in missing {
            tracing::debug!("⚠️ '{}' has no quantity in {} line(s)", key, group.len());
            entries.push(self.ambiguous_entry(&key, group, AmbiguityReason::MissingQuantity));
        }

        let ambiguous = entries.iter().filter(|e| e.ambiguous).count();
        tracing::info!(
            "🧮 Aggregated {} lines into {} entries ({} need attention)",
            lines.len(),
            entries.len(),
            ambiguous
        );
        entries
    }

    fn analyze(&self, index: usize, line: &RawIngredientLine, target: Option<ServingsTarget>) -> LineAnalysis {
        let parsed = self.parser.parse(&line.text);
        let identity = self.resolver.resolve(&parsed.name);

        let mut unscaled = false;
        let amount = match (parsed.amount, target) {
            (Some(amount), Some(target)) => match line.recipe_servings {
                Some(servings) if servings > 0 => {
                    amount.checked_mul(&Ratio::new(i128::from(target.get()), i128::from(servings)))
                }
                _ => {
                    unscaled = true;
                    Some(amount)
                }
            },
            (amount, _) => amount,
        };
        let (family, base_amount) = self.parser.units().normalize(parsed.unit, amount);
        let out_of_range = parsed.amount.is_some() && base_amount.is_none();

        LineAnalysis {
            index,
            line: line.clone(),
            parsed,
            identity,
            family,
            base_amount,
            unscaled,
            out_of_range,
        }
    }

    fn summed_entry(&self, key: &str, family: UnitFamily, group: Vec<LineAnalysis>) -> AggregatedEntry {
        let total = amount::checked_sum(group.iter().filter_map(|a| a.base_amount));
        let Some(total) = total else {
            return self.out_of_range_entry(key, group);
        };
        let precision = self.settings.display_precision;
        let units = self.parser.units();

        let (display_amount, unit_label) = match units.display_unit(family, total) {
            Some((token, value)) => {
                let plural = amount::format_amount(value, precision) != "1";
                (value, units.label(token, plural).to_string())
            }
            None if family.base_unit().is_some() => return self.out_of_range_entry(key, group),
            None => (total, String::new()),
        };

        let mut entry = self.base_entry(key, family, group);
        entry.total_amount = Some(total);
        entry.display_amount = Some(display_amount);
        entry.display_quantity = Some(amount::format_amount(display_amount, precision));
        entry.unit_label = unit_label;
        entry
    }

    fn out_of_range_entry(&self, key: &str, group: Vec<LineAnalysis>) -> AggregatedEntry {
        tracing::warn!("⚠️ '{}' amounts are too large to add up exactly, listing its lines instead", key);
        self.ambiguous_entry(key, group, AmbiguityReason::AmountOutOfRange)
    }

    fn ambiguous_entry(&self, key: &str, group: Vec<LineAnalysis>, reason: AmbiguityReason) -> AggregatedEntry {
        let mut entry = self.base_entry(key, UnitFamily::Unmatched, group);
        entry.ambiguous = true;
        entry.ambiguity = Some(reason);
        entry
    }

    fn base_entry(&self, key: &str, family: UnitFamily, group: Vec<LineAnalysis>) -> AggregatedEntry {
        let display_name = preferred_display_name(&group);
        let unscaled = group.iter().any(|a| a.unscaled);

        let mut modifiers: Vec<String> = Vec::new();
        for modifier in group.iter().filter_map(|a| a.parsed.modifier.as_ref()) {
            if !modifiers.contains(modifier) {
                modifiers.push(modifier.clone());
            }
        }

        AggregatedEntry {
            identity_key: key.to_string(),
            display_name,
            total_amount: None,
            display_amount: None,
            display_quantity: None,
            unit_family: family,
            unit_label: String::new(),
            source_lines: group.into_iter().map(|a| a.line).collect(),
            modifiers,
            ambiguous: false,
            ambiguity: None,
            unscaled,
            category: None,
        }
    }
}

/// 出現次數最多的顯示名稱，同票取字典序最小者，與輸入順序無關
fn preferred_display_name(group: &[LineAnalysis]) -> String {
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for analysis in group {
        *counts.entry(analysis.identity.display_name.as_str()).or_default() += 1;
    }
    counts
        .into_iter()
        .fold(None::<(&str, usize)>, |best, (name, count)| match best {
            Some((_, best_count)) if best_count >= count => best,
            _ => Some((name, count)),
        })
        .map(|(name, _)| name.to_string())
        .unwrap_or_default()
}
