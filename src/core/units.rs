//! 單位正規化：同一單位族內換算到基準單位（ml / g），並挑選顯示單位。
//!
//! 換算表是資料而非程式邏輯，可由 `[units.*]` 與 `[display]` 設定整張替換。

use crate::domain::amount::{self, Amount};
use crate::domain::model::{UnitFamily, UnitToken};
use num_rational::Ratio;
use num_traits::{CheckedDiv, CheckedMul};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq)]
pub struct UnitDefinition {
    pub token: UnitToken,
    /// 對基準單位的倍率
    pub factor: Amount,
    pub singular: String,
    pub plural: String,
    /// 小寫拼法，可含空白（"fl oz"）
    pub aliases: Vec<String>,
}

impl UnitDefinition {
    fn builtin(token: UnitToken, factor: &str, singular: &str, plural: &str, aliases: &[&str]) -> Self {
        Self {
            token,
            factor: amount::parse_decimal(factor).unwrap_or_else(|| Ratio::from_integer(1)),
            singular: singular.to_string(),
            plural: plural.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct UnitTable {
    definitions: BTreeMap<UnitToken, UnitDefinition>,
    aliases: HashMap<String, UnitToken>,
    max_alias_words: usize,
    /// 每個單位族的顯示候選單位，依倍率由大到小排列
    ladders: BTreeMap<UnitFamily, Vec<UnitToken>>,
}

impl Default for UnitTable {
    fn default() -> Self {
        Self::new(builtin_definitions(), BTreeMap::new())
    }
}

impl UnitTable {
    /// `ladders` 中沒有列出的單位族使用 [`default_ladder`]
    pub fn new(
        definitions: Vec<UnitDefinition>,
        ladders: BTreeMap<UnitFamily, Vec<UnitToken>>,
    ) -> Self {
        let mut by_token: BTreeMap<UnitToken, UnitDefinition> = builtin_definitions()
            .into_iter()
            .map(|d| (d.token, d))
            .collect();
        for definition in definitions {
            by_token.insert(definition.token, definition);
        }

        let mut aliases = HashMap::new();
        let mut max_alias_words = 1;
        for definition in by_token.values() {
            let spellings = definition
                .aliases
                .iter()
                .map(String::as_str)
                .chain([definition.token.key(), definition.singular.as_str(), definition.plural.as_str()]);
            for spelling in spellings {
                let normalized = normalize_spelling(spelling);
                if normalized.is_empty() {
                    continue;
                }
                max_alias_words = max_alias_words.max(normalized.split(' ').count());
                aliases.entry(normalized).or_insert(definition.token);
            }
        }

        let mut table = Self {
            definitions: by_token,
            aliases,
            max_alias_words,
            ladders: BTreeMap::new(),
        };

        for family in [UnitFamily::Volume, UnitFamily::Weight] {
            let mut ladder: Vec<UnitToken> = match ladders.get(&family) {
                Some(custom) => custom.iter().copied().filter(|t| t.family() == family).collect(),
                None => default_ladder(family),
            };
            ladder.sort_by(|a, b| table.factor(*b).cmp(&table.factor(*a)));
            ladder.dedup();
            table.ladders.insert(family, ladder);
        }

        table
    }

    pub fn factor(&self, token: UnitToken) -> Amount {
        self.definitions
            .get(&token)
            .map(|d| d.factor)
            .unwrap_or_else(|| Ratio::from_integer(1))
    }

    /// 單位拼法查詢，大小寫與句點不敏感（"Tbsp."、"fl. oz"）
    pub fn lookup(&self, spelling: &str) -> Option<UnitToken> {
        self.aliases.get(&normalize_spelling(spelling)).copied()
    }

    pub fn max_alias_words(&self) -> usize {
        self.max_alias_words
    }

    /// (unit, amount) -> (unit_family, base_amount)；沒有單位視為 Count。
    /// 換算溢位時 base_amount 為 None
    pub fn normalize(&self, unit: Option<UnitToken>, amount: Option<Amount>) -> (UnitFamily, Option<Amount>) {
        match unit {
            None => (UnitFamily::Count, amount),
            Some(token) => (
                token.family(),
                amount.and_then(|a| a.checked_mul(&self.factor(token))),
            ),
        }
    }

    /// 選出數值 >= 1 的最大單位；都不滿足時退回基準單位
    pub fn display_unit(&self, family: UnitFamily, base_amount: Amount) -> Option<(UnitToken, Amount)> {
        let base = family.base_unit()?;
        let one = Ratio::from_integer(1);

        self.ladders
            .get(&family)
            .and_then(|ladder| {
                ladder.iter().find_map(|&token| {
                    let value = base_amount.checked_div(&self.factor(token))?;
                    (value >= one).then_some((token, value))
                })
            })
            .or_else(|| base_amount.checked_div(&self.factor(base)).map(|value| (base, value)))
    }

    pub fn label(&self, token: UnitToken, plural: bool) -> &str {
        match self.definitions.get(&token) {
            Some(d) if plural => &d.plural,
            Some(d) => &d.singular,
            None => token.key(),
        }
    }

    pub fn ladder(&self, family: UnitFamily) -> &[UnitToken] {
        self.ladders.get(&family).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// 預設顯示單位：該單位族的所有單位（排序在 [`UnitTable::new`] 依倍率處理）
pub fn default_ladder(family: UnitFamily) -> Vec<UnitToken> {
    UnitToken::ALL
        .into_iter()
        .filter(|token| token.family() == family)
        .collect()
}

fn normalize_spelling(spelling: &str) -> String {
    spelling
        .to_lowercase()
        .replace(['.', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn builtin_definitions() -> Vec<UnitDefinition> {
    use UnitToken::*;
    vec![
        UnitDefinition::builtin(Tsp, "4.92892", "tsp", "tsp", &["tsp", "tsps", "teaspoon", "teaspoons"]),
        UnitDefinition::builtin(
            Tbsp,
            "14.7868",
            "tbsp",
            "tbsp",
            &["tbsp", "tbsps", "tbs", "tbl", "tablespoon", "tablespoons"],
        ),
        UnitDefinition::builtin(Cup, "236.588", "cup", "cups", &["cup", "cups"]),
        UnitDefinition::builtin(
            Ml,
            "1",
            "ml",
            "ml",
            &["ml", "mls", "milliliter", "milliliters", "millilitre", "millilitres"],
        ),
        UnitDefinition::builtin(L, "1000", "l", "l", &["l", "liter", "liters", "litre", "litres"]),
        UnitDefinition::builtin(
            FlOz,
            "29.5735",
            "fl oz",
            "fl oz",
            &["fl oz", "floz", "fluid ounce", "fluid ounces"],
        ),
        UnitDefinition::builtin(Pint, "473.176", "pint", "pints", &["pint", "pints", "pt", "pts"]),
        UnitDefinition::builtin(Quart, "946.353", "quart", "quarts", &["quart", "quarts", "qt", "qts"]),
        UnitDefinition::builtin(Gallon, "3785.41", "gallon", "gallons", &["gallon", "gallons", "gal", "gals"]),
        UnitDefinition::builtin(G, "1", "g", "g", &["g", "gram", "grams", "gramme", "grammes"]),
        UnitDefinition::builtin(
            Kg,
            "1000",
            "kg",
            "kg",
            &["kg", "kgs", "kilogram", "kilograms", "kilo", "kilos"],
        ),
        UnitDefinition::builtin(Oz, "28.3495", "oz", "oz", &["oz", "ounce", "ounces"]),
        UnitDefinition::builtin(Lb, "453.592", "lb", "lb", &["lb", "lbs", "pound", "pounds"]),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(text: &str) -> Amount {
        amount::parse_decimal(text).unwrap()
    }

    #[test]
    fn test_lookup_is_case_and_period_insensitive() {
        let table = UnitTable::default();
        assert_eq!(table.lookup("Tablespoons"), Some(UnitToken::Tbsp));
        assert_eq!(table.lookup("tbsp."), Some(UnitToken::Tbsp));
        assert_eq!(table.lookup("fl. oz"), Some(UnitToken::FlOz));
        assert_eq!(table.lookup("Fluid  Ounces"), Some(UnitToken::FlOz));
        assert_eq!(table.lookup("eggs"), None);
        assert_eq!(table.max_alias_words(), 2);
    }

    #[test]
    fn test_normalize_converts_to_base_unit() {
        let table = UnitTable::default();
        assert_eq!(
            table.normalize(Some(UnitToken::Cup), Some(Ratio::from_integer(2))),
            (UnitFamily::Volume, Some(dec("473.176")))
        );
        assert_eq!(
            table.normalize(Some(UnitToken::Kg), Some(dec("1.5"))),
            (UnitFamily::Weight, Some(Ratio::from_integer(1500)))
        );
    }

    #[test]
    fn test_normalize_without_unit_is_count() {
        let table = UnitTable::default();
        assert_eq!(
            table.normalize(None, Some(Ratio::from_integer(2))),
            (UnitFamily::Count, Some(Ratio::from_integer(2)))
        );
        assert_eq!(table.normalize(None, None), (UnitFamily::Count, None));
        assert_eq!(table.normalize(Some(UnitToken::Cup), None), (UnitFamily::Volume, None));
    }

    #[test]
    fn test_display_unit_picks_largest_unit_at_least_one() {
        let table = UnitTable::default();
        let (unit, value) = table
            .display_unit(UnitFamily::Weight, Ratio::from_integer(1500))
            .unwrap();
        assert_eq!(unit, UnitToken::Kg);
        assert_eq!(value, dec("1.5"));

        let (unit, value) = table.display_unit(UnitFamily::Volume, dec("354.882")).unwrap();
        assert_eq!(unit, UnitToken::Cup);
        assert_eq!(amount::format_amount(value, 2), "1.5");
    }

    #[test]
    fn test_default_ladder_covers_whole_family() {
        let table = UnitTable::default();
        assert_eq!(
            table.ladder(UnitFamily::Volume),
            &[
                UnitToken::Gallon,
                UnitToken::L,
                UnitToken::Quart,
                UnitToken::Pint,
                UnitToken::Cup,
                UnitToken::FlOz,
                UnitToken::Tbsp,
                UnitToken::Tsp,
                UnitToken::Ml,
            ]
        );
        assert_eq!(
            table.ladder(UnitFamily::Weight),
            &[UnitToken::Kg, UnitToken::Lb, UnitToken::Oz, UnitToken::G]
        );
        assert!(table.ladder(UnitFamily::Count).is_empty());
    }

    #[test]
    fn test_display_unit_keeps_familiar_kitchen_units() {
        let table = UnitTable::default();
        let (unit, value) = table.display_unit(UnitFamily::Volume, dec("7570.82")).unwrap();
        assert_eq!(unit, UnitToken::Gallon);
        assert_eq!(amount::format_amount(value, 2), "2");

        let (unit, value) = table.display_unit(UnitFamily::Volume, dec("14.7868")).unwrap();
        assert_eq!(unit, UnitToken::Tbsp);
        assert_eq!(amount::format_amount(value, 2), "1");

        // 3 tbsp 已達 1 fl oz，顯示為較大的 fl oz
        let (unit, value) = table.display_unit(UnitFamily::Volume, dec("44.3604")).unwrap();
        assert_eq!(unit, UnitToken::FlOz);
        assert_eq!(amount::format_amount(value, 2), "1.5");

        let (unit, value) = table.display_unit(UnitFamily::Weight, dec("113.398")).unwrap();
        assert_eq!(unit, UnitToken::Oz);
        assert_eq!(amount::format_amount(value, 2), "4");

        let (unit, _) = table.display_unit(UnitFamily::Volume, Ratio::from_integer(1200)).unwrap();
        assert_eq!(unit, UnitToken::L);
        let (unit, _) = table.display_unit(UnitFamily::Weight, Ratio::from_integer(500)).unwrap();
        assert_eq!(unit, UnitToken::Lb);
    }

    #[test]
    fn test_normalize_overflow_drops_base_amount() {
        let table = UnitTable::default();
        let huge = Ratio::new(1, i128::MAX);
        assert_eq!(table.normalize(Some(UnitToken::Cup), Some(huge)), (UnitFamily::Volume, None));
        assert!(table.display_unit(UnitFamily::Volume, Ratio::from_integer(i128::MAX)).is_some());
    }

    #[test]
    fn test_display_unit_falls_back_to_base_unit() {
        let table = UnitTable::default();
        let (unit, value) = table.display_unit(UnitFamily::Volume, dec("2.5")).unwrap();
        assert_eq!(unit, UnitToken::Ml);
        assert_eq!(value, dec("2.5"));
        assert!(table.display_unit(UnitFamily::Count, Ratio::from_integer(3)).is_none());
    }

    #[test]
    fn test_custom_ladder_restricts_display_units() {
        let mut ladders = BTreeMap::new();
        ladders.insert(UnitFamily::Volume, vec![UnitToken::Ml, UnitToken::L]);
        let table = UnitTable::new(Vec::new(), ladders);
        assert_eq!(table.ladder(UnitFamily::Volume), &[UnitToken::L, UnitToken::Ml]);

        let (unit, _) = table.display_unit(UnitFamily::Volume, dec("354.882")).unwrap();
        assert_eq!(unit, UnitToken::Ml);
    }

    #[test]
    fn test_overridden_factor_and_alias() {
        let mut cup = builtin_definitions()
            .into_iter()
            .find(|d| d.token == UnitToken::Cup)
            .unwrap();
        cup.factor = Ratio::from_integer(250);
        cup.aliases.push("tasse".to_string());
        let table = UnitTable::new(vec![cup], BTreeMap::new());

        assert_eq!(table.lookup("tasse"), Some(UnitToken::Cup));
        assert_eq!(
            table.normalize(Some(UnitToken::Cup), Some(Ratio::from_integer(2))),
            (UnitFamily::Volume, Some(Ratio::from_integer(500)))
        );
    }
}
