//! 數量解析器：把一行食材文字拆成 (數量, 單位, 名稱, 修飾語)。
//!
//! 開頭的數量以小型文法處理，而不是一串正規表達式：
//!
//! ```text
//! number  := simple | integer ws (fraction | vulgar)
//! simple  := vulgar | integer vulgar? | decimal | integer "/" integer
//! lead    := number (ws? ("-" | "–" | "to") ws? number)?
//! ```
//!
//! 解析永遠不會失敗；開頭數字格式錯誤時整行降級為名稱。

use crate::core::units::UnitTable;
use crate::domain::amount::{self, Amount};
use crate::domain::model::{ParsedQuantity, UnitToken};
use num_traits::CheckedAdd;
use std::sync::Arc;

/// 解析器使用的字彙，全部可由設定檔替換
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParserVocabulary {
    /// "a"、"some"、"a few"：沒有數值的數量詞，直接捨棄
    pub quantity_words: Vec<String>,
    /// "pinch"、"dash"：無法加總的模糊份量，移到 modifier
    pub vague_measures: Vec<String>,
    /// 名稱結尾的附註（"to taste"）
    pub note_phrases: Vec<String>,
    /// 單位之後的連接詞（"2 cups of flour"）
    pub connectors: Vec<String>,
}

impl Default for ParserVocabulary {
    fn default() -> Self {
        fn owned(words: &[&str]) -> Vec<String> {
            words.iter().map(|w| w.to_string()).collect()
        }
        Self {
            quantity_words: owned(&["a", "an", "some", "few", "a few", "several", "a couple of", "a little"]),
            vague_measures: owned(&[
                "pinch", "pinches", "dash", "dashes", "handful", "handfuls", "splash", "splashes",
                "sprinkle", "sprinkles",
            ]),
            note_phrases: owned(&["to taste", "or to taste", "as needed", "for garnish", "for serving", "optional", "if desired"]),
            connectors: owned(&["of"]),
        }
    }
}

#[derive(Debug, Clone)]
pub struct QuantityParser {
    units: Arc<UnitTable>,
    vocabulary: ParserVocabulary,
}

impl Default for QuantityParser {
    fn default() -> Self {
        Self::new(Arc::new(UnitTable::default()), ParserVocabulary::default())
    }
}

/// 開頭數量的掃描結果
#[derive(Debug, PartialEq)]
enum Lead<'a> {
    Absent,
    Malformed,
    Value {
        amount: Amount,
        lexeme: &'a str,
        range: Option<String>,
        rest: &'a str,
    },
}

impl QuantityParser {
    pub fn new(units: Arc<UnitTable>, vocabulary: ParserVocabulary) -> Self {
        Self { units, vocabulary }
    }

    pub fn units(&self) -> &UnitTable {
        &self.units
    }

    pub fn parse(&self, line: &str) -> ParsedQuantity {
        let trimmed = line
            .trim()
            .trim_start_matches(['-', '*', '•', '·'])
            .trim();
        if trimmed.is_empty() {
            return ParsedQuantity::unparsed(line);
        }

        // 括號內容與逗號後的子句都是修飾語（"(diced)"、", room temperature"）
        let mut bracket_notes = Vec::new();
        let without_brackets = extract_parentheticals(trimmed, &mut bracket_notes);
        let mut clauses = without_brackets.split(',');
        let head = clauses
            .next()
            .unwrap_or_default()
            .trim()
            .trim_end_matches(['.', ';', ':'])
            .trim();
        let clause_notes: Vec<String> = clauses
            .map(|c| c.trim().trim_end_matches('.').trim().to_string())
            .filter(|c| !c.is_empty())
            .collect();

        let mut leading_notes = Vec::new();
        let (mut amount, lexeme, rest) = match scan_lead(head) {
            Lead::Malformed => return ParsedQuantity::unparsed(trimmed),
            Lead::Absent => (None, "", head),
            Lead::Value {
                amount,
                lexeme,
                range,
                rest,
            } => {
                leading_notes.extend(range);
                (Some(amount), lexeme, rest)
            }
        };

        let words: Vec<&str> = rest.split_whitespace().collect();
        let mut pos = 0;

        let mut quantity_word = false;
        if amount.is_none() {
            if let Some(n) = match_phrase(&words, &self.vocabulary.quantity_words) {
                pos += n;
                quantity_word = true;
            }
        }

        // "2-inch"、"8-ounce"：尺寸描述，不是數量
        if words.get(pos).is_some_and(|w| is_size_word(w)) {
            leading_notes.push(words[pos].to_string());
            pos += 1;
        }

        let mut unit = None;
        if amount.is_some() || quantity_word {
            if let Some((token, n)) = self.match_unit(&words[pos..]) {
                unit = Some(token);
                pos += n;
            }
        }

        if unit.is_none() {
            if let Some(n) = match_phrase(&words[pos..], &self.vocabulary.vague_measures) {
                let measure = words[pos..pos + n].join(" ");
                // "2 pinches salt" 無法加總，數量一併移到 modifier
                let note = if amount.take().is_some() {
                    format!("{} {}", lexeme, measure)
                } else {
                    measure
                };
                leading_notes.push(note);
                pos += n;
                pos += match_phrase(&words[pos..], &self.vocabulary.connectors).unwrap_or(0);
            }
        } else {
            pos += match_phrase(&words[pos..], &self.vocabulary.connectors).unwrap_or(0);
        }

        let mut name_words: Vec<&str> = words[pos..].to_vec();
        let mut trailing_notes = Vec::new();
        while let Some(note) = self.strip_note_phrase(&mut name_words) {
            trailing_notes.push(note);
        }
        trailing_notes.reverse();

        let name = name_words
            .join(" ")
            .trim_matches(|c: char| c.is_whitespace() || matches!(c, ',' | '.' | ';' | ':' | '-'))
            .to_string();
        if name.is_empty() {
            return ParsedQuantity::unparsed(trimmed);
        }

        let notes: Vec<String> = leading_notes
            .into_iter()
            .chain(bracket_notes)
            .chain(clause_notes)
            .chain(trailing_notes)
            .collect();

        ParsedQuantity {
            amount,
            unit,
            name,
            modifier: (!notes.is_empty()).then(|| notes.join(", ")),
        }
    }

    /// 先試多字單位（"fl oz"），再試單字
    fn match_unit(&self, words: &[&str]) -> Option<(UnitToken, usize)> {
        let longest = self.units.max_alias_words().min(words.len());
        (1..=longest)
            .rev()
            .find_map(|n| self.units.lookup(&words[..n].join(" ")).map(|token| (token, n)))
    }

    fn strip_note_phrase(&self, words: &mut Vec<&str>) -> Option<String> {
        let mut best: Option<usize> = None;
        for phrase in &self.vocabulary.note_phrases {
            let phrase_words: Vec<&str> = phrase.split_whitespace().collect();
            let n = phrase_words.len();
            if n == 0 || n > words.len() {
                continue;
            }
            let tail = &words[words.len() - n..];
            if words_match(tail, &phrase_words) && best.map_or(true, |b| n > b) {
                best = Some(n);
            }
        }
        let n = best?;
        let note = words.split_off(words.len() - n).join(" ");
        Some(note)
    }
}

fn words_match(words: &[&str], phrase: &[&str]) -> bool {
    words.len() == phrase.len()
        && words
            .iter()
            .zip(phrase)
            .all(|(w, p)| w.to_lowercase() == p.to_lowercase())
}

/// 在字串開頭找最長的詞組，回傳吃掉的字數
fn match_phrase(words: &[&str], phrases: &[String]) -> Option<usize> {
    phrases
        .iter()
        .filter_map(|phrase| {
            let phrase_words: Vec<&str> = phrase.split_whitespace().collect();
            let n = phrase_words.len();
            (n > 0 && n <= words.len() && words_match(&words[..n], &phrase_words)).then_some(n)
        })
        .max()
}

fn extract_parentheticals(text: &str, notes: &mut Vec<String>) -> String {
    let mut outside = String::with_capacity(text.len());
    let mut inside = String::new();
    let mut depth = 0usize;

    for c in text.chars() {
        match c {
            '(' | '[' => {
                if depth > 0 {
                    inside.push(c);
                }
                depth += 1;
            }
            ')' | ']' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    push_note(notes, &inside);
                    inside.clear();
                    outside.push(' ');
                } else {
                    inside.push(c);
                }
            }
            ')' | ']' => {}
            _ if depth > 0 => inside.push(c),
            _ => outside.push(c),
        }
    }
    // 括號未閉合時，剩下的內容仍視為修飾語
    push_note(notes, &inside);
    outside
}

fn push_note(notes: &mut Vec<String>, text: &str) {
    let note = text.trim();
    if !note.is_empty() {
        notes.push(note.to_string());
    }
}

struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str) -> Self {
        Self { text, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.text[self.pos..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn rest(&self) -> &'a str {
        &self.text[self.pos..]
    }

    fn skip_spaces(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
        self.pos > start
    }

    fn digits(&mut self) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.bump();
        }
        &self.text[start..self.pos]
    }
}

fn is_fraction_slash(c: char) -> bool {
    c == '/' || c == '\u{2044}'
}

fn is_range_dash(c: char) -> bool {
    matches!(c, '-' | '–' | '—')
}

/// "2-inch"、"1½-inch"、"8-ounce"
fn is_size_word(word: &str) -> bool {
    let Some((size, measure)) = word.split_once(is_range_dash) else {
        return false;
    };
    !size.is_empty()
        && size
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '.' | '/') || amount::vulgar_fraction(c).is_some())
        && measure.chars().next().is_some_and(char::is_alphabetic)
}

/// simple := vulgar | integer vulgar? | decimal | integer "/" integer
/// 第二個回傳值表示是否為純整數（可接續成帶分數）
fn scan_simple(cursor: &mut Cursor<'_>) -> Result<Option<(Amount, bool)>, ()> {
    let Some(first) = cursor.peek() else {
        return Ok(None);
    };

    if let Some(value) = amount::vulgar_fraction(first) {
        cursor.bump();
        return Ok(Some((value, false)));
    }

    let starts_decimal = first == '.' && cursor.peek_second().is_some_and(|c| c.is_ascii_digit());
    if !first.is_ascii_digit() && !starts_decimal {
        return Ok(None);
    }

    let integer = cursor.digits();
    match cursor.peek() {
        Some('.') if cursor.peek_second().is_some_and(|c| c.is_ascii_digit()) || integer.is_empty() => {
            cursor.bump();
            let fraction = cursor.digits();
            let value = amount::parse_decimal(&format!("{}.{}", integer, fraction)).ok_or(())?;
            Ok(Some((value, false)))
        }
        Some(c) if is_fraction_slash(c) => {
            cursor.bump();
            let denominator = cursor.digits();
            let value = amount::parse_fraction(integer, denominator).ok_or(())?;
            Ok(Some((value, false)))
        }
        Some(c) if amount::vulgar_fraction(c).is_some() => {
            cursor.bump();
            let whole = amount::parse_decimal(integer).ok_or(())?;
            let part = amount::vulgar_fraction(c).ok_or(())?;
            Ok(Some((whole.checked_add(&part).ok_or(())?, false)))
        }
        _ => {
            let value = amount::parse_decimal(integer).ok_or(())?;
            Ok(Some((value, true)))
        }
    }
}

/// number := simple | integer ws (fraction | vulgar)
fn scan_number(cursor: &mut Cursor<'_>) -> Result<Option<Amount>, ()> {
    let Some((value, is_integer)) = scan_simple(cursor)? else {
        return Ok(None);
    };
    if !is_integer {
        return Ok(Some(value));
    }

    // 帶分數："1 1/2"、"1 ½"
    let save = cursor.pos;
    if !cursor.skip_spaces() {
        return Ok(Some(value));
    }
    if let Some(part) = cursor.peek().and_then(amount::vulgar_fraction) {
        cursor.bump();
        return Ok(Some(value.checked_add(&part).ok_or(())?));
    }
    match cursor.peek() {
        Some(c) if c.is_ascii_digit() => {
            let numerator = cursor.digits();
            if cursor.peek().is_some_and(is_fraction_slash) {
                cursor.bump();
                let denominator = cursor.digits();
                let fraction = amount::parse_fraction(numerator, denominator).ok_or(())?;
                Ok(Some(value.checked_add(&fraction).ok_or(())?))
            } else {
                cursor.pos = save;
                Ok(Some(value))
            }
        }
        _ => {
            cursor.pos = save;
            Ok(Some(value))
        }
    }
}

fn scan_lead(head: &str) -> Lead<'_> {
    let mut cursor = Cursor::new(head);
    let low = match scan_number(&mut cursor) {
        Err(()) => return Lead::Malformed,
        Ok(None) => return Lead::Absent,
        Ok(Some(value)) => value,
    };
    let low_end = cursor.pos;
    if cursor.peek().is_some_and(is_range_dash) && cursor.peek_second().is_some_and(char::is_alphabetic) {
        return Lead::Absent;
    }

    // 範圍："2-3"、"2 – 3"、"2 to 3"，取下限
    let save = cursor.pos;
    cursor.skip_spaces();
    let has_separator = match cursor.peek() {
        Some(c) if is_range_dash(c) => {
            cursor.bump();
            true
        }
        Some('t') | Some('T') => {
            let rest = cursor.rest();
            let is_to = rest.get(..2).is_some_and(|w| w.eq_ignore_ascii_case("to"))
                && rest.get(2..).is_some_and(|tail| tail.starts_with(char::is_whitespace));
            if is_to {
                cursor.pos += 2;
            }
            is_to
        }
        _ => false,
    };

    if has_separator {
        cursor.skip_spaces();
        let high_start = cursor.pos;
        match scan_number(&mut cursor) {
            Err(()) => return Lead::Malformed,
            Ok(Some(high)) => {
                let low_text = head[..low_end].trim();
                let high_text = head[high_start..cursor.pos].trim();
                return Lead::Value {
                    amount: if high < low { high } else { low },
                    lexeme: head[..cursor.pos].trim(),
                    range: Some(format!("range:{}-{}", low_text, high_text)),
                    rest: cursor.rest(),
                };
            }
            Ok(None) => cursor.pos = save,
        }
    } else {
        cursor.pos = save;
    }

    Lead::Value {
        amount: low,
        lexeme: head[..low_end].trim(),
        range: None,
        rest: cursor.rest(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_rational::Ratio;

    fn parse(line: &str) -> ParsedQuantity {
        QuantityParser::default().parse(line)
    }

    fn ratio(n: i128, d: i128) -> Option<Amount> {
        Some(Ratio::new(n, d))
    }

    #[test]
    fn test_integer_with_unit() {
        let parsed = parse("2 cups rice");
        assert_eq!(parsed.amount, ratio(2, 1));
        assert_eq!(parsed.unit, Some(UnitToken::Cup));
        assert_eq!(parsed.name, "rice");
        assert_eq!(parsed.modifier, None);
    }

    #[test]
    fn test_decimal_fraction_and_mixed_numbers() {
        assert_eq!(parse("0.5 kg beef").amount, ratio(1, 2));
        assert_eq!(parse(".25 l milk").amount, ratio(1, 4));
        assert_eq!(parse("3/4 cup sugar").amount, ratio(3, 4));
        let mixed = parse("1 1/2 cups sugar");
        assert_eq!(mixed.amount, ratio(3, 2));
        assert_eq!(mixed.unit, Some(UnitToken::Cup));
        assert_eq!(mixed.name, "sugar");
    }

    #[test]
    fn test_vulgar_fractions() {
        let half = parse("½ tsp salt");
        assert_eq!(half.amount, ratio(1, 2));
        assert_eq!(half.unit, Some(UnitToken::Tsp));
        assert_eq!(half.name, "salt");
        assert_eq!(parse("1½ cups milk").amount, ratio(3, 2));
        assert_eq!(parse("2 ¼ cups flour").amount, ratio(9, 4));
        assert_eq!(parse("1\u{2044}3 cup oil").amount, ratio(1, 3));
    }

    #[test]
    fn test_ranges_use_lower_bound() {
        let dash = parse("2-3 cloves garlic");
        assert_eq!(dash.amount, ratio(2, 1));
        assert_eq!(dash.unit, None);
        assert_eq!(dash.name, "cloves garlic");
        assert_eq!(dash.modifier.as_deref(), Some("range:2-3"));

        let words = parse("2 to 3 tbsp butter");
        assert_eq!(words.amount, ratio(2, 1));
        assert_eq!(words.unit, Some(UnitToken::Tbsp));
        assert_eq!(words.name, "butter");
        assert_eq!(words.modifier.as_deref(), Some("range:2-3"));

        assert_eq!(parse("1/2 - 1 cup stock").amount, ratio(1, 2));
    }

    #[test]
    fn test_size_words_are_not_quantities() {
        let ginger = parse("2-inch piece ginger");
        assert_eq!(ginger.amount, None);
        assert_eq!(ginger.unit, None);
        assert_eq!(ginger.name, "piece ginger");
        assert_eq!(ginger.modifier.as_deref(), Some("2-inch"));

        let counted = parse("1 2-inch piece ginger, peeled");
        assert_eq!(counted.amount, ratio(1, 1));
        assert_eq!(counted.name, "piece ginger");
        assert_eq!(counted.modifier.as_deref(), Some("2-inch, peeled"));

        let cans = parse("2 14½-ounce cans tomatoes");
        assert_eq!(cans.amount, ratio(2, 1));
        assert_eq!(cans.unit, None);
        assert_eq!(cans.name, "cans tomatoes");
        assert_eq!(cans.modifier.as_deref(), Some("14½-ounce"));
    }

    #[test]
    fn test_glued_and_punctuated_units() {
        let grams = parse("200g flour");
        assert_eq!(grams.amount, ratio(200, 1));
        assert_eq!(grams.unit, Some(UnitToken::G));
        assert_eq!(grams.name, "flour");

        assert_eq!(parse("2 Tbsp. olive oil").unit, Some(UnitToken::Tbsp));
        let rum = parse("1 fl oz dark rum");
        assert_eq!(rum.unit, Some(UnitToken::FlOz));
        assert_eq!(rum.name, "dark rum");
        assert_eq!(parse("2 cups of flour").name, "flour");
    }

    #[test]
    fn test_bare_count() {
        let eggs = parse("2 eggs");
        assert_eq!(eggs.amount, ratio(2, 1));
        assert_eq!(eggs.unit, None);
        assert_eq!(eggs.name, "eggs");
    }

    #[test]
    fn test_no_quantity_lines() {
        let salt = parse("salt to taste");
        assert_eq!(salt.amount, None);
        assert_eq!(salt.unit, None);
        assert_eq!(salt.name, "salt");
        assert_eq!(salt.modifier.as_deref(), Some("to taste"));

        let cumin = parse("pinch of cumin");
        assert_eq!(cumin.amount, None);
        assert_eq!(cumin.name, "cumin");
        assert_eq!(cumin.modifier.as_deref(), Some("pinch"));

        let pinch = parse("a pinch of salt");
        assert_eq!(pinch.amount, None);
        assert_eq!(pinch.name, "salt");
    }

    #[test]
    fn test_quantity_words_are_discarded() {
        let parsley = parse("some parsley");
        assert_eq!(parsley.amount, None);
        assert_eq!(parsley.unit, None);
        assert_eq!(parsley.name, "parsley");

        assert_eq!(parse("a few basil leaves").name, "basil leaves");

        let sugar = parse("a cup of sugar");
        assert_eq!(sugar.amount, None);
        assert_eq!(sugar.unit, Some(UnitToken::Cup));
        assert_eq!(sugar.name, "sugar");
    }

    #[test]
    fn test_counted_vague_measure_loses_amount() {
        let salt = parse("2 pinches salt");
        assert_eq!(salt.amount, None);
        assert_eq!(salt.name, "salt");
        assert_eq!(salt.modifier.as_deref(), Some("2 pinches"));
    }

    #[test]
    fn test_modifiers_from_brackets_and_clauses() {
        let onions = parse("2 onions (diced), room temperature");
        assert_eq!(onions.amount, ratio(2, 1));
        assert_eq!(onions.name, "onions");
        assert_eq!(onions.modifier.as_deref(), Some("diced, room temperature"));

        let pepper = parse("Salt and pepper, to taste");
        assert_eq!(pepper.name, "Salt and pepper");
        assert_eq!(pepper.modifier.as_deref(), Some("to taste"));

        let butter = parse("1 cup butter (2 sticks, softened)");
        assert_eq!(butter.unit, Some(UnitToken::Cup));
        assert_eq!(butter.name, "butter");
        assert_eq!(butter.modifier.as_deref(), Some("2 sticks, softened"));
    }

    #[test]
    fn test_malformed_quantity_degrades_to_name() {
        let parsed = parse("  1/0 cup flour ");
        assert_eq!(parsed.amount, None);
        assert_eq!(parsed.unit, None);
        assert_eq!(parsed.name, "1/0 cup flour");
        assert_eq!(parse("3/ cup milk").name, "3/ cup milk");
    }

    #[test]
    fn test_empty_name_degrades_to_name() {
        let parsed = parse("2 cups");
        assert_eq!(parsed.amount, None);
        assert_eq!(parsed.name, "2 cups");
        assert_eq!(parse("   ").name, "");
    }

    #[test]
    fn test_list_bullets_are_ignored() {
        let apples = parse("- 3 apples");
        assert_eq!(apples.amount, ratio(3, 1));
        assert_eq!(apples.name, "apples");
    }

    #[test]
    fn test_custom_vocabulary() {
        let vocabulary = ParserVocabulary {
            quantity_words: vec!["un peu de".to_string()],
            vague_measures: Vec::new(),
            note_phrases: vec!["au goût".to_string()],
            connectors: vec!["de".to_string()],
        };
        let parser = QuantityParser::new(Arc::new(UnitTable::default()), vocabulary);
        let parsed = parser.parse("un peu de sel au goût");
        assert_eq!(parsed.amount, None);
        assert_eq!(parsed.name, "sel");
        assert_eq!(parsed.modifier.as_deref(), Some("au goût"));
        assert_eq!(parser.parse("2 cups de farine").name, "farine");
    }
}
