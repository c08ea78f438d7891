//! 精確的有理數數量。
//!
//! 食譜數量（"1 1/2"、"⅓"、"236.588"）一律以有理數保存，加總時不會累積浮點誤差；
//! 只有在顯示或序列化輸出時才轉成小數。

use num_rational::Ratio;
use num_traits::{CheckedAdd, CheckedMul, Zero};
use serde::Serializer;

pub type Amount = Ratio<i128>;

const MAX_INTEGER_DIGITS: usize = 18;
const MAX_FRACTION_DIGITS: usize = 12;

/// 解析十進位字串（"2"、"2.5"、".5"）為精確的有理數
pub fn parse_decimal(text: &str) -> Option<Amount> {
    let text = text.trim();
    let (int_part, frac_part) = text.split_once('.').unwrap_or((text, ""));

    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    if int_part.len() > MAX_INTEGER_DIGITS || frac_part.len() > MAX_FRACTION_DIGITS {
        return None;
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit()) || !frac_part.bytes().all(|b| b.is_ascii_digit())
    {
        return None;
    }

    let digits = format!("{}{}", int_part, frac_part);
    let numer: i128 = digits.parse().ok()?;
    let denom = 10_i128.checked_pow(frac_part.len() as u32)?;
    Some(Ratio::new(numer, denom))
}

/// 解析簡單分數 "1/2"，分母為 0 時回傳 None
pub fn parse_fraction(numer: &str, denom: &str) -> Option<Amount> {
    let n = parse_integer(numer)?;
    let d = parse_integer(denom)?;
    if d.is_zero() {
        return None;
    }
    Some(Ratio::new(n, d))
}

fn parse_integer(text: &str) -> Option<i128> {
    if text.is_empty() || text.len() > MAX_INTEGER_DIGITS || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    text.parse().ok()
}

/// Unicode 分數字元（½、⅓ …）
pub fn vulgar_fraction(c: char) -> Option<Amount> {
    let (n, d) = match c {
        '½' => (1, 2),
        '⅓' => (1, 3),
        '⅔' => (2, 3),
        '¼' => (1, 4),
        '¾' => (3, 4),
        '⅕' => (1, 5),
        '⅖' => (2, 5),
        '⅗' => (3, 5),
        '⅘' => (4, 5),
        '⅙' => (1, 6),
        '⅚' => (5, 6),
        '⅐' => (1, 7),
        '⅛' => (1, 8),
        '⅜' => (3, 8),
        '⅝' => (5, 8),
        '⅞' => (7, 8),
        '⅑' => (1, 9),
        '⅒' => (1, 10),
        _ => return None,
    };
    Some(Ratio::new(n, d))
}

/// 將設定檔中的浮點數（例如 236.588）以其最短十進位表示轉成精確值
pub fn from_f64(value: f64) -> Option<Amount> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    parse_decimal(&format!("{}", value))
}

pub fn to_f64(amount: Amount) -> f64 {
    *amount.numer() as f64 / *amount.denom() as f64
}

/// 逐一累加，任何一步溢位都回傳 None
pub fn checked_sum<I: IntoIterator<Item = Amount>>(values: I) -> Option<Amount> {
    values
        .into_iter()
        .try_fold(Amount::zero(), |total, value| total.checked_add(&value))
}

/// 固定小數位數四捨五入後輸出，並去掉尾端的 0（1.50 -> "1.5"，2.00 -> "2"）
pub fn format_amount(amount: Amount, precision: u32) -> String {
    let scale = 10_u128.pow(precision);
    let (numer, denom) = (*amount.numer(), *amount.denom());
    let mut whole = (numer / denom).unsigned_abs();
    let remainder = Ratio::new((numer % denom).unsigned_abs(), denom.unsigned_abs());

    let mut frac = match remainder.checked_mul(&Ratio::from_integer(scale)) {
        Some(scaled) => scaled.round().to_integer(),
        // 分母過大時小數部分改用浮點近似
        None => (*remainder.numer() as f64 / *remainder.denom() as f64 * scale as f64).round() as u128,
    };
    if frac >= scale {
        whole += 1;
        frac -= scale;
    }

    let sign = if numer < 0 && (whole > 0 || frac > 0) { "-" } else { "" };
    if frac == 0 {
        return format!("{}{}", sign, whole);
    }

    let frac_text = format!("{:0width$}", frac, width = precision as usize);
    format!("{}{}.{}", sign, whole, frac_text.trim_end_matches('0'))
}

pub fn serialize_optional<S: Serializer>(value: &Option<Amount>, serializer: S) -> Result<S::Ok, S::Error> {
    match value {
        Some(amount) => serializer.serialize_some(&to_f64(*amount)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_decimal() {
        assert_eq!(parse_decimal("2"), Some(Ratio::from_integer(2)));
        assert_eq!(parse_decimal("2.5"), Some(Ratio::new(5, 2)));
        assert_eq!(parse_decimal(".5"), Some(Ratio::new(1, 2)));
        assert_eq!(parse_decimal("236.588"), Some(Ratio::new(236_588, 1000)));
        assert_eq!(parse_decimal("."), None);
        assert_eq!(parse_decimal("1.2.3"), None);
        assert_eq!(parse_decimal("abc"), None);
    }

    #[test]
    fn test_parse_fraction_rejects_zero_denominator() {
        assert_eq!(parse_fraction("1", "2"), Some(Ratio::new(1, 2)));
        assert_eq!(parse_fraction("1", "0"), None);
        assert_eq!(parse_fraction("", "2"), None);
    }

    #[test]
    fn test_vulgar_fractions() {
        assert_eq!(vulgar_fraction('½'), Some(Ratio::new(1, 2)));
        assert_eq!(vulgar_fraction('⅔'), Some(Ratio::new(2, 3)));
        assert_eq!(vulgar_fraction('x'), None);
    }

    #[test]
    fn test_from_f64_uses_shortest_representation() {
        assert_eq!(from_f64(236.588), Some(Ratio::new(236_588, 1000)));
        assert_eq!(from_f64(1000.0), Some(Ratio::from_integer(1000)));
        assert_eq!(from_f64(-1.0), None);
        assert_eq!(from_f64(f64::NAN), None);
    }

    #[test]
    fn test_format_amount_trims_trailing_zeros() {
        assert_eq!(format_amount(Ratio::new(3, 2), 2), "1.5");
        assert_eq!(format_amount(Ratio::from_integer(2), 2), "2");
        assert_eq!(format_amount(Ratio::new(1, 3), 2), "0.33");
        assert_eq!(format_amount(Ratio::new(2, 3), 2), "0.67");
        assert_eq!(format_amount(Ratio::new(15_000_000_001, 10_000_000_000), 2), "1.5");
        assert_eq!(format_amount(Ratio::new(1999, 1000), 2), "2");
        assert_eq!(format_amount(Ratio::new(-1, 2), 2), "-0.5");
        assert_eq!(format_amount(Ratio::new(7, 4), 0), "2");
    }

    #[test]
    fn test_format_amount_handles_huge_denominators() {
        assert_eq!(format_amount(Ratio::new(1, i128::MAX), 2), "0");
        assert_eq!(format_amount(Ratio::new(i128::MAX - 1, i128::MAX), 2), "1");
        assert_eq!(format_amount(Ratio::new(i128::MAX, 2), 0), "85070591730234615865843651857942052864");
    }

    #[test]
    fn test_checked_sum_reports_overflow() {
        assert_eq!(
            checked_sum([Ratio::new(1, 2), Ratio::new(1, 3)]),
            Some(Ratio::new(5, 6))
        );
        assert_eq!(checked_sum(Vec::new()), Some(Ratio::from_integer(0)));
        assert_eq!(checked_sum([Ratio::from_integer(i128::MAX), Ratio::from_integer(1)]), None);
    }
}
