//! 逐行讀取 stdin，印出解析與身分解析結果，方便調整字彙設定

use anyhow::{Context, Result};
use shoplist::core::units::UnitTable;
use shoplist::domain::amount;
use shoplist::{EngineConfig, IdentityResolver, QuantityParser};
use std::io::{self, BufRead};
use std::sync::Arc;

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => EngineConfig::from_file(&path).with_context(|| format!("loading config from {}", path))?,
        None => EngineConfig::default(),
    };

    let units: Arc<UnitTable> = Arc::new(config.unit_table()?);
    let parser = QuantityParser::new(units.clone(), config.parser_vocabulary());
    let lexicon = config.lexicon();
    let synonyms = config.synonym_table(&lexicon);
    let resolver = IdentityResolver::new(lexicon, Arc::new(synonyms));

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line.context("reading stdin")?;
        if line.trim().is_empty() {
            continue;
        }

        let parsed = parser.parse(&line);
        let identity = resolver.resolve(&parsed.name);
        let (family, base) = units.normalize(parsed.unit, parsed.amount);

        println!("{}", line.trim());
        println!(
            "  amount={} unit={} name={:?} modifier={:?}",
            parsed.amount.map(|a| amount::format_amount(a, 4)).unwrap_or_else(|| "-".to_string()),
            parsed.unit.map(|u| u.key()).unwrap_or("-"),
            parsed.name,
            parsed.modifier.as_deref().unwrap_or("")
        );
        println!(
            "  key={:?} family={} base={}",
            identity.identity_key,
            family,
            base.map(|b| amount::format_amount(b, 4)).unwrap_or_else(|| "-".to_string())
        );
    }

    Ok(())
}
