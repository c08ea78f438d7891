use clap::Parser;
use shoplist::config::cli::write_output;
use shoplist::core::export;
use shoplist::utils::error::{ErrorSeverity, ShopListError};
use shoplist::utils::{logger, validation::Validate};
use shoplist::{CliConfig, EngineConfig, JsonRecipeFile, ShoppingListEngine};
use std::path::Path;

fn main() {
    let config = CliConfig::parse();

    // 初始化日誌
    if config.log_json {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting shoplist CLI");
    if config.verbose {
        tracing::debug!("CLI config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if config.monitor {
        tracing::info!("🔍 System monitoring enabled");
    }

    match run(&config) {
        Ok(destination) => {
            tracing::info!("✅ Shopping list generated successfully!");
            if let Some(path) = destination {
                tracing::info!("📁 Output saved to: {}", path);
                println!("✅ Shopping list generated successfully!");
                println!("📁 Output saved to: {}", path);
            }
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Shopping list generation failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            // 輸出用戶友好的錯誤信息
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 建議: {}", e.recovery_suggestion());

            // 根據錯誤嚴重程度決定退出碼
            let exit_code = match e.severity() {
                ErrorSeverity::Low => 0,      // 警告，但成功
                ErrorSeverity::Medium => 2,   // 輸入錯誤
                ErrorSeverity::High => 1,     // 處理錯誤
                ErrorSeverity::Critical => 3, // 系統錯誤
            };

            if exit_code > 0 {
                std::process::exit(exit_code);
            }
        }
    }
}

/// 回傳輸出檔路徑；寫到 stdout 時為 None
fn run(config: &CliConfig) -> Result<Option<String>, ShopListError> {
    let engine_config = match &config.config {
        Some(path) => {
            tracing::info!("⚙️ Loading engine config from {}", path);
            EngineConfig::from_file(path)?
        }
        None => EngineConfig::default(),
    };
    let engine = ShoppingListEngine::new_with_monitoring(&engine_config, config.monitor)?;

    let mut request = JsonRecipeFile::new(&config.recipes).load_request()?;
    if config.servings.is_some() {
        request.servings_target = config.servings;
    }
    if config.name.is_some() {
        request.name = config.name.clone();
    }

    let list = engine.generate(&request)?;
    let rendered = export::render(&list, config.format)?;

    match &config.output {
        Some(path) => {
            write_output(Path::new(path), &rendered)?;
            Ok(Some(path.clone()))
        }
        None => {
            print!("{}", rendered);
            Ok(None)
        }
    }
}
