use clap::Parser;
use funding_treemap::utils::error::ErrorSeverity;
use funding_treemap::utils::logger;
use funding_treemap::{CliConfig, LocalStorage, RenderEngine, RenderError};

#[tokio::main]
async fn main() {
    let cli = CliConfig::parse();

    // 初始化日誌
    logger::init_logger(cli.verbose, cli.log_format);

    tracing::info!("Starting funding-treemap");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    // 合併並驗證配置
    let config = match cli.resolve() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("❌ Configuration validation failed: {}", e);
            tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
            eprintln!("❌ {}", e.user_friendly_message());
            std::process::exit(1);
        }
    };

    let storage = LocalStorage::new(".");
    let engine = RenderEngine::new(storage, config);

    match engine.run(cli.export).await {
        Ok(report) => {
            tracing::info!("✅ Treemap rendered: {} departments", report.departments);
            println!(
                "✅ Rendered {} departments ({} word clouds, {} words)",
                report.departments, report.clouds_drawn, report.words_placed
            );
            if let Some(svg) = &report.svg_path {
                println!("📁 SVG saved to: {}", svg);
            }
            if let Some(png) = &report.png_path {
                println!("📁 PNG saved to: {}", png);
            }
        }
        Err(e) => exit_with(e),
    }
}

fn exit_with(e: RenderError) {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Render failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,      // 警告，但成功
        ErrorSeverity::Medium => 2,   // 重試錯誤
        ErrorSeverity::High => 1,     // 處理錯誤
        ErrorSeverity::Critical => 3, // 系統錯誤
    };

    if exit_code > 0 {
        std::process::exit(exit_code);
    }
}
