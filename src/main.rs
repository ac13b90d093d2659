use clap::Parser;
use std::path::Path;
use tramite_dashboard::domain::model::DashboardReport;
use tramite_dashboard::utils::error::ErrorSeverity;
use tramite_dashboard::utils::{logger, validation::Validate};
use tramite_dashboard::{
    ApiRecordSource, CliArgs, DashboardConfig, DashboardEngine, DashboardError, DashboardPipeline,
    LocalStorage, LookupTables,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger();
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("Starting tramite-dashboard");
    if args.verbose {
        tracing::debug!("CLI args: {:?}", args);
    }

    if let Err(e) = run(&args).await {
        tracing::error!(
            "❌ Dashboard run failed: {} (Category: {:?}, Severity: {:?})",
            e,
            e.category(),
            e.severity()
        );
        tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Sugerencia: {}", e.user_friendly_suggestion());

        // 根據錯誤嚴重程度決定退出碼
        let exit_code = match e.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        };

        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

async fn run(args: &CliArgs) -> Result<(), DashboardError> {
    tracing::info!("📋 Loading configuration from: {}", args.config);
    let mut config = DashboardConfig::from_file(&args.config)?;
    args.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        eprintln!("💡 Sugerencia: {}", e.user_friendly_suggestion());
        std::process::exit(1);
    }

    let reference = args.reference_instant()?;
    let settings = config.report_settings()?;
    tracing::info!("🕒 Reference instant: {}", reference.to_rfc3339());

    // 對照檔路徑相對於設定檔所在目錄
    let config_dir = Path::new(&args.config)
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let lookups = LookupTables::load(&LocalStorage::new(config_dir), &config.lookups).await?;

    let uncovered = settings.rules.uncovered(lookups.known_status_codes());
    if !uncovered.is_empty() {
        tracing::warn!(
            "⚠️ {} status codes belong to no category: {:?}",
            uncovered.len(),
            uncovered
        );
    }

    let monitor_enabled = args.monitor || config.monitoring_enabled();
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let source = ApiRecordSource::from_config(&config)?;
    tracing::info!("🌐 Source endpoint: {}", source.endpoint());
    let storage = LocalStorage::new(config.output.output_path.clone());
    let pipeline = DashboardPipeline::new(storage, source, settings, reference)
        .with_lookups(lookups)
        .with_query(args.query());
    let engine = DashboardEngine::new_with_monitoring(pipeline, monitor_enabled);

    if args.dry_run {
        let report = engine.build_report().await?;
        print_summary(&report);
        return Ok(());
    }

    let output_path = engine.run().await?;
    println!("✅ Dashboard report completed successfully!");
    println!("📁 Output saved to: {}", output_path);
    Ok(())
}

fn print_summary(report: &DashboardReport) {
    println!("📊 {} records ({} unclassified)", report.record_count, report.unclassified);
    for summary in &report.categories {
        match &summary.windows {
            Some(windows) => {
                let counts: Vec<String> = windows
                    .iter()
                    .map(|(kind, count)| format!("{} {}", kind.label(), count))
                    .collect();
                println!("  {}: {} [{}]", summary.title, summary.total, counts.join(", "));
            }
            None => println!("  {}: {}", summary.title, summary.total),
        }
    }
}
