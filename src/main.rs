use clap::Parser;
use machine_locator::utils::error::ErrorSeverity;
use machine_locator::utils::{logger, validation::Validate};
use machine_locator::{
    lookup_from_config, CliConfig, ConfigProvider, EtlEngine, EtlError, LocalStorage,
    LocatorPipeline, Operation, RunReport, TomlConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 初始化日誌
    if cli.json_logs {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }

    tracing::info!("Starting machine-locator");
    tracing::debug!(
        "Operation: {}, input: {}, output: {}",
        cli.operation,
        cli.input,
        cli.output
    );

    let outcome = match cli.config.clone() {
        Some(path) => {
            tracing::info!("📁 Loading configuration from: {}", path);
            match TomlConfig::from_file(&path) {
                Ok(config) => run(config).await,
                Err(e) => Err(e),
            }
        }
        None => run(cli).await,
    };

    match outcome {
        Ok(report) => print_report(&report),
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Run failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            eprintln!("❌ Error: {}", e.user_friendly_message());
            eprintln!("💡 {}", e.recovery_suggestion());

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
    }

    Ok(())
}

async fn run<C: ConfigProvider + Validate>(config: C) -> Result<RunReport, EtlError> {
    // 驗證配置
    config.validate()?;

    let lookup = lookup_from_config(&config)?;
    let storage = LocalStorage::default();
    let pipeline = LocatorPipeline::new(storage, config, lookup);

    EtlEngine::new(pipeline).run().await
}

fn print_report(report: &RunReport) {
    let result = &report.result;

    match report.operation {
        Operation::Extract => {
            println!("Extracted {} locations", result.records.len());
        }
        Operation::Geocode => {
            if let Some(summary) = &result.geocode_summary {
                println!("\n{}", summary);
            }
        }
        Operation::Validate => {
            if let Some(validation) = &result.validation {
                print!("{}", validation);
            }
        }
        Operation::Summarize => {
            if let Some(summary) = &result.dataset_summary {
                print!("\n{}", summary);
            }
        }
    }

    if let Some(path) = &report.output_path {
        println!("📁 Results saved to: {}", path);
    }
}
