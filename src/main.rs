use clap::Parser;
use serde_json::{json, Value};
use std::sync::Arc;
use unemployment_forecast::domain::ports::{ConfigProvider, Storage};
use unemployment_forecast::utils::error::{ErrorSeverity, ForecastError};
use unemployment_forecast::utils::{logger, validation::Validate};
use unemployment_forecast::{
    build_dashboard, CategoryRegistry, CliConfig, Command, DashboardOptions, ForecastEngine,
    LocalStorage, ServiceConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    // 設定檔先讀取，日誌格式可能由設定檔決定
    let service = cli
        .config
        .as_deref()
        .map(ServiceConfig::from_file)
        .transpose()
        .map(|service| {
            service.map(|mut service| {
                cli.apply_overrides(&mut service);
                service
            })
        });

    let (verbose, json_logs) = match &service {
        Ok(Some(service)) => (service.logging.verbose, service.json_logs()),
        _ => (cli.verbose, cli.json_logs),
    };
    if json_logs {
        logger::init_json_logger(verbose);
    } else {
        logger::init_cli_logger(verbose);
    }

    tracing::info!("Starting unemployment-forecast CLI");
    if verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let outcome = match service {
        Ok(Some(service)) => run_with_service(&cli.command, &service).await,
        Ok(None) => run_with_cli(&cli).await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Err(e) => {
            // 記錄詳細錯誤信息
            tracing::error!(
                "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

            println!("{}", serde_json::to_string_pretty(&e.to_payload())?);
            eprintln!("❌ {}", e.user_friendly_message());

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
    }

    Ok(())
}

async fn run_with_service(command: &Command, service: &ServiceConfig) -> Result<Value, ForecastError> {
    if let Err(e) = service.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }
    execute(command, service, service.registry()?, &service.dashboard).await
}

async fn run_with_cli(cli: &CliConfig) -> Result<Value, ForecastError> {
    if let Err(e) = cli.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        return Err(e);
    }
    execute(
        &cli.command,
        cli,
        CategoryRegistry::builtin(),
        &DashboardOptions::default(),
    )
    .await
}

async fn execute(
    command: &Command,
    config: &impl ConfigProvider,
    registry: CategoryRegistry,
    dashboard: &DashboardOptions,
) -> Result<Value, ForecastError> {
    let storage = Arc::new(LocalStorage::new(config.base_path()));
    let engine = ForecastEngine::from_config(storage.clone(), Arc::new(registry), config)?;

    let output = match command {
        Command::Forecast {
            category,
            year,
            quarter,
        } => serde_json::to_value(engine.forecast_request(category, *year, *quarter).await?)?,
        Command::Categories => serde_json::to_value(engine.category_hierarchy())?,
        Command::Subcategories { main } => serde_json::to_value(engine.subcategories_of(main)?)?,
        Command::Fitted { category } => {
            engine.registry().binding(category)?;
            json!({
                "category": category,
                "fitted": engine.fitted_series(category).await,
            })
        }
        Command::Dashboard { output } => {
            let summary = build_dashboard(&engine, dashboard).await;
            match output {
                Some(path) => {
                    storage
                        .write_file(path, &serde_json::to_vec_pretty(&summary)?)
                        .await?;
                    json!({ "success": true, "written": path })
                }
                None => serde_json::to_value(&summary)?,
            }
        }
    };

    Ok(output)
}
