use anyhow::Context;
use bichat::agent::{AnalysisAgent, QueryAgent, Supervisor};
use bichat::cli::InteractiveCli;
use bichat::config::Config;
use bichat::providers::create_provider;
use bichat::session::{SessionManager, SessionStore};
use bichat::warehouse::{build_table_name, BigQueryWarehouse, Warehouse};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "bichat")]
#[command(author, version, about = "Conversational business intelligence CLI", long_about = None)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(format!("bichat={}", config.log_level).parse()?),
        )
        .init();

    let db_path = config.session_db_path()?;
    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create data directory: {}", parent.display()))?;
    }
    let store = SessionStore::new(&db_path)?;
    let manager = SessionManager::new(store);

    let provider: Arc<dyn bichat::providers::Provider> =
        Arc::from(create_provider(&config.provider));

    let access_token = config
        .warehouse
        .access_token
        .as_deref()
        .context("No warehouse access token: set warehouse.access_token or WAREHOUSE_ACCESS_TOKEN")?;
    let warehouse: Arc<dyn Warehouse> = Arc::new(BigQueryWarehouse::new(
        &config.warehouse.project_id,
        access_token,
        config.safety.query_timeout_secs,
    ));
    let table = build_table_name(
        &config.warehouse.project_id,
        &config.warehouse.dataset,
        &config.warehouse.table,
    );

    let supervisor = Supervisor::new(provider.clone());
    let query_agent = QueryAgent::new(
        provider.clone(),
        warehouse,
        &table,
        config.safety.max_date_range_days,
    );
    let analysis_agent = AnalysisAgent::new(provider);

    let mut interactive = InteractiveCli::new(manager, supervisor, query_agent, analysis_agent)?;
    interactive.run().await
}
