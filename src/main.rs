use augur::services::params::{last_trading_day, read_stock_groups};
use augur::services::{Analyzer, BatchAnalyzer, SeriesStore};
use augur::sources::{PriceSource, YahooFinanceClient};
use augur::Config;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "augur=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = Config::from_env();

    let source: Arc<dyn PriceSource> = Arc::new(YahooFinanceClient::new(Duration::from_secs(
        config.source_timeout_secs,
    ))?);

    let today = chrono::Local::now().date_naive();
    let date = last_trading_day(
        source.as_ref(),
        &config.reference_symbol,
        config.analysis_date.unwrap_or(today),
        today,
    )
    .await?;
    info!(
        "Analyzing {} (cache {})",
        date,
        config.store.cache_dir.display()
    );

    let store = Arc::new(SeriesStore::new(&config.store, source)?);
    let analyzer = Arc::new(Analyzer::new(&config, store));

    let groups = read_stock_groups(&config.stock_list_path)?;
    if groups.is_empty() {
        anyhow::bail!(
            "no symbols found in {}",
            config.stock_list_path.display()
        );
    }

    let report = BatchAnalyzer::new(analyzer, config.max_workers)
        .run_groups(&groups, date)
        .await;

    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(analysis) => println!("{}", serde_json::to_string(analysis)?),
            Err(e) => error!("{}: {}", outcome.symbol, e),
        }
    }

    for (group, ranked) in report.ranked_groups().iter().enumerate() {
        for (rank, analysis) in ranked.iter().enumerate() {
            info!(
                "group {} #{} {} {:.1} {}",
                group + 1,
                rank + 1,
                analysis.symbol,
                analysis.score.composite,
                analysis.score.label
            );
        }
    }

    if report.succeeded() == 0 {
        anyhow::bail!("every symbol failed for {}", date);
    }

    Ok(())
}
