use anyhow::{bail, Context, Result};
use paper_trade_analytics::{
    inner_join, moving_averages, regress, return_comparison, rolling_volatility, rsi,
    series_overview, simple_return_points, SeriesPoint, DEFAULT_RSI_WINDOW,
    DEFAULT_VOLATILITY_WINDOW, MA_WINDOWS,
};
use paper_trade_core::{AppConfig, BarTable, ConfigLoader, DailyBar};
use paper_trade_data::{
    HistoryRefresher, HistoryStore, HoldingsRepository, PostgresHistoryStore,
};
use paper_trade_optimizer::{
    holdings_weights, ReturnsSnapshot, SimulationConfig, SymbolHistory,
};
use serde_json::json;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use tracing::info;

use crate::csv_source::CsvQuoteSource;

async fn connect(config: &AppConfig) -> Result<PostgresHistoryStore> {
    PostgresHistoryStore::connect(&config.database.url, config.database.max_connections).await
}

/// Refreshes bar history for the given symbols from a CSV quote directory.
pub async fn refresh(symbols: &[String], benchmark: bool, data_dir: &Path) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = connect(&config).await?;
    store.run_migrations().await?;

    let quotes = Arc::new(CsvQuoteSource::new(data_dir.to_path_buf()));
    let refresher = HistoryRefresher::new(
        Arc::new(store),
        quotes,
        config.market_data.retention_days,
    );

    if benchmark {
        let outcome = refresher
            .refresh_benchmark(&config.market_data.benchmark_symbol)
            .await
            .context("benchmark refresh failed")?;
        info!(
            symbol = %outcome.symbol,
            retained = outcome.retained,
            "benchmark refreshed"
        );
    }

    let report = refresher.refresh_all(symbols).await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.failed.is_empty() {
        bail!("{} of {} symbols failed to refresh", report.failed.len(), symbols.len());
    }
    Ok(())
}

/// Prints the chart analytics payloads for one symbol as JSON.
pub async fn analytics(symbol: &str) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = connect(&config).await?;

    let bars = store.read_series(BarTable::StockHistory, symbol).await?;
    if bars.is_empty() {
        bail!("no stored history for {symbol}; run a refresh first");
    }
    let benchmark_bars = store
        .read_series(
            BarTable::BenchmarkHistory,
            &config.market_data.benchmark_symbol,
        )
        .await?;

    let closes: Vec<_> = bars.iter().map(|b| b.close).collect();
    let payload = json!({
        "overview": series_overview(&bars),
        "comparison": return_comparison(
            &simple_return_points(&bars),
            &simple_return_points(&benchmark_bars),
        ),
        "regression": regress(&inner_join(
            &simple_return_points(&bars),
            &simple_return_points(&benchmark_bars),
        )),
        "volatility": {
            "symbol": volatility_payload(&bars),
            "benchmark": volatility_payload(&benchmark_bars),
        },
        "rsi": rsi(&closes, DEFAULT_RSI_WINDOW),
        "moving_averages": moving_averages(&closes, &MA_WINDOWS),
    });

    println!("{}", serde_json::to_string_pretty(&payload)?);
    Ok(())
}

fn volatility_payload(bars: &[DailyBar]) -> serde_json::Value {
    let points: Vec<SeriesPoint> = simple_return_points(bars);
    let returns: Vec<Option<f64>> = points.iter().map(|p| p.value).collect();
    json!({
        "dates": bars.iter().map(|b| b.date).collect::<Vec<_>>(),
        "values": rolling_volatility(&returns, DEFAULT_VOLATILITY_WINDOW),
        "window": DEFAULT_VOLATILITY_WINDOW,
    })
}

/// Prints a user's efficient-frontier payload as JSON.
pub async fn frontier(user: i64, trials: Option<usize>, seed: Option<u64>) -> Result<()> {
    let config = ConfigLoader::load()?;
    let store = connect(&config).await?;
    let holdings_repo = HoldingsRepository::new(store.pool().clone());

    let symbols = holdings_repo.user_symbols(user).await?;
    if symbols.is_empty() {
        bail!("user {user} holds no symbols");
    }

    let mut series = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        let bars = store.read_series(BarTable::StockHistory, symbol).await?;
        if bars.is_empty() {
            bail!("no stored history for held symbol {symbol}; run a refresh first");
        }
        series.push(SymbolHistory::from_daily_bars(&bars));
    }
    let snapshot = ReturnsSnapshot::from_series(series, config.portfolio.risk_free_rate)?;

    let holdings = holdings_repo.holdings_for_user(user).await?;
    let latest_prices = store.latest_adjusted_closes(&symbols).await?;
    let weights = holdings_weights(&holdings, &latest_prices)?;
    let by_symbol: HashMap<&str, f64> = weights
        .iter()
        .map(|(symbol, weight)| (symbol.as_str(), *weight))
        .collect();
    let user_weights: Vec<f64> = snapshot
        .symbols()
        .iter()
        .map(|symbol| by_symbol.get(symbol.as_str()).copied().unwrap_or(0.0))
        .collect();

    let mut sim_config = SimulationConfig::new(trials.unwrap_or(config.portfolio.num_trials));
    if let Some(seed) = seed {
        sim_config = sim_config.with_seed(seed);
    }

    let plot = snapshot.plot_data(&user_weights, &sim_config)?;
    println!("{}", serde_json::to_string_pretty(&plot)?);
    Ok(())
}
