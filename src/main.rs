use anyhow::Context;
use chrono::Datelike;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use prism_advisor::client::ScoringClient;
use prism_advisor::config::{ProviderTuning, Settings};
use prism_advisor::cpi::CpiTable;
use prism_advisor::market::YahooMarketData;
use prism_advisor::portfolio;
use prism_advisor::screen::{InflationBasis, ScreenPolicy, Screener};
use prism_advisor::universe::Universe;

#[derive(Debug, Parser)]
#[command(name = "prism_advisor", about = "Build and submit a portfolio for the current client brief")]
struct Args {
    /// Monthly CPI table (BLS CSV export).
    #[arg(long, default_value = "data/cpi_index_all_00-25.csv")]
    cpi_file: String,

    /// Ticker universe dataset (JSON). The built-in lists are used when omitted.
    #[arg(long)]
    universe_file: Option<String>,

    /// Disliked sectors to keep anyway, comma separated.
    #[arg(long, value_delimiter = ',')]
    keep_sectors: Vec<String>,

    /// Measure the CPI change chronologically (end against start) instead of
    /// the pipeline's start-over-end convention.
    #[arg(long)]
    chronological_inflation: bool,

    /// How many unfiltered picks to fall back to when the screen empties out.
    #[arg(long, default_value_t = 5)]
    fallback_picks: usize,

    /// Build and report the portfolio but skip the submission call.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "prism_advisor=info".into()),
        )
        .init();

    let args = Args::parse();
    let settings = Settings::from_env();
    let api_code = settings.require_api_code()?;
    let client = ScoringClient::new(settings.server_url.clone(), settings.server_port, api_code);

    match client.team_info().await {
        Ok(info) => tracing::info!(info = %info, "team status"),
        Err(err) => tracing::warn!(error = %err, "could not fetch team info"),
    }

    let brief = client
        .fetch_brief()
        .await
        .context("fetching the client brief failed")?;
    tracing::info!(
        start = %brief.start,
        end = %brief.end,
        age = brief.age,
        employed = brief.employed,
        salary = brief.salary,
        budget = brief.budget,
        dislikes = ?brief.dislikes,
        "client brief received"
    );

    let cpi = CpiTable::from_csv_file(&args.cpi_file)
        .with_context(|| format!("loading CPI table from '{}'", args.cpi_file))?;
    tracing::info!(months = cpi.months_len(), "CPI table loaded");

    let universe = match &args.universe_file {
        Some(path) => Universe::from_json_file(path)
            .with_context(|| format!("loading universe dataset from '{path}'"))?,
        None => Universe::builtin().clone(),
    };
    let range = brief.range();
    let candidates = universe.candidates_for(range.end.year());
    tracing::info!(
        version = %universe.version,
        year = range.end.year(),
        candidates = candidates.len(),
        "candidate universe ready"
    );

    let policy = ScreenPolicy {
        keep_sectors: args
            .keep_sectors
            .iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect(),
        inflation_basis: if args.chronological_inflation {
            InflationBasis::EndOverStart
        } else {
            InflationBasis::StartOverEnd
        },
    };

    let market = YahooMarketData::new(ProviderTuning::default());
    let screener = Screener::new(&market, &cpi, policy);

    let mut selected = screener.select(&candidates, range, &brief.dislikes).await;
    if selected.is_empty() {
        tracing::warn!(
            limit = args.fallback_picks,
            "nothing survived the screen, falling back to unfiltered picks"
        );
        selected = screener.fallback(&candidates, range, args.fallback_picks).await;
    }

    let risk_score = portfolio::risk_tolerance_score(brief.age, brief.salary, brief.budget);
    tracing::info!(risk_score, "risk tolerance scored");

    let lines = portfolio::build_lines(&market, &selected, range, risk_score).await;
    let entries = portfolio::allocate_shares(&lines, brief.budget);
    if entries.is_empty() {
        anyhow::bail!("no ticker produced a positive allocation, nothing to submit");
    }

    for entry in &entries {
        tracing::info!(ticker = %entry.ticker, shares = entry.shares, "portfolio line");
    }
    let spend = portfolio::total_spend(&lines, &entries);
    tracing::info!(
        spend,
        budget = brief.budget,
        remaining = brief.budget - spend,
        "portfolio sized"
    );

    if args.dry_run {
        tracing::info!("dry run, skipping submission");
        return Ok(());
    }

    let response = client
        .submit(&entries)
        .await
        .context("portfolio submission failed")?;
    tracing::info!(response = %response, "portfolio submitted");

    Ok(())
}
