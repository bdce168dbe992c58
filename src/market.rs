//! Market data gateway.
//!
//! Wraps the public Yahoo endpoints behind the [`MarketData`] trait: the v8
//! chart API for prices over a date range and the v10 quoteSummary API for
//! descriptive fields. Lookups that come up empty are absent values, never
//! errors; the screen treats absence as grounds for rejection.

use async_trait::async_trait;
use chrono::NaiveDate;
use rand::Rng;
use serde::Deserialize;
use std::time::Duration;

use crate::config::ProviderTuning;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";
const QUOTE_SUMMARY_URL: &str = "https://query1.finance.yahoo.com/v10/finance/quoteSummary";
const QUOTE_SUMMARY_MODULES: &str = "assetProfile,summaryDetail,price";
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Prices at the two ends of a requested window: the open on the first
/// traded day and the close on the last, each rounded to 4 decimal places.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRange {
    pub open: f64,
    pub close: f64,
}

impl PriceRange {
    /// Fractional return across the window, or `None` for a non-positive
    /// opening price.
    pub fn nominal_return(&self) -> Option<f64> {
        if self.open <= 0.0 {
            return None;
        }
        Some((self.close - self.open) / self.open)
    }
}

/// Descriptive snapshot for one ticker. Fields the provider does not carry
/// come back as `None`, except the counters, which default to zero the way
/// the provider itself reports them.
#[derive(Debug, Clone, Default)]
pub struct StockProfile {
    pub sector: Option<String>,
    pub industry: Option<String>,
    pub beta: Option<f64>,
    pub average_volume: u64,
    pub market_cap: u64,
    pub current_price: Option<f64>,
}

#[async_trait]
pub trait MarketData: Send + Sync {
    /// Prices for `ticker` across `[start, end]`, or `None` when the provider
    /// has no usable data for the window.
    async fn price_range(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Option<PriceRange>;

    /// Descriptive fields for `ticker`, or `None` once retries are exhausted.
    async fn profile(&self, ticker: &str) -> Option<StockProfile>;
}

/// Live gateway backed by the Yahoo endpoints.
pub struct YahooMarketData {
    http: reqwest::Client,
    tuning: ProviderTuning,
}

impl YahooMarketData {
    pub fn new(tuning: ProviderTuning) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .expect("failed to build HTTP client");
        Self { http, tuning }
    }

    fn chart_url(ticker: &str, start: NaiveDate, end: NaiveDate) -> String {
        let period1 = start.and_hms_opt(0, 0, 0).unwrap().and_utc().timestamp();
        let period2 = end.and_hms_opt(23, 59, 59).unwrap().and_utc().timestamp();
        format!("{CHART_URL}/{ticker}?period1={period1}&period2={period2}&interval=1d")
    }

    async fn fetch_chart(&self, ticker: &str, start: NaiveDate, end: NaiveDate) -> Option<PriceRange> {
        let url = Self::chart_url(ticker, start, end);
        let response = self.http.get(&url).send().await.ok()?;
        if !response.status().is_success() {
            return None;
        }
        let chart: ChartResponse = response.json().await.ok()?;
        price_range_from_chart(chart)
    }

    async fn fetch_profile_once(&self, ticker: &str) -> anyhow::Result<StockProfile> {
        let url = format!("{QUOTE_SUMMARY_URL}/{ticker}?modules={QUOTE_SUMMARY_MODULES}");
        let response = self.http.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("quoteSummary returned HTTP {status}");
        }
        let body: QuoteSummaryResponse = response.json().await?;
        let entry = body
            .quote_summary
            .result
            .unwrap_or_default()
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("quoteSummary returned no result"))?;
        Ok(profile_from_entry(entry))
    }
}

#[async_trait]
impl MarketData for YahooMarketData {
    async fn price_range(&self, ticker: &str, start: NaiveDate, end: NaiveDate)
        -> Option<PriceRange> {
        let range = self.fetch_chart(ticker, start, end).await;
        if range.is_none() {
            tracing::debug!(ticker = %ticker, start = %start, end = %end, "no usable chart data");
        }
        range
    }

    async fn profile(&self, ticker: &str) -> Option<StockProfile> {
        let attempts = self.tuning.retry_attempts.max(1);
        for attempt in 1..=attempts {
            // The provider rate-limits aggressively; pace every call.
            tokio::time::sleep(self.tuning.pace).await;

            match self.fetch_profile_once(ticker).await {
                Ok(profile) => return Some(profile),
                Err(err) if attempt == attempts => {
                    tracing::warn!(ticker = %ticker, attempts, error = %err, "profile lookup exhausted retries");
                }
                Err(err) => {
                    let delay = backoff_delay(&self.tuning, attempt);
                    tracing::warn!(ticker = %ticker, attempt, delay_ms = delay.as_millis() as u64, error = %err, "profile lookup failed, retrying");
                    tokio::time::sleep(delay).await;
                }
            }
        }
        None
    }
}

/// Jittered exponential backoff: uniform over
/// `[backoff_min, min(backoff_max, backoff_min * 2^(attempt - 1))]`.
fn backoff_delay(tuning: &ProviderTuning, attempt: u32) -> Duration {
    let floor = tuning.backoff_min.as_secs_f64();
    let exp = floor * 2f64.powi(attempt.saturating_sub(1) as i32);
    let ceil = tuning.backoff_max.as_secs_f64().min(exp).max(floor);
    let secs = rand::thread_rng().gen_range(floor..=ceil);
    Duration::from_secs_f64(secs)
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

fn price_range_from_chart(chart: ChartResponse) -> Option<PriceRange> {
    let data = chart.chart.result?.into_iter().next()?;
    let quote = data.indicators.quote.into_iter().next()?;
    // Untraded days show up as nulls; take the window's first and last fills.
    let open = quote.open.iter().copied().flatten().next()?;
    let close = quote.close.iter().rev().copied().flatten().next()?;
    Some(PriceRange {
        open: round4(open),
        close: round4(close),
    })
}

fn profile_from_entry(entry: QuoteSummaryEntry) -> StockProfile {
    let asset = entry.asset_profile.unwrap_or_default();
    let detail = entry.summary_detail.unwrap_or_default();
    let price = entry.price.unwrap_or_default();

    let market_cap = price
        .market_cap
        .as_ref()
        .and_then(|v| v.raw)
        .or_else(|| detail.market_cap.as_ref().and_then(|v| v.raw));

    StockProfile {
        sector: asset.sector.filter(|s| !s.is_empty()),
        industry: asset.industry.filter(|s| !s.is_empty()),
        beta: detail.beta.and_then(|v| v.raw),
        average_volume: detail
            .average_volume
            .and_then(|v| v.raw)
            .map(|v| v as u64)
            .unwrap_or(0),
        market_cap: market_cap.map(|v| v as u64).unwrap_or(0),
        current_price: price.regular_market_price.and_then(|v| v.raw),
    }
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteData {
    open: Vec<Option<f64>>,
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResponse {
    #[serde(rename = "quoteSummary")]
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    result: Option<Vec<QuoteSummaryEntry>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct QuoteSummaryEntry {
    #[serde(rename = "assetProfile")]
    asset_profile: Option<AssetProfileModule>,
    #[serde(rename = "summaryDetail")]
    summary_detail: Option<SummaryDetailModule>,
    price: Option<PriceModule>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct AssetProfileModule {
    sector: Option<String>,
    industry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct SummaryDetailModule {
    beta: Option<RawValue>,
    #[serde(rename = "averageVolume")]
    average_volume: Option<RawValue>,
    #[serde(rename = "marketCap")]
    market_cap: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct PriceModule {
    #[serde(rename = "regularMarketPrice")]
    regular_market_price: Option<RawValue>,
    #[serde(rename = "marketCap")]
    market_cap: Option<RawValue>,
}

/// Yahoo wraps scalars as `{"raw": 1.23, "fmt": "1.23"}`.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}
