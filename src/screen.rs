//! Risk screen applied to the candidate universe.
//!
//! Candidates run through the checks in a fixed order and drop out on the
//! first failure: price availability, a usable profile with a sector, the
//! client's sector dislikes, systematic risk, liquidity, and finally a
//! positive inflation-adjusted return over the evaluation window.

use std::collections::BTreeSet;

use chrono::Datelike;

use crate::brief::DateRange;
use crate::cpi::CpiTable;
use crate::market::{MarketData, PriceRange};

/// Beta above this is rejected as too exposed to market swings.
pub const MAX_BETA: f64 = 1.2;
/// A candidate passes the liquidity check with either enough daily volume
/// or enough market cap.
pub const LIQUID_VOLUME_THRESHOLD: u64 = 100_000;
pub const LIQUID_MARKET_CAP_THRESHOLD: u64 = 500_000;

/// Which direction the CPI change is measured when adjusting returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InflationBasis {
    /// CPI at the window start measured against CPI at the window end:
    /// `(cpi_at_start - cpi_at_end) / cpi_at_end`. The scoring pipeline's
    /// convention; deflationary windows make this positive.
    #[default]
    StartOverEnd,
    /// Chronological change: `(cpi_at_end - cpi_at_start) / cpi_at_start`.
    EndOverStart,
}

/// Operator policy for a run. Overrides are decided up front, never
/// interactively.
#[derive(Debug, Clone, Default)]
pub struct ScreenPolicy {
    /// Disliked sectors the operator has explicitly chosen to keep anyway.
    pub keep_sectors: BTreeSet<String>,
    pub inflation_basis: InflationBasis,
}

pub struct Screener<'a> {
    market: &'a dyn MarketData,
    cpi: &'a CpiTable,
    policy: ScreenPolicy,
}

impl<'a> Screener<'a> {
    pub fn new(market: &'a dyn MarketData, cpi: &'a CpiTable, policy: ScreenPolicy) -> Self {
        Self {
            market,
            cpi,
            policy,
        }
    }

    /// Run every candidate through the risk checks. Survivors keep their
    /// candidate order.
    pub async fn select(
        &self,
        candidates: &[String],
        range: DateRange,
        avoid_sectors: &[String],
    ) -> Vec<String> {
        tracing::info!(
            candidates = candidates.len(),
            start = %range.start,
            end = %range.end,
            avoid = ?avoid_sectors,
            "screening candidates"
        );

        let mut accepted = Vec::new();
        for ticker in candidates {
            let Some(prices) = self.market.price_range(ticker, range.start, range.end).await
            else {
                tracing::info!(ticker = %ticker, "rejected: price data unavailable");
                continue;
            };
            let Some(profile) = self.market.profile(ticker).await else {
                tracing::info!(ticker = %ticker, "rejected: no profile data");
                continue;
            };
            let Some(sector) = profile.sector.as_deref() else {
                tracing::info!(ticker = %ticker, "rejected: no sector data");
                continue;
            };

            if avoid_sectors.iter().any(|avoided| avoided == sector) {
                if self.policy.keep_sectors.contains(sector) {
                    tracing::info!(ticker = %ticker, sector, "disliked sector kept by override");
                } else {
                    tracing::info!(ticker = %ticker, sector, "rejected: disliked sector");
                    continue;
                }
            }

            if let Some(beta) = profile.beta {
                if beta > MAX_BETA {
                    tracing::info!(ticker = %ticker, beta, "rejected: beta too high");
                    continue;
                }
            }

            if profile.average_volume <= LIQUID_VOLUME_THRESHOLD
                && profile.market_cap <= LIQUID_MARKET_CAP_THRESHOLD
            {
                tracing::info!(
                    ticker = %ticker,
                    volume = profile.average_volume,
                    market_cap = profile.market_cap,
                    "rejected: thin liquidity"
                );
                continue;
            }

            match self.excess_return(prices, range) {
                Some(excess) if excess > 0.0 => {
                    tracing::info!(ticker = %ticker, excess_return = excess, "accepted");
                    accepted.push(ticker.clone());
                }
                Some(excess) => {
                    tracing::info!(ticker = %ticker, excess_return = excess, "rejected: loses to inflation");
                }
                None => {
                    tracing::info!(ticker = %ticker, "rejected: return not computable for window");
                }
            }
        }

        tracing::info!(selected = accepted.len(), "screen finished");
        accepted
    }

    /// Unfiltered fallback when the screen empties out: the first `limit`
    /// candidates with available prices, in candidate order.
    pub async fn fallback(&self, candidates: &[String], range: DateRange, limit: usize) -> Vec<String> {
        let mut picks = Vec::new();
        for ticker in candidates {
            if picks.len() >= limit {
                break;
            }
            if self
                .market
                .price_range(ticker, range.start, range.end)
                .await
                .is_some()
            {
                picks.push(ticker.clone());
            }
        }
        picks
    }

    /// Nominal return minus the CPI change over the window, or `None` when
    /// either leg is not computable.
    fn excess_return(&self, prices: PriceRange, range: DateRange) -> Option<f64> {
        let nominal = prices.nominal_return()?;
        let cpi_at_start = self.cpi.get(range.start.year(), range.start.month())?;
        let cpi_at_end = self.cpi.get(range.end.year(), range.end.month())?;
        let inflation = match self.policy.inflation_basis {
            InflationBasis::StartOverEnd => (cpi_at_start - cpi_at_end) / cpi_at_end,
            InflationBasis::EndOverStart => (cpi_at_end - cpi_at_start) / cpi_at_start,
        };
        Some(nominal - inflation)
    }
}
