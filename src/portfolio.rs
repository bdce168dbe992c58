//! Position sizing.
//!
//! Survivors of the screen get a weight proportional to reward per unit of
//! tolerated risk, then the budget is split across the weights and floored
//! into whole share counts so the total can never overshoot.

use crate::brief::DateRange;
use crate::market::MarketData;

/// Intermediate sizing line: the allocation strength and the price used to
/// turn it into shares.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioLine {
    pub ticker: String,
    pub weight: f64,
    pub price: f64,
}

/// Final output unit: a ticker and a whole share count, always at least 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortfolioEntry {
    pub ticker: String,
    pub shares: u64,
}

/// Blend of age, salary and budget in roughly `[0, 1]`; higher means the
/// client tolerates more risk.
pub fn risk_tolerance_score(age: u32, salary: f64, budget: f64) -> f64 {
    let age_factor = 1.0 - (age as f64 / 100.0);
    let salary_factor = (salary / 200_000.0).min(1.0);
    let budget_factor = (budget / 50_000.0).min(1.0);
    0.4 * age_factor + 0.3 * salary_factor + 0.3 * budget_factor
}

/// Allocation strength for one holding: absolute return per unit of beta,
/// damped by the client's risk tolerance. Zero whenever beta or the score
/// cannot support the division.
pub fn allocation_weight(risk_score: f64, nominal_return: f64, beta: Option<f64>) -> f64 {
    match beta {
        Some(beta) if beta > 0.0 && risk_score > 0.0 => {
            nominal_return.abs() / (risk_score * beta)
        }
        _ => 0.0,
    }
}

/// Re-price the selected tickers and derive their sizing lines. Tickers
/// whose weight comes out non-positive are dropped here rather than carried
/// through as zero-share noise.
pub async fn build_lines(
    market: &dyn MarketData,
    selected: &[String],
    range: DateRange,
    risk_score: f64,
) -> Vec<PortfolioLine> {
    let mut lines = Vec::new();
    for ticker in selected {
        let Some(prices) = market.price_range(ticker, range.start, range.end).await else {
            tracing::warn!(ticker = %ticker, "prices vanished between screen and sizing, dropping");
            continue;
        };
        let Some(nominal) = prices.nominal_return() else {
            tracing::warn!(ticker = %ticker, "non-positive open price, dropping");
            continue;
        };
        let beta = market.profile(ticker).await.and_then(|p| p.beta);
        let weight = allocation_weight(risk_score, nominal, beta);
        if weight > 0.0 && prices.close > 0.0 {
            lines.push(PortfolioLine {
                ticker: ticker.clone(),
                weight,
                price: prices.close,
            });
        } else {
            tracing::info!(ticker = %ticker, weight, "excluded from sizing");
        }
    }
    lines
}

/// Split `budget` across the weights and floor each target into whole
/// shares. Lines that floor to zero shares are dropped.
pub fn allocate_shares(lines: &[PortfolioLine], budget: f64) -> Vec<PortfolioEntry> {
    let total_weight: f64 = lines.iter().map(|line| line.weight).sum();
    if total_weight <= 0.0 {
        return Vec::new();
    }

    let mut entries = Vec::new();
    for line in lines {
        let target = line.weight / total_weight * budget;
        let shares = (target / line.price).floor() as u64;
        if shares >= 1 {
            entries.push(PortfolioEntry {
                ticker: line.ticker.clone(),
                shares,
            });
        }
    }
    entries
}

/// Total cost of the sized portfolio at its sizing prices.
pub fn total_spend(lines: &[PortfolioLine], entries: &[PortfolioEntry]) -> f64 {
    entries
        .iter()
        .map(|entry| {
            let price = lines
                .iter()
                .find(|line| line.ticker == entry.ticker)
                .map(|line| line.price)
                .unwrap_or(0.0);
            price * entry.shares as f64
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::market::stubs::StaticMarket;
    use crate::market::StockProfile;
    use chrono::NaiveDate;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn window() -> DateRange {
        DateRange {
            start: NaiveDate::from_ymd_opt(2014, 6, 6).unwrap(),
            end: NaiveDate::from_ymd_opt(2014, 8, 9).unwrap(),
        }
    }

    #[test]
    fn risk_score_blends_age_salary_and_budget() {
        let score = risk_tolerance_score(30, 60_000.0, 10_000.0);
        assert!((score - 0.43).abs() < 1e-12);
    }

    #[test]
    fn risk_score_caps_the_salary_and_budget_factors() {
        let capped = risk_tolerance_score(30, 1_000_000.0, 500_000.0);
        let at_cap = risk_tolerance_score(30, 200_000.0, 50_000.0);
        assert!((capped - at_cap).abs() < 1e-12);
    }

    #[test]
    fn younger_clients_score_higher() {
        let younger = risk_tolerance_score(25, 60_000.0, 10_000.0);
        let older = risk_tolerance_score(60, 60_000.0, 10_000.0);
        assert!(younger > older);
    }

    #[test]
    fn more_salary_or_budget_never_lowers_the_score() {
        let base = risk_tolerance_score(40, 50_000.0, 5_000.0);
        assert!(risk_tolerance_score(40, 80_000.0, 5_000.0) >= base);
        assert!(risk_tolerance_score(40, 50_000.0, 20_000.0) >= base);
        // Past the caps the factors saturate.
        assert_eq!(
            risk_tolerance_score(40, 300_000.0, 5_000.0),
            risk_tolerance_score(40, 200_000.0, 5_000.0)
        );
    }

    #[test]
    fn weight_is_reward_per_unit_of_risk() {
        let weight = allocation_weight(0.43, 0.2, Some(0.8));
        assert!((weight - 0.2 / (0.43 * 0.8)).abs() < 1e-12);
        // Losses still size a position; direction is ignored.
        assert_eq!(
            allocation_weight(0.43, -0.2, Some(0.8)),
            allocation_weight(0.43, 0.2, Some(0.8))
        );
    }

    #[test]
    fn weight_is_zero_without_a_usable_beta() {
        assert_eq!(allocation_weight(0.43, 0.2, None), 0.0);
        assert_eq!(allocation_weight(0.43, 0.2, Some(0.0)), 0.0);
        assert_eq!(allocation_weight(0.43, 0.2, Some(-0.5)), 0.0);
        assert_eq!(allocation_weight(0.0, 0.2, Some(0.8)), 0.0);
    }

    #[test]
    fn a_single_line_gets_the_floored_budget() {
        let lines = vec![PortfolioLine {
            ticker: "AAA".to_string(),
            weight: 0.5814,
            price: 12.0,
        }];
        let entries = allocate_shares(&lines, 10_000.0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].shares, 833);
        let spend = total_spend(&lines, &entries);
        assert!((spend - 9_996.0).abs() < 1e-9);
        assert!(spend <= 10_000.0);
    }

    #[test]
    fn lines_that_floor_to_zero_are_dropped() {
        let lines = vec![
            PortfolioLine {
                ticker: "CHEAP".to_string(),
                weight: 100.0,
                price: 1.0,
            },
            PortfolioLine {
                ticker: "DEAR".to_string(),
                weight: 0.001,
                price: 5_000.0,
            },
        ];
        let entries = allocate_shares(&lines, 1_000.0);
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].ticker, "CHEAP");
    }

    #[test]
    fn no_weights_means_no_portfolio() {
        assert!(allocate_shares(&[], 10_000.0).is_empty());
        let lines = vec![PortfolioLine {
            ticker: "AAA".to_string(),
            weight: 0.0,
            price: 12.0,
        }];
        assert!(allocate_shares(&lines, 10_000.0).is_empty());
    }

    #[test]
    fn spend_never_exceeds_the_budget() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..200 {
            let budget = rng.gen_range(100.0..50_000.0);
            let count = rng.gen_range(1..12);
            let lines: Vec<PortfolioLine> = (0..count)
                .map(|i| PortfolioLine {
                    ticker: format!("T{i}"),
                    weight: rng.gen_range(0.01..5.0),
                    price: rng.gen_range(0.5..900.0),
                })
                .collect();
            let entries = allocate_shares(&lines, budget);
            let spend = total_spend(&lines, &entries);
            assert!(spend <= budget, "spend {spend} exceeded budget {budget}");
        }
    }

    #[tokio::test]
    async fn build_lines_reprices_and_weighs_the_selection() {
        let market = StaticMarket::default()
            .with_prices("AAA", 10.0, 12.0)
            .with_profile(
                "AAA",
                StockProfile {
                    beta: Some(0.8),
                    ..StockProfile::default()
                },
            )
            .with_prices("NOBETA", 10.0, 12.0)
            .with_profile("NOBETA", StockProfile::default());

        let selected = vec!["AAA".to_string(), "NOBETA".to_string(), "GONE".to_string()];
        let lines = build_lines(&market, &selected, window(), 0.43).await;

        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].ticker, "AAA");
        assert_eq!(lines[0].price, 12.0);
        assert!((lines[0].weight - 0.2 / (0.43 * 0.8)).abs() < 1e-12);
    }
}
