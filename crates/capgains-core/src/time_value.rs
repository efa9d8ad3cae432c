use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::error::CapGainsError;
use crate::types::{Money, Rate};
use crate::CapGainsResult;

const CONVERGENCE_THRESHOLD: Decimal = dec!(0.0000001);
const MAX_IRR_ITERATIONS: u32 = 100;
const DAYS_PER_YEAR: Decimal = dec!(365.25);

/// Fractional years between two dates (never negative).
pub fn years_between(from: NaiveDate, to: NaiveDate) -> Decimal {
    let days = (to - from).num_days().max(0);
    Decimal::from(days) / DAYS_PER_YEAR
}

/// Compound annual growth rate from `start_value` to `end_value` over `years`.
pub fn cagr(start_value: Money, end_value: Money, years: Decimal) -> CapGainsResult<Rate> {
    if start_value <= Decimal::ZERO {
        return Err(CapGainsError::DivisionByZero {
            context: "CAGR start value".into(),
        });
    }
    if years <= Decimal::ZERO {
        return Err(CapGainsError::InvalidInput {
            field: "years".into(),
            reason: "CAGR requires a positive holding period".into(),
        });
    }
    if end_value <= Decimal::ZERO {
        return Ok(dec!(-1));
    }
    end_value
        .checked_div(start_value)
        .and_then(|multiple| multiple.checked_powd(Decimal::ONE / years))
        .map(|growth| growth - Decimal::ONE)
        .ok_or_else(|| CapGainsError::ConvergenceFailure {
            function: "CAGR".into(),
            iterations: 0,
            last_delta: end_value - start_value,
        })
}

/// Rate bounds for the Newton iteration. Below the floor the discount factor
/// collapses towards zero for long-dated flows.
const RATE_FLOOR: Rate = dec!(-0.99);
const RATE_CEILING: Rate = dec!(100);

/// NPV of the dated flows at `rate` and its derivative with respect to the
/// rate. `None` when any term leaves the Decimal range.
fn npv_with_derivative(flows: &[(Decimal, Money)], rate: Rate) -> Option<(Decimal, Decimal)> {
    let one_plus_r = Decimal::ONE + rate;
    let mut npv = Decimal::ZERO;
    let mut slope = Decimal::ZERO;

    for (years, amount) in flows {
        let discount = one_plus_r.checked_powd(*years)?;
        if discount.is_zero() {
            return None;
        }
        npv = npv.checked_add(amount.checked_div(discount)?)?;
        let weighted = years.checked_mul(*amount)?;
        slope = slope.checked_sub(weighted.checked_div(one_plus_r.checked_mul(discount)?)?)?;
    }
    Some((npv, slope))
}

/// Money-weighted rate of return of dated contributions (negative) and
/// redemptions (positive), solved by Newton-Raphson.
///
/// Deep losses over long horizons push the discount factors outside the
/// Decimal range; that is reported as `ConvergenceFailure` rather than
/// attempted.
pub fn xirr(dated_flows: &[(NaiveDate, Money)], guess: Rate) -> CapGainsResult<Rate> {
    if dated_flows.len() < 2 {
        return Err(CapGainsError::InsufficientData(
            "Money-weighted return needs a contribution and a redemption".into(),
        ));
    }

    let first_date = dated_flows[0].0;
    let flows: Vec<(Decimal, Money)> = dated_flows
        .iter()
        .map(|(date, amount)| (years_between(first_date, *date), *amount))
        .collect();

    let failure = |iterations: u32, last_delta: Decimal| CapGainsError::ConvergenceFailure {
        function: "exit simulation XIRR".into(),
        iterations,
        last_delta,
    };

    let mut rate = guess.clamp(RATE_FLOOR, RATE_CEILING);
    let mut last_npv = Decimal::ZERO;

    for i in 0..MAX_IRR_ITERATIONS {
        let (npv, slope) = npv_with_derivative(&flows, rate).ok_or_else(|| failure(i, last_npv))?;
        last_npv = npv;

        if npv.abs() < CONVERGENCE_THRESHOLD {
            return Ok(rate);
        }
        let step = npv.checked_div(slope).ok_or_else(|| failure(i, npv))?;
        rate = (rate - step).clamp(RATE_FLOOR, RATE_CEILING);
    }

    Err(failure(MAX_IRR_ITERATIONS, last_npv))
}

/// Money-weighted annualized return of a set of dated contributions that are
/// all realized for `ending_value` on `exit_date`.
///
/// A single contribution uses the closed-form CAGR; several use XIRR. When
/// neither can be solved the simple return is spread linearly over the
/// amount-weighted holding period.
pub fn annualized_return(
    contributions: &[(NaiveDate, Money)],
    exit_date: NaiveDate,
    ending_value: Money,
) -> CapGainsResult<Rate> {
    let invested: Money = contributions.iter().map(|(_, amount)| *amount).sum();
    if invested <= Decimal::ZERO {
        return Err(CapGainsError::InsufficientData(
            "Annualized return requires a positive invested amount".into(),
        ));
    }

    let solved = if let [(date, amount)] = contributions {
        cagr(*amount, ending_value, years_between(*date, exit_date))
    } else {
        let mut flows: Vec<(NaiveDate, Money)> =
            contributions.iter().map(|(date, amount)| (*date, -*amount)).collect();
        flows.sort_by_key(|(date, _)| *date);
        flows.push((exit_date, ending_value));
        xirr(&flows, dec!(0.10))
    };

    match solved {
        Ok(rate) => Ok(rate),
        Err(err) => {
            tracing::debug!(%err, "annualized return fell back to simple return");
            let weighted_years: Decimal = contributions
                .iter()
                .map(|(date, amount)| years_between(*date, exit_date) * *amount)
                .sum::<Decimal>()
                / invested;
            if weighted_years <= Decimal::ZERO {
                return Ok(Decimal::ZERO);
            }
            Ok((ending_value - invested) / invested / weighted_years)
        }
    }
}
