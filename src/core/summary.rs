use super::engine::MONTHS_PER_YEAR;
use super::types::{AmortizationPeriod, AmortizationYear, ScheduleSummary};

pub fn summarize_schedule(schedule: &[AmortizationPeriod]) -> ScheduleSummary {
    let total_interest: f64 = schedule.iter().map(|p| p.interest).sum();
    let total_principal: f64 = schedule.iter().map(|p| p.principal).sum();

    ScheduleSummary {
        monthly_payment: schedule.first().map_or(0.0, |p| p.payment),
        total_interest,
        total_principal,
        total_repaid: total_interest + total_principal,
        periods: schedule.len(),
    }
}

/// Groups a schedule into calendar-free loan years of `MONTHS_PER_YEAR` periods each.
/// A trailing partial year is kept as its own bucket.
pub fn yearly_breakdown(schedule: &[AmortizationPeriod]) -> Vec<AmortizationYear> {
    schedule
        .chunks(MONTHS_PER_YEAR as usize)
        .zip(1u32..)
        .map(|(months, year)| AmortizationYear {
            year,
            interest: months.iter().map(|p| p.interest).sum(),
            principal: months.iter().map(|p| p.principal).sum(),
            closing_balance: months.last().map_or(0.0, |p| p.remaining_balance),
        })
        .collect()
}
