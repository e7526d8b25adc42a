mod engine;
mod summary;
mod types;

pub use engine::{compute_monthly_payment, compute_profitability, generate_schedule};
pub use summary::{summarize_schedule, yearly_breakdown};
pub use types::{
    AmortizationPeriod, AmortizationYear, InvestmentParameters, LoanParameters,
    ProfitabilityResult, ScheduleSummary,
};
