use tracing::trace;

use super::types::{
    AmortizationPeriod, InvestmentParameters, LoanParameters, ProfitabilityResult,
};

pub(super) const MONTHS_PER_YEAR: u32 = 12;
const FINAL_BALANCE_TOLERANCE: f64 = 0.01;

fn monthly_rate(annual_rate_percent: f64) -> f64 {
    annual_rate_percent / 100.0 / MONTHS_PER_YEAR as f64
}

/// Fixed monthly instalment of an amortizing loan.
///
/// `term_years` must be non-zero; a zero term divides by zero and yields a
/// non-finite payment. The principal is not validated.
pub fn compute_monthly_payment(principal: f64, annual_rate_percent: f64, term_years: u32) -> f64 {
    let rate = monthly_rate(annual_rate_percent);
    let periods = (term_years * MONTHS_PER_YEAR) as f64;

    if rate == 0.0 {
        return principal / periods;
    }

    let growth = (1.0 + rate).powf(periods);
    principal * rate * growth / (growth - 1.0)
}

/// Month-by-month breakdown of a loan, `term_years * 12` periods long.
///
/// The balance left after the last period is forced to exactly zero when it
/// is within a cent of it, and every reported balance is floored at zero.
pub fn generate_schedule(loan: &LoanParameters) -> Vec<AmortizationPeriod> {
    let payment =
        compute_monthly_payment(loan.principal, loan.annual_rate_percent, loan.term_years);
    let rate = monthly_rate(loan.annual_rate_percent);
    let periods = loan.term_years * MONTHS_PER_YEAR;

    let mut schedule = Vec::with_capacity(periods as usize);
    let mut balance = loan.principal;

    for month in 1..=periods {
        let interest = balance * rate;
        let principal = payment - interest;
        balance -= principal;

        if month == periods && balance.abs() < FINAL_BALANCE_TOLERANCE {
            trace!(residual = balance, "clearing final balance drift");
            balance = 0.0;
        }

        schedule.push(AmortizationPeriod {
            month,
            payment,
            interest,
            principal,
            remaining_balance: balance.max(0.0),
        });
    }

    schedule
}

/// Cash-flow and return metrics for a financed rental property.
///
/// ROI and net yield are reported as 0 whenever the initial investment is not
/// strictly positive.
pub fn compute_profitability(data: &InvestmentParameters) -> ProfitabilityResult {
    let monthly_payment =
        compute_monthly_payment(data.loan_amount, data.annual_rate_percent, data.term_years);

    let monthly_property_tax = data.annual_property_tax / MONTHS_PER_YEAR as f64;
    let monthly_net_cash_flow = data.monthly_rent - monthly_payment - monthly_property_tax;
    let annual_net_cash_flow = monthly_net_cash_flow * MONTHS_PER_YEAR as f64;

    let initial_investment = data.initial_investment();
    let total_return_over_term = annual_net_cash_flow * data.term_years as f64;

    let (roi_percent, net_yield_percent) = if initial_investment > 0.0 {
        (
            total_return_over_term / initial_investment * 100.0,
            annual_net_cash_flow / initial_investment * 100.0,
        )
    } else {
        (0.0, 0.0)
    };

    ProfitabilityResult {
        monthly_payment,
        initial_investment,
        monthly_net_cash_flow,
        annual_net_cash_flow,
        total_return_over_term,
        roi_percent,
        net_yield_percent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::{prop_assert, prop_assert_eq, proptest};

    const EPS: f64 = 1e-6;

    fn assert_approx(actual: f64, expected: f64) {
        assert!(
            (actual - expected).abs() <= EPS,
            "expected {expected}, got {actual}"
        );
    }

    fn assert_approx_tol(actual: f64, expected: f64, tol: f64) {
        assert!(
            (actual - expected).abs() <= tol,
            "expected {expected}, got {actual}, tolerance {tol}"
        );
    }

    fn sample_investment() -> InvestmentParameters {
        InvestmentParameters {
            property_price: 140_000.0,
            loan_amount: 130_000.0,
            annual_rate_percent: 3.1,
            term_years: 20,
            monthly_rent: 490.0,
            renovation_costs: 35_000.0,
            notary_fees: 8_500.0,
            loan_fees: 2_500.0,
            broker_commission: 1_500.0,
            tax_reduction: 12_000.0,
            annual_property_tax: 2_400.0,
        }
    }

    #[test]
    fn zero_rate_payment_is_straight_line() {
        assert_eq!(compute_monthly_payment(1200.0, 0.0, 1), 100.0);
        assert_eq!(compute_monthly_payment(240_000.0, 0.0, 20), 1_000.0);
    }

    #[test]
    fn annuity_payment_matches_reference_values() {
        assert_approx(compute_monthly_payment(162_500.0, 3.1, 20), 909.377_458_308_735);
        assert_approx(compute_monthly_payment(100_000.0, 6.0, 30), 599.550_525_152_757);
        assert_approx(compute_monthly_payment(220_000.0, 3.5, 25), 1_101.371_854_570_882);
    }

    #[test]
    fn payment_scales_with_principal_and_accepts_negative_amounts() {
        let base = compute_monthly_payment(100_000.0, 4.0, 15);
        assert_approx(compute_monthly_payment(200_000.0, 4.0, 15), 2.0 * base);
        assert_approx(compute_monthly_payment(-100_000.0, 4.0, 15), -base);
        assert_eq!(compute_monthly_payment(0.0, 4.0, 15), 0.0);
    }

    #[test]
    fn zero_term_payment_is_not_finite() {
        assert!(!compute_monthly_payment(100_000.0, 3.0, 0).is_finite());
        assert!(!compute_monthly_payment(100_000.0, 0.0, 0).is_finite());
    }

    #[test]
    fn zero_term_schedule_is_empty() {
        let loan = LoanParameters {
            principal: 100_000.0,
            annual_rate_percent: 3.0,
            term_years: 0,
        };
        assert!(generate_schedule(&loan).is_empty());
    }

    #[test]
    fn schedule_first_period_oracle_matches_hand_calculation() {
        // 162_500 * 0.031 / 12 = 419.791666...
        let loan = LoanParameters {
            principal: 162_500.0,
            annual_rate_percent: 3.1,
            term_years: 20,
        };
        let schedule = generate_schedule(&loan);
        let first = schedule[0];

        assert_eq!(first.month, 1);
        assert_approx(first.interest, 419.791_666_666_667);
        assert_approx(first.principal, 909.377_458_308_735 - 419.791_666_666_667);
        assert_approx(first.remaining_balance, 162_010.414_208_357_92);
    }

    #[test]
    fn schedule_total_interest_regression() {
        let loan = LoanParameters {
            principal: 162_500.0,
            annual_rate_percent: 3.1,
            term_years: 20,
        };
        let schedule = generate_schedule(&loan);
        let total_interest: f64 = schedule.iter().map(|p| p.interest).sum();
        let total_principal: f64 = schedule.iter().map(|p| p.principal).sum();

        assert_eq!(schedule.len(), 240);
        assert_approx_tol(total_interest, 55_750.589_994, 1e-4);
        assert_approx_tol(total_principal, 162_500.0, 1e-4);
    }

    #[test]
    fn scenario_twenty_five_year_loan_ends_at_zero() {
        let loan = LoanParameters {
            principal: 220_000.0,
            annual_rate_percent: 3.5,
            term_years: 25,
        };
        let schedule = generate_schedule(&loan);

        assert_eq!(schedule.len(), 300);
        assert_eq!(schedule.last().map(|p| p.remaining_balance), Some(0.0));
        for pair in schedule.windows(2) {
            assert!(pair[1].remaining_balance < pair[0].remaining_balance);
        }
    }

    #[test]
    fn zero_rate_schedule_has_no_interest() {
        let loan = LoanParameters {
            principal: 1_200.0,
            annual_rate_percent: 0.0,
            term_years: 1,
        };
        let schedule = generate_schedule(&loan);

        assert_eq!(schedule.len(), 12);
        for (idx, period) in schedule.iter().enumerate() {
            assert_eq!(period.month, idx as u32 + 1);
            assert_eq!(period.interest, 0.0);
            assert_eq!(period.principal, 100.0);
        }
        assert_eq!(schedule[10].remaining_balance, 100.0);
        assert_eq!(schedule[11].remaining_balance, 0.0);
    }

    #[test]
    fn negative_principal_balances_are_floored_at_zero() {
        let loan = LoanParameters {
            principal: -10_000.0,
            annual_rate_percent: 2.0,
            term_years: 2,
        };
        let schedule = generate_schedule(&loan);

        assert_eq!(schedule.len(), 24);
        assert!(schedule.iter().all(|p| p.remaining_balance == 0.0));
        assert!(schedule[0].payment < 0.0);
    }

    #[test]
    fn profitability_sample_investment_matches_hand_calculation() {
        let data = sample_investment();
        let result = compute_profitability(&data);

        // 140_000 - 130_000 + 35_000 + 8_500 + 2_500 + 1_500 - 12_000
        assert_approx(result.initial_investment, 45_500.0);
        assert_approx(result.monthly_payment, 727.501_966_646_988);
        // 490 - 727.50 - 200
        assert_approx(result.monthly_net_cash_flow, -437.501_966_646_988);
        assert_approx(result.annual_net_cash_flow, -5_250.023_599_763_856);
        assert_approx_tol(result.total_return_over_term, -105_000.471_995_277, 1e-5);
        assert_approx_tol(result.roi_percent, -230.770_268_121_488, 1e-6);
        assert_approx_tol(result.net_yield_percent, -11.538_513_406_074, 1e-6);
    }

    #[test]
    fn profitability_positive_cash_flow_yields_positive_returns() {
        let mut data = sample_investment();
        data.monthly_rent = 1_500.0;
        let result = compute_profitability(&data);

        assert!(result.monthly_net_cash_flow > 0.0);
        assert_approx(result.annual_net_cash_flow, result.monthly_net_cash_flow * 12.0);
        assert_approx(result.total_return_over_term, result.annual_net_cash_flow * 20.0);
        assert_approx(result.roi_percent, result.net_yield_percent * 20.0);
    }

    #[test]
    fn profitability_zero_initial_investment_reports_zero_roi_and_yield() {
        let mut data = sample_investment();
        // Outlay without the tax reduction is 57_500.
        data.tax_reduction = 57_500.0;
        let result = compute_profitability(&data);

        assert_eq!(result.initial_investment, 0.0);
        assert_eq!(result.roi_percent, 0.0);
        assert_eq!(result.net_yield_percent, 0.0);
        assert!(result.monthly_net_cash_flow < 0.0);
    }

    #[test]
    fn profitability_negative_initial_investment_reports_zero_roi_and_yield() {
        let mut data = sample_investment();
        data.tax_reduction = 100_000.0;
        data.monthly_rent = 3_000.0;
        let result = compute_profitability(&data);

        assert!(result.initial_investment < 0.0);
        assert!(result.annual_net_cash_flow > 0.0);
        assert_eq!(result.roi_percent, 0.0);
        assert_eq!(result.net_yield_percent, 0.0);
    }

    #[test]
    fn profitability_without_loan_only_charges_property_tax() {
        let mut data = sample_investment();
        data.loan_amount = 0.0;
        let result = compute_profitability(&data);

        assert_eq!(result.monthly_payment, 0.0);
        assert_approx(result.monthly_net_cash_flow, 490.0 - 200.0);
    }

    #[test]
    fn repeated_calls_are_bit_identical() {
        let loan = LoanParameters {
            principal: 187_345.67,
            annual_rate_percent: 4.27,
            term_years: 23,
        };
        assert_eq!(generate_schedule(&loan), generate_schedule(&loan));
        assert_eq!(
            compute_monthly_payment(187_345.67, 4.27, 23).to_bits(),
            compute_monthly_payment(187_345.67, 4.27, 23).to_bits()
        );

        let data = sample_investment();
        assert_eq!(compute_profitability(&data), compute_profitability(&data));
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_schedule_has_term_months_and_ends_at_exactly_zero(
            principal in 1u32..2_000_000,
            rate_bp in 0u32..1_500,
            term_years in 1u32..41
        ) {
            let loan = LoanParameters {
                principal: principal as f64,
                annual_rate_percent: rate_bp as f64 / 100.0,
                term_years,
            };
            let schedule = generate_schedule(&loan);

            prop_assert_eq!(schedule.len(), (term_years * 12) as usize);
            prop_assert_eq!(schedule.last().map(|p| p.remaining_balance), Some(0.0));
            for (idx, period) in schedule.iter().enumerate() {
                prop_assert_eq!(period.month, idx as u32 + 1);
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_interest_plus_principal_equals_payment(
            principal in 1u32..2_000_000,
            rate_bp in 0u32..1_500,
            term_years in 1u32..41
        ) {
            let loan = LoanParameters {
                principal: principal as f64,
                annual_rate_percent: rate_bp as f64 / 100.0,
                term_years,
            };
            let schedule = generate_schedule(&loan);

            for period in &schedule[..schedule.len() - 1] {
                prop_assert!((period.interest + period.principal - period.payment).abs() <= EPS);
            }
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(64))]

        #[test]
        fn prop_balance_is_non_increasing_and_non_negative(
            principal in 1u32..2_000_000,
            rate_bp in 0u32..1_500,
            term_years in 1u32..41
        ) {
            let loan = LoanParameters {
                principal: principal as f64,
                annual_rate_percent: rate_bp as f64 / 100.0,
                term_years,
            };
            let schedule = generate_schedule(&loan);

            prop_assert!(schedule[0].remaining_balance <= loan.principal);
            for pair in schedule.windows(2) {
                prop_assert!(pair[1].remaining_balance <= pair[0].remaining_balance);
            }
            prop_assert!(schedule.iter().all(|p| p.remaining_balance >= 0.0));
        }
    }

    proptest! {
        #![proptest_config(proptest::test_runner::Config::with_cases(48))]

        #[test]
        fn prop_non_positive_outlay_always_reports_zero_returns(
            rent in 0u32..5_000,
            excess_reduction in 0u32..200_000,
            property_tax in 0u32..10_000,
            term_years in 1u32..31
        ) {
            let mut data = sample_investment();
            data.monthly_rent = rent as f64;
            data.annual_property_tax = property_tax as f64;
            data.term_years = term_years;
            data.tax_reduction = 57_500.0 + excess_reduction as f64;

            let result = compute_profitability(&data);
            prop_assert!(result.initial_investment <= 0.0);
            prop_assert_eq!(result.roi_percent, 0.0);
            prop_assert_eq!(result.net_yield_percent, 0.0);
        }
    }
}
