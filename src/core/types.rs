use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoanParameters {
    #[serde(rename = "amount")]
    pub principal: f64,
    #[serde(rename = "interestRate")]
    pub annual_rate_percent: f64,
    #[serde(rename = "duration")]
    pub term_years: u32,
}

/// One month of an amortization schedule. `month` is 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationPeriod {
    pub month: u32,
    #[serde(rename = "monthlyPayment")]
    pub payment: f64,
    #[serde(rename = "interestPayment")]
    pub interest: f64,
    #[serde(rename = "principalPayment")]
    pub principal: f64,
    pub remaining_balance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvestmentParameters {
    pub property_price: f64,
    pub loan_amount: f64,
    #[serde(rename = "interestRate")]
    pub annual_rate_percent: f64,
    #[serde(rename = "duration")]
    pub term_years: u32,
    pub monthly_rent: f64,
    pub renovation_costs: f64,
    pub notary_fees: f64,
    pub loan_fees: f64,
    #[serde(rename = "cabinetCommission")]
    pub broker_commission: f64,
    pub tax_reduction: f64,
    #[serde(rename = "propertyTax")]
    pub annual_property_tax: f64,
}

impl InvestmentParameters {
    /// Cash the investor puts in up front. Can be zero or negative when the
    /// tax reduction outweighs the costs not covered by the loan.
    pub fn initial_investment(&self) -> f64 {
        self.property_price - self.loan_amount
            + self.renovation_costs
            + self.notary_fees
            + self.loan_fees
            + self.broker_commission
            - self.tax_reduction
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfitabilityResult {
    pub monthly_payment: f64,
    pub initial_investment: f64,
    pub monthly_net_cash_flow: f64,
    pub annual_net_cash_flow: f64,
    #[serde(rename = "totalReturn")]
    pub total_return_over_term: f64,
    #[serde(rename = "roi")]
    pub roi_percent: f64,
    #[serde(rename = "netYield")]
    pub net_yield_percent: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScheduleSummary {
    pub monthly_payment: f64,
    pub total_interest: f64,
    pub total_principal: f64,
    pub total_repaid: f64,
    pub periods: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AmortizationYear {
    pub year: u32,
    pub interest: f64,
    pub principal: f64,
    pub closing_balance: f64,
}
