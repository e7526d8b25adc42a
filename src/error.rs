use thiserror::Error;

/// A loan or investment parameter set the calculators must not be run on.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ParameterError {
    #[error("--duration must be > 0")]
    NonPositiveDuration,

    #[error("--duration must be <= {max} years")]
    DurationTooLong { max: u32 },

    #[error("--{field} must be a finite number")]
    NonFiniteValue { field: &'static str },

    #[error("--{field} must be >= 0")]
    NegativeValue { field: &'static str },

    #[error("--interest-rate {rate} is too small to amortize over the term; use 0 or a larger rate")]
    DegenerateRate { rate: f64 },
}
