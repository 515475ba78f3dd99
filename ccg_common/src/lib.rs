mod eur;

pub mod op;
mod secret;

pub use eur::{CommissionRate, EurCents, EurConversionError, RateError, EUR_CURRENCY_CODE, EUR_CURRENCY_CODE_LOWER};
pub use secret::Secret;
