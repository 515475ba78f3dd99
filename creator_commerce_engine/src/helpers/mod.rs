use ccg_common::EurCents;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
#[error("Invalid price value: {0}")]
pub struct PriceParseError(String);

/// The platform sends prices as decimal strings ("100.00"). Parse into cents without going
/// through floating point. One decimal digit means tenths ("100.5" is 100.50), more than two
/// digits is rejected rather than silently truncated.
pub fn parse_price(price: &str) -> Result<EurCents, PriceParseError> {
    let price = price.trim();
    let (negative, digits) = match price.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, price),
    };
    let mut parts = digits.split('.');
    let whole = parts
        .next()
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<i64>().ok())
        .ok_or_else(|| PriceParseError(price.to_string()))?;
    let cents = match parts.next() {
        None => 0,
        Some(frac) if frac.len() == 1 => frac.parse::<i64>().map(|t| t * 10).map_err(|_| PriceParseError(price.to_string()))?,
        Some(frac) if frac.len() == 2 => frac.parse::<i64>().map_err(|_| PriceParseError(price.to_string()))?,
        Some(_) => return Err(PriceParseError(price.to_string())),
    };
    if parts.next().is_some() {
        return Err(PriceParseError(price.to_string()));
    }
    let value = whole * 100 + cents;
    Ok(EurCents::from(if negative { -value } else { value }))
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parses_platform_price_strings() {
        assert_eq!(parse_price("100.00").unwrap(), EurCents::from(10_000));
        assert_eq!(parse_price("100").unwrap(), EurCents::from(10_000));
        assert_eq!(parse_price("100.5").unwrap(), EurCents::from(10_050));
        assert_eq!(parse_price("0.07").unwrap(), EurCents::from(7));
        assert_eq!(parse_price("-3.20").unwrap(), EurCents::from(-320));
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_price("").is_err());
        assert!(parse_price("abc").is_err());
        assert!(parse_price("1.234").is_err());
        assert!(parse_price("1.2.3").is_err());
        assert!(parse_price(".50").is_err());
    }
}
