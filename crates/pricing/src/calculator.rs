use stockflow_core::Price;

use crate::rate::RateError;

/// Sum of `quantity * price` over the given lines.
///
/// Recomputed on every read; nothing here is stored.
pub fn total<I>(lines: I) -> f64
where
    I: IntoIterator<Item = (i64, Price)>,
{
    lines
        .into_iter()
        .map(|(quantity, price)| quantity as f64 * price.amount())
        .sum()
}

/// `total` converted with `rate` (local units per USD).
pub fn usd_total(total: f64, rate: f64) -> Result<f64, RateError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RateError::InvalidRate(rate));
    }
    Ok(total / rate)
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn price(amount: f64) -> Price {
        Price::new(amount).unwrap()
    }

    #[test]
    fn total_multiplies_quantity_by_price() {
        assert_eq!(total([(5, price(100.0))]), 500.0);
        assert_eq!(total([(2, price(10.0)), (3, price(1.5))]), 24.5);
    }

    #[test]
    fn empty_order_totals_zero() {
        assert_eq!(total(Vec::<(i64, Price)>::new()), 0.0);
        assert_eq!(usd_total(0.0, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn usd_total_divides_by_rate() {
        assert_eq!(usd_total(500.0, 2.0).unwrap(), 250.0);
    }

    #[test]
    fn unusable_rates_are_rejected() {
        for rate in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(usd_total(10.0, rate), Err(RateError::InvalidRate(_))));
        }
    }

    proptest! {
        #[test]
        fn total_is_never_negative(
            lines in prop::collection::vec((1i64..1_000, 0.0f64..10_000.0), 0..20)
        ) {
            let t = total(lines.into_iter().map(|(q, p)| (q, price(p))));
            prop_assert!(t >= 0.0);
        }
    }
}
