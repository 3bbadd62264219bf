use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{CompanyId, Currency, CurrencyCode};

use crate::error::{ServiceError, ServiceResult, checked};

/// Currency conversion service.
pub trait CurrencyConversion {
    /// Convert `amount` from `from` to `to` at the rate valid on `date`.
    ///
    /// The result is not rounded; callers round to the precision of the field
    /// they store it in.
    fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
        company: CompanyId,
        date: NaiveDate,
    ) -> ServiceResult<Decimal>;
}

/// Units of `currency` per one unit of the table's base currency, from `date` on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExchangeRate {
    pub currency: CurrencyCode,
    pub date: NaiveDate,
    pub rate: Decimal,
}

/// Dated exchange rates against a single base currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateTable {
    pub base: CurrencyCode,
    #[serde(default)]
    pub rates: Vec<ExchangeRate>,
}

impl RateTable {
    pub fn new(base: CurrencyCode) -> Self {
        Self {
            base,
            rates: Vec::new(),
        }
    }

    pub fn with_rate(mut self, currency: CurrencyCode, date: NaiveDate, rate: Decimal) -> Self {
        self.rates.push(ExchangeRate {
            currency,
            date,
            rate,
        });
        self
    }

    /// Latest rate of `currency` effective on `date`.
    pub fn rate(&self, currency: &CurrencyCode, date: NaiveDate) -> ServiceResult<Decimal> {
        if *currency == self.base {
            return Ok(Decimal::ONE);
        }
        self.rates
            .iter()
            .filter(|r| &r.currency == currency && r.date <= date && !r.rate.is_zero())
            .max_by_key(|r| r.date)
            .map(|r| r.rate)
            .ok_or_else(|| ServiceError::MissingRate {
                currency: currency.to_string(),
                date: date.to_string(),
            })
    }
}

impl CurrencyConversion for RateTable {
    fn convert(
        &self,
        amount: Decimal,
        from: &Currency,
        to: &Currency,
        _company: CompanyId,
        date: NaiveDate,
    ) -> ServiceResult<Decimal> {
        if from.code == to.code {
            return Ok(amount);
        }
        let from_rate = self.rate(&from.code, date)?;
        let to_rate = self.rate(&to.code, date)?;
        let base = checked(amount.checked_div(from_rate), "converted amount")?;
        checked(base.checked_mul(to_rate), "converted amount")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn code(c: &str) -> CurrencyCode {
        CurrencyCode::new(c).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn table() -> RateTable {
        RateTable::new(code("USD"))
            .with_rate(code("AED"), day(2024, 1, 1), dec!(3.6725))
            .with_rate(code("EUR"), day(2024, 1, 1), dec!(0.90))
            .with_rate(code("EUR"), day(2024, 3, 1), dec!(0.92))
    }

    #[test]
    fn converts_through_base_currency() {
        let usd = Currency::new(code("USD"), 2);
        let aed = Currency::new(code("AED"), 2);
        let out = table()
            .convert(dec!(10), &usd, &aed, CompanyId::new(), day(2024, 2, 1))
            .unwrap();
        assert_eq!(out, dec!(36.725));
    }

    #[test]
    fn uses_latest_rate_on_or_before_date() {
        let t = table();
        assert_eq!(t.rate(&code("EUR"), day(2024, 2, 28)).unwrap(), dec!(0.90));
        assert_eq!(t.rate(&code("EUR"), day(2024, 3, 1)).unwrap(), dec!(0.92));
    }

    #[test]
    fn missing_rate_is_an_error() {
        let err = table().rate(&code("EUR"), day(2023, 12, 31)).unwrap_err();
        assert!(matches!(err, ServiceError::MissingRate { .. }));
    }
}
