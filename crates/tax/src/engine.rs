//! Per-line and aggregate totals under a rounding policy.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::{Currency, CurrencyCode, TaxId};

use crate::compute::{TaxBreakdown, TaxComputer};
use crate::error::{TaxError, checked};
use crate::tax::TaxDefinition;

/// When monetary rounding happens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingPolicy {
    /// Round every line, then sum the rounded figures.
    #[default]
    RoundPerLine,
    /// Sum raw figures per (tax, currency), then round once.
    RoundGlobally,
}

impl core::str::FromStr for RoundingPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "round_per_line" => Ok(Self::RoundPerLine),
            "round_globally" => Ok(Self::RoundGlobally),
            other => Err(format!("unknown tax rounding policy {other:?}")),
        }
    }
}

/// A priced line as seen by the engine.
#[derive(Debug, Clone, Copy)]
pub struct TaxLine<'a> {
    pub quantity: Decimal,
    pub price_unit: Decimal,
    pub taxes: &'a [TaxDefinition],
    pub currency: &'a Currency,
}

/// Untaxed, tax and total amounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub untaxed: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    fn new(untaxed: Decimal, tax: Decimal) -> Result<Self, TaxError> {
        Ok(Self {
            untaxed,
            tax,
            total: checked(untaxed.checked_add(tax), "total")?,
        })
    }

    fn add(&mut self, other: Totals) -> Result<(), TaxError> {
        self.untaxed = checked(self.untaxed.checked_add(other.untaxed), "untaxed amount")?;
        self.tax = checked(self.tax.checked_add(other.tax), "tax amount")?;
        self.total = checked(self.total.checked_add(other.total), "total")?;
        Ok(())
    }
}

fn sum_rounded(
    mut amounts: impl Iterator<Item = Decimal>,
    currency: &Currency,
) -> Result<Decimal, TaxError> {
    amounts.try_fold(Decimal::ZERO, |acc, amount| {
        checked(acc.checked_add(currency.round(amount)), "tax amount")
    })
}

/// Base and amount of one tax in one currency, rounded under the active policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxGroupTotal {
    pub tax_id: TaxId,
    pub name: String,
    pub currency: CurrencyCode,
    pub base: Decimal,
    pub amount: Decimal,
}

/// Result of [`compute`].
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TaxSummary {
    /// One entry per input line, in input order, always rounded per line.
    pub per_line: Vec<Totals>,
    /// Aggregates per currency.
    pub totals: BTreeMap<CurrencyCode, Totals>,
    /// Breakdown per (tax, currency) in order of first appearance.
    pub tax_groups: Vec<TaxGroupTotal>,
}

impl TaxSummary {
    /// Aggregates for `currency`; zero when no line used it.
    pub fn totals_for(&self, currency: &CurrencyCode) -> Totals {
        self.totals.get(currency).copied().unwrap_or_default()
    }
}

#[derive(Debug)]
struct RawGroup {
    tax_id: TaxId,
    name: String,
    currency: Currency,
    base: Decimal,
    amount: Decimal,
}

fn line_totals(raw: &TaxBreakdown, currency: &Currency) -> Result<Totals, TaxError> {
    let untaxed = currency.round(raw.total_excluded);
    let tax = sum_rounded(raw.taxes.iter().map(|t| t.amount), currency)?;
    Totals::new(untaxed, tax)
}

/// Compute per-line and aggregate totals for `lines`.
///
/// Pseudo-lines must already be filtered out by the caller. Under
/// [`RoundingPolicy::RoundPerLine`] the aggregate equals the sum of the
/// per-line figures exactly. Under [`RoundingPolicy::RoundGlobally`] raw bases
/// and amounts are grouped per (tax, currency) and per currency and rounded
/// once, so the aggregate may differ from that sum by the accumulated rounding
/// drift. With a single line both policies agree.
pub fn compute(
    lines: &[TaxLine<'_>],
    policy: RoundingPolicy,
    computer: &dyn TaxComputer,
) -> Result<TaxSummary, TaxError> {
    let mut per_line = Vec::with_capacity(lines.len());
    let mut groups: Vec<RawGroup> = Vec::new();
    let mut raw_untaxed: BTreeMap<CurrencyCode, (Currency, Decimal)> = BTreeMap::new();
    let mut totals: BTreeMap<CurrencyCode, Totals> = BTreeMap::new();

    for line in lines {
        let raw = computer.compute_all(line.taxes, line.price_unit, line.quantity, line.currency)?;
        let rounded = line_totals(&raw, line.currency)?;
        per_line.push(rounded);

        let code = &line.currency.code;
        totals.entry(code.clone()).or_default().add(rounded)?;
        let untaxed = &mut raw_untaxed
            .entry(code.clone())
            .or_insert_with(|| (line.currency.clone(), Decimal::ZERO))
            .1;
        *untaxed = checked(untaxed.checked_add(raw.total_excluded), "untaxed amount")?;

        for tax in &raw.taxes {
            let (base, amount) = match policy {
                RoundingPolicy::RoundPerLine => {
                    (line.currency.round(tax.base), line.currency.round(tax.amount))
                }
                RoundingPolicy::RoundGlobally => (tax.base, tax.amount),
            };
            match groups
                .iter_mut()
                .find(|g| g.tax_id == tax.tax_id && &g.currency.code == code)
            {
                Some(group) => {
                    group.base = checked(group.base.checked_add(base), "tax base")?;
                    group.amount = checked(group.amount.checked_add(amount), "tax amount")?;
                }
                None => groups.push(RawGroup {
                    tax_id: tax.tax_id,
                    name: tax.name.clone(),
                    currency: line.currency.clone(),
                    base,
                    amount,
                }),
            }
        }
    }

    if policy == RoundingPolicy::RoundGlobally {
        totals = raw_untaxed
            .into_iter()
            .map(|(code, (currency, untaxed))| -> Result<_, TaxError> {
                let tax = sum_rounded(
                    groups
                        .iter()
                        .filter(|g| g.currency.code == code)
                        .map(|g| g.amount),
                    &currency,
                )?;
                Ok((code, Totals::new(currency.round(untaxed), tax)?))
            })
            .collect::<Result<_, TaxError>>()?;
    }

    let tax_groups = groups
        .into_iter()
        .map(|g| TaxGroupTotal {
            tax_id: g.tax_id,
            name: g.name,
            base: g.currency.round(g.base),
            amount: g.currency.round(g.amount),
            currency: g.currency.code,
        })
        .collect();

    Ok(TaxSummary {
        per_line,
        totals,
        tax_groups,
    })
}
