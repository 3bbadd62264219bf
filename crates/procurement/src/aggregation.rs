//! Document totals and planned date, derived from the lines.

use chrono::{DateTime, Utc};

use procura_core::DomainResult;
use procura_tax::{RoundingPolicy, TaxComputer, TaxLine, Totals};

use crate::document::Document;
use crate::line::Line;

/// Earliest planned date over product lines that have one.
pub fn earliest_planned_date<'a>(lines: impl IntoIterator<Item = &'a Line>) -> Option<DateTime<Utc>> {
    lines
        .into_iter()
        .filter(|l| !l.is_pseudo())
        .filter_map(|l| l.date_planned())
        .min()
}

/// Recompute line amounts, document totals, tax groups and planned date.
///
/// Pseudo-lines are excluded from the tax engine. Without a currency every
/// amount reads zero.
pub fn recompute_totals(
    doc: &mut Document,
    policy: RoundingPolicy,
    computer: &dyn TaxComputer,
) -> DomainResult<()> {
    doc.date_planned = earliest_planned_date(&doc.lines);

    let Some(currency) = doc.currency.clone() else {
        for line in &mut doc.lines {
            line.clear_amounts();
        }
        doc.totals = Totals::default();
        doc.tax_groups.clear();
        return Ok(());
    };

    let priced: Vec<usize> = doc
        .lines
        .iter()
        .enumerate()
        .filter(|(_, l)| !l.is_pseudo())
        .map(|(i, _)| i)
        .collect();
    let inputs: Vec<TaxLine<'_>> = priced
        .iter()
        .map(|&i| TaxLine {
            quantity: doc.lines[i].quantity,
            price_unit: doc.lines[i].price_unit,
            taxes: &doc.lines[i].taxes,
            currency: &currency,
        })
        .collect();
    let summary = procura_tax::compute(&inputs, policy, computer)?;

    for line in doc.lines.iter_mut().filter(|l| l.is_pseudo()) {
        line.clear_amounts();
    }
    for (&i, totals) in priced.iter().zip(&summary.per_line) {
        doc.lines[i].set_amounts(*totals);
    }
    doc.totals = summary.totals_for(&currency.code);
    doc.tax_groups = summary.tax_groups;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use procura_core::{Currency, CurrencyCode, ProductId};
    use procura_tax::{StandardTaxComputer, TaxDefinition};
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::document::{DocumentDraft, DocumentKind};

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    fn priced_line(qty: Decimal, price: Decimal, taxes: Vec<TaxDefinition>) -> Line {
        Line::product(ProductId::new(), qty)
            .with_price_unit(price)
            .with_taxes(taxes)
    }

    fn test_document(lines: Vec<Line>) -> Document {
        let draft = DocumentDraft {
            currency: Some(Currency::new(CurrencyCode::new("USD").unwrap(), 2)),
            ..DocumentDraft::default()
        };
        let mut doc = Document::new(DocumentKind::PurchaseOrder, "PO/00001", draft);
        doc.lines = lines;
        doc
    }

    #[test]
    fn earliest_date_ignores_unset_and_pseudo_lines() {
        let lines = vec![
            Line::product(ProductId::new(), dec!(1)).with_date_planned(at(2024, 3, 1)),
            Line::product(ProductId::new(), dec!(1)).with_date_planned(at(2024, 2, 15)),
            Line::product(ProductId::new(), dec!(1)),
            Line::note("Deliver to the back door"),
        ];
        assert_eq!(earliest_planned_date(&lines), Some(at(2024, 2, 15)));

        let unset = vec![Line::product(ProductId::new(), dec!(1))];
        assert_eq!(earliest_planned_date(&unset), None);
    }

    #[test]
    fn sections_do_not_contribute() {
        let vat = TaxDefinition::percent("VAT 15%", dec!(15));
        let mut doc = test_document(vec![
            Line::section("Consumables"),
            priced_line(dec!(2), dec!(10), vec![vat.clone()]),
            priced_line(dec!(1), dec!(5), vec![vat]),
        ]);

        recompute_totals(&mut doc, RoundingPolicy::RoundPerLine, &StandardTaxComputer).unwrap();

        assert_eq!(doc.amount_untaxed(), dec!(25));
        assert_eq!(doc.amount_tax(), dec!(3.75));
        assert_eq!(doc.amount_total(), dec!(28.75));
        assert_eq!(doc.lines()[0].total(), Decimal::ZERO);
        assert_eq!(doc.lines()[1].subtotal(), dec!(20));
        assert_eq!(doc.tax_groups().len(), 1);
    }

    #[test]
    fn global_rounding_differs_by_a_cent() {
        let vat = TaxDefinition::percent("VAT 15%", dec!(15));
        let lines: Vec<Line> = (0..3)
            .map(|_| priced_line(dec!(3), dec!(0.10), vec![vat.clone()]))
            .collect();

        let mut per_line = test_document(lines.clone());
        recompute_totals(&mut per_line, RoundingPolicy::RoundPerLine, &StandardTaxComputer).unwrap();
        let mut global = test_document(lines);
        recompute_totals(&mut global, RoundingPolicy::RoundGlobally, &StandardTaxComputer).unwrap();

        assert_eq!(per_line.amount_tax(), dec!(0.15));
        assert_eq!(global.amount_tax(), dec!(0.14));
        assert_eq!(global.lines()[0].tax(), dec!(0.05));
    }

    #[test]
    fn no_currency_reads_zero() {
        let mut doc = test_document(vec![priced_line(dec!(1), dec!(10), vec![])]);
        doc.currency = None;
        recompute_totals(&mut doc, RoundingPolicy::RoundPerLine, &StandardTaxComputer).unwrap();
        assert_eq!(doc.amount_total(), Decimal::ZERO);
    }
}
