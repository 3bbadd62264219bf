use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use procura_core::TaxId;

/// How a tax turns a base into an amount.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AmountType {
    /// `amount` percent of the base.
    Percent,
    /// `amount` per unit of quantity.
    Fixed,
    /// Evaluates its children in their own sequence order.
    Group { children: Vec<TaxDefinition> },
}

/// A tax definition (rate, type, inclusion and stacking behaviour).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxDefinition {
    pub id: TaxId,
    pub name: String,
    pub amount_type: AmountType,
    pub amount: Decimal,
    /// The tax is already contained in the unit price.
    #[serde(default)]
    pub price_include: bool,
    /// Later taxes in the sequence use `base + this tax` as their base.
    #[serde(default)]
    pub include_base_amount: bool,
    #[serde(default)]
    pub sequence: i32,
}

impl TaxDefinition {
    pub fn percent(name: impl Into<String>, rate: Decimal) -> Self {
        Self::build(name, AmountType::Percent, rate)
    }

    pub fn fixed(name: impl Into<String>, per_unit: Decimal) -> Self {
        Self::build(name, AmountType::Fixed, per_unit)
    }

    pub fn group(name: impl Into<String>, children: Vec<TaxDefinition>) -> Self {
        Self::build(name, AmountType::Group { children }, Decimal::ZERO)
    }

    fn build(name: impl Into<String>, amount_type: AmountType, amount: Decimal) -> Self {
        Self {
            id: TaxId::new(),
            name: name.into(),
            amount_type,
            amount,
            price_include: false,
            include_base_amount: false,
            sequence: 1,
        }
    }

    pub fn included(mut self) -> Self {
        self.price_include = true;
        self
    }

    pub fn affecting_base(mut self) -> Self {
        self.include_base_amount = true;
        self
    }

    pub fn with_sequence(mut self, sequence: i32) -> Self {
        self.sequence = sequence;
        self
    }

    /// Expand groups into their leaf taxes, ordered by sequence.
    ///
    /// Children keep the position of their group; a tax id appearing twice is
    /// only kept the first time.
    pub fn flatten(taxes: &[TaxDefinition]) -> Vec<TaxDefinition> {
        let mut ordered: Vec<&TaxDefinition> = taxes.iter().collect();
        ordered.sort_by_key(|t| t.sequence);

        let mut out: Vec<TaxDefinition> = Vec::new();
        for tax in ordered {
            let leaves = match &tax.amount_type {
                AmountType::Group { children } => Self::flatten(children),
                _ => vec![tax.clone()],
            };
            for leaf in leaves {
                if !out.iter().any(|t| t.id == leaf.id) {
                    out.push(leaf);
                }
            }
        }
        out
    }
}
