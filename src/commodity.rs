//! Multi-commodity arithmetic.
//!
//! [`Quantity`] is a single `(decimal, commodity)` pair. [`Value`] is the
//! spec's central arithmetic type: a possibly multi-commodity signed
//! quantity, with `Null` standing in for "no amount at all". Addition of
//! two `Value`s in different commodities promotes to a balance; addition
//! within one commodity collapses back to a single amount.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use rust_decimal::Decimal;

use crate::symbol::Symbol;

/// A single-commodity amount: `quantity` units of `s`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quantity {
    pub q: Decimal,
    pub s: Symbol,
}

impl Quantity {
    pub fn new(q: Decimal, s: Symbol) -> Quantity {
        Quantity { q, s }
    }

    pub fn to_value(self) -> Value {
        Value::new(self.q, self.s)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {}", self.s, self.q)
    }
}

impl Neg for Quantity {
    type Output = Quantity;
    fn neg(self) -> Quantity {
        Quantity::new(-self.q, self.s)
    }
}

/// A possibly multi-commodity signed quantity.
///
/// `Null` carries no commodity at all (the identity for addition, and the
/// result every balanced entry's postings must sum to). `Amount` is exactly
/// one commodity. `Balance` is two or more, keyed by commodity so that
/// iteration order is deterministic and commodity-insertion order is
/// preserved for display via `BTreeMap`'s key order (interning order, since
/// `Symbol`'s `Ord` reflects assignment order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Value {
    #[default]
    Null,
    Amount(Quantity),
    Balance(BTreeMap<Symbol, Decimal>),
}

impl Value {
    pub fn new(q: Decimal, s: Symbol) -> Value {
        if q == Decimal::ZERO {
            return Value::Null;
        }
        Value::Amount(Quantity::new(q, s))
    }

    pub fn from_quantity(q: Quantity) -> Value {
        Value::new(q.q, q.s)
    }

    pub fn is_zero(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the single commodity quantity of this value, if it has
    /// exactly one (or none, which reads as a zero `Quantity` without a
    /// commodity being meaningful — callers should check `is_zero` first).
    pub fn to_quantity(&self) -> Option<Quantity> {
        match self {
            Value::Null => None,
            Value::Amount(q) => Some(*q),
            Value::Balance(_) => None,
        }
    }

    /// Iterates the per-commodity quantities making up this value, in
    /// commodity-insertion order. Empty for `Null`.
    pub fn iter_quantities(&self) -> Box<dyn Iterator<Item = Quantity> + '_> {
        match self {
            Value::Null => Box::new(std::iter::empty()),
            Value::Amount(q) => Box::new(std::iter::once(*q)),
            Value::Balance(m) => Box::new(m.iter().map(|(&s, &q)| Quantity::new(q, s))),
        }
    }

    fn as_map(&self) -> BTreeMap<Symbol, Decimal> {
        match self {
            Value::Null => BTreeMap::new(),
            Value::Amount(q) => BTreeMap::from([(q.s, q.q)]),
            Value::Balance(m) => m.clone(),
        }
    }

    /// Collapses a balance with zero, one, or many non-zero entries back
    /// down to `Null`/`Amount`/`Balance` as appropriate.
    fn simplify(mut m: BTreeMap<Symbol, Decimal>) -> Value {
        m.retain(|_, q| *q != Decimal::ZERO);
        match m.len() {
            0 => Value::Null,
            1 => {
                let (&s, &q) = m.iter().next().unwrap();
                Value::Amount(Quantity::new(q, s))
            }
            _ => Value::Balance(m),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Value::Null => write!(f, "0"),
            Value::Amount(q) => write!(f, "{}", q),
            Value::Balance(m) => {
                let mut first = true;
                for (s, q) in m {
                    if !first {
                        write!(f, ", ")?;
                    }
                    write!(f, "{} {}", s, q)?;
                    first = false;
                }
                Ok(())
            }
        }
    }
}

impl Add<&Value> for &Value {
    type Output = Value;
    fn add(self, rhs: &Value) -> Value {
        let mut m = self.as_map();
        for (s, q) in rhs.as_map() {
            *m.entry(s).or_insert(Decimal::ZERO) += q;
        }
        Value::simplify(m)
    }
}

impl Add for Value {
    type Output = Value;
    fn add(self, rhs: Value) -> Value {
        &self + &rhs
    }
}

impl AddAssign<&Value> for Value {
    fn add_assign(&mut self, rhs: &Value) {
        *self = &*self + rhs;
    }
}

impl Sub<&Value> for &Value {
    type Output = Value;
    fn sub(self, rhs: &Value) -> Value {
        let mut m = self.as_map();
        for (s, q) in rhs.as_map() {
            *m.entry(s).or_insert(Decimal::ZERO) -= q;
        }
        Value::simplify(m)
    }
}

impl Sub for Value {
    type Output = Value;
    fn sub(self, rhs: Value) -> Value {
        &self - &rhs
    }
}

impl SubAssign<&Value> for Value {
    fn sub_assign(&mut self, rhs: &Value) {
        *self = &*self - rhs;
    }
}

impl Neg for Value {
    type Output = Value;
    fn neg(self) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Amount(q) => Value::Amount(-q),
            Value::Balance(m) => Value::Balance(m.into_iter().map(|(s, q)| (s, -q)).collect()),
        }
    }
}

impl Sum for Value {
    fn sum<I: Iterator<Item = Value>>(iter: I) -> Value {
        iter.fold(Value::Null, |acc, v| acc + v)
    }
}

impl<'a> Sum<&'a Value> for Value {
    fn sum<I: Iterator<Item = &'a Value>>(iter: I) -> Value {
        iter.fold(Value::Null, |acc, v| &acc + v)
    }
}

impl From<Quantity> for Value {
    fn from(q: Quantity) -> Value {
        Value::from_quantity(q)
    }
}

/// Sort-key ordering: per-commodity lexicographic on quantity, with the
/// null commodity/empty balance sorting before any named commodity.
impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Value) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Value) -> Ordering {
        let a = self.as_map();
        let b = other.as_map();
        let mut ai = a.iter();
        let mut bi = b.iter();
        loop {
            match (ai.next(), bi.next()) {
                (None, None) => return Ordering::Equal,
                (None, Some(_)) => return Ordering::Less,
                (Some(_), None) => return Ordering::Greater,
                (Some((sa, qa)), Some((sb, qb))) => match sa.cmp(sb).then(qa.cmp(qb)) {
                    Ordering::Equal => continue,
                    ord => return ord,
                },
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;

    fn usd(q: Decimal) -> Value {
        Value::new(q, Symbol::new("COMMODITY-TEST-USD"))
    }

    fn eur(q: Decimal) -> Value {
        Value::new(q, Symbol::new("COMMODITY-TEST-EUR"))
    }

    #[test]
    fn same_commodity_stays_an_amount() {
        let v = usd(dec!(10)) + usd(dec!(5));
        assert!(matches!(v, Value::Amount(_)));
        assert_eq!(v.to_quantity().unwrap().q, dec!(15));
    }

    #[test]
    fn different_commodities_promote_to_balance() {
        let v = usd(dec!(10)) + eur(dec!(5));
        assert!(matches!(v, Value::Balance(_)));
        assert_eq!(v.iter_quantities().count(), 2);
    }

    #[test]
    fn cancelling_amounts_simplify_to_null() {
        let v = usd(dec!(10)) - usd(dec!(10));
        assert_eq!(v, Value::Null);
        assert!(v.is_zero());
    }

    #[test]
    fn balance_demotes_to_amount_when_one_side_cancels() {
        let v = (usd(dec!(10)) + eur(dec!(5))) - eur(dec!(5));
        assert!(matches!(v, Value::Amount(_)));
    }

    #[test]
    fn negation_is_pointwise() {
        let v = -(usd(dec!(10)) + eur(dec!(5)));
        let mut qs: Vec<_> = v.iter_quantities().map(|q| q.q).collect();
        qs.sort();
        assert_eq!(qs, vec![dec!(-10), dec!(-5)]);
    }
}
