use std::fmt;
use std::sync::Mutex;

use bimap::BiMap;
use lazy_static::lazy_static;

type Id = u32;
type Name = String;

lazy_static! {
    static ref ID_TO_SYMBOL: Mutex<BiMap<Id, Name>> = Mutex::new(BiMap::new());
    static ref NEXT_ID: Mutex<Id> = Mutex::new(0);
}

/// An interned commodity name (currency, security, unit, ...).
///
/// `Symbol`s are cheap to copy and compare; the actual text lives in a
/// process-wide interning table so `Value`/`Quantity` arithmetic never has
/// to hash or compare strings.
#[derive(PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub struct Symbol(Id);

impl Symbol {
    pub fn new(n: &str) -> Symbol {
        let mut i2s = ID_TO_SYMBOL.lock().unwrap();
        if let Some(id) = i2s.get_by_right(n) {
            return Symbol(*id);
        }

        let mut next = NEXT_ID.lock().unwrap();
        let id = *next;
        i2s.insert(id, n.to_owned());
        *next += 1;

        Symbol(id)
    }

    pub fn name(&self) -> String {
        let i2s = ID_TO_SYMBOL.lock().unwrap();
        i2s.get_by_left(&self.0)
            .cloned()
            .unwrap_or_else(|| String::from("?"))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({} :: {})", self.0, self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interning_is_stable() {
        let a = Symbol::new("USD");
        let b = Symbol::new("USD");
        let c = Symbol::new("EUR");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.name(), "USD");
    }
}
