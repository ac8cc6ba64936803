/// Builds a [`crate::commodity::Quantity`] literal, e.g. `quantity!(10, "USD")`.
///
/// Requires `rust_decimal::dec` to be in scope at the call site (the
/// teacher's own convention — kept so fixtures read the same way).
#[macro_export]
macro_rules! quantity {
    ($num:literal, $sym:literal) => {
        $crate::commodity::Quantity::new(dec!($num), $crate::symbol::Symbol::new($sym))
    };
}

/// Builds a [`crate::commodity::Value`] literal, e.g. `value!(10, "USD")`.
#[macro_export]
macro_rules! value {
    ($num:literal, $sym:literal) => {
        $crate::commodity::Value::from_quantity($crate::quantity!($num, $sym))
    };
}
