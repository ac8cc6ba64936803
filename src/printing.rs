//! Terminal rendering for the two report kinds (§4.7's outer surface):
//! `printing::balance` and `printing::register` turn the plain-data rows
//! `balance::trial_balance`/`register::register` compute into
//! `comfy_table` output, mirroring the conventions `ledger` renders with
//! elsewhere — no color, no box-drawing, right-aligned amounts, account
//! names in blue, negative quantities in red.

use comfy_table::{presets, Attribute, Cell, CellAlignment, Color, Table};
use rust_decimal::Decimal;

use crate::commodity::{Quantity, Value};
use crate::journal::AccName;

pub use balance::print as bal;
pub use register::print as reg;

mod balance {
    use std::io::{self, Write};

    use super::*;
    use crate::balance::BalanceRow;

    pub fn print(mut out: impl Write, rows: &[BalanceRow]) -> io::Result<()> {
        let mut table = Table::new();
        table.load_preset(presets::NOTHING);

        for row in rows {
            if row.account.is_empty() {
                table.add_row(vec![Cell::new("--------------")
                    .add_attribute(Attribute::Bold)
                    .set_alignment(CellAlignment::Right)]);
                print_total(&mut table, &row.total);
                continue;
            }
            print_row(&mut table, row);
        }

        match writeln!(out, "{}", table) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            Err(e) => Err(e),
        }
    }

    fn print_row(table: &mut Table, row: &BalanceRow) {
        let indent = row.depth.saturating_sub(1);
        if row.total.is_zero() {
            table.add_row(vec![
                Cell::new("0").set_alignment(CellAlignment::Right),
                account_name(&row.account, indent),
            ]);
            return;
        }

        let qtys = row.total.iter_quantities().collect::<Vec<_>>();
        for qty in &qtys[..qtys.len() - 1] {
            table.add_row(vec![commodity(*qty, CellAlignment::Right), Cell::new("")]);
        }
        table.add_row(vec![
            commodity(qtys[qtys.len() - 1], CellAlignment::Right),
            account_name(&row.account, indent),
        ]);
    }

    fn print_total(table: &mut Table, total: &Value) {
        if total.is_zero() {
            table.add_row(vec![Cell::new("0").set_alignment(CellAlignment::Right)]);
            return;
        }
        for qty in total.iter_quantities() {
            table.add_row(vec![commodity(qty, CellAlignment::Right), Cell::new("")]);
        }
    }
}

mod register {
    use std::io::{self, Write};

    use super::*;
    use crate::register::RegisterRow;

    pub fn print(mut out: impl Write, rows: &[RegisterRow]) -> io::Result<()> {
        let mut table = Table::new();
        table.load_preset(presets::NOTHING).set_header(
            ["Date", "Payee", "Account", "Amount", "RunningTotal"].map(|s| {
                Cell::new(s)
                    .add_attribute(Attribute::Bold)
                    .set_alignment(CellAlignment::Center)
            }),
        );

        for row in rows {
            let totals = row.running_total.iter_quantities().collect::<Vec<_>>();
            if totals.is_empty() {
                table.add_row(vec![
                    Cell::new(row.date.to_string()),
                    Cell::new(&row.payee),
                    account_name(&row.account, 0),
                    value_cell(&row.amount),
                    Cell::new("0").set_alignment(CellAlignment::Right),
                ]);
                continue;
            }

            table.add_row(vec![
                Cell::new(row.date.to_string()),
                Cell::new(&row.payee),
                account_name(&row.account, 0),
                value_cell(&row.amount),
                commodity(totals[0], CellAlignment::Right),
            ]);
            for qty in &totals[1..] {
                table.add_row(vec![
                    Cell::new(""),
                    Cell::new(""),
                    Cell::new(""),
                    Cell::new(""),
                    commodity(*qty, CellAlignment::Right),
                ]);
            }
        }

        match writeln!(out, "{}", table) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
            Err(e) => Err(e),
        }
    }
}

/// Returns a `Cell` displaying the account's full path, indented.
fn account_name(n: &AccName, indent: usize) -> Cell {
    Cell::new(format!("{}{}", "  ".repeat(indent), n))
        .fg(Color::DarkBlue)
        .set_alignment(CellAlignment::Left)
}

/// Returns a `Cell` displaying "{symbol} {value}", colored DarkRed if
/// `q` is negative.
fn commodity(q: Quantity, align: CellAlignment) -> Cell {
    let text = format!("{}", q);
    let cell = if q.q < Decimal::ZERO {
        Cell::new(text).fg(Color::DarkRed)
    } else {
        Cell::new(text)
    };
    cell.set_alignment(align)
}

/// Returns a `Cell` displaying a (possibly multi-commodity) `Value`,
/// colored DarkRed if any of its quantities is negative.
fn value_cell(v: &Value) -> Cell {
    let cell = Cell::new(v.to_string()).set_alignment(CellAlignment::Right);
    if v.iter_quantities().any(|q| q.q < Decimal::ZERO) {
        cell.fg(Color::DarkRed)
    } else {
        cell
    }
}
