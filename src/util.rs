use std::fs::File;
use std::io::{self, BufRead, BufReader};

use crate::journal;
use crate::pricedb::{self, PriceDB};

#[derive(Debug, thiserror::Error)]
pub enum ReadDbError {
    #[error("reading journal: {0}")]
    Journal(#[from] journal::JournalError),
    #[error("reading price db: {0}")]
    Io(#[from] io::Error),
}

/// Reads a journal file and, if given, a supplementary price-db file,
/// merging the latter's prices on top of the ones the journal's own `P`
/// directives already contributed.
pub fn read_journal_and_price_db(
    journal_path: &str,
    pricedb_path: Option<&str>,
) -> Result<(journal::Journal, PriceDB), ReadDbError> {
    let file = File::open(journal_path)?;
    let journal = journal::read_journal(file)?;
    let mut price_db = PriceDB::from_journal(&journal);

    let Some(path) = pricedb_path else {
        return Ok((journal, price_db));
    };

    let file = File::open(path)?;
    for line in BufReader::new(file).lines() {
        let line = line?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        match pricedb::parse_market_price_line(line) {
            Ok(mp) => price_db.upsert_price(mp.sym, mp.date_time, mp.price),
            Err(e) => tracing::warn!(?e, line, "skipping unparsable price db line"),
        }
    }

    Ok((journal, price_db))
}
