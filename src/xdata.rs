//! The report arena: a side table of mutable pipeline scratch state, kept
//! apart from the immutable journal (see Design Notes, "xdata scratch
//! slots"). Entries/postings fed to the pipeline are copied in from the
//! journal once, in journal order; handlers that emit synthetic output
//! (subtotal, collapse, interval, ...) allocate new entries/postings
//! through `Report::alloc_synthetic_*` rather than touching the journal.

use chrono::NaiveDate;

use crate::account::{AccountId, AccountTree};
use crate::commodity::Value;
use crate::journal::{AccName, Journal, State};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PostingId(usize);

pub type PostingRef = PostingId;
pub type AccountRef = AccountId;

#[derive(Debug, Clone)]
pub struct EntryData {
    pub state: State,
    pub code: Option<String>,
    pub date: NaiveDate,
    pub effective_date: NaiveDate,
    pub payee: String,
    pub synthetic: bool,
}

#[derive(Debug, Clone)]
pub struct PostingData {
    pub entry: EntryId,
    pub account: AccountId,
    pub amount: Value,
    pub state: State,
    pub synthetic: bool,
}

/// Mutable pipeline scratch attached to one posting. Never read before a
/// handler that sets it has run; every field defaults to "no override".
#[derive(Debug, Clone, Default)]
pub struct PostingXdata {
    pub amount_override: Option<Value>,
    pub date_override: Option<NaiveDate>,
    pub payee_override: Option<String>,
    pub running_total: Option<Value>,
    pub sort_key: Option<Value>,
    pub matched: bool,
    /// Set by an accumulator with `remember_components`; consumed by
    /// `component_xacts`.
    pub components: Vec<PostingId>,
}

#[derive(Debug, Clone, Default)]
pub struct AccountXdata {
    pub total: Value,
    pub subtotal: Value,
    pub displayed: bool,
    pub matched: bool,
}

pub struct Report {
    entries: Vec<EntryData>,
    postings: Vec<PostingData>,
    posting_xdata: Vec<PostingXdata>,
    original_posting_count: usize,
    pub accounts: AccountTree,
    account_xdata: Vec<AccountXdata>,
}

impl Report {
    pub fn from_journal(journal: &Journal) -> Report {
        let mut accounts = AccountTree::new();
        let mut entries = Vec::new();
        let mut postings = Vec::new();

        for e in journal.entries() {
            let entry_id = EntryId(entries.len());
            entries.push(EntryData {
                state: e.state,
                code: e.code.clone(),
                date: e.date,
                effective_date: e.effective_date(),
                payee: e.payee.clone(),
                synthetic: false,
            });
            for p in &e.postings {
                let account = accounts.get_or_create(&p.account);
                postings.push(PostingData {
                    entry: entry_id,
                    account,
                    amount: Value::from_quantity(p.amount),
                    state: p.state,
                    synthetic: false,
                });
            }
        }

        let posting_xdata = vec![PostingXdata::default(); postings.len()];
        let account_xdata = vec![AccountXdata::default(); accounts.len() + 1];
        let original_posting_count = postings.len();

        Report {
            entries,
            postings,
            posting_xdata,
            original_posting_count,
            accounts,
            account_xdata,
        }
    }

    /// All postings present when the report was built, in journal order —
    /// the input to `session_postings` (§4.6).
    pub fn session_postings(&self) -> Vec<PostingId> {
        (0..self.original_posting_count).map(PostingId).collect()
    }

    /// Postings belonging to one entry, in entry order.
    pub fn entry_postings(&self, entry: EntryId) -> Vec<PostingId> {
        self.postings
            .iter()
            .enumerate()
            .filter(|(_, p)| p.entry == entry)
            .map(|(i, _)| PostingId(i))
            .collect()
    }

    pub fn entry(&self, id: EntryId) -> &EntryData {
        &self.entries[id.0]
    }

    pub fn posting(&self, id: PostingId) -> &PostingData {
        &self.postings[id.0]
    }

    pub fn posting_xdata(&self, id: PostingId) -> &PostingXdata {
        &self.posting_xdata[id.0]
    }

    pub fn posting_xdata_mut(&mut self, id: PostingId) -> &mut PostingXdata {
        &mut self.posting_xdata[id.0]
    }

    pub fn account_xdata(&self, id: AccountId) -> &AccountXdata {
        &self.account_xdata[account_index(id)]
    }

    pub fn account_xdata_mut(&mut self, id: AccountId) -> &mut AccountXdata {
        &mut self.account_xdata[account_index(id)]
    }

    /// The effective amount of a posting: its xdata override if one was
    /// set (e.g. by `invert`), else its own (or its synthetic) amount.
    pub fn effective_amount(&self, id: PostingId) -> Value {
        self.posting_xdata(id)
            .amount_override
            .clone()
            .unwrap_or_else(|| self.posting(id).amount.clone())
    }

    pub fn effective_date(&self, id: PostingId) -> NaiveDate {
        self.posting_xdata(id)
            .date_override
            .unwrap_or_else(|| self.entry(self.posting(id).entry).effective_date)
    }

    pub fn effective_payee(&self, id: PostingId) -> String {
        self.posting_xdata(id)
            .payee_override
            .clone()
            .unwrap_or_else(|| self.entry(self.posting(id).entry).payee.clone())
    }

    pub fn account_path(&self, id: AccountId) -> &AccName {
        self.accounts.get(id).full_name()
    }

    /// Looks up (or creates) a distinguished placeholder account such as
    /// `<Total>` or `<Revalued>`, growing the xdata table to match.
    pub fn get_or_create_account(&mut self, path: &AccName) -> AccountId {
        let id = self.accounts.get_or_create(path);
        if account_index(id) >= self.account_xdata.len() {
            self.account_xdata.resize(account_index(id) + 1, AccountXdata::default());
        }
        id
    }

    pub fn alloc_synthetic_entry(
        &mut self,
        date: NaiveDate,
        payee: String,
        code: Option<String>,
    ) -> EntryId {
        let id = EntryId(self.entries.len());
        self.entries.push(EntryData {
            state: State::None,
            code,
            date,
            effective_date: date,
            payee,
            synthetic: true,
        });
        id
    }

    pub fn alloc_synthetic_posting(
        &mut self,
        entry: EntryId,
        account: AccountId,
        amount: Value,
    ) -> PostingId {
        let id = PostingId(self.postings.len());
        self.postings.push(PostingData {
            entry,
            account,
            amount,
            state: State::None,
            synthetic: true,
        });
        self.posting_xdata.push(PostingXdata::default());
        id
    }
}

/// `AccountId(0)` is the tree root, which always exists, so the xdata
/// table is indexed directly by the id's ordinal.
fn account_index(id: AccountId) -> usize {
    id.ordinal()
}
