//! The account tree.
//!
//! Accounts form a single-rooted tree: every account's full path equals its
//! parent's full path plus `:` plus its own name, and no two siblings share
//! a name. The tree is built once per report (by the account-aggregation
//! pass, see `pipeline::account_pass`) from the set of account paths seen in
//! the journal; back-references from child to parent are plain indices
//! (`AccountId`), never owning pointers, so there is no cycle to worry
//! about — see the Design Notes on weak back-references.

use std::collections::HashMap;

use crate::journal::AccName;

/// An index into an [`AccountTree`]. Cheap to copy, stable for the
/// lifetime of the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AccountId(usize);

impl AccountId {
    /// This id's position in traversal/xdata-table order; not meaningful
    /// across different `AccountTree`s.
    pub fn ordinal(&self) -> usize {
        self.0
    }
}

/// A single node of the account tree.
pub struct Account {
    /// last path segment, e.g. `"Checking"` for `Assets:Bank:Checking`
    name: String,
    /// full slash^H^H^Hcolon-joined path from the (unnamed) root
    full: AccName,
    parent: Option<AccountId>,
    children: Vec<AccountId>,
}

impl Account {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn full_name(&self) -> &AccName {
        &self.full
    }

    pub fn parent(&self) -> Option<AccountId> {
        self.parent
    }

    pub fn children(&self) -> &[AccountId] {
        &self.children
    }

    pub fn depth(&self) -> usize {
        self.full.split_parts().count()
    }
}

/// The tree of all accounts referenced by a report, rooted at a single
/// unnamed "master" account (id `AccountId(0)`, never returned by
/// `get_or_create`).
pub struct AccountTree {
    nodes: Vec<Account>,
    by_path: HashMap<AccName, AccountId>,
}

impl Default for AccountTree {
    fn default() -> Self {
        Self::new()
    }
}

impl AccountTree {
    pub fn new() -> AccountTree {
        let root = Account {
            name: String::new(),
            full: AccName::from(""),
            parent: None,
            children: Vec::new(),
        };
        AccountTree {
            nodes: vec![root],
            by_path: HashMap::new(),
        }
    }

    pub fn root(&self) -> AccountId {
        AccountId(0)
    }

    pub fn get(&self, id: AccountId) -> &Account {
        &self.nodes[id.0]
    }

    pub fn lookup(&self, path: &AccName) -> Option<AccountId> {
        self.by_path.get(path).copied()
    }

    /// Returns the id for `path`, creating it and every missing ancestor
    /// along the way. Siblings never share a name because each level is
    /// looked up/created by its own full path.
    pub fn get_or_create(&mut self, path: &AccName) -> AccountId {
        if let Some(&id) = self.by_path.get(path) {
            return id;
        }

        let mut parent = self.root();
        let mut built = AccName::from("");
        for part in path.split_parts() {
            built = built.append(&AccName::from(part));
            if let Some(&id) = self.by_path.get(&built) {
                parent = id;
                continue;
            }

            let node = Account {
                name: part.to_owned(),
                full: built.clone(),
                parent: Some(parent),
                children: Vec::new(),
            };
            let id = AccountId(self.nodes.len());
            self.nodes.push(node);
            self.nodes[parent.0].children.push(id);
            self.by_path.insert(built.clone(), id);
            parent = id;
        }

        parent
    }

    /// Depth-first, pre-order traversal starting at `root()`'s children,
    /// the order required by `subtotal` (§4.3) and the account-aggregation
    /// pass (§4.5). Children are visited in insertion order.
    pub fn depth_first(&self) -> Vec<AccountId> {
        let mut out = Vec::new();
        let mut stack: Vec<AccountId> = self.get(self.root()).children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            let children = &self.get(id).children;
            for &c in children.iter().rev() {
                stack.push(c);
            }
        }
        out
    }

    pub fn len(&self) -> usize {
        self.nodes.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shared_prefixes_share_ancestors() {
        let mut tree = AccountTree::new();
        let a = tree.get_or_create(&AccName::from("Assets:Bank:Checking"));
        let b = tree.get_or_create(&AccName::from("Assets:Bank:Savings"));

        let bank_a = tree.get(a).parent().unwrap();
        let bank_b = tree.get(b).parent().unwrap();
        assert_eq!(bank_a, bank_b);
        assert_eq!(tree.get(bank_a).full_name(), &AccName::from("Assets:Bank"));
        assert_eq!(tree.get(bank_a).name(), "Bank");
    }

    #[test]
    fn depth_first_visits_parents_before_children() {
        let mut tree = AccountTree::new();
        tree.get_or_create(&AccName::from("Assets:Bank:Checking"));
        tree.get_or_create(&AccName::from("Assets:Cash"));

        let order = tree.depth_first();
        let mut seen_positions = HashMap::new();
        for (i, id) in order.iter().enumerate() {
            seen_positions.insert(tree.get(*id).full_name().clone(), i);
        }

        assert!(seen_positions[&AccName::from("Assets")] < seen_positions[&AccName::from("Assets:Bank")]);
        assert!(
            seen_positions[&AccName::from("Assets:Bank")]
                < seen_positions[&AccName::from("Assets:Bank:Checking")]
        );
    }
}
