//! Reverse index from principal to local-group membership.

use std::collections::{BTreeSet, HashMap};

use crate::account::AccountName;
use crate::providers::DirectoryService;

/// Process-lifetime reverse mapping `principal -> local group names`.
///
/// The local membership enumeration only exposes `group -> members`, so the
/// reverse index is built once by walking every local group and queried many
/// times afterwards. The snapshot is immutable: nothing mutates local groups
/// mid-run, and a stale read would only reproduce what a racing CLI run
/// would have seen anyway.
#[derive(Debug, Default)]
pub struct LocalGroupIndex {
    by_member: HashMap<String, BTreeSet<String>>,
}

impl LocalGroupIndex {
    /// Builds the full index by walking every local group's member list.
    ///
    /// Groups the directory could not enumerate are already absent from
    /// [`DirectoryService::local_groups`], so the index is best-effort by
    /// construction.
    pub fn build<D: DirectoryService + ?Sized>(directory: &D) -> Self {
        let mut by_member: HashMap<String, BTreeSet<String>> = HashMap::new();
        for group in directory.local_groups() {
            for member in &group.members {
                by_member
                    .entry(member.index_key())
                    .or_default()
                    .insert(group.name.clone());
            }
        }
        Self { by_member }
    }

    /// The local groups `account` is a direct member of, in sorted order.
    /// Empty when the account belongs to none.
    pub fn groups_of(&self, account: &AccountName) -> impl Iterator<Item = &str> {
        self.by_member
            .get(&account.index_key())
            .into_iter()
            .flatten()
            .map(String::as_str)
    }

    /// Number of distinct members known to the index.
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_member.len()
    }

    /// Whether no membership at all was found.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_member.is_empty()
    }
}
