//! The rights aggregator: one account in, its deduplicated right set out.

use std::collections::BTreeSet;
use std::sync::OnceLock;

use tracing::{debug, warn};

use crate::account::AccountName;
use crate::closure::authorization_closure;
use crate::error::RightsError;
use crate::index::LocalGroupIndex;
use crate::principal::Principal;
use crate::providers::{
    DirectoryService, IdentityLookup, PolicyHandle, PolicyStore, Resolution, Right,
};

/// Result of a resolution: the canonical account and its sorted right set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveRights {
    /// The fully qualified account the rights belong to.
    pub account: AccountName,
    /// Sorted, deduplicated right names.
    pub rights: Vec<Right>,
}

/// Orchestrates identity resolution, membership walking and policy queries.
///
/// The collaborators are injected, never ambient; the local-group index is a
/// per-resolver snapshot built on first use and reused by every later call
/// (`OnceLock` keeps the build single-shot even if the resolver ever crosses
/// threads). One `all_rights` call opens the policy store once and owns that
/// handle until the call returns.
pub struct RightsResolver<I, P, D> {
    identity: I,
    policy: P,
    directory: D,
    index: OnceLock<LocalGroupIndex>,
    strict: bool,
}

impl<I, P, D> RightsResolver<I, P, D>
where
    I: IdentityLookup,
    P: PolicyStore,
    D: DirectoryService,
{
    /// Wires the three collaborators together. Lenient by default: an
    /// unresolvable account yields an empty right set.
    pub const fn new(identity: I, policy: P, directory: D) -> Self {
        Self {
            identity,
            policy,
            directory,
            index: OnceLock::new(),
            strict: false,
        }
    }

    /// In strict mode an unresolvable account fails with
    /// [`RightsError::AccountNotFound`] instead of yielding an empty set.
    #[must_use]
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Resolves the full effective right set of `raw`.
    ///
    /// The union covers rights assigned directly to the account, to every
    /// group in its authorization closure, and to every local group any of
    /// those principals is a member of. Output is sorted and free of
    /// duplicates.
    ///
    /// # Errors
    /// [`RightsError::AccessDenied`] when the policy store cannot be opened
    /// (always fatal, nothing partial is returned), and
    /// [`RightsError::AccountNotFound`] in strict mode only. A failed query
    /// for a single group is logged and skipped; an unreachable domain drops
    /// only the domain-derived subset.
    pub fn all_rights(&self, raw: &str) -> Result<EffectiveRights, RightsError> {
        let machine = self.identity.machine_name().to_owned();
        let account = AccountName::normalize(raw, &machine);

        let principal = match self.identity.resolve(&account) {
            Resolution::Resolved(principal) => principal,
            Resolution::NotFound => {
                if self.strict {
                    return Err(RightsError::AccountNotFound(account));
                }
                warn!(%account, "account did not resolve, reporting no rights");
                return Ok(EffectiveRights {
                    account,
                    rights: Vec::new(),
                });
            }
        };

        // Opened once per call, shared by every query below, closed when the
        // handle drops on any exit path.
        let handle = self.policy.open()?;

        let index = self
            .index
            .get_or_init(|| LocalGroupIndex::build(&self.directory));

        let mut rights = BTreeSet::new();
        let mut seen_local: BTreeSet<String> = BTreeSet::new();

        collect_rights(&handle, &principal, &mut rights);

        for group in authorization_closure(&self.directory, &principal, &machine) {
            collect_rights(&handle, &group, &mut rights);
            self.collect_local_rights(
                &handle,
                index,
                &group.account,
                &machine,
                &mut rights,
                &mut seen_local,
            );
        }

        self.collect_local_rights(
            &handle,
            index,
            &principal.account,
            &machine,
            &mut rights,
            &mut seen_local,
        );

        Ok(EffectiveRights {
            account: principal.account,
            rights: rights.into_iter().collect(),
        })
    }

    /// Adds the rights of every local group `account` is a member of,
    /// querying each group at most once per `all_rights` call.
    fn collect_local_rights(
        &self,
        handle: &P::Handle,
        index: &LocalGroupIndex,
        account: &AccountName,
        machine: &str,
        rights: &mut BTreeSet<Right>,
        seen_local: &mut BTreeSet<String>,
    ) {
        for group_name in index.groups_of(account) {
            if !seen_local.insert(group_name.to_uppercase()) {
                continue;
            }
            let group_account = AccountName::new(machine, group_name);
            match self.identity.resolve(&group_account) {
                Resolution::Resolved(group) => collect_rights(handle, &group, rights),
                Resolution::NotFound => {
                    debug!(group = %group_account, "local group did not resolve, skipping");
                }
            }
        }
    }
}

/// Queries one principal's direct rights, isolating per-principal failures:
/// a failed enumeration must not blank out rights already found for others.
fn collect_rights<H: PolicyHandle>(
    handle: &H,
    principal: &Principal,
    rights: &mut BTreeSet<Right>,
) {
    match handle.rights_of(&principal.sid) {
        Ok(found) => rights.extend(found),
        Err(err) => {
            warn!(account = %principal.account, error = %err, "rights query failed for one principal, skipping it");
        }
    }
}
