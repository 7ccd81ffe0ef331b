//! Domain membership walker: the authorization-group closure of an account.

use tracing::warn;

use crate::error::RightsError;
use crate::principal::Principal;
use crate::providers::{Context, DirectoryService};

/// Snapshot of the groups `principal` is a transitive member of.
///
/// The context is machine-local when the account's scope names the local
/// machine, otherwise the scope is treated as a domain. The closure itself
/// comes from the directory service, nested groups already flattened; this
/// walker does not recurse.
///
/// An unreachable domain degrades to an empty closure: rights resolution
/// then continues with only locally derivable information instead of
/// failing the whole run.
pub fn authorization_closure<D: DirectoryService + ?Sized>(
    directory: &D,
    principal: &Principal,
    machine: &str,
) -> Vec<Principal> {
    let context = if principal.account.is_machine_scoped(machine) {
        Context::Machine
    } else {
        Context::Domain
    };
    match directory.authorization_groups(principal, context) {
        Ok(groups) => groups,
        Err(RightsError::DomainUnreachable(domain)) => {
            warn!(%domain, account = %principal.account, "domain unreachable, continuing with local rights only");
            Vec::new()
        }
        Err(err) => {
            warn!(error = %err, account = %principal.account, "group closure query failed, continuing without it");
            Vec::new()
        }
    }
}
