//! Collaborator contracts consumed by the rights-resolution engine.
//!
//! Three external services back the engine: an identity lookup (name to SID
//! translation), the authority policy store (rights per SID) and a
//! directory/group-membership service (authorization closure and local
//! groups). On Windows they are implemented over the native APIs in
//! [`windows`]; tests substitute in-memory fakes.

use crate::account::AccountName;
use crate::error::RightsError;
use crate::principal::{Principal, SecurityId};

#[cfg(windows)]
pub mod windows;

/// A right or logon-right name, e.g. `SeServiceLogonRight`.
///
/// Rights are machine-scoped plain strings: the name means the same
/// privilege everywhere, but the set of holders is local to this machine's
/// policy store.
pub type Right = String;

/// Outcome of an identity resolution.
///
/// Not-found is an expected branch, not an error: callers must decide
/// between lenient and strict handling explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The name translated to a principal.
    Resolved(Principal),
    /// The name maps to no known account.
    NotFound,
}

/// Name-to-SID translation service.
pub trait IdentityLookup {
    /// The local machine name, used to qualify unscoped input and to pick
    /// the membership context.
    fn machine_name(&self) -> &str;

    /// Resolves a qualified name to its SID and classification.
    ///
    /// Implementations over native lookup APIs must follow the two-call
    /// probe-then-fetch buffer protocol: probe for the required size, then
    /// fetch with a correctly sized buffer. Never guess buffer sizes.
    fn resolve(&self, account: &AccountName) -> Resolution;
}

/// The machine's security-policy store.
pub trait PolicyStore {
    /// Scoped handle to an opened store.
    type Handle: PolicyHandle;

    /// Acquires a handle with the union of all read/enumerate access flags.
    ///
    /// # Errors
    /// [`RightsError::AccessDenied`] when the calling process is not
    /// elevated. The handle is released when dropped, on every exit path.
    fn open(&self) -> Result<Self::Handle, RightsError>;
}

/// An open policy-store handle.
///
/// Exclusively owned by one `all_rights` invocation; never shared across
/// concurrent resolutions.
pub trait PolicyHandle {
    /// Enumerates every right directly assigned to exactly this SID.
    ///
    /// A store-side "no rights found" is success with an empty list, not an
    /// error.
    ///
    /// # Errors
    /// [`RightsError::PolicyQueryFailed`] for any other non-success status.
    fn rights_of(&self, sid: &SecurityId) -> Result<Vec<Right>, RightsError>;
}

/// Which account database a membership query runs against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// The local machine's account database.
    Machine,
    /// A domain directory.
    Domain,
}

/// One local group together with its direct members, already resolved to
/// qualified names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalGroup {
    /// The group's short name (local groups carry no scope of their own).
    pub name: String,
    /// Direct members, each as a qualified `SCOPE\name`.
    pub members: Vec<AccountName>,
}

/// Directory and account-database membership service.
pub trait DirectoryService {
    /// The authorization-group closure of `principal`: every group it is a
    /// transitive member of, nested groups included.
    ///
    /// The closure is computed by the directory service itself; callers do
    /// not recurse further.
    ///
    /// # Errors
    /// [`RightsError::DomainUnreachable`] when the directory server cannot
    /// be contacted. Callers degrade softly.
    fn authorization_groups(
        &self,
        principal: &Principal,
        context: Context,
    ) -> Result<Vec<Principal>, RightsError>;

    /// Walks every local group on the machine with its direct members.
    ///
    /// Best-effort: a group whose member enumeration fails is skipped, not
    /// reported.
    fn local_groups(&self) -> Vec<LocalGroup>;
}
