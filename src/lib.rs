//! # Effective Windows user-rights resolution
//!
//! Resolves the *effective* set of security rights (privileges and logon
//! rights such as `SeServiceLogonRight` or `SeBackupPrivilege`) held by an
//! account on a machine: rights assigned directly to the account plus rights
//! inherited transitively through group membership — local groups, domain
//! groups and nested groups.
//!
//! The crate provides:
//! - [`AccountName`]: qualified `SCOPE\name` identifiers with CLI-input
//!   normalization (`bob` / `.\bob` / `CORP\bob`).
//! - [`Principal`], [`PrincipalKind`], [`SecurityId`]: resolved identities
//!   with an opaque SID.
//! - [`IdentityLookup`], [`PolicyStore`], [`DirectoryService`]: the three
//!   collaborator contracts the engine runs against.
//! - [`LocalGroupIndex`]: the build-once reverse index from principal to
//!   local-group membership.
//! - [`RightsResolver`]: the aggregator exposing [`RightsResolver::all_rights`].
//! - `providers::windows` (Windows only): collaborators backed by the LSA
//!   policy store, `LookupAccountNameW`, the Authz group closure and the
//!   `NetLocalGroup*` enumeration APIs.
//!
//! ## Failure model
//! Opening the policy store requires elevation and is fatal on denial; an
//! unreachable domain degrades to "only local rights known"; a single
//! group's failed rights query is skipped without discarding the rest; an
//! unresolvable account yields an empty set unless strict mode is enabled.
//! See [`RightsError`].
//!
//! ## Example
//! The engine is generic over its collaborators, so it runs anywhere with
//! in-memory stand-ins:
//! ```rust
//! use win_effective_rights::{
//!     AccountName, Context, DirectoryService, IdentityLookup, LocalGroup,
//!     PolicyHandle, PolicyStore, Principal, PrincipalKind, Resolution, Right,
//!     RightsError, RightsResolver, SecurityId,
//! };
//!
//! struct OneUser;
//! impl IdentityLookup for OneUser {
//!     fn machine_name(&self) -> &str {
//!         "HOST"
//!     }
//!     fn resolve(&self, account: &AccountName) -> Resolution {
//!         Resolution::Resolved(Principal::new(
//!             account.clone(),
//!             SecurityId::from_bytes(account.index_key().into_bytes()),
//!             PrincipalKind::User,
//!         ))
//!     }
//! }
//!
//! struct OpenStore;
//! impl PolicyStore for OpenStore {
//!     type Handle = Store;
//!     fn open(&self) -> Result<Store, RightsError> {
//!         Ok(Store)
//!     }
//! }
//! struct Store;
//! impl PolicyHandle for Store {
//!     fn rights_of(&self, sid: &SecurityId) -> Result<Vec<Right>, RightsError> {
//!         Ok(if sid.as_bytes() == b"HOST\\ALICE" {
//!             vec!["SeInteractiveLogonRight".into()]
//!         } else {
//!             Vec::new()
//!         })
//!     }
//! }
//!
//! struct NoDirectory;
//! impl DirectoryService for NoDirectory {
//!     fn authorization_groups(
//!         &self,
//!         _principal: &Principal,
//!         _context: Context,
//!     ) -> Result<Vec<Principal>, RightsError> {
//!         Ok(Vec::new())
//!     }
//!     fn local_groups(&self) -> Vec<LocalGroup> {
//!         Vec::new()
//!     }
//! }
//!
//! let resolver = RightsResolver::new(OneUser, OpenStore, NoDirectory);
//! let resolved = resolver.all_rights("alice").unwrap();
//! assert_eq!(resolved.account.to_string(), "HOST\\alice");
//! assert_eq!(resolved.rights, ["SeInteractiveLogonRight"]);
//! ```
//!
//! ## Concurrency
//! Single-threaded, synchronous, blocking: one CLI invocation, one account.
//! The policy handle is owned by one `all_rights` call; the local-group
//! index is built at most once per resolver behind a `OnceLock` so a future
//! multi-account extension cannot build it twice.

#![warn(missing_docs)]

mod account;
mod closure;
mod error;
mod index;
mod principal;
pub mod providers;
mod resolver;

pub use account::AccountName;
pub use closure::authorization_closure;
pub use error::RightsError;
pub use index::LocalGroupIndex;
pub use principal::{Principal, PrincipalKind, SecurityId};
pub use providers::{
    Context, DirectoryService, IdentityLookup, LocalGroup, PolicyHandle, PolicyStore, Resolution,
    Right,
};
pub use resolver::{EffectiveRights, RightsResolver};
