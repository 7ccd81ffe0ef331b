//! Error taxonomy of the rights-resolution engine.
//!
//! Every native or directory failure is translated into one of these kinds
//! before it crosses into the aggregator; raw platform status codes never
//! leak past the collaborator boundary (the ones carried here are already
//! translated Win32 codes, kept for diagnostics only).

use crate::account::AccountName;
use thiserror::Error;

/// Failures surfaced by rights resolution.
///
/// The transient `ERROR_INSUFFICIENT_BUFFER` sizing signal of the two-call
/// lookup protocol has no variant on purpose: it is retried exactly once
/// inside the lookup collaborator and never surfaces.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RightsError {
    /// The input name could not be translated to a SID.
    ///
    /// Only returned in strict mode; the lenient default degrades to an
    /// empty rights list instead.
    #[error("account not found: {0}")]
    AccountNotFound(AccountName),

    /// The local security policy store refused to open.
    ///
    /// Requires an elevated process; always fatal.
    #[error("access denied opening the local security policy (run elevated)")]
    AccessDenied,

    /// A rights enumeration returned a non-success, non-empty status.
    ///
    /// Carries the translated Win32 error code.
    #[error("policy query failed (error {0})")]
    PolicyQueryFailed(u32),

    /// The directory server for the named domain could not be reached.
    ///
    /// Non-fatal: the membership walker degrades to an empty closure.
    #[error("domain controller unreachable for {0}")]
    DomainUnreachable(String),
}
