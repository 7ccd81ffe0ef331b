//! Resolved security principals: qualified name, SID and classification.

use crate::account::AccountName;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// An opaque security identifier.
///
/// Obtained only from identity resolution; never built by hand. The bytes
/// are carried bit-for-bit back into policy queries and are never
/// interpreted — no field or endianness assumptions belong here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SecurityId(Box<[u8]>);

impl SecurityId {
    /// Wraps raw SID bytes returned by a lookup service.
    #[inline]
    pub fn from_bytes<B: Into<Box<[u8]>>>(bytes: B) -> Self {
        Self(bytes.into())
    }

    /// The raw bytes, exactly as the lookup service produced them.
    #[inline]
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

/// Classification of a principal, mirroring the values of the Windows
/// `SID_NAME_USE` enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive, IntoPrimitive)]
#[repr(i32)]
pub enum PrincipalKind {
    /// A user account.
    User = 1,

    /// A group account.
    Group = 2,

    /// A domain.
    Domain = 3,

    /// An alias (local group).
    Alias = 4,

    /// A well-known group (Everyone, LocalSystem, ...).
    WellKnownGroup = 5,

    /// An account that has been deleted.
    DeletedAccount = 6,

    /// Not a valid account or domain SID.
    Invalid = 7,

    /// Could not be determined.
    Unknown = 8,

    /// A computer (machine account).
    Computer = 9,
}

impl PrincipalKind {
    /// Maps a raw `SID_NAME_USE` value, folding unrecognized values into
    /// [`Self::Unknown`].
    #[inline]
    #[must_use]
    pub fn from_raw(raw: i32) -> Self {
        Self::try_from_primitive(raw).unwrap_or(Self::Unknown)
    }
}

/// A resolved identity: qualified name, SID and kind.
///
/// Membership between principals is many-to-many and arbitrarily nested;
/// nothing here assumes a nesting depth bound.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    /// The fully qualified `SCOPE\name`.
    pub account: AccountName,
    /// The opaque identifier used for policy queries.
    pub sid: SecurityId,
    /// What kind of principal the name resolved to.
    pub kind: PrincipalKind,
}

impl Principal {
    /// Bundles the parts of a resolved identity.
    #[inline]
    #[must_use]
    pub const fn new(account: AccountName, sid: SecurityId, kind: PrincipalKind) -> Self {
        Self { account, sid, kind }
    }
}
