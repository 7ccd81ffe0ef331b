//! Qualified account identifiers (`SCOPE\name`) with normalization.
//!
//! - [`AccountName`] stores the scope (domain or machine name) and the short
//!   account name separately; `Display` prints as `SCOPE\name`.
//! - [`AccountName::normalize`] qualifies raw CLI input against the local
//!   machine name: a bare `name` and a `.\name` both become `MACHINE\name`.
//! - [`AccountName::index_key`] yields the uppercased form used as the
//!   case-insensitive key of the local-group index.

use core::fmt::{self, Display};

/// A fully qualified `SCOPE\name` account identifier.
///
/// Invariant: always qualified. Construction goes through [`Self::new`] with
/// both parts, or through [`Self::normalize`] which fills in the local
/// machine name for unqualified input. Immutable once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AccountName {
    scope: String,
    name: String,
}

impl AccountName {
    /// Builds an already-qualified account identifier.
    #[inline]
    pub fn new<S: Into<String>, N: Into<String>>(scope: S, name: N) -> Self {
        Self {
            scope: scope.into(),
            name: name.into(),
        }
    }

    /// Qualifies raw input against `machine`.
    ///
    /// - `bob` becomes `MACHINE\bob`
    /// - `.\bob` becomes `MACHINE\bob`
    /// - `CORP\bob` stays `CORP\bob`
    ///
    /// Only the first `\` separates scope from name; any further backslashes
    /// stay part of the name. An empty scope token is treated like `.`.
    pub fn normalize(raw: &str, machine: &str) -> Self {
        match raw.split_once('\\') {
            Some((scope, name)) if scope.is_empty() || scope == "." => Self::new(machine, name),
            Some((scope, name)) => Self::new(scope, name),
            None => Self::new(machine, raw),
        }
    }

    /// The domain or machine name part.
    #[inline]
    #[must_use]
    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// The account or group short name part.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Uppercased `SCOPE\NAME`, the case-insensitive lookup key used by the
    /// local-group index.
    #[must_use]
    pub fn index_key(&self) -> String {
        format!("{}\\{}", self.scope, self.name).to_uppercase()
    }

    /// Whether the scope names the local machine (case-insensitive).
    #[must_use]
    pub fn is_machine_scoped(&self, machine: &str) -> bool {
        self.scope.eq_ignore_ascii_case(machine)
    }
}

impl Display for AccountName {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\\{}", self.scope, self.name)
    }
}
