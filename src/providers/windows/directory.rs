//! Directory membership over the Authz context API and the NetLocalGroup
//! enumeration APIs.
//!
//! The authorization-group closure comes from `AuthzGetInformationFromContext`
//! with `AuthzContextInfoGroupsSids`, the same machinery the account
//! management stack uses: nesting is already flattened by the directory, so
//! no recursion happens here.

use core::mem::{MaybeUninit, offset_of};
use core::ptr::{self, null, null_mut};

use thiserror::Error;
use tracing::warn;
use widestring::{U16CStr, U16CString};
use windows_sys::Win32::Foundation::{
    ERROR_BAD_NETPATH, ERROR_INSUFFICIENT_BUFFER, ERROR_MORE_DATA, ERROR_NO_SUCH_DOMAIN,
    GetLastError, LUID,
};
use windows_sys::Win32::NetworkManagement::NetManagement::{
    LOCALGROUP_INFO_0, LOCALGROUP_MEMBERS_INFO_2, MAX_PREFERRED_LENGTH, NERR_Success,
    NetApiBufferFree, NetLocalGroupEnum, NetLocalGroupGetMembers,
};
use windows_sys::Win32::Security::Authorization::{
    AUTHZ_CLIENT_CONTEXT_HANDLE, AUTHZ_RESOURCE_MANAGER_HANDLE, AUTHZ_RM_FLAG_NO_AUDIT,
    AuthzContextInfoGroupsSids, AuthzFreeContext, AuthzFreeResourceManager,
    AuthzGetInformationFromContext, AuthzInitializeContextFromSid,
    AuthzInitializeResourceManager,
};
use windows_sys::Win32::Security::{SID_AND_ATTRIBUTES, TOKEN_GROUPS};

use super::identity::{copy_sid, lookup_sid};
use crate::account::AccountName;
use crate::error::RightsError;
use crate::principal::{Principal, PrincipalKind};
use crate::providers::{Context, DirectoryService, LocalGroup};

// WIN32 RPC_S_SERVER_UNAVAILABLE: the DC endpoint did not answer.
const RPC_S_SERVER_UNAVAILABLE: u32 = 1722;

/// Resource-manager initialization failed before any query ran.
#[derive(Debug, Error)]
pub enum DirectoryInitError {
    /// `AuthzInitializeResourceManager` failed; carries the `GetLastError` code.
    #[error("AuthzInitializeResourceManager failed (error {0})")]
    ResourceManager(u32),
}

/// Membership service over the live machine: Authz for the group closure,
/// NetLocalGroup* for the local account database.
pub struct Win32DirectoryService {
    machine: String,
    manager: ResourceManager,
}

impl Win32DirectoryService {
    /// Initializes the Authz resource manager (audit-free) and captures the
    /// machine name.
    ///
    /// # Errors
    /// [`DirectoryInitError`] when the resource manager cannot be created.
    pub fn new() -> Result<Self, DirectoryInitError> {
        let mut manager_mu: MaybeUninit<AUTHZ_RESOURCE_MANAGER_HANDLE> = MaybeUninit::uninit();
        // SAFETY: no callbacks, no name; the out-pointer is valid.
        let ok = unsafe {
            AuthzInitializeResourceManager(
                AUTHZ_RM_FLAG_NO_AUDIT,
                None,
                None,
                None,
                null(),
                manager_mu.as_mut_ptr(),
            )
        };
        if ok == 0 {
            // SAFETY: `GetLastError` can be called immediately after a failing FFI call.
            return Err(DirectoryInitError::ResourceManager(unsafe {
                GetLastError()
            }));
        }
        Ok(Self {
            machine: super::computer_name(),
            // SAFETY: AuthzInitializeResourceManager reported success.
            manager: ResourceManager(unsafe { manager_mu.assume_init() }),
        })
    }

    fn members_of(&self, group: &str) -> Result<Vec<AccountName>, u32> {
        let Ok(group_wide) = U16CString::from_str(group) else {
            // Group names out of the API cannot contain interior NULs.
            return Ok(Vec::new());
        };
        let mut members = Vec::new();
        let mut resume: usize = 0;
        loop {
            let mut buffer: *mut u8 = null_mut();
            let mut read = 0u32;
            let mut total = 0u32;
            // SAFETY: null server targets the local machine; level 2 yields
            // members with SIDs and qualified names.
            let status = unsafe {
                NetLocalGroupGetMembers(
                    null(),
                    group_wide.as_ptr(),
                    2,
                    &raw mut buffer,
                    MAX_PREFERRED_LENGTH,
                    &raw mut read,
                    &raw mut total,
                    &raw mut resume,
                )
            };
            if status != NERR_Success && status != ERROR_MORE_DATA {
                return Err(status);
            }
            let _guard = NetBuffer(buffer.cast());
            // SAFETY: on success the buffer holds `read` LOCALGROUP_MEMBERS_INFO_2 records.
            let entries = unsafe {
                core::slice::from_raw_parts(buffer.cast::<LOCALGROUP_MEMBERS_INFO_2>(), read as usize)
            };
            for entry in entries {
                // SAFETY: the API returns NUL-terminated "DOMAIN\name" strings.
                let qualified = unsafe { U16CStr::from_ptr_str(entry.lgrmi2_domainandname) };
                members.push(AccountName::normalize(
                    &qualified.to_string_lossy(),
                    &self.machine,
                ));
            }
            if status != ERROR_MORE_DATA {
                break;
            }
        }
        Ok(members)
    }
}

impl DirectoryService for Win32DirectoryService {
    fn authorization_groups(
        &self,
        principal: &Principal,
        context: Context,
    ) -> Result<Vec<Principal>, RightsError> {
        let ctx = AuthzContext::from_sid(&self.manager, principal).map_err(|code| {
            match (context, code) {
                (
                    Context::Domain,
                    ERROR_NO_SUCH_DOMAIN | ERROR_BAD_NETPATH | RPC_S_SERVER_UNAVAILABLE,
                ) => RightsError::DomainUnreachable(principal.account.scope().to_owned()),
                (_, code) => RightsError::PolicyQueryFailed(code),
            }
        })?;

        let buffer = ctx.groups_buffer()?;

        // The buffer holds a TOKEN_GROUPS header followed by GroupCount
        // SID_AND_ATTRIBUTES entries. Vec<u8> promises no alignment, so
        // every read is unaligned.
        // SAFETY: the OS wrote at least a GroupCount at the struct's head.
        let count = unsafe {
            ptr::read_unaligned(
                buffer
                    .as_ptr()
                    .add(offset_of!(TOKEN_GROUPS, GroupCount))
                    .cast::<u32>(),
            )
        };
        let first = buffer
            .as_ptr()
            .wrapping_add(offset_of!(TOKEN_GROUPS, Groups))
            .cast::<SID_AND_ATTRIBUTES>();

        let mut groups = Vec::with_capacity(count as usize);
        for i in 0..count as usize {
            // SAFETY: `count` entries follow the header per the API contract.
            let entry = unsafe { ptr::read_unaligned(first.add(i)) };
            // SID-only entries that no longer translate (logon sessions,
            // orphaned SIDs) are skipped rather than failing the closure.
            let Some((account, kind)) = lookup_sid(entry.Sid) else {
                continue;
            };
            if matches!(kind, PrincipalKind::User | PrincipalKind::Computer) {
                continue;
            }
            groups.push(Principal::new(account, copy_sid(entry.Sid), kind));
        }
        Ok(groups)
    }

    fn local_groups(&self) -> Vec<LocalGroup> {
        let mut groups = Vec::new();
        let mut resume: usize = 0;
        loop {
            let mut buffer: *mut u8 = null_mut();
            let mut read = 0u32;
            let mut total = 0u32;
            // SAFETY: null server targets the local machine; level 0 yields names only.
            let status = unsafe {
                NetLocalGroupEnum(
                    null(),
                    0,
                    &raw mut buffer,
                    MAX_PREFERRED_LENGTH,
                    &raw mut read,
                    &raw mut total,
                    &raw mut resume,
                )
            };
            if status != NERR_Success && status != ERROR_MORE_DATA {
                warn!(status, "local group enumeration failed, index stays partial");
                break;
            }
            let _guard = NetBuffer(buffer.cast());
            // SAFETY: on success the buffer holds `read` LOCALGROUP_INFO_0 records.
            let entries = unsafe {
                core::slice::from_raw_parts(buffer.cast::<LOCALGROUP_INFO_0>(), read as usize)
            };
            for entry in entries {
                // SAFETY: the API returns NUL-terminated group names.
                let name = unsafe { U16CStr::from_ptr_str(entry.lgrpi0_name) }.to_string_lossy();
                match self.members_of(&name) {
                    Ok(members) => groups.push(LocalGroup { name, members }),
                    Err(status) => {
                        warn!(group = %name, status, "skipping local group whose members could not be read");
                    }
                }
            }
            if status != ERROR_MORE_DATA {
                break;
            }
        }
        groups
    }
}

/// Owns the Authz resource manager for the service's lifetime.
struct ResourceManager(AUTHZ_RESOURCE_MANAGER_HANDLE);

impl Drop for ResourceManager {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful initialization and is
        // freed exactly once.
        let _ = unsafe { AuthzFreeResourceManager(self.0) };
    }
}

/// A client context for one principal, freed on drop.
struct AuthzContext(AUTHZ_CLIENT_CONTEXT_HANDLE);

impl AuthzContext {
    fn from_sid(manager: &ResourceManager, principal: &Principal) -> Result<Self, u32> {
        let mut context_mu: MaybeUninit<AUTHZ_CLIENT_CONTEXT_HANDLE> = MaybeUninit::uninit();
        let identifier = LUID {
            LowPart: 0,
            HighPart: 0,
        };
        // SAFETY: the SID bytes are a valid SID from identity resolution; no
        // expiration, no dynamic groups.
        let ok = unsafe {
            AuthzInitializeContextFromSid(
                0,
                principal.sid.as_bytes().as_ptr().cast_mut().cast(),
                manager.0,
                null(),
                identifier,
                null(),
                context_mu.as_mut_ptr(),
            )
        };
        if ok == 0 {
            // SAFETY: `GetLastError` can be called immediately after a failing FFI call.
            return Err(unsafe { GetLastError() });
        }
        // SAFETY: AuthzInitializeContextFromSid reported success.
        Ok(Self(unsafe { context_mu.assume_init() }))
    }

    /// Fetches the raw `TOKEN_GROUPS` blob, probe-then-fetch.
    fn groups_buffer(&self) -> Result<Vec<u8>, RightsError> {
        let mut size = 0u32;
        // SAFETY: documented size probe with zero-length buffer.
        let probed = unsafe {
            AuthzGetInformationFromContext(
                self.0,
                AuthzContextInfoGroupsSids,
                0,
                &raw mut size,
                null_mut(),
            )
        };
        if probed != 0 {
            // A probe cannot succeed with a zero-length buffer.
            return Err(RightsError::PolicyQueryFailed(0));
        }
        // SAFETY: `GetLastError` is always safe to call.
        let err = unsafe { GetLastError() };
        if err != ERROR_INSUFFICIENT_BUFFER {
            return Err(RightsError::PolicyQueryFailed(err));
        }

        let mut buffer = vec![0u8; size as usize];
        // SAFETY: the buffer carries the capacity reported by the probe.
        let fetched = unsafe {
            AuthzGetInformationFromContext(
                self.0,
                AuthzContextInfoGroupsSids,
                size,
                &raw mut size,
                buffer.as_mut_ptr().cast(),
            )
        };
        if fetched == 0 {
            // SAFETY: `GetLastError` can be called immediately after a failing FFI call.
            return Err(RightsError::PolicyQueryFailed(unsafe { GetLastError() }));
        }
        Ok(buffer)
    }
}

impl Drop for AuthzContext {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful initialization and is
        // freed exactly once.
        let _ = unsafe { AuthzFreeContext(self.0) };
    }
}

/// Frees a NetApi-allocated output buffer when dropped.
struct NetBuffer(*mut core::ffi::c_void);

impl Drop for NetBuffer {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer came from a NetApi allocation and is freed once.
            let _ = unsafe { NetApiBufferFree(self.0) };
        }
    }
}
