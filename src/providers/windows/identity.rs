//! Name and SID translation over the SAM/LSA account lookup APIs.

use core::mem::{MaybeUninit, offset_of};
use core::ptr::{self, null, null_mut};
use std::os::windows::io::{AsRawHandle, FromRawHandle, OwnedHandle, RawHandle};

use smallvec::SmallVec;
use thiserror::Error;
use widestring::U16CString;
use windows_sys::Win32::Foundation::{
    ERROR_INSUFFICIENT_BUFFER, ERROR_INVALID_FLAGS, GetLastError,
};
use windows_sys::Win32::Security::{
    GetLengthSid, GetTokenInformation, LookupAccountNameW, LookupAccountSidW, TOKEN_QUERY,
    TOKEN_USER, TokenUser,
};
use windows_sys::Win32::System::Threading::{GetCurrentProcess, OpenProcessToken};

use crate::account::AccountName;
use crate::principal::{Principal, PrincipalKind, SecurityId};
use crate::providers::{IdentityLookup, Resolution};

/// Identity lookup over `LookupAccountNameW` against the local system,
/// which falls through to trusted domain controllers for domain names.
pub struct SamIdentityLookup {
    machine: String,
}

impl SamIdentityLookup {
    /// Captures the machine name once; lookups reuse it for qualification.
    #[must_use]
    pub fn new() -> Self {
        Self {
            machine: super::computer_name(),
        }
    }
}

impl Default for SamIdentityLookup {
    fn default() -> Self {
        Self::new()
    }
}

impl IdentityLookup for SamIdentityLookup {
    fn machine_name(&self) -> &str {
        &self.machine
    }

    fn resolve(&self, account: &AccountName) -> Resolution {
        let Ok(qualified) = U16CString::from_str(account.to_string()) else {
            // Interior NUL cannot name a real account.
            return Resolution::NotFound;
        };

        let mut sid_len = 0u32;
        let mut domain_len = 0u32;
        let mut kind_raw = 0i32;

        // Probe call: null buffers, zero lengths. The API reports the
        // required sizes through the length out-parameters and fails.
        // SAFETY: the documented probe form of LookupAccountNameW.
        let probed = unsafe {
            LookupAccountNameW(
                null(),
                qualified.as_ptr(),
                null_mut(),
                &raw mut sid_len,
                null_mut(),
                &raw mut domain_len,
                &raw mut kind_raw,
            )
        };
        if probed != 0 {
            // A probe with null buffers cannot legitimately succeed.
            return Resolution::NotFound;
        }
        // SAFETY: `GetLastError` is always safe to call.
        let err = unsafe { GetLastError() };
        if err != ERROR_INSUFFICIENT_BUFFER && err != ERROR_INVALID_FLAGS {
            return Resolution::NotFound;
        }

        // Fetch call, retried exactly once with correctly sized buffers.
        let mut sid_buffer = vec![0u8; sid_len as usize];
        let mut domain_buffer = SmallVec::<[u16; 256]>::from_elem(0, domain_len as usize);
        // SAFETY: both buffers carry the capacities reported by the probe.
        let fetched = unsafe {
            LookupAccountNameW(
                null(),
                qualified.as_ptr(),
                sid_buffer.as_mut_ptr().cast(),
                &raw mut sid_len,
                domain_buffer.as_mut_ptr(),
                &raw mut domain_len,
                &raw mut kind_raw,
            )
        };
        if fetched == 0 {
            return Resolution::NotFound;
        }

        Resolution::Resolved(Principal::new(
            account.clone(),
            SecurityId::from_bytes(sid_buffer),
            PrincipalKind::from_raw(kind_raw),
        ))
    }
}

/// Failures while determining the invoking user's identity.
#[derive(Debug, Error)]
pub enum CurrentUserError {
    /// `OpenProcessToken` failed; carries the `GetLastError` code.
    #[error("OpenProcessToken failed (error {0})")]
    OpenToken(u32),

    /// `GetTokenInformation` failed; carries the `GetLastError` code.
    #[error("GetTokenInformation failed (error {0})")]
    TokenInfo(u32),

    /// The token's user SID did not translate back to a name.
    #[error("the current user SID could not be resolved to an account name")]
    Unresolvable,
}

/// The invoking user's qualified `DOMAIN\name`, read from the process
/// token's user SID and translated back through `LookupAccountSidW`.
pub fn current_user() -> Result<AccountName, CurrentUserError> {
    let mut raw_handle_mu: MaybeUninit<RawHandle> = MaybeUninit::uninit();

    // SAFETY: GetCurrentProcess is side-effect free and can be called unconditionally.
    let process_handle = unsafe { GetCurrentProcess() };
    // SAFETY: FFI call; pointers are valid. The return value is checked immediately.
    let open_ok =
        unsafe { OpenProcessToken(process_handle, TOKEN_QUERY, raw_handle_mu.as_mut_ptr().cast()) };
    if open_ok == 0 {
        // SAFETY: `GetLastError` can be called immediately after a failing FFI call.
        return Err(CurrentUserError::OpenToken(unsafe { GetLastError() }));
    }

    // SAFETY: OpenProcessToken reported success; the handle is initialized.
    let raw_handle: RawHandle = unsafe { raw_handle_mu.assume_init() };
    // SAFETY: `raw_handle` is a valid owned handle obtained from the OS.
    let token_handle: OwnedHandle = unsafe { OwnedHandle::from_raw_handle(raw_handle) };

    // Size probe, then fetch with the reported size.
    let mut size: u32 = 0;
    // SAFETY: standard size-query pattern with null buffer and zero length.
    unsafe {
        GetTokenInformation(
            token_handle.as_raw_handle(),
            TokenUser,
            ptr::null_mut(),
            0,
            &raw mut size,
        )
    };
    let mut buffer = vec![0u8; size as usize];
    // SAFETY: buffer pointer and length match the allocation; the size came from the probe.
    let fetched = unsafe {
        GetTokenInformation(
            token_handle.as_raw_handle(),
            TokenUser,
            buffer.as_mut_ptr().cast(),
            size,
            &raw mut size,
        )
    };
    if fetched == 0 {
        // SAFETY: `GetLastError` can be called immediately after a failing FFI call.
        return Err(CurrentUserError::TokenInfo(unsafe { GetLastError() }));
    }

    let sid_offset = offset_of!(TOKEN_USER, User.Sid);
    // SAFETY: the buffer holds a TOKEN_USER written by the OS; the PSID field
    // is read unaligned because Vec<u8> guarantees no particular alignment.
    let sid_ptr = unsafe { ptr::read_unaligned(buffer.as_ptr().add(sid_offset).cast()) };

    lookup_sid(sid_ptr)
        .map(|(account, _kind)| account)
        .ok_or(CurrentUserError::Unresolvable)
}

/// Resolves a raw SID pointer to its `DOMAIN\name` and kind via
/// `LookupAccountSidW`, probe-then-fetch. `None` when the SID maps to no
/// account (logon-session SIDs and the like).
///
/// The pointer must reference a valid SID for the duration of the call.
pub(crate) fn lookup_sid(sid: *mut core::ffi::c_void) -> Option<(AccountName, PrincipalKind)> {
    let mut name_len = 0u32;
    let mut domain_len = 0u32;
    let mut kind_raw = 0i32;

    // SAFETY: documented probe form; the caller guarantees `sid` is valid.
    let probed = unsafe {
        LookupAccountSidW(
            null(),
            sid,
            null_mut(),
            &raw mut name_len,
            null_mut(),
            &raw mut domain_len,
            &raw mut kind_raw,
        )
    };
    if probed != 0 {
        return None;
    }
    // SAFETY: `GetLastError` is always safe to call.
    if unsafe { GetLastError() } != ERROR_INSUFFICIENT_BUFFER {
        return None;
    }

    let mut name_buffer = SmallVec::<[u16; 256]>::from_elem(0, name_len as usize);
    let mut domain_buffer = SmallVec::<[u16; 256]>::from_elem(0, domain_len as usize);
    // SAFETY: buffers carry the capacities reported by the probe.
    let fetched = unsafe {
        LookupAccountSidW(
            null(),
            sid,
            name_buffer.as_mut_ptr(),
            &raw mut name_len,
            domain_buffer.as_mut_ptr(),
            &raw mut domain_len,
            &raw mut kind_raw,
        )
    };
    if fetched == 0 {
        return None;
    }

    name_buffer.truncate(name_len as usize);
    domain_buffer.truncate(domain_len as usize);
    let account = AccountName::new(
        String::from_utf16_lossy(&domain_buffer),
        String::from_utf16_lossy(&name_buffer),
    );
    Some((account, PrincipalKind::from_raw(kind_raw)))
}

/// Copies the bytes of a raw SID into an owned [`SecurityId`].
///
/// The pointer must reference a valid SID for the duration of the call.
pub(crate) fn copy_sid(sid: *mut core::ffi::c_void) -> SecurityId {
    // SAFETY: the caller guarantees a valid SID; GetLengthSid reads only its header.
    let len = unsafe { GetLengthSid(sid) };
    // SAFETY: a valid SID occupies exactly GetLengthSid bytes.
    let bytes = unsafe { core::slice::from_raw_parts(sid.cast::<u8>(), len as usize) };
    SecurityId::from_bytes(bytes.to_vec())
}
