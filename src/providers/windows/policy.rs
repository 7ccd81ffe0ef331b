//! The LSA authority-policy store: open, enumerate rights per SID, close.

use core::mem::MaybeUninit;
use core::ptr::{null, null_mut};

use windows_sys::Win32::Foundation::{ERROR_ACCESS_DENIED, ERROR_FILE_NOT_FOUND, ERROR_SUCCESS};
use windows_sys::Win32::Security::Authentication::Identity::{
    LSA_HANDLE, LSA_OBJECT_ATTRIBUTES, LSA_UNICODE_STRING, LsaClose, LsaEnumerateAccountRights,
    LsaFreeMemory, LsaNtStatusToWinError, LsaOpenPolicy, POLICY_AUDIT_LOG_ADMIN,
    POLICY_CREATE_ACCOUNT, POLICY_CREATE_PRIVILEGE, POLICY_CREATE_SECRET,
    POLICY_GET_PRIVATE_INFORMATION, POLICY_LOOKUP_NAMES, POLICY_NOTIFICATION, POLICY_SERVER_ADMIN,
    POLICY_SET_AUDIT_REQUIREMENTS, POLICY_SET_DEFAULT_QUOTA_LIMITS, POLICY_TRUST_ADMIN,
    POLICY_VIEW_AUDIT_INFORMATION, POLICY_VIEW_LOCAL_INFORMATION,
};

use crate::error::RightsError;
use crate::principal::SecurityId;
use crate::providers::{PolicyHandle, PolicyStore, Right};

/// Union of every read/enumerate access bit; rights enumeration itself only
/// needs `POLICY_LOOKUP_NAMES`, the rest matches the store's full read
/// surface so one handle serves every query of a resolution run.
const POLICY_ALL_READ: u32 = POLICY_AUDIT_LOG_ADMIN
    | POLICY_CREATE_ACCOUNT
    | POLICY_CREATE_PRIVILEGE
    | POLICY_CREATE_SECRET
    | POLICY_GET_PRIVATE_INFORMATION
    | POLICY_LOOKUP_NAMES
    | POLICY_NOTIFICATION
    | POLICY_SERVER_ADMIN
    | POLICY_SET_AUDIT_REQUIREMENTS
    | POLICY_SET_DEFAULT_QUOTA_LIMITS
    | POLICY_TRUST_ADMIN
    | POLICY_VIEW_AUDIT_INFORMATION
    | POLICY_VIEW_LOCAL_INFORMATION;

/// Factory for [`LsaPolicy`] handles on the local machine's policy store.
pub struct LsaPolicyStore;

impl PolicyStore for LsaPolicyStore {
    type Handle = LsaPolicy;

    fn open(&self) -> Result<LsaPolicy, RightsError> {
        LsaPolicy::open_local()
    }
}

/// An open handle to the local LSA policy store, closed on drop.
pub struct LsaPolicy {
    handle: LSA_HANDLE,
}

impl LsaPolicy {
    /// Opens the local policy store with the full read access mask.
    ///
    /// # Errors
    /// [`RightsError::AccessDenied`] when the process is not elevated;
    /// [`RightsError::PolicyQueryFailed`] for any other open failure.
    pub fn open_local() -> Result<Self, RightsError> {
        // LsaOpenPolicy ignores the attribute contents but requires the struct.
        // SAFETY: LSA_OBJECT_ATTRIBUTES is plain data; all-zero is its documented init.
        let attributes: LSA_OBJECT_ATTRIBUTES = unsafe { core::mem::zeroed() };
        let mut handle_mu: MaybeUninit<LSA_HANDLE> = MaybeUninit::uninit();

        // SAFETY: null system name opens the local policy; out-pointer is valid.
        let status = unsafe {
            LsaOpenPolicy(
                null(),
                &raw const attributes,
                POLICY_ALL_READ,
                handle_mu.as_mut_ptr(),
            )
        };
        // SAFETY: pure status-code translation.
        match unsafe { LsaNtStatusToWinError(status) } {
            ERROR_SUCCESS => Ok(Self {
                // SAFETY: LsaOpenPolicy reported success; the handle is initialized.
                handle: unsafe { handle_mu.assume_init() },
            }),
            ERROR_ACCESS_DENIED => Err(RightsError::AccessDenied),
            other => Err(RightsError::PolicyQueryFailed(other)),
        }
    }
}

impl PolicyHandle for LsaPolicy {
    fn rights_of(&self, sid: &SecurityId) -> Result<Vec<Right>, RightsError> {
        let mut records_ptr: *mut LSA_UNICODE_STRING = null_mut();
        let mut count = 0u32;

        // SAFETY: the handle is open; the SID bytes are passed back bit-for-bit.
        let status = unsafe {
            LsaEnumerateAccountRights(
                self.handle,
                sid.as_bytes().as_ptr().cast_mut().cast(),
                &raw mut records_ptr,
                &raw mut count,
            )
        };
        // SAFETY: pure status-code translation.
        match unsafe { LsaNtStatusToWinError(status) } {
            ERROR_SUCCESS => {}
            // "No rights assigned to this exact SID" is success with an
            // empty list, not a failure.
            ERROR_FILE_NOT_FOUND => return Ok(Vec::new()),
            other => return Err(RightsError::PolicyQueryFailed(other)),
        }

        // Decode eagerly while the guard owns the native buffer; the guard
        // frees it on every path out of this scope.
        let _guard = LsaBuffer(records_ptr.cast());
        // SAFETY: on success the store returned exactly `count` contiguous records.
        let records = unsafe { core::slice::from_raw_parts(records_ptr, count as usize) };
        let mut rights = Vec::with_capacity(count as usize);
        for record in records {
            // SAFETY: each record's buffer holds Length/2 UTF-16 code units.
            let units = unsafe {
                core::slice::from_raw_parts(record.Buffer, usize::from(record.Length) / 2)
            };
            rights.push(String::from_utf16_lossy(units));
        }
        Ok(rights)
    }
}

impl Drop for LsaPolicy {
    fn drop(&mut self) {
        // SAFETY: the handle came from a successful LsaOpenPolicy and is
        // closed exactly once.
        let _ = unsafe { LsaClose(self.handle) };
    }
}

/// Frees an LSA-allocated output buffer when dropped.
struct LsaBuffer(*mut core::ffi::c_void);

impl Drop for LsaBuffer {
    fn drop(&mut self) {
        if !self.0.is_null() {
            // SAFETY: the pointer came from an LSA allocation and is freed once.
            let _ = unsafe { LsaFreeMemory(self.0) };
        }
    }
}
