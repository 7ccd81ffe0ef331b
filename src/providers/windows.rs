//! Collaborators backed by the Windows security APIs.
//!
//! - [`SamIdentityLookup`]: `LookupAccountNameW` with the two-call
//!   probe-then-fetch buffer protocol.
//! - [`LsaPolicyStore`] / [`LsaPolicy`]: the LSA policy store,
//!   `LsaEnumerateAccountRights` decoded eagerly inside a free-on-drop
//!   buffer guard.
//! - [`Win32DirectoryService`]: Authz authorization-group closure plus
//!   `NetLocalGroup*` enumeration.
//! - [`current_user`]: the invoking user's qualified name, read from the
//!   process token.

mod directory;
mod identity;
mod policy;

pub use directory::{DirectoryInitError, Win32DirectoryService};
pub use identity::{CurrentUserError, SamIdentityLookup, current_user};
pub use policy::{LsaPolicy, LsaPolicyStore};

use windows_sys::Win32::System::SystemInformation::GetComputerNameW;

/// The local machine's NetBIOS name.
///
/// Falls back to the `COMPUTERNAME` environment variable if the API call
/// fails, which keeps normalization working even in stripped-down sessions.
pub(crate) fn computer_name() -> String {
    let mut len: u32 = 0;
    // SAFETY: documented size probe, null buffer with zero length.
    unsafe { GetComputerNameW(core::ptr::null_mut(), &raw mut len) };
    let mut buffer = vec![0u16; len as usize];
    // SAFETY: the buffer was sized by the probe call just above.
    let ok = unsafe { GetComputerNameW(buffer.as_mut_ptr(), &raw mut len) };
    if ok != 0 {
        buffer.truncate(len as usize);
        return String::from_utf16_lossy(&buffer);
    }
    std::env::var("COMPUTERNAME").unwrap_or_else(|_| "LOCALHOST".to_owned())
}
