//! Object storage for uploaded media.

mod local;
mod remote;

pub use local::LocalStorage;
pub use remote::RemoteStorage;

use mercato_core::ProviderError;

/// Reject keys that could escape the storage root or the bucket prefix.
fn check_key(key: &str) -> Result<(), ProviderError> {
    let bad = key.is_empty()
        || key.starts_with('/')
        || key.contains('\\')
        || key.split('/').any(|part| part.is_empty() || part == "." || part == "..");
    if bad {
        return Err(ProviderError::Rejected {
            status: 400,
            message: format!("invalid storage key '{key}'"),
        });
    }
    Ok(())
}
