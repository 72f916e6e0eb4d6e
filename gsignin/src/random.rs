use crate::error::{Error, Result};

/// Source of cryptographically secure random bytes.
pub trait SecureRandom: Send + Sync {
    fn fill(&self, dest: &mut [u8]) -> Result<()>;
}

/// The operating system's CSPRNG.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSecureRandom;

impl SecureRandom for OsSecureRandom {
    fn fill(&self, dest: &mut [u8]) -> Result<()> {
        getrandom::getrandom(dest).map_err(|e| {
            let status = e
                .raw_os_error()
                .unwrap_or_else(|| status_code(e.code().get()));
            tracing::error!(status, "secure random generation failed");
            Error::SecureRandomGenerationFailed(status)
        })
    }
}

/// getrandom's internal codes start at `2^31` and do not fit an `i32`.
fn status_code(code: u32) -> i32 {
    i32::try_from(code).unwrap_or(i32::MIN)
}

/// Returns `N` random bytes from `rng`.
pub fn random_bytes<const N: usize>(rng: &dyn SecureRandom) -> Result<[u8; N]> {
    let mut bytes = [0u8; N];
    rng.fill(&mut bytes)?;
    Ok(bytes)
}
