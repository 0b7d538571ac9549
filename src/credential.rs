//! Bearer credential type

use std::{fmt, sync::Arc};

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// Opaque bearer secret identifying one account.
///
/// The secret itself is never printed: both `Debug` and `Display` show a short
/// fingerprint instead, so a credential can be put in log lines safely.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Credential {
    secret: Arc<str>,
}

impl Credential {
    /// wrap a bearer secret
    pub fn new<S: AsRef<str> + ?Sized>(secret: &S) -> Self {
        Self {
            secret: Arc::from(secret.as_ref()),
        }
    }

    pub(crate) fn secret(&self) -> &str {
        &self.secret
    }

    /// Stable, non-reversible 8 hex digits identifying this credential.
    ///
    /// FNV-1a folded to 32 bits, stable across processes so it can be used as
    /// a persistent key.
    pub fn fingerprint(&self) -> String {
        let hash = self.secret.bytes().fold(FNV_OFFSET_BASIS, |hash, b| {
            (hash ^ u64::from(b)).wrapping_mul(FNV_PRIME)
        });
        format!("{:08x}", (hash ^ (hash >> 32)) as u32)
    }
}

impl From<&str> for Credential {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Credential {
    fn from(s: String) -> Self {
        Self::new(&s)
    }
}

impl fmt::Display for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.fingerprint())
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Credential")
            .field(&self.fingerprint())
            .finish()
    }
}
