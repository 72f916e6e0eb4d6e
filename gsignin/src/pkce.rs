//! Proof Key for Code Exchange (RFC 7636).
//!
//! A fresh [`ProofKeyForCodeExchange`] is made for every sign-in attempt. The
//! challenge goes out with the authorization request, the verifier with the
//! token request, which lets the token endpoint check that both come from the
//! same client.

use std::fmt;

use sha2::{Digest, Sha256};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::base64url;
use crate::error::{Error, Result};
use crate::random::{OsSecureRandom, SecureRandom, random_bytes};

/// Secret half of a PKCE pair.
///
/// Always 43 to 128 characters out of `A-Z a-z 0-9 - . _ ~`.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CodeVerifier(String);

impl CodeVerifier {
    pub const MIN_LEN: usize = 43;
    pub const MAX_LEN: usize = 128;

    pub fn new(value: &str) -> Result<Self> {
        let len_ok = (Self::MIN_LEN..=Self::MAX_LEN).contains(&value.len());
        if !len_ok || !value.bytes().all(is_unreserved) {
            return Err(Error::InvalidCodeVerifier);
        }
        Ok(Self(value.to_owned()))
    }

    /// 32 random bytes, base64url-encoded and cut to the minimum length.
    pub fn random_with(rng: &dyn SecureRandom) -> Result<Self> {
        let mut bytes = random_bytes::<32>(rng)?;
        let mut encoded = base64url::encode(&bytes);
        bytes.zeroize();

        encoded.truncate(Self::MIN_LEN);
        Ok(Self(encoded))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CodeVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CodeVerifier(..)")
    }
}

fn is_unreserved(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'-' | b'.' | b'_' | b'~')
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    #[default]
    S256,
    Plain,
}

impl Method {
    /// Value of the `code_challenge_method` parameter.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::S256 => "S256",
            Self::Plain => "plain",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Method {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "S256" | "s256" => Ok(Self::S256),
            "plain" => Ok(Self::Plain),
            other => Err(format!("unknown code challenge method: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProofKeyForCodeExchange {
    code_verifier: CodeVerifier,
    method: Method,
}

impl ProofKeyForCodeExchange {
    pub fn new(code_verifier: &str, method: Method) -> Result<Self> {
        Ok(Self {
            code_verifier: CodeVerifier::new(code_verifier)?,
            method,
        })
    }

    /// Random S256 pair from the OS random source.
    pub fn make_random() -> Result<Self> {
        Self::make_random_with(&OsSecureRandom)
    }

    pub fn make_random_with(rng: &dyn SecureRandom) -> Result<Self> {
        Ok(Self {
            code_verifier: CodeVerifier::random_with(rng)?,
            method: Method::S256,
        })
    }

    pub fn code_verifier(&self) -> &CodeVerifier {
        &self.code_verifier
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn code_challenge(&self) -> String {
        match self.method {
            Method::S256 => base64url::encode(Sha256::digest(self.code_verifier.as_str())),
            Method::Plain => self.code_verifier.as_str().to_owned(),
        }
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    struct FailingRandom;

    impl SecureRandom for FailingRandom {
        fn fill(&self, _: &mut [u8]) -> Result<()> {
            Err(Error::SecureRandomGenerationFailed(-25291))
        }
    }

    struct ZeroRandom;

    impl SecureRandom for ZeroRandom {
        fn fill(&self, dest: &mut [u8]) -> Result<()> {
            dest.fill(0);
            Ok(())
        }
    }

    #[test]
    fn rfc7636_appendix_b() {
        let pkce = ProofKeyForCodeExchange::new(
            "dBjftJeZ4CVP-mB92K27uhbUJU1p1r_wW1gFWFOEjXk",
            Method::S256,
        )
        .unwrap();
        assert_eq!(
            pkce.code_challenge(),
            "E9Melhoa2OwvFrEMTJguCHaoeK1t8URWbuGJSstw-cM"
        );
    }

    #[test]
    fn plain_challenge_is_verifier() {
        let verifier = "a".repeat(43);
        let pkce = ProofKeyForCodeExchange::new(&verifier, Method::Plain).unwrap();
        assert_eq!(pkce.code_challenge(), verifier);
        assert_eq!(pkce.method().as_str(), "plain");
    }

    #[test]
    fn rejects_invalid_verifiers() {
        assert!(CodeVerifier::new(&"a".repeat(42)).is_err());
        assert!(CodeVerifier::new(&"a".repeat(129)).is_err());
        assert!(CodeVerifier::new(&format!("{}+", "a".repeat(42))).is_err());
        assert!(CodeVerifier::new(&format!("{}é", "a".repeat(42))).is_err());
        assert!(CodeVerifier::new(&format!("{}-._~", "a".repeat(39))).is_ok());
        assert!(CodeVerifier::new(&"Z9".repeat(64)).is_ok());
    }

    #[test]
    fn random_verifier_from_known_bytes() {
        let verifier = CodeVerifier::random_with(&ZeroRandom).unwrap();
        assert_eq!(verifier.as_str(), "A".repeat(43));
    }

    #[test]
    fn random_failure_is_surfaced() {
        let err = ProofKeyForCodeExchange::make_random_with(&FailingRandom).unwrap_err();
        assert!(matches!(err, Error::SecureRandomGenerationFailed(-25291)));
    }

    #[test]
    fn random_pairs_are_unique() {
        let a = ProofKeyForCodeExchange::make_random().unwrap();
        let b = ProofKeyForCodeExchange::make_random().unwrap();
        assert_ne!(a.code_verifier(), b.code_verifier());
        assert_eq!(a.method(), Method::S256);
    }

    #[test]
    fn debug_hides_verifier() {
        let pkce = ProofKeyForCodeExchange::new(&"s".repeat(43), Method::S256).unwrap();
        assert!(!format!("{pkce:?}").contains("sss"));
    }

    proptest! {
        #[test]
        fn generated_verifiers_are_valid(_seed in 0u8..32) {
            let pkce = ProofKeyForCodeExchange::make_random().unwrap();
            let verifier = pkce.code_verifier().as_str();
            prop_assert!(CodeVerifier::new(verifier).is_ok());
            prop_assert_eq!(verifier.len(), CodeVerifier::MIN_LEN);
        }

        #[test]
        fn challenge_is_deterministic(verifier in "[A-Za-z0-9._~-]{43,128}") {
            let a = ProofKeyForCodeExchange::new(&verifier, Method::S256).unwrap();
            let b = ProofKeyForCodeExchange::new(&verifier, Method::S256).unwrap();
            prop_assert_eq!(a.code_challenge(), b.code_challenge());
            prop_assert_eq!(
                a.code_challenge(),
                base64url::encode(Sha256::digest(verifier.as_bytes()))
            );
        }
    }
}
