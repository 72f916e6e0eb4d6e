use url::Url;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Errors produced by a sign-in attempt.
///
/// Every failure path of [`GoogleAuthenticator`](crate::GoogleAuthenticator)
/// ends in one of these. Transport errors are passed through unchanged so that
/// callers can tell an unreachable endpoint apart from a rejected request.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid Google client id: {0:?}")]
    InvalidClientId(String),

    #[error("code verifier must be 43-128 unreserved URL characters")]
    InvalidCodeVerifier,

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("secure random generation failed with status {0}")]
    SecureRandomGenerationFailed(i32),

    #[error("the user cancelled the authentication session")]
    UserCancelled,

    /// The session finished with both a callback URL and an error, or with
    /// neither. This is a broken session implementation, not a user action.
    #[error("authentication session completed without a consistent result")]
    InconsistentCompletion,

    #[error("authentication session failed: {0}")]
    Session(String),

    #[error("callback URL did not contain a code parameter: {0}")]
    UrlDidNotContainCodeParameter(Url),

    #[error("token response did not include an ID token")]
    TokenResponseDidNotIncludeIdToken,

    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("token endpoint returned {status}: {error}")]
    TokenEndpoint {
        status: u16,
        error: String,
        description: Option<String>,
    },

    #[error("failed to decode response: {0}")]
    Decoding(#[from] serde_json::Error),

    #[error("ID token verification failed: {0}")]
    IdTokenVerification(String),
}

/// Coarse classification of [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Entropy,
    UserInteraction,
    Protocol,
    Transport,
    Verification,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidClientId(_) | Self::InvalidCodeVerifier | Self::InvalidUrl(_) => {
                ErrorKind::Configuration
            }
            Self::SecureRandomGenerationFailed(_) => ErrorKind::Entropy,
            Self::UserCancelled | Self::InconsistentCompletion | Self::Session(_) => {
                ErrorKind::UserInteraction
            }
            Self::UrlDidNotContainCodeParameter(_) | Self::TokenResponseDidNotIncludeIdToken => {
                ErrorKind::Protocol
            }
            Self::Transport(_) | Self::TokenEndpoint { .. } | Self::Decoding(_) => {
                ErrorKind::Transport
            }
            Self::IdTokenVerification(_) => ErrorKind::Verification,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::UserCancelled)
    }
}
