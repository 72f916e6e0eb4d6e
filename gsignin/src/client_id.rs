use std::fmt;
use std::str::FromStr;

use crate::error::Error;

const REDIRECT_PATH: &str = ":/oauth2callback";

/// OAuth client id of an installed Google app, e.g.
/// `123-abc.apps.googleusercontent.com`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GoogleClientId(String);

impl GoogleClientId {
    /// Returns `None` unless the id has at least two non-empty
    /// dot-separated segments.
    pub fn new(value: &str) -> Option<Self> {
        let mut segments = value.split('.');
        let valid = segments.clone().count() >= 2 && segments.all(|s| !s.is_empty());
        valid.then(|| Self(value.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Custom URL scheme Google redirects to: the id's segments reversed.
    pub fn default_scheme(&self) -> String {
        self.0.split('.').rev().collect::<Vec<_>>().join(".")
    }

    pub fn default_redirect_uri(&self) -> String {
        format!("{}{REDIRECT_PATH}", self.default_scheme())
    }
}

impl FromStr for GoogleClientId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| Error::InvalidClientId(s.to_owned()))
    }
}

impl fmt::Display for GoogleClientId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
