//! Interactive browser session.
//!
//! Hosts plug in the actual browser presentation through
//! [`WebAuthenticationSession`]. Callback-style platform APIs can be bridged
//! to `async` with [`completion_channel`].

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};

use async_trait::async_trait;
use tokio::sync::oneshot;
use url::Url;

use crate::error::{Error, Result};

/// Presents the authorization URL to the user and waits for the redirect.
///
/// Implementations resolve with the callback URL once the browser is
/// redirected to a URL with `callback_scheme`, or with
/// [`Error::UserCancelled`] when the user dismisses the session.
#[async_trait]
pub trait WebAuthenticationSession: Send + Sync {
    async fn authenticate(&self, url: Url, callback_scheme: &str) -> Result<Url>;
}

/// Creates a single-use completion handle and the future it resolves.
pub fn completion_channel() -> (SessionCompletion, SessionCompletionFuture) {
    let (tx, rx) = oneshot::channel();
    (SessionCompletion { tx }, SessionCompletionFuture { rx })
}

/// Write half of [`completion_channel`].
///
/// `complete` takes `self`, so a session can only be resumed once.
#[derive(Debug)]
pub struct SessionCompletion {
    tx: oneshot::Sender<Result<Url>>,
}

impl SessionCompletion {
    /// Resolves the session from a platform callback that reports either a
    /// URL or an error.
    pub fn complete(self, callback: Option<Url>, error: Option<Error>) {
        let result = match (callback, error) {
            (Some(url), None) => Ok(url),
            (None, Some(error)) => Err(error),
            (callback, error) => {
                tracing::error!(
                    has_callback = callback.is_some(),
                    has_error = error.is_some(),
                    "inconsistent authentication session completion"
                );
                Err(Error::InconsistentCompletion)
            }
        };
        self.resolve(result);
    }

    pub fn resolve(self, result: Result<Url>) {
        if self.tx.send(result).is_err() {
            tracing::debug!("authentication session completed after the waiter went away");
        }
    }
}

/// Read half of [`completion_channel`].
///
/// Resolves to [`Error::InconsistentCompletion`] if the handle is dropped
/// without completing.
#[derive(Debug)]
pub struct SessionCompletionFuture {
    rx: oneshot::Receiver<Result<Url>>,
}

impl Future for SessionCompletionFuture {
    type Output = Result<Url>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|res| match res {
            Ok(res) => res,
            Err(_) => {
                tracing::error!("authentication session was dropped without completing");
                Err(Error::InconsistentCompletion)
            }
        })
    }
}

static PRESENTED_SESSION: AtomicU64 = AtomicU64::new(0);
static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Registration of the session currently on screen.
///
/// Only one session is tracked process-wide; a newer presentation replaces
/// the older one, and dropping a guard only clears its own registration.
#[derive(Debug)]
#[must_use]
pub struct PresentedSession {
    id: u64,
}

impl PresentedSession {
    pub fn begin() -> Self {
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        let previous = PRESENTED_SESSION.swap(id, Ordering::AcqRel);
        if previous != 0 {
            tracing::warn!(previous, id, "replacing a presented authentication session");
        }
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn is_current(&self) -> bool {
        PRESENTED_SESSION.load(Ordering::Acquire) == self.id
    }

    /// Id of the session currently presented, if any.
    pub fn current() -> Option<u64> {
        match PRESENTED_SESSION.load(Ordering::Acquire) {
            0 => None,
            id => Some(id),
        }
    }
}

impl Drop for PresentedSession {
    fn drop(&mut self) {
        PRESENTED_SESSION
            .compare_exchange(self.id, 0, Ordering::AcqRel, Ordering::Acquire)
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn callback() -> Url {
        Url::parse("com.googleusercontent.apps.123://oauth2callback?code=ABC123").unwrap()
    }

    #[tokio::test]
    async fn resolves_with_callback() {
        let (completion, waiter) = completion_channel();
        tokio::spawn(async move { completion.complete(Some(callback()), None) });
        assert_eq!(waiter.await.unwrap(), callback());
    }

    #[tokio::test]
    async fn resolves_with_error() {
        let (completion, waiter) = completion_channel();
        completion.complete(None, Some(Error::UserCancelled));
        assert!(matches!(waiter.await, Err(Error::UserCancelled)));
    }

    #[tokio::test]
    async fn both_or_neither_is_inconsistent() {
        let (completion, waiter) = completion_channel();
        completion.complete(Some(callback()), Some(Error::UserCancelled));
        assert!(matches!(waiter.await, Err(Error::InconsistentCompletion)));

        let (completion, waiter) = completion_channel();
        completion.complete(None, None);
        assert!(matches!(waiter.await, Err(Error::InconsistentCompletion)));
    }

    #[tokio::test]
    async fn dropped_handle_does_not_hang() {
        let (completion, waiter) = completion_channel();
        drop(completion);
        assert!(matches!(waiter.await, Err(Error::InconsistentCompletion)));
    }

    #[test]
    fn completing_after_waiter_is_gone_is_harmless() {
        let (completion, waiter) = completion_channel();
        drop(waiter);
        completion.complete(Some(callback()), None);
    }

    #[test]
    fn presented_session_tracks_latest() {
        let first = PresentedSession::begin();
        assert!(first.is_current());

        let second = PresentedSession::begin();
        assert!(!first.is_current());
        assert!(second.is_current());

        drop(first);
        assert!(second.is_current());

        let id = second.id();
        drop(second);
        assert_ne!(PresentedSession::current(), Some(id));
    }
}
