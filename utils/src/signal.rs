use std::future::Future;

use futures_util::future::select_all;
use tokio::signal::unix::{self, SignalKind};

pub const TERMINATION_SIGNALS: [libc::c_int; 4] = [
    libc::SIGINT,
    libc::SIGTERM,
    libc::SIGQUIT,
    libc::SIGHUP,
];

/// Runs `f` until it completes or one of [`TERMINATION_SIGNALS`] arrives.
///
/// Signal handlers are installed before `f` is first polled.
pub async fn run_until_signal<F>(f: F) -> std::io::Result<Result<F::Output, SignalKind>>
where
    F: Future,
{
    let signal = any_signal(TERMINATION_SIGNALS)?;
    Ok(tokio::select! {
        output = f => Ok(output),
        signal = signal => {
            tracing::info!(?signal, "received termination signal");
            Err(signal)
        }
    })
}

/// Resolves with the first of `signals` to be delivered.
pub fn any_signal<I, T>(signals: I) -> std::io::Result<impl Future<Output = SignalKind>>
where
    I: IntoIterator<Item = T>,
    T: Into<SignalKind>,
{
    let mut streams = Vec::new();
    for signal in signals {
        let kind = signal.into();
        streams.push((kind, unix::signal(kind)?));
    }

    Ok(async move {
        if streams.is_empty() {
            return std::future::pending().await;
        }
        let recv_all = streams.into_iter().map(|(kind, mut stream)| {
            Box::pin(async move {
                stream.recv().await;
                kind
            })
        });
        select_all(recv_all).await.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn completes_without_signal() {
        let res = run_until_signal(async { 42 }).await.unwrap();
        assert_eq!(res.unwrap(), 42);
    }

    #[tokio::test]
    async fn reports_delivered_signal() {
        let waiting = tokio::spawn(run_until_signal(std::future::pending::<()>()));
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        unsafe { libc::raise(libc::SIGHUP) };

        let res = waiting.await.unwrap().unwrap();
        assert_eq!(res.unwrap_err(), SignalKind::hangup());
    }
}
