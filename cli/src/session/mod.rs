use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::extract::{RawQuery, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use axum::routing::get;
use gsignin::authorization::is_callback_url;
use gsignin::{Error, SessionCompletion, WebAuthenticationSession, completion_channel};
use gsignin_utils::signal::run_until_signal;
use tokio::net::TcpListener;
use url::Url;

use crate::config::LoopbackConfig;

/// Browser session for desktop use: the user opens the consent page in any
/// browser and Google redirects back to a one-shot HTTP listener on the
/// loopback interface.
pub struct LoopbackSession {
    listener: Mutex<Option<TcpListener>>,
    redirect_uri: Url,
    path: String,
}

impl LoopbackSession {
    pub async fn bind(config: &LoopbackConfig) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.listen_addr).await?;
        let local_addr = listener.local_addr()?;
        let redirect_uri = redirect_uri(local_addr, &config.path)?;

        tracing::debug!(%redirect_uri, "loopback listener bound");

        Ok(Self {
            listener: Mutex::new(Some(listener)),
            redirect_uri,
            path: config.path.clone(),
        })
    }

    pub fn redirect_uri(&self) -> &Url {
        &self.redirect_uri
    }

    fn take_listener(&self) -> gsignin::Result<TcpListener> {
        self.listener
            .lock()
            .ok()
            .and_then(|mut listener| listener.take())
            .ok_or_else(|| Error::Session("loopback listener was already used".to_owned()))
    }
}

#[async_trait]
impl WebAuthenticationSession for LoopbackSession {
    async fn authenticate(&self, url: Url, callback_scheme: &str) -> gsignin::Result<Url> {
        if !is_callback_url(&self.redirect_uri, callback_scheme) {
            return Err(Error::Session(format!(
                "loopback session cannot receive `{callback_scheme}` callbacks"
            )));
        }

        let listener = self.take_listener()?;
        let (completion, waiter) = completion_channel();

        let state = CallbackState {
            completion: Arc::new(Mutex::new(Some(completion))),
            redirect_uri: self.redirect_uri.clone(),
        };
        let router = axum::Router::new()
            .route(&self.path, get(callback))
            .with_state(state);

        let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
        tokio::spawn(async move {
            let serve = axum::serve(listener, router).with_graceful_shutdown(async move {
                stop_rx.await.ok();
            });
            if let Err(e) = serve.await {
                tracing::error!("loopback listener failed: {e:?}");
            }
        });

        eprintln!("Open this URL in your browser to sign in with Google:\n\n  {url}\n");

        let result = run_until_signal(waiter)
            .await
            .map_err(|e| Error::Session(format!("failed to install signal handlers: {e}")))?;
        stop_tx.send(()).ok();

        match result {
            Ok(result) => result,
            Err(_signal) => Err(Error::UserCancelled),
        }
    }
}

#[derive(Clone)]
struct CallbackState {
    completion: Arc<Mutex<Option<SessionCompletion>>>,
    redirect_uri: Url,
}

async fn callback(State(state): State<CallbackState>, RawQuery(query): RawQuery) -> Response {
    let completion = state
        .completion
        .lock()
        .ok()
        .and_then(|mut completion| completion.take());
    let Some(completion) = completion else {
        return (StatusCode::GONE, "This sign-in request was already handled.").into_response();
    };

    let mut callback = state.redirect_uri;
    callback.set_query(query.as_deref());

    let error = callback
        .query_pairs()
        .find(|(key, _)| key == "error")
        .map(|(_, value)| value.into_owned());

    match error {
        None => {
            completion.complete(Some(callback), None);
            Html("<p>Signed in. You can close this window.</p>").into_response()
        }
        Some(error) => {
            tracing::info!(%error, "authorization was not granted");
            let error = match error.as_str() {
                "access_denied" => Error::UserCancelled,
                _ => Error::Session(format!("authorization failed: {error}")),
            };
            completion.complete(None, Some(error));
            Html("<p>Sign-in was not completed. You can close this window.</p>").into_response()
        }
    }
}

fn redirect_uri(addr: SocketAddr, path: &str) -> anyhow::Result<Url> {
    let mut url = Url::parse(&format!("http://{addr}"))?;
    url.set_path(path);
    Ok(url)
}
