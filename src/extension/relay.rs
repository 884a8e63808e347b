//! Message relay: the single entry point for cross-context requests.
//!
//! The relay owns the [`AuthChecker`] outright, so auth state is only ever
//! touched from this task. `checkAuth` is answered inline; page-bound requests
//! are forwarded on a spawned task so a slow page never holds up auth checks.
//! Cookie events are drained before the next request is looked at, which
//! guarantees a removal is applied before any later `checkAuth`.

use super::auth::AuthChecker;
use super::cookies::CookieChange;
use super::page::PageHandle;
use super::protocol::{Envelope, Origin, Payload, Request, Response};
use crate::error::RelayError;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, mpsc, oneshot};

pub struct MessageRelay {
    auth: AuthChecker,
    page: PageHandle,
    inbox: mpsc::Receiver<Envelope>,
    cookie_events: Option<broadcast::Receiver<CookieChange>>,
}

enum Event {
    Cookie(Result<CookieChange, RecvError>),
    Envelope(Option<Envelope>),
}

impl MessageRelay {
    pub fn new(
        auth: AuthChecker,
        page: PageHandle,
        cookie_events: broadcast::Receiver<CookieChange>,
        capacity: usize,
    ) -> (Self, RelayHandle) {
        let (handle, inbox) = RelayHandle::channel(capacity);
        let relay = Self {
            auth,
            page,
            inbox,
            cookie_events: Some(cookie_events),
        };
        (relay, handle)
    }

    pub fn spawn(
        auth: AuthChecker,
        page: PageHandle,
        cookie_events: broadcast::Receiver<CookieChange>,
        capacity: usize,
    ) -> RelayHandle {
        let (relay, handle) = Self::new(auth, page, cookie_events, capacity);
        tokio::spawn(relay.run());
        handle
    }

    pub async fn run(mut self) {
        loop {
            let event = tokio::select! {
                biased;
                change = next_change(&mut self.cookie_events) => Event::Cookie(change),
                envelope = self.inbox.recv() => Event::Envelope(envelope),
            };

            match event {
                Event::Cookie(Ok(change)) => self.auth.on_cookie_change(&change),
                Event::Cookie(Err(RecvError::Lagged(missed))) => {
                    tracing::warn!(missed, "cookie events lagged; auth cache cleared");
                    self.auth.invalidate();
                }
                Event::Cookie(Err(RecvError::Closed)) => {
                    tracing::debug!("cookie store closed its change feed");
                    self.cookie_events = None;
                }
                Event::Envelope(Some(envelope)) => self.dispatch(envelope).await,
                Event::Envelope(None) => break,
            }
        }
        tracing::debug!("message relay stopped");
    }

    async fn dispatch(&mut self, envelope: Envelope) {
        let Envelope {
            origin,
            request,
            reply,
        } = envelope;
        let action = request.action();

        if reply.is_closed() {
            tracing::debug!(action, origin = %origin.label(), "requester gone before dispatch");
            return;
        }

        if !origin.permits(&request) {
            tracing::warn!(action, origin = %origin.label(), "request rejected for origin");
            deliver(
                reply,
                action,
                Response::error(format!("{action} is not available to {}", origin.label())),
            );
            return;
        }

        if request.is_page_bound() {
            let page = self.page.clone();
            tokio::spawn(async move {
                let response = page
                    .request(request)
                    .await
                    .unwrap_or_else(|e| Response::error(e.to_string()));
                deliver(reply, action, response);
            });
        } else {
            let state = self.auth.check_auth().await;
            deliver(reply, action, Response::ok(Payload::Auth(state)));
        }
    }
}

async fn next_change(
    events: &mut Option<broadcast::Receiver<CookieChange>>,
) -> Result<CookieChange, RecvError> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Replies to a torn-down requester are discarded, not treated as errors.
fn deliver(reply: oneshot::Sender<Response>, action: &'static str, response: Response) {
    if reply.send(response).is_err() {
        tracing::debug!(action, "requester gone; reply dropped");
    }
}

/// Sender side of the relay inbox.
#[derive(Clone)]
pub struct RelayHandle {
    inbox: mpsc::Sender<Envelope>,
}

impl RelayHandle {
    /// A handle and the raw inbox it feeds.
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<Envelope>) {
        let (tx, rx) = mpsc::channel(capacity);
        (Self { inbox: tx }, rx)
    }

    pub async fn send(&self, origin: Origin, request: Request) -> Result<Response, RelayError> {
        let action = request.action();
        let (reply, rx) = oneshot::channel();
        self.inbox
            .send(Envelope {
                origin,
                request,
                reply,
            })
            .await
            .map_err(|_| RelayError::Disconnected { context: "relay" })?;
        rx.await.map_err(|_| RelayError::NoReply {
            context: "relay",
            action,
        })
    }
}
