//! Acknowledgement guard
//!
//! The follow-up of a trigger must not start before the caller's answer has
//! been handed to the transport. [`AckGuard`] travels inside the response
//! body; the paired [`AckWait`] resolves when the body is dropped, which
//! hyper does once it has finished writing it.

use crate::sos::TriggerResponse;
use axum::body::{Body, Bytes};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http_body::{Frame, SizeHint};
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::oneshot;

/// Held until the acknowledgement has been delivered
#[derive(Debug)]
pub struct AckGuard {
    _release: oneshot::Sender<()>,
}

/// Resolves once the paired [`AckGuard`] is gone
#[derive(Debug)]
pub struct AckWait {
    released: oneshot::Receiver<()>,
}

impl AckGuard {
    pub fn pair() -> (AckGuard, AckWait) {
        let (tx, rx) = oneshot::channel();
        (AckGuard { _release: tx }, AckWait { released: rx })
    }
}

impl AckWait {
    /// Wait for the guard to be dropped
    pub async fn released(self) {
        // The sender never sends; a closed channel is the signal.
        let _ = self.released.await;
    }
}

/// Response body that keeps an [`AckGuard`] alive until it is dropped
pub struct GuardedBody {
    inner: Body,
    _guard: AckGuard,
}

impl http_body::Body for GuardedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        Pin::new(&mut self.get_mut().inner).poll_frame(cx)
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// A successful trigger answer
#[derive(Debug)]
pub struct Acknowledgement {
    response: TriggerResponse,
    guard: AckGuard,
}

impl Acknowledgement {
    pub fn new(response: TriggerResponse, guard: AckGuard) -> Self {
        Self { response, guard }
    }

    pub fn response(&self) -> &TriggerResponse {
        &self.response
    }
}

impl IntoResponse for Acknowledgement {
    fn into_response(self) -> Response {
        let guard = self.guard;
        (StatusCode::OK, Json(self.response))
            .into_response()
            .map(|inner| Body::new(GuardedBody { inner, _guard: guard }))
    }
}
