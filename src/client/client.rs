//! Client implementation and the responder seam.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Method, Request, Response, Url};
use thiserror::Error;

use super::Header;

/// Errors surfaced by [`Client::send`] and [`Client::send_with`].
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request could not be constructed from the given inputs.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The transport failed to deliver the request or receive a
    /// response (DNS, refused connection, TLS).
    #[error("request failed: {0}")]
    RequestFailed(String),

    /// The caller's mutation callback aborted the send. The underlying
    /// error is carried through unchanged.
    #[error(transparent)]
    Aborted(#[from] anyhow::Error),
}

/// Transport seam for [`Client`].
///
/// Production code uses [`HttpResponder`] which sends requests over the
/// network. Tests replace it to return canned responses.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: Request) -> Result<Response, ClientError>;
}

/// Default responder performing a real network send.
pub struct HttpResponder {
    accept_invalid_certs: Arc<AtomicBool>,
}

#[async_trait]
impl Responder for HttpResponder {
    async fn respond(&self, request: Request) -> Result<Response, ClientError> {
        let transport = reqwest::Client::builder()
            .danger_accept_invalid_certs(self.accept_invalid_certs.load(Ordering::SeqCst))
            .build()
            .map_err(|e| ClientError::RequestFailed(e.to_string()))?;
        transport
            .execute(request)
            .await
            .map_err(|e| ClientError::RequestFailed(e.to_string()))
    }
}

/// HTTP client applying default headers and an optional pre-send
/// mutation to every request before handing it to the responder.
pub struct Client {
    /// Headers applied to every request before the caller's mutation
    /// callback runs. Mutable at any time; changes take effect on the
    /// next send.
    pub default_headers: Header,
    accept_invalid_certs: Arc<AtomicBool>,
    responder: Box<dyn Responder>,
}

impl Default for Client {
    fn default() -> Self {
        Self::new()
    }
}

impl Client {
    /// Create a new client with an empty default header set and the
    /// network-backed responder installed.
    pub fn new() -> Self {
        let accept_invalid_certs = Arc::new(AtomicBool::new(false));
        Client {
            default_headers: Header::new(),
            accept_invalid_certs: accept_invalid_certs.clone(),
            responder: Box::new(HttpResponder { accept_invalid_certs }),
        }
    }

    /// Accept invalid and self-signed certificates in HTTPS connections.
    ///
    /// Only honored by the built-in responder; a replacement responder
    /// decides TLS behavior for itself.
    pub fn set_accept_invalid_certs(&mut self, accept: bool) {
        self.accept_invalid_certs.store(accept, Ordering::SeqCst);
    }

    /// Replace the transport. Subsequent sends go through `responder`
    /// instead of the network.
    pub fn set_responder(&mut self, responder: Box<dyn Responder>) {
        self.responder = responder;
    }

    /// Request `url` with `method`, applying only the default headers.
    pub async fn send(&self, method: Method, url: &str) -> Result<Response, ClientError> {
        self.send_with(method, url, |_| Ok(())).await
    }

    /// Request `url` with `method`, invoking `mutate` on the constructed
    /// request directly before sending.
    ///
    /// Default headers are applied first, so `mutate` sees and may
    /// override them. When `mutate` fails, the send is aborted: the
    /// responder is never invoked and the error is returned unchanged.
    pub async fn send_with<F>(
        &self,
        method: Method,
        url: &str,
        mutate: F,
    ) -> Result<Response, ClientError>
    where
        F: FnOnce(&mut Request) -> Result<(), ClientError>,
    {
        let parsed = Url::parse(url)
            .map_err(|e| ClientError::InvalidRequest(format!("{url:?}: {e}")))?;
        let mut request = Request::new(method, parsed);

        for (name, value) in self.default_headers.iter() {
            request.headers_mut().append(name, value.clone());
        }

        mutate(&mut request)?;

        self.responder.respond(request).await
    }
}
