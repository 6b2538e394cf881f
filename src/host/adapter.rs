//! Bridges callback-style middleware into the async request pipeline.
//!
//! Legacy dev-server middleware follows a three-argument contract:
//! `(request, response, next)` where calling `next` with no error means
//! "proceed" and calling it with an error means "abort". The adapter turns
//! one such unit into a pipeline-compatible async step by suspending on a
//! single-resolution channel until the middleware signals completion.
//!
//! The middleware contract is: exactly one of {produce a response, call the
//! continuation} per invocation. The adapter resolves both halves; a
//! middleware that holds its continuation forever hangs the request, which is
//! a contract violation the adapter deliberately does not guard against.

use crate::error::{HostError, Result};
use axum::body::{to_bytes, Body, Bytes};
use axum::extract::Request;
use axum::http::{request::Parts, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::Response;
use parking_lot::Mutex;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::oneshot;

/// Error value a middleware may pass to its continuation.
pub type ChainError = Box<dyn std::error::Error + Send + Sync>;

/// Completion callback handed to a middleware unit.
///
/// Invoking with `None` means "proceed"; invoking with `Some(err)` means
/// "abort with error". The callback is `FnOnce`, so a second invocation is
/// unrepresentable.
pub type Continuation = Box<dyn FnOnce(Option<ChainError>) + Send + 'static>;

/// A callback-style middleware unit.
///
/// `call` must not block: implementations that perform I/O spawn a task and
/// complete through the response handle or the continuation asynchronously.
pub trait MiddlewareUnit: Send + Sync + 'static {
    /// Handle one request.
    ///
    /// The unit must either produce a terminal response (write to `res` and
    /// call [`RawResponse::end`]) or invoke `next` exactly once.
    fn call(&self, req: Arc<RawRequest>, res: Arc<RawResponse>, next: Continuation);
}

/// Raw transport-level view of the pipeline request.
///
/// Presents the request in the shape legacy middleware expects: method, path,
/// headers and a fully buffered body. The body bytes are shared with the
/// request handed back to the pipeline, not copied.
#[derive(Debug)]
pub struct RawRequest {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
}

impl RawRequest {
    pub(crate) fn from_parts(parts: &Parts, body: Bytes) -> Self {
        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            body,
        }
    }

    /// Request method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Full request URI.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// Request path.
    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// Request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Buffered request body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }
}

#[derive(Debug)]
struct ResponseState {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
    ended: bool,
}

impl Default for ResponseState {
    fn default() -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body: Vec::new(),
            ended: false,
        }
    }
}

/// Raw transport-level view of the pipeline response.
///
/// A shared handle: writes the middleware performs here are visible on the
/// same handle the pipeline inspects after the middleware completes. Header
/// names are unique; inserting an existing name replaces its value.
#[derive(Debug, Default)]
pub struct RawResponse {
    inner: Mutex<ResponseState>,
}

impl RawResponse {
    /// Set the response status.
    pub fn set_status(&self, status: StatusCode) {
        self.inner.lock().status = status;
    }

    /// Insert a header, replacing any existing value for the name.
    pub fn insert_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.lock().headers.insert(name, value);
    }

    /// Append a chunk to the response body.
    pub fn write(&self, chunk: &[u8]) {
        self.inner.lock().body.extend_from_slice(chunk);
    }

    /// Mark the response as complete.
    ///
    /// Until `end` is called, the pipeline treats the response as unwritten.
    pub fn end(&self) {
        self.inner.lock().ended = true;
    }

    /// Whether the middleware has completed a response on this handle.
    pub fn is_ended(&self) -> bool {
        self.inner.lock().ended
    }

    /// Take the completed response out of the handle, if any.
    pub(crate) fn take_response(&self) -> Option<Response> {
        let mut state = self.inner.lock();
        if !state.ended {
            return None;
        }
        let mut response = Response::new(Body::from(std::mem::take(&mut state.body)));
        *response.status_mut() = state.status;
        *response.headers_mut() = std::mem::take(&mut state.headers);
        Some(response)
    }
}

/// Adapts one callback-style middleware unit into the async pipeline.
pub struct MiddlewareAdapter {
    unit: Arc<dyn MiddlewareUnit>,
}

impl MiddlewareAdapter {
    /// Wrap a middleware unit.
    pub fn new(unit: Arc<dyn MiddlewareUnit>) -> Self {
        Self { unit }
    }

    /// Run one request through the middleware, then advance the pipeline.
    ///
    /// The request is presented to the middleware as a raw request/response
    /// pair. The adapter suspends until the middleware either completes a
    /// response or invokes its continuation:
    ///
    /// - continuation with no error: `next` runs; if the middleware also wrote
    ///   a response, that response wins over the downstream one
    /// - continuation with an error: the error propagates to the caller
    /// - continuation dropped after a completed response: that response is
    ///   returned (the middleware produced a terminal response itself)
    /// - continuation dropped with no response: protocol bug, reported as a
    ///   chain error
    ///
    /// # Errors
    ///
    /// Returns `HostError::Middleware` for continuation errors and contract
    /// violations, `HostError::Server` if the request body cannot be buffered.
    pub async fn invoke<F, Fut>(&self, req: Request, next: F) -> Result<Response>
    where
        F: FnOnce(Request) -> Fut + Send,
        Fut: Future<Output = Response> + Send,
    {
        let (parts, body) = req.into_parts();
        let bytes = to_bytes(body, usize::MAX)
            .await
            .map_err(|e| HostError::Server(format!("failed to buffer request body: {}", e)))?;

        let raw_req = Arc::new(RawRequest::from_parts(&parts, bytes.clone()));
        let raw_res = Arc::new(RawResponse::default());

        let (tx, rx) = oneshot::channel::<Option<ChainError>>();
        let continuation: Continuation = Box::new(move |err| {
            let _ = tx.send(err);
        });

        self.unit
            .call(Arc::clone(&raw_req), Arc::clone(&raw_res), continuation);

        match rx.await {
            Ok(None) => {}
            Ok(Some(err)) => return Err(HostError::Middleware(err.to_string())),
            Err(_) => {
                // Continuation dropped without being invoked. Legal only when
                // the middleware produced a terminal response itself.
                return raw_res.take_response().ok_or_else(|| {
                    HostError::Middleware(
                        "middleware completed without responding or continuing".to_string(),
                    )
                });
            }
        }

        let downstream = next(Request::from_parts(parts, Body::from(bytes))).await;
        Ok(raw_res.take_response().unwrap_or(downstream))
    }
}
