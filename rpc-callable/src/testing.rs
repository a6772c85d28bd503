//! In-process channel used by unit tests.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use futures::future::BoxFuture;

use crate::options::CallOptions;
use crate::streaming::BoxObserver;
use crate::transport::{Channel, RequestBytes, TransportChannel, TransportError};

type UnaryHandler =
    Arc<dyn Fn(&str, Bytes, &CallOptions) -> Result<Bytes, TransportError> + Send + Sync>;
type StreamHandler = Arc<dyn Fn(Vec<Bytes>) -> Result<Bytes, TransportError> + Send + Sync>;

/// Echoes the request bytes back.
pub(crate) fn echo_unary(
    _method: &str,
    request: Bytes,
    _options: &CallOptions,
) -> Result<Bytes, TransportError> {
    Ok(request)
}

/// Sums JSON-encoded integers.
pub(crate) fn summing_client_stream(requests: Vec<Bytes>) -> Result<Bytes, TransportError> {
    let mut total = 0_u64;
    for bytes in requests {
        let n: u64 = serde_json::from_slice(&bytes)
            .map_err(|e| TransportError::without_status(e.to_string()))?;
        total += n;
    }
    Ok(Bytes::from(total.to_string()))
}

#[derive(Clone, Debug)]
pub(crate) struct RecordedCall {
    pub(crate) method: String,
    pub(crate) timeout: Option<Duration>,
}

struct DropFlag(Arc<AtomicBool>);

impl Drop for DropFlag {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// A channel that records every call and answers with a handler.
#[derive(Clone)]
pub(crate) struct RecordingChannel {
    unary: Option<UnaryHandler>,
    stream: Option<StreamHandler>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    streamed: Arc<Mutex<Vec<Vec<u8>>>>,
    pending_dropped: Arc<AtomicBool>,
}

impl std::fmt::Debug for RecordingChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("RecordingChannel")
    }
}

impl RecordingChannel {
    pub(crate) fn new<F>(handler: F) -> Self
    where
        F: Fn(&str, Bytes, &CallOptions) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        Self {
            unary: Some(Arc::new(handler)),
            stream: None,
            calls: Arc::default(),
            streamed: Arc::default(),
            pending_dropped: Arc::default(),
        }
    }

    /// A channel whose unary calls never resolve.
    pub(crate) fn pending() -> Self {
        Self {
            unary: None,
            stream: None,
            calls: Arc::default(),
            streamed: Arc::default(),
            pending_dropped: Arc::default(),
        }
    }

    pub(crate) fn with_client_stream<F>(mut self, handler: F) -> Self
    where
        F: Fn(Vec<Bytes>) -> Result<Bytes, TransportError> + Send + Sync + 'static,
    {
        self.stream = Some(Arc::new(handler));
        self
    }

    pub(crate) fn handle(&self) -> TransportChannel {
        TransportChannel::new(self.clone())
    }

    pub(crate) fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn streamed_requests(&self) -> Vec<Vec<u8>> {
        self.streamed.lock().unwrap().clone()
    }

    pub(crate) fn pending_call_dropped(&self) -> bool {
        self.pending_dropped.load(Ordering::SeqCst)
    }

    fn record(&self, method: &str, options: &CallOptions) {
        self.calls.lock().unwrap().push(RecordedCall {
            method: method.to_owned(),
            timeout: options.timeout(),
        });
    }
}

impl Channel for RecordingChannel {
    fn unary(
        &self,
        method: &str,
        request: Bytes,
        options: CallOptions,
    ) -> BoxFuture<'static, Result<Bytes, TransportError>> {
        self.record(method, &options);
        match &self.unary {
            Some(handler) => {
                let result = handler(method, request, &options);
                Box::pin(async move { result })
            }
            None => {
                let flag = DropFlag(self.pending_dropped.clone());
                Box::pin(async move {
                    let _flag = flag;
                    futures::future::pending().await
                })
            }
        }
    }

    fn client_streaming(
        &self,
        method: &str,
        mut requests: RequestBytes,
        mut responses: BoxObserver<Bytes, TransportError>,
        options: CallOptions,
    ) {
        self.record(method, &options);
        let Some(handler) = self.stream.clone() else {
            responses.on_error(TransportError::without_status("no stream handler"));
            return;
        };
        let streamed = self.streamed.clone();
        tokio::spawn(async move {
            let mut received = Vec::new();
            while let Some(item) = requests.next().await {
                match item {
                    Ok(bytes) => {
                        streamed.lock().unwrap().push(bytes.to_vec());
                        received.push(bytes);
                    }
                    Err(err) => {
                        responses.on_error(err);
                        return;
                    }
                }
            }
            match handler(received) {
                Ok(body) => {
                    responses.on_next(body);
                    responses.on_completed();
                }
                Err(err) => responses.on_error(err),
            }
        });
    }
}
