use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use rentscan_protocol::StatusResponse;

use crate::error::BackendError;
use crate::sink::ResponseSink;

#[derive(Default)]
pub(crate) struct RecordingSink {
    sent: Mutex<Vec<StatusResponse>>,
}

impl RecordingSink {
    pub(crate) fn sent(&self) -> Vec<StatusResponse> {
        self.sent.lock().expect("recording sink").clone()
    }
}

#[async_trait]
impl ResponseSink for RecordingSink {
    async fn send(&self, response: &StatusResponse) -> Result<(), BackendError> {
        self.sent.lock().expect("recording sink").push(response.clone());
        Ok(())
    }
}

/// Fails the first `failures` sends, records the rest.
pub(crate) struct FailingSink {
    failures: usize,
    attempts: AtomicUsize,
    inner: RecordingSink,
}

impl FailingSink {
    pub(crate) fn always() -> Self {
        Self::first(usize::MAX)
    }

    pub(crate) fn first(failures: usize) -> Self {
        Self { failures, attempts: AtomicUsize::new(0), inner: RecordingSink::default() }
    }

    pub(crate) fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub(crate) fn sent(&self) -> Vec<StatusResponse> {
        self.inner.sent()
    }
}

#[async_trait]
impl ResponseSink for FailingSink {
    async fn send(&self, response: &StatusResponse) -> Result<(), BackendError> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err(BackendError::TransportWrite(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "sink closed",
            )));
        }
        self.inner.send(response).await
    }
}
