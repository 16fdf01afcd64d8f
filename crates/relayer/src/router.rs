//! Submission pipeline: a bounded handoff from the pollers into a
//! single-writer destination submitter.
//!
//! One submitter task per destination account keeps submissions
//! sequential, which keeps nonces sequential. Each message resolves its
//! completion channel with the terminal outcome; producers decide what to
//! await.

use compass_chain::{SubmitError, Submitter};
use compass_primitives::{
    Message, SubmitOutcome,
    interval::{ROUTER_QUEUE_CAPACITY, SUBMIT_ATTEMPTS, SUBMIT_RETRY_BASE, SUBMIT_RETRY_MAX},
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::{
    error::{RelayerError, Result},
    metrics,
};

/// Sending half of the pipeline, cloned into every poller.
#[derive(Debug, Clone)]
pub struct Router {
    tx: mpsc::Sender<Message>,
}

impl Router {
    pub fn channel() -> (Self, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(ROUTER_QUEUE_CAPACITY);
        (Self { tx }, rx)
    }

    /// Non-blocking publish. On a full or closed queue the message is
    /// resolved as failed so the producer's completion accounting stays
    /// consistent, and the error is returned.
    pub fn send(&self, message: Message) -> Result<()> {
        match self.tx.try_send(message) {
            Ok(()) => Ok(()),
            Err(err) => {
                let (reason, message) = match err {
                    mpsc::error::TrySendError::Full(m) => ("submission queue full", m),
                    mpsc::error::TrySendError::Closed(m) => ("submitter gone", m),
                };
                message.resolve(SubmitOutcome::failed(reason));
                Err(RelayerError::Routing)
            }
        }
    }
}

/// The consuming side: submits messages one at a time, waiting for
/// on-chain confirmation, retrying transient failures with exponential
/// back-off.
pub struct SubmitterTask<S> {
    dst_name: String,
    submitter: S,
    rx: mpsc::Receiver<Message>,
    shutdown: CancellationToken,
}

impl<S: Submitter> SubmitterTask<S> {
    pub fn new(
        dst_name: impl Into<String>,
        submitter: S,
        rx: mpsc::Receiver<Message>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            dst_name: dst_name.into(),
            submitter,
            rx,
            shutdown,
        }
    }

    pub async fn run(mut self) -> Result<()> {
        loop {
            let message = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                message = self.rx.recv() => match message {
                    Some(message) => message,
                    None => break,
                },
            };
            self.handle(message).await;
        }

        // Cancellation never aborts an in-flight submission, but anything
        // still queued fails out so producers are not left waiting.
        self.rx.close();
        while let Ok(message) = self.rx.try_recv() {
            message.resolve(SubmitOutcome::failed("shutting down"));
        }
        Err(RelayerError::Shutdown)
    }

    async fn handle(&self, message: Message) {
        let kind = message.body.kind();
        let outcome = self.submit_with_retry(&message).await;
        metrics::record_submission(&self.dst_name, kind, outcome.is_confirmed());
        match &outcome {
            SubmitOutcome::Confirmed { tx_hash } => {
                tracing::info!(dst = %self.dst_name, kind, %tx_hash, "message confirmed on-chain");
            }
            SubmitOutcome::Failed { reason } => {
                tracing::error!(dst = %self.dst_name, kind, %reason, "message terminally failed");
            }
        }
        message.resolve(outcome);
    }

    async fn submit_with_retry(&self, message: &Message) -> SubmitOutcome {
        let mut delay = SUBMIT_RETRY_BASE;
        for attempt in 1..=SUBMIT_ATTEMPTS {
            match self.submitter.submit(message.src, &message.body).await {
                Ok(tx_hash) => return SubmitOutcome::Confirmed { tx_hash },
                Err(SubmitError::Rejected(reason)) => {
                    return SubmitOutcome::failed(reason);
                }
                Err(SubmitError::Transient(reason)) => {
                    tracing::warn!(
                        dst = %self.dst_name,
                        attempt,
                        %reason,
                        "submission failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    delay = (delay * 2).min(SUBMIT_RETRY_MAX);
                }
            }
        }
        SubmitOutcome::failed(format!(
            "gave up after {SUBMIT_ATTEMPTS} transient failures"
        ))
    }
}
