//! Out-of-band alarm channel.
//!
//! Alerts are free-form strings for a human: the engine fires them on
//! conditions that need attention but must not stop the loops. The binary
//! owns the receiving side and decides where they go.

use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct Alerter {
    tx: mpsc::UnboundedSender<String>,
}

impl Alerter {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn fire(&self, message: impl Into<String>) {
        let message = message.into();
        if self.tx.send(message).is_err() {
            tracing::warn!("alert channel closed; alert dropped");
        }
    }
}
