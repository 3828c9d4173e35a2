//! Single-shot signal subscriptions for the Messenger

use serde_json::Value;
use std::sync::Arc;
use std::sync::atomic::Ordering;
use std::time::Duration;
use tokio::sync::oneshot;

use super::errors::{MessengerError, MessengerResult};
use super::messenger::{Messenger, MessengerInner, SignalWaiter};
use super::types::{ContextId, Message, MessageKind};

/// A registered signal subscription.
///
/// The waiter is in the registry from the moment [`Messenger::subscribe`]
/// returns, so a signal posted before [`SignalWait::wait`] is first polled
/// still resolves it. Dropping the subscription deregisters it.
#[must_use = "a subscription does nothing unless waited on"]
pub struct SignalWait {
    inner: Arc<MessengerInner>,
    id: u64,
    kind: MessageKind,
    context: ContextId,
    signal: Option<oneshot::Receiver<Value>>,
}

impl SignalWait {
    /// Resolve with the payload of the matching signal (`Null` when it has
    /// none).
    ///
    /// # Errors
    /// `MessengerError::Timeout` naming the kind when nothing arrives in time.
    pub async fn wait(mut self, timeout: Duration) -> MessengerResult<Value> {
        let kind = self.kind;
        let Some(signal) = self.signal.take() else {
            return Err(MessengerError::Closed(kind));
        };

        tracing::debug!(kind = %kind, context = %self.context, timeout_ms = timeout.as_millis() as u64, "Waiting for signal");

        match tokio::time::timeout(timeout, signal).await {
            Ok(Ok(payload)) => {
                tracing::debug!(kind = %kind, context = %self.context, "Signal received");
                Ok(payload)
            }
            Ok(Err(_)) => Err(MessengerError::Closed(kind)),
            Err(_) => {
                tracing::warn!(kind = %kind, context = %self.context, "Timed out waiting for signal");
                Err(MessengerError::Timeout(kind))
            }
        }
    }
}

impl Drop for SignalWait {
    fn drop(&mut self) {
        if self.inner.waiters.lock().remove(&self.id).is_some() {
            tracing::trace!(waiter = self.id, "Signal waiter deregistered");
        }
    }
}

impl Messenger {
    /// Register interest in the first `kind` message posted by `context`.
    ///
    /// Registration happens before this returns; await the result with
    /// [`SignalWait::wait`].
    pub fn subscribe(&self, kind: MessageKind, context: &ContextId) -> SignalWait {
        let (resolve, signal) = oneshot::channel();
        let id = self.inner.next_waiter.fetch_add(1, Ordering::Relaxed);

        self.inner.waiters.lock().insert(
            id,
            SignalWaiter {
                kind,
                context: context.clone(),
                resolve,
            },
        );
        tracing::trace!(waiter = id, kind = %kind, context = %context, "Signal waiter registered");

        SignalWait {
            inner: Arc::clone(&self.inner),
            id,
            kind,
            context: context.clone(),
            signal: Some(signal),
        }
    }

    /// Wait for the first `kind` message posted by `context`.
    ///
    /// Shorthand for `subscribe(kind, context).wait(timeout)`. The waiter is
    /// only registered once the returned future is polled; use
    /// [`Messenger::subscribe`] when the signal may be posted before that.
    ///
    /// # Errors
    /// `MessengerError::Timeout` naming `kind` when nothing arrives in time.
    pub async fn wait_for_signal(
        &self,
        kind: MessageKind,
        context: &ContextId,
        timeout: Duration,
    ) -> MessengerResult<Value> {
        self.subscribe(kind, context).wait(timeout).await
    }

    /// Number of signal waits currently registered.
    #[must_use]
    pub fn pending_signals(&self) -> usize {
        self.inner.waiters.lock().len()
    }

    /// Hand `message` to the earliest matching waiter, if any.
    pub(super) fn satisfy_waiter(&self, sender: &ContextId, message: &Message) {
        let kind = message.kind();
        let mut payload = Some(message.payload());

        while let Some(value) = payload.take() {
            let waiter = {
                let mut waiters = self.inner.waiters.lock();
                let id = waiters
                    .iter()
                    .find(|(_, waiter)| waiter.kind == kind && &waiter.context == sender)
                    .map(|(id, _)| *id);
                id.and_then(|id| waiters.remove(&id))
            };

            let Some(waiter) = waiter else {
                return;
            };

            // A waiter whose future is already gone passes the signal on
            if let Err(value) = waiter.resolve.send(value) {
                payload = Some(value);
            }
        }
    }
}
