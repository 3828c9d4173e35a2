//! Core Messenger struct: handler registry, requests and runtime messages

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::AtomicU64;
use tokio::sync::{mpsc, oneshot};

use super::errors::{MessengerError, MessengerResult};
use super::types::{ContextId, Message, MessageKind};

/// Message handler living inside one context.
///
/// Returning `None` means the handler consumed the message without replying.
#[async_trait]
pub trait ContextHandler: Send + Sync {
    async fn on_message(&self, message: Message) -> Option<Value>;
}

/// Runtime message from a context to the coordinator
#[derive(Debug)]
pub struct Envelope {
    pub sender: ContextId,
    pub message: Message,
    /// Present when the sender awaits an answer
    pub reply: Option<oneshot::Sender<Value>>,
}

impl Envelope {
    /// Answer the sender; a no-op for fire-and-forget envelopes.
    pub fn respond(&mut self, value: Value) {
        if let Some(reply) = self.reply.take()
            && reply.send(value).is_err()
        {
            tracing::debug!(sender = %self.sender, "Runtime reply dropped, sender stopped waiting");
        }
    }
}

pub(super) struct SignalWaiter {
    pub(super) kind: MessageKind,
    pub(super) context: ContextId,
    pub(super) resolve: oneshot::Sender<Value>,
}

#[derive(Default)]
pub(super) struct MessengerInner {
    pub(super) handlers: DashMap<ContextId, Arc<dyn ContextHandler>>,
    /// Keyed by registration order so the earliest waiter wins
    pub(super) waiters: Mutex<BTreeMap<u64, SignalWaiter>>,
    pub(super) next_waiter: AtomicU64,
    pub(super) runtime: Mutex<Option<mpsc::UnboundedSender<Envelope>>>,
}

/// Routes messages between contexts and the coordinator.
///
/// Cheap to clone; all clones share one registry.
#[derive(Clone, Default)]
pub struct Messenger {
    pub(super) inner: Arc<MessengerInner>,
}

impl fmt::Debug for Messenger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Messenger")
            .field("handlers", &self.inner.handlers.len())
            .field("pending_signals", &self.pending_signals())
            .finish()
    }
}

impl Messenger {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `handler` to `context`, replacing any previous one.
    pub fn register(&self, context: ContextId, handler: Arc<dyn ContextHandler>) {
        tracing::debug!(context = %context, "Registering context handler");
        self.inner.handlers.insert(context, handler);
    }

    pub fn unregister(&self, context: &ContextId) {
        if self.inner.handlers.remove(context).is_some() {
            tracing::debug!(context = %context, "Unregistered context handler");
        }
    }

    #[must_use]
    pub fn has_handler(&self, context: &ContextId) -> bool {
        self.inner.handlers.contains_key(context)
    }

    fn handler(&self, context: &ContextId) -> MessengerResult<Arc<dyn ContextHandler>> {
        self.inner
            .handlers
            .get(context)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| MessengerError::NoReceiver(context.clone()))
    }

    /// Send `message` into `context` and wait for its reply.
    pub async fn send_request(&self, context: &ContextId, message: Message) -> MessengerResult<Value> {
        let handler = self.handler(context)?;
        let kind = message.kind();
        tracing::trace!(context = %context, kind = %kind, "Sending request");

        handler
            .on_message(message)
            .await
            .ok_or_else(|| MessengerError::NoResponse(context.clone()))
    }

    /// Send `message` into `context` without waiting for a reply.
    pub async fn deliver(&self, context: &ContextId, message: Message) -> MessengerResult<()> {
        let handler = self.handler(context)?;
        tracing::trace!(context = %context, kind = %message.kind(), "Delivering message");
        // Any reply is discarded
        let _ = handler.on_message(message).await;
        Ok(())
    }

    /// Take the runtime message stream, replacing any previous listener.
    pub fn runtime_listener(&self) -> mpsc::UnboundedReceiver<Envelope> {
        let (sender, receiver) = mpsc::unbounded_channel();
        *self.inner.runtime.lock() = Some(sender);
        receiver
    }

    /// Emit a runtime message from `sender` without waiting for an answer.
    ///
    /// The message first satisfies the earliest pending signal wait for the
    /// same `(type, sender)` pair, then goes to the runtime listener.
    pub fn post(&self, sender: &ContextId, message: Message) {
        self.satisfy_waiter(sender, &message);

        let envelope = Envelope {
            sender: sender.clone(),
            message,
            reply: None,
        };
        if let Err(e) = self.forward(envelope) {
            tracing::trace!(sender = %sender, error = %e, "Runtime message not forwarded");
        }
    }

    /// Emit a runtime message from `sender` and wait for the coordinator's reply.
    pub async fn send_runtime(&self, sender: &ContextId, message: Message) -> MessengerResult<Value> {
        self.satisfy_waiter(sender, &message);

        let (reply, answer) = oneshot::channel();
        self.forward(Envelope {
            sender: sender.clone(),
            message,
            reply: Some(reply),
        })?;

        answer
            .await
            .map_err(|_| MessengerError::NoResponse(sender.clone()))
    }

    fn forward(&self, envelope: Envelope) -> MessengerResult<()> {
        let runtime = self.inner.runtime.lock();
        let Some(listener) = runtime.as_ref() else {
            return Err(MessengerError::NoListener);
        };
        listener.send(envelope).map_err(|_| MessengerError::NoListener)
    }
}
