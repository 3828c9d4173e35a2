//! Cross-context messaging
//!
//! Request/response into a context, fire-and-forget delivery, runtime
//! messages from contexts to the coordinator, and timeout-bound single-shot
//! signal subscriptions used to synchronize with contexts the coordinator
//! does not control.

pub mod errors;
pub mod messenger;
mod signals;
pub mod types;

pub use errors::{MessengerError, MessengerResult};
pub use messenger::{ContextHandler, Envelope, Messenger};
pub use signals::SignalWait;
pub use types::{ContextId, Message, MessageKind, PdfDownload, Reply};

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;

    struct Echo;

    #[async_trait]
    impl ContextHandler for Echo {
        async fn on_message(&self, message: Message) -> Option<Value> {
            match message {
                Message::ExtractContent => Some(json!({ "success": true })),
                _ => None,
            }
        }
    }

    #[tokio::test]
    async fn request_reaches_registered_handler() {
        let messenger = Messenger::new();
        let ctx = ContextId::from("page-1");
        messenger.register(ctx.clone(), Arc::new(Echo));

        let reply = messenger.send_request(&ctx, Message::ExtractContent).await.unwrap();
        assert_eq!(reply, json!({ "success": true }));

        match messenger.send_request(&ctx, Message::ReaderReady).await {
            Err(MessengerError::NoResponse(id)) => assert_eq!(id, ctx),
            other => panic!("expected NoResponse, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn request_without_handler_fails() {
        let messenger = Messenger::new();
        let err = messenger
            .send_request(&ContextId::from("missing"), Message::ExtractContent)
            .await
            .unwrap_err();
        assert!(matches!(err, MessengerError::NoReceiver(_)));
    }

    #[tokio::test]
    async fn runtime_request_round_trip() {
        let messenger = Messenger::new();
        let mut listener = messenger.runtime_listener();

        let responder = tokio::spawn(async move {
            let mut envelope = listener.recv().await.expect("envelope");
            assert_eq!(envelope.message.kind(), MessageKind::ReaderOpened);
            envelope.respond(json!("ack"));
        });

        let reply = messenger
            .send_runtime(&ContextId::from("reader"), Message::ReaderOpened)
            .await
            .unwrap();
        assert_eq!(reply, json!("ack"));
        responder.await.unwrap();
    }

    #[tokio::test]
    async fn runtime_message_without_listener_is_rejected() {
        let messenger = Messenger::new();
        let err = messenger
            .send_runtime(&ContextId::from("reader"), Message::ReaderOpened)
            .await
            .unwrap_err();
        assert_eq!(err, MessengerError::NoListener);
    }

    #[tokio::test(start_paused = true)]
    async fn dropped_wait_deregisters() {
        let messenger = Messenger::new();
        let ctx = ContextId::from("reader");

        let wait = messenger.wait_for_signal(MessageKind::ReaderReady, &ctx, Duration::from_secs(10));
        let result = tokio::time::timeout(Duration::from_millis(5), wait).await;
        assert!(result.is_err());
        assert_eq!(messenger.pending_signals(), 0);
    }

    #[tokio::test]
    async fn subscription_registers_before_first_poll() {
        let messenger = Messenger::new();
        let ctx = ContextId::from("reader");

        let wait = messenger.subscribe(MessageKind::ReaderReady, &ctx);
        assert_eq!(messenger.pending_signals(), 1);

        messenger.post(&ctx, Message::ReaderReady);
        assert!(wait.wait(Duration::from_millis(50)).await.unwrap().is_null());
        assert_eq!(messenger.pending_signals(), 0);
    }

    #[test]
    fn dropped_subscription_deregisters() {
        let messenger = Messenger::new();
        let wait = messenger.subscribe(MessageKind::DownloadPdf, &ContextId::from("reader"));
        assert_eq!(messenger.pending_signals(), 1);
        drop(wait);
        assert_eq!(messenger.pending_signals(), 0);
    }
}
