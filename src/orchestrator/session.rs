//! Capture session guard

use std::sync::Arc;

use crate::config::PrintOptions;
use crate::host::{CaptureBackend, HostError, HostResult};
use crate::messaging::ContextId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Detached,
    Attached,
}

/// Remote capture attachment to one rendering context.
///
/// `Detached → Attached → Detached`. Once an attach has been attempted the
/// backend gets exactly one detach call: from [`CaptureSession::release`],
/// or scheduled on the runtime when the session is dropped unreleased.
/// Detach failures are logged and never surface.
pub struct CaptureSession {
    backend: Arc<dyn CaptureBackend>,
    context: ContextId,
    state: SessionState,
    needs_detach: bool,
}

impl CaptureSession {
    pub fn new(backend: Arc<dyn CaptureBackend>, context: ContextId) -> Self {
        Self {
            backend,
            context,
            state: SessionState::Detached,
            needs_detach: false,
        }
    }

    pub async fn attach(&mut self, protocol_version: &str) -> HostResult<()> {
        if self.state == SessionState::Attached {
            return Ok(());
        }

        // A failed attach may still have left a half-open session behind
        self.needs_detach = true;
        self.backend.attach(&self.context, protocol_version).await?;
        self.state = SessionState::Attached;

        tracing::debug!(context = %self.context, protocol_version, "Capture session attached");
        Ok(())
    }

    /// Print the context. Only valid while attached.
    pub async fn print_to_pdf(&self, options: &PrintOptions) -> HostResult<String> {
        if self.state != SessionState::Attached {
            return Err(HostError::Capability(format!(
                "capture session for {} is not attached",
                self.context
            )));
        }
        self.backend.print_to_pdf(&self.context, options).await
    }

    /// Detach now. Never fails.
    pub async fn release(mut self) {
        if !self.needs_detach {
            return;
        }
        self.needs_detach = false;
        self.state = SessionState::Detached;

        match self.backend.detach(&self.context).await {
            Ok(()) => tracing::debug!(context = %self.context, "Capture session detached"),
            Err(e) => tracing::debug!(context = %self.context, error = %e, "Detach failed, ignoring"),
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if !self.needs_detach {
            return;
        }
        self.needs_detach = false;

        let backend = Arc::clone(&self.backend);
        let context = self.context.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(context = %context, "Capture session dropped while attached, scheduling detach");
                handle.spawn(async move {
                    if let Err(e) = backend.detach(&context).await {
                        tracing::debug!(context = %context, error = %e, "Deferred detach failed, ignoring");
                    }
                });
            }
            Err(_) => {
                tracing::warn!(context = %context, "No runtime to detach capture session on drop");
            }
        }
    }
}
