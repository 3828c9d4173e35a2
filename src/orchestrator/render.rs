//! Rendering context lease

use std::sync::Arc;

use super::errors::{WorkflowError, WorkflowResult};
use crate::host::{ContextHost, HostError, SharedState};
use crate::messaging::ContextId;
use crate::utils::CURRENT_ARTICLE_KEY;

/// What happens to the rendering context when a run ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Teardown {
    /// Close the context; clear the stored article only once it is gone
    CloseThenClear,
    /// Keep the context open for a manual retry; always clear the stored article
    LeaveOpen,
}

/// Owns at most one rendering context for the duration of a run.
pub struct RenderLease {
    contexts: Arc<dyn ContextHost>,
    state: Arc<dyn SharedState>,
    teardown: Teardown,
    context: Option<ContextId>,
    finished: bool,
}

impl RenderLease {
    pub fn new(contexts: Arc<dyn ContextHost>, state: Arc<dyn SharedState>, teardown: Teardown) -> Self {
        Self {
            contexts,
            state,
            teardown,
            context: None,
            finished: false,
        }
    }

    /// Create the rendering context at `uri`.
    ///
    /// # Errors
    /// `RenderContextUnavailable` when the host fails or names no context.
    pub async fn open(&mut self, uri: &str, active: bool) -> WorkflowResult<ContextId> {
        if let Some(context) = &self.context {
            return Ok(context.clone());
        }

        match self.contexts.create(uri, active).await {
            Ok(Some(context)) => {
                tracing::debug!(context = %context, active, "Rendering context created");
                self.context = Some(context.clone());
                Ok(context)
            }
            Ok(None) => Err(WorkflowError::RenderContextUnavailable(
                "host returned no context id".to_string(),
            )),
            Err(e) => Err(WorkflowError::RenderContextUnavailable(e.to_string())),
        }
    }

    /// Start the agent of the leased context.
    ///
    /// # Errors
    /// `RenderContextUnavailable` when nothing is leased or the host fails.
    pub async fn start(&self) -> WorkflowResult<()> {
        let context = self.context.as_ref().ok_or_else(|| {
            WorkflowError::RenderContextUnavailable("no rendering context leased".to_string())
        })?;
        self.contexts
            .start(context)
            .await
            .map_err(|e| WorkflowError::RenderContextUnavailable(e.to_string()))
    }

    #[must_use]
    pub fn context(&self) -> Option<&ContextId> {
        self.context.as_ref()
    }

    /// Tear down per the lease's policy. Returns whether the stored article
    /// was cleared.
    pub async fn finish(mut self) -> bool {
        self.finished = true;

        let clear = match (&self.context, self.teardown) {
            (None, _) | (Some(_), Teardown::LeaveOpen) => true,
            (Some(context), Teardown::CloseThenClear) => match self.contexts.close(context).await {
                Ok(()) => true,
                Err(HostError::ContextNotFound(_)) => true,
                Err(e) => {
                    if self.contexts.exists(context).await {
                        tracing::error!(
                            context = %context,
                            error = %e,
                            "Failed to close rendering context, keeping stored article"
                        );
                        false
                    } else {
                        true
                    }
                }
            },
        };

        if clear && let Err(e) = self.state.remove(CURRENT_ARTICLE_KEY).await {
            tracing::warn!(error = %e, "Failed to clear stored article");
        }
        clear
    }
}

impl Drop for RenderLease {
    fn drop(&mut self) {
        if !self.finished && let Some(context) = &self.context {
            tracing::warn!(context = %context, "Run abandoned, rendering context and stored article left in place");
        }
    }
}
