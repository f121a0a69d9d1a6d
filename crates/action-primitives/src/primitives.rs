//! Action primitives implementation
//!
//! In-page primitives behind the page requests:
//! 1. activate - pointer overlay, native click, synthetic fallback
//! 2. set_value - per-character input with keyboard events
//! 3. navigate / search / go_back
//! 4. scroll - by amount or one viewport
//! 5. send_keys - keyboard input to the focused element
//! 6. extract - text, markdown or html dump of the body

mod click;
mod extract;
mod keys;
mod navigate;
mod scroll;
mod type_text;

pub use click::*;
pub use extract::*;
pub use keys::*;
pub use navigate::*;
pub use scroll::*;
pub use type_text::*;

use std::sync::Arc;
use std::time::Duration;

use action_locator::{DefaultElementResolver, ElementResolver, Resolution};
use async_trait::async_trait;
use perceiver_structural::{DomSnapshot, SnapshotId};

use crate::{
    errors::ActionError,
    types::{ActionReport, ExecCtx, ExecutorSettings, ExtractFormat, ScrollDirection},
};

/// Action primitives trait
///
/// Indexed primitives take the snapshot of the cycle the index came from and
/// the snapshot node behind it; the locator turns that into a live element.
#[async_trait]
pub trait ActionPrimitives: Send + Sync {
    async fn activate(
        &self,
        ctx: &ExecCtx,
        snapshot: &DomSnapshot,
        node: SnapshotId,
    ) -> Result<ActionReport, ActionError>;

    async fn set_value(
        &self,
        ctx: &ExecCtx,
        snapshot: &DomSnapshot,
        node: SnapshotId,
        value: &str,
    ) -> Result<ActionReport, ActionError>;

    async fn search(&self, ctx: &ExecCtx, query: &str) -> Result<ActionReport, ActionError>;

    async fn navigate(&self, ctx: &ExecCtx, url: &str) -> Result<ActionReport, ActionError>;

    async fn go_back(&self, ctx: &ExecCtx) -> Result<ActionReport, ActionError>;

    async fn scroll(
        &self,
        ctx: &ExecCtx,
        direction: ScrollDirection,
        amount: Option<f64>,
    ) -> Result<ActionReport, ActionError>;

    async fn send_keys(&self, ctx: &ExecCtx, keys: &str) -> Result<ActionReport, ActionError>;

    async fn extract(
        &self,
        ctx: &ExecCtx,
        format: ExtractFormat,
    ) -> Result<ActionReport, ActionError>;

    /// Remove the pointer overlay and highlight markers.
    fn cleanup(&self, ctx: &ExecCtx);
}

/// Default implementation of action primitives
pub struct DefaultActionPrimitives {
    /// Resolver used to turn snapshot nodes into live elements
    resolver: Arc<dyn ElementResolver>,

    /// Pause between typed characters
    keystroke_delay: Duration,
}

impl Default for DefaultActionPrimitives {
    fn default() -> Self {
        Self::new(&ExecutorSettings::default())
    }
}

impl DefaultActionPrimitives {
    pub fn new(settings: &ExecutorSettings) -> Self {
        Self::with_resolver(settings, Arc::new(DefaultElementResolver::new()))
    }

    /// Create a primitives implementation with a custom element resolver
    pub fn with_resolver(settings: &ExecutorSettings, resolver: Arc<dyn ElementResolver>) -> Self {
        Self {
            resolver,
            keystroke_delay: settings.keystroke_delay(),
        }
    }

    pub fn keystroke_delay(&self) -> Duration {
        self.keystroke_delay
    }

    /// Locate the live element behind a snapshot node
    pub async fn locate(
        &self,
        ctx: &ExecCtx,
        snapshot: &DomSnapshot,
        node: SnapshotId,
    ) -> Result<Resolution, ActionError> {
        Ok(self.resolver.resolve(ctx.doc.clone(), snapshot, node).await?)
    }
}

#[async_trait]
impl ActionPrimitives for DefaultActionPrimitives {
    async fn activate(
        &self,
        ctx: &ExecCtx,
        snapshot: &DomSnapshot,
        node: SnapshotId,
    ) -> Result<ActionReport, ActionError> {
        click::execute_activate(self, ctx, snapshot, node).await
    }

    async fn set_value(
        &self,
        ctx: &ExecCtx,
        snapshot: &DomSnapshot,
        node: SnapshotId,
        value: &str,
    ) -> Result<ActionReport, ActionError> {
        type_text::execute_set_value(self, ctx, snapshot, node, value).await
    }

    async fn search(&self, ctx: &ExecCtx, query: &str) -> Result<ActionReport, ActionError> {
        navigate::execute_search(ctx, query).await
    }

    async fn navigate(&self, ctx: &ExecCtx, url: &str) -> Result<ActionReport, ActionError> {
        navigate::execute_navigate(ctx, url).await
    }

    async fn go_back(&self, ctx: &ExecCtx) -> Result<ActionReport, ActionError> {
        navigate::execute_go_back(ctx).await
    }

    async fn scroll(
        &self,
        ctx: &ExecCtx,
        direction: ScrollDirection,
        amount: Option<f64>,
    ) -> Result<ActionReport, ActionError> {
        scroll::execute_scroll(ctx, direction, amount).await
    }

    async fn send_keys(&self, ctx: &ExecCtx, keys: &str) -> Result<ActionReport, ActionError> {
        keys::execute_send_keys(ctx, keys).await
    }

    async fn extract(
        &self,
        ctx: &ExecCtx,
        format: ExtractFormat,
    ) -> Result<ActionReport, ActionError> {
        extract::execute_extract(ctx, format).await
    }

    fn cleanup(&self, ctx: &ExecCtx) {
        ctx.doc.clear_overlays();
    }
}
