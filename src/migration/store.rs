//! Where the active version lives between calls.

use super::types::BoxError;
use async_trait::async_trait;

/// External persistence for the active version label.
///
/// `get` returns `None` when nothing is active. `set` receives the new
/// label (or `None` to clear it) and returns the label the store
/// confirmed. The engine calls both with its shared context.
#[async_trait]
pub trait ActiveVersionStore<C>: Send + Sync {
    async fn get(&self, ctx: &C) -> Result<Option<String>, BoxError>;

    async fn set(&self, version: Option<&str>, ctx: &C) -> Result<Option<String>, BoxError>;
}

/// Strategy chosen once when the engine is built.
pub enum ActiveVersionSource<C> {
    /// The collection's own marker, alive for the engine's lifetime.
    InMemory,
    /// An external store, re-read at the start of every operation.
    Persisted(Box<dyn ActiveVersionStore<C>>),
}
