use async_trait::async_trait;
use std::future::Future;

use crate::error::SegmentError;

/// populates one cache segment.  Returns the number of rows processed.
///
/// Loaders must leave their segment fully rewritten on success: a loader that appends
/// to a collection clears it first so that reruns stay idempotent.
#[async_trait]
pub trait SegmentLoader: Send + Sync {
    async fn load(&self) -> Result<usize, SegmentError>;
}

/// adapts a closure returning a future into a loader
pub struct FnLoader<F> {
    f: F,
}

impl<F> FnLoader<F> {
    pub fn new(f: F) -> FnLoader<F> {
        FnLoader { f }
    }
}

#[async_trait]
impl<F, Fut> SegmentLoader for FnLoader<F>
where
    F: Fn() -> Fut + Send + Sync,
    Fut: Future<Output = Result<usize, SegmentError>> + Send + 'static,
{
    async fn load(&self) -> Result<usize, SegmentError> {
        (self.f)().await
    }
}
