use async_trait::async_trait;
use bytes::Bytes;

use crate::error::FetchError;

/// Trait for fetching a whole remote resource by address.
///
/// This is the only transport capability the chunk pipeline needs. `fetch`
/// takes no cancellation token. Callers race the returned future against a
/// [`CancellationToken`](super::CancellationToken) and drop it once the token
/// fires, so cancellation reaches the transport only as a dropped future.
/// Implementations must not spawn detached work that outlives the future.
#[async_trait]
pub trait ChunkFetcher: Send + Sync {
    /// Fetch the resource at `address` and return its body.
    ///
    /// A non-success status must be reported as [`FetchError::Status`].
    async fn fetch(&self, address: &str) -> Result<Bytes, FetchError>;

    /// Identifier used in logs (e.g. the base URL or a mock name).
    fn identifier(&self) -> &str;
}

#[async_trait]
impl<F: ChunkFetcher + ?Sized> ChunkFetcher for std::sync::Arc<F> {
    async fn fetch(&self, address: &str) -> Result<Bytes, FetchError> {
        (**self).fetch(address).await
    }

    fn identifier(&self) -> &str {
        (**self).identifier()
    }
}
