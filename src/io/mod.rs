mod cancel;
mod fetcher;
mod http_fetcher;

pub use cancel::CancellationToken;
pub use fetcher::ChunkFetcher;
pub use http_fetcher::{HttpFetcher, DEFAULT_FETCH_TIMEOUT_SECS};
