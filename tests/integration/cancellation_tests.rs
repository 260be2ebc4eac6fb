//! Cancellation integration tests.
//!
//! Tests verify:
//! - Cancelling while the fetch is in flight drops the fetch
//! - Cancellation landing after the fetch discards the payload undecoded
//! - A cancelled request never writes a buffer or populates the cache

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;

use pyramid_chunks::chunk::{ChunkResult, ChunkService, ChunkSource, ChunkState, OffsetRangeParameters};
use pyramid_chunks::format::{DataType, Encoding, Level, LevelSpec};
use pyramid_chunks::io::CancellationToken;

use super::test_utils::{CancelOnCompleteFetcher, TrackingMockFetcher};

fn raw_source() -> ChunkSource<OffsetRangeParameters> {
    let level = Level::new(LevelSpec {
        index: 0,
        voxel_extent: [4, 4, 1],
        voxel_offset: [0, 0, 0],
        chunk_extent: [4, 4, 1],
        resolution: [1.0, 1.0, 1.0],
        data_type: DataType::Uint8,
        num_channels: 1,
        encoding: Encoding::Raw,
    })
    .unwrap();
    ChunkSource::new(
        Arc::new(level),
        OffsetRangeParameters {
            url: "http://h/vol/s0".to_string(),
        },
    )
}

#[tokio::test]
async fn test_cancel_during_fetch() {
    let source = raw_source();
    let fetcher = TrackingMockFetcher::new()
        .with_resource("http://h/vol/s0/0-4_0-4_0-1", vec![9u8; 16])
        .with_delay(Duration::from_secs(30));
    let token = CancellationToken::new();

    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        canceller.cancel();
    });

    let chunk = source.create_chunk([0, 0, 0]).unwrap();
    let outcome = tokio::time::timeout(
        Duration::from_secs(5),
        source.download(chunk, &fetcher, &token),
    )
    .await
    .expect("cancellation should end the download promptly");

    assert!(outcome.is_cancelled());
    assert_eq!(outcome.chunk().state(), ChunkState::Cancelled);
    assert!(outcome.chunk().buffer().is_none());
    assert_eq!(
        outcome.chunk().address(),
        Some("http://h/vol/s0/0-4_0-4_0-1")
    );
    assert_eq!(fetcher.request_count(), 1);
    assert_eq!(fetcher.completed_count(), 0);
}

#[tokio::test]
async fn test_cancel_after_fetch_discards_payload() {
    let source = raw_source();
    let token = CancellationToken::new();
    // Payload length is wrong on purpose: decoding it would fail
    let fetcher = CancelOnCompleteFetcher {
        payload: Bytes::from(vec![0u8; 3]),
        token: token.clone(),
    };

    let chunk = source.create_chunk([0, 0, 0]).unwrap();
    let outcome = source.download(chunk, &fetcher, &token).await;

    assert!(outcome.is_cancelled());
    assert!(outcome.error().is_none());
    assert!(outcome.chunk().buffer().is_none());
}

#[tokio::test]
async fn test_cancelled_service_request_is_not_cached() {
    let fetcher = Arc::new(
        TrackingMockFetcher::new()
            .with_resource("http://h/vol/s0/0-4_0-4_0-1", vec![9u8; 16])
            .with_delay(Duration::from_millis(200)),
    );
    let service = ChunkService::new(vec![vec![raw_source()]], fetcher.clone());

    let token = CancellationToken::new();
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let result = service.get_chunk(0, 0, [0, 0, 0], &token).await.unwrap();
    assert!(matches!(result, ChunkResult::Cancelled));
    assert!(service.cache().is_empty().await);

    // A fresh token fetches again and populates
    let result = service
        .get_chunk(0, 0, [0, 0, 0], &CancellationToken::new())
        .await
        .unwrap();
    match result {
        ChunkResult::Ready(response) => {
            assert!(!response.cache_hit);
            assert_eq!(response.data.as_ref(), &[9u8; 16]);
        }
        ChunkResult::Cancelled => panic!("fresh token should not be cancelled"),
    }
    assert_eq!(fetcher.request_count(), 2);
}

#[tokio::test]
async fn test_independent_tokens() {
    let source = raw_source();
    let fetcher = TrackingMockFetcher::new().with_resource("http://h/vol/s0/0-4_0-4_0-1", vec![1u8; 16]);

    let cancelled = CancellationToken::new();
    cancelled.cancel();
    let live = CancellationToken::new();

    let a = source.download(source.create_chunk([0, 0, 0]).unwrap(), &fetcher, &cancelled);
    let b = source.download(source.create_chunk([0, 0, 0]).unwrap(), &fetcher, &live);
    let (a, b) = tokio::join!(a, b);

    assert!(a.is_cancelled());
    assert!(b.is_populated());
    assert_eq!(fetcher.request_count(), 1);
}
