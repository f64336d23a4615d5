//! A small simulated producer backend for exercising the engine end to end, analogous in spirit
//! to the teacher's `tests/mock_engine` harness: a minimal fake driven entirely through the
//! crate's public API.

use std::{collections::HashMap, time::Duration};

use futures::{stream, Stream, StreamExt};
use tiler::{engine::ProducerFactory, Engine, EngineConfig, Error, Input, Limiter, Order, OutputShape, Snapshot};

type EngineResult<T> = std::result::Result<T, Error>;

/// A catalog of canned pages, one `Vec<i32>` per query. Building a [`ProducerFactory`] from it
/// yields each query's items in order, then ends that query's stream (the valve stays `On`, just
/// idle, exactly as spec §4.2 describes a naturally-exhausted producer).
pub fn catalog(pages: impl IntoIterator<Item = (i64, Vec<i32>)>) -> ProducerFactory<i64, i32> {
    let pages: HashMap<i64, Vec<i32>> = pages.into_iter().collect();
    std::sync::Arc::new(move |query: &i64| {
        let items = pages.get(query).cloned().unwrap_or_default();
        Box::pin(stream::iter(items.into_iter().map(Ok)))
    })
}

/// Builds an unspecified-order, unbounded-list engine over `pages` and returns its handle plus
/// the running snapshot stream.
pub fn list_engine(pages: impl IntoIterator<Item = (i64, Vec<i32>)>) -> (tiler::EngineHandle<i64, i32>, impl Stream<Item = EngineResult<Snapshot<i64, i32>>>) {
    engine_with(pages, Order::Unspecified, Limiter::unbounded(OutputShape::List))
}

/// Builds an engine with an explicit `order` and an unbounded list limiter.
pub fn sorted_engine(
    pages: impl IntoIterator<Item = (i64, Vec<i32>)>,
    order: Order<i64, i32>,
) -> (tiler::EngineHandle<i64, i32>, impl Stream<Item = EngineResult<Snapshot<i64, i32>>>) {
    engine_with(pages, order, Limiter::unbounded(OutputShape::List))
}

/// Builds an engine with an explicit `order` and `limiter`, both fully under the caller's control.
pub fn engine_with(
    pages: impl IntoIterator<Item = (i64, Vec<i32>)>,
    order: Order<i64, i32>,
    limiter: Limiter<i64, i32>,
) -> (tiler::EngineHandle<i64, i32>, impl Stream<Item = EngineResult<Snapshot<i64, i32>>>) {
    let config = EngineConfig::new(order, limiter, catalog(pages)).expect("valid engine config");
    let (handle, engine) = Engine::new(config);
    (handle, engine.run())
}

/// Pulls the next snapshot off `stream`, failing the test instead of hanging forever if the
/// engine never emits (e.g. a bug silently drops an event).
pub async fn next_snapshot<S>(stream: &mut S) -> Snapshot<i64, i32>
where
    S: Stream<Item = EngineResult<Snapshot<i64, i32>>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for a snapshot")
        .expect("engine stream ended unexpectedly")
        .expect("engine produced a fatal error")
}

/// Pulls `n` snapshots, returning only the last one: convenient when a batch of inputs is known
/// to cause exactly `n` emissions and only the final state matters to the assertion.
pub async fn nth_snapshot<S>(stream: &mut S, n: usize) -> Snapshot<i64, i32>
where
    S: Stream<Item = EngineResult<Snapshot<i64, i32>>> + Unpin,
{
    let mut last = next_snapshot(stream).await;
    for _ in 1..n {
        last = next_snapshot(stream).await;
    }
    last
}

/// Asserts that no further snapshot arrives within a short window — used for idempotence checks
/// (spec §8: "no second snapshot arrives within a reasonable timeout").
pub async fn assert_no_further_snapshot<S>(stream: &mut S)
where
    S: Stream<Item = EngineResult<Snapshot<i64, i32>>> + Unpin,
{
    let result = tokio::time::timeout(Duration::from_millis(150), stream.next()).await;
    assert!(result.is_err(), "expected no further snapshot, but got one");
}

/// Pulls the next raw result off `stream` without unwrapping it, so a fatal engine error can be
/// asserted on directly instead of panicking.
pub async fn next_result<S>(stream: &mut S) -> EngineResult<Snapshot<i64, i32>>
where
    S: Stream<Item = EngineResult<Snapshot<i64, i32>>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(2), stream.next())
        .await
        .expect("timed out waiting for a result")
        .expect("engine stream ended unexpectedly")
}

/// Pulls snapshots until `predicate` accepts one, or fails the test after a timeout.
///
/// The per-query valves run as independent tasks, so the exact interleaving of `Data` events
/// across queries isn't deterministic; tests wait for a condition on the accumulated state
/// instead of counting emissions.
pub async fn wait_for<S>(stream: &mut S, mut predicate: impl FnMut(&Snapshot<i64, i32>) -> bool) -> Snapshot<i64, i32>
where
    S: Stream<Item = EngineResult<Snapshot<i64, i32>>> + Unpin,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let snapshot = stream
                .next()
                .await
                .expect("engine stream ended unexpectedly")
                .expect("engine produced a fatal error");
            if predicate(&snapshot) {
                return snapshot;
            }
        }
    })
    .await
    .expect("timed out waiting for a snapshot matching the predicate")
}

pub fn send(handle: &tiler::EngineHandle<i64, i32>, input: Input<i64, i32>) {
    handle.send(input).expect("engine still accepting input");
}

pub fn list_items(snapshot: &Snapshot<i64, i32>) -> Vec<i32> {
    let list = snapshot.as_list().expect("expected a list snapshot");
    list.iter().map(|(_, item)| *item).collect()
}

pub fn list_queries(snapshot: &Snapshot<i64, i32>) -> Vec<i64> {
    let list = snapshot.as_list().expect("expected a list snapshot");
    list.iter().map(|(q, _)| *q).collect()
}

pub fn ascending() -> tiler::Comparator<i64> {
    std::sync::Arc::new(|a: &i64, b: &i64| a.cmp(b))
}
