//! The neighbored cursor fetcher (spec §4.7): adapts cursor/token-based pagination, where page
//! `p+1` requires a token learned from fetching page `p`, to the engine's concurrent
//! [`ProducerFactory`](crate::engine::ProducerFactory) contract.

use std::{
    collections::{HashMap, VecDeque},
    hash::Hash,
    sync::{Arc, Mutex},
};

use futures::{future::BoxFuture, stream};
use tokio::sync::Notify;

use crate::{engine::ProducerFactory, ErrorKind, Result};

/// One page fetched for a query: its items, plus any `(neighbor_query, token)` pairs the fetch
/// learned along the way (e.g. the token for the next page).
pub struct CursorPage<Q, T, I> {
    pub items: I,
    pub neighbors: Vec<(Q, T)>,
}

impl<Q, T, I> CursorPage<Q, T, I> {
    pub fn new(items: I, neighbors: impl IntoIterator<Item = (Q, T)>) -> Self {
        Self {
            items,
            neighbors: neighbors.into_iter().collect(),
        }
    }
}

/// The user's page-fetching function: given a query and its continuation token, returns the
/// page's items plus any newly learned neighbor tokens.
pub type CursorFetchFn<Q, T, I> = Arc<dyn Fn(Q, T) -> BoxFuture<'static, Result<CursorPage<Q, T, I>>> + Send + Sync>;

/// A bounded, insertion-ordered `Q -> Token` table.
///
/// Per spec §4.7, "when `|tokens| > max_tokens`, the least-recently-learned key is dropped" —
/// i.e. eviction order is by learn time, oldest first, not by most-recent-use. That's a plain
/// bounded FIFO keyed on first-insertion order, despite the spec's "LIFO map" label for this
/// structure; see DESIGN.md for why FIFO-by-insertion is what's actually implemented here.
struct TokenTable<Q, T> {
    values: HashMap<Q, T>,
    learned_order: VecDeque<Q>,
    max_tokens: usize,
}

impl<Q, T> TokenTable<Q, T>
where
    Q: Clone + Eq + Hash,
{
    fn new(max_tokens: usize) -> Self {
        Self {
            values: HashMap::new(),
            learned_order: VecDeque::new(),
            max_tokens,
        }
    }

    fn get(&self, query: &Q) -> Option<&T> {
        self.values.get(query)
    }

    /// Learns (or re-learns) a token for `query`, evicting the oldest-learned entries if this
    /// pushes the table over capacity. Re-learning an already-known query does not move it in
    /// the eviction order — only the first time a key is learned counts as its "learn time".
    fn learn(&mut self, query: Q, token: T) {
        if !self.values.contains_key(&query) {
            self.learned_order.push_back(query.clone());
        }
        self.values.insert(query, token);
        while self.values.len() > self.max_tokens {
            let Some(oldest) = self.learned_order.pop_front() else {
                break;
            };
            self.values.remove(&oldest);
        }
    }
}

/// Suspends fetches until the token they need has been learned, merging newly learned tokens
/// back into the table and waking any fetcher they unblock.
///
/// `Arc`-wrapped so it can be captured by the `ProducerFactory` closure handed to
/// [`EngineConfig`](crate::engine::EngineConfig) while fetches for other queries, driven through
/// the same table, run concurrently.
pub struct CursorFetcher<Q, T, I> {
    table: Mutex<TokenTable<Q, T>>,
    notify: Notify,
    fetch: CursorFetchFn<Q, T, I>,
}

impl<Q, T, I> CursorFetcher<Q, T, I>
where
    Q: Clone + Eq + Hash + Send + Sync + 'static,
    T: Clone + Send + Sync + 'static,
    I: Send + 'static,
{
    /// Creates a fetcher seeded with the starting query/token pairs the caller already knows
    /// (e.g. the first page's token, supplied out of band). Fails with
    /// [`ErrorKind::InvalidCursorSeed`] if `seed` is empty: with no seeded query there is no way
    /// for any fetch ever to become unblocked.
    pub fn new(max_tokens: usize, seed: impl IntoIterator<Item = (Q, T)>, fetch: CursorFetchFn<Q, T, I>) -> Result<Arc<Self>> {
        let mut table = TokenTable::new(max_tokens);
        let mut seeded_any = false;
        for (query, token) in seed {
            table.learn(query, token);
            seeded_any = true;
        }
        if !seeded_any {
            return Err(ErrorKind::InvalidCursorSeed.with_message("neighbored cursor fetcher requires at least one seeded query"));
        }
        Ok(Arc::new(Self {
            table: Mutex::new(table),
            notify: Notify::new(),
            fetch,
        }))
    }

    /// Builds a [`ProducerFactory`] that drives this fetcher: each query's stream suspends until
    /// its token is available, fetches exactly one page, merges any newly learned neighbor
    /// tokens, and completes.
    pub fn into_producer(self: Arc<Self>) -> ProducerFactory<Q, I> {
        Arc::new(move |query: &Q| {
            let this = self.clone();
            let query = query.clone();
            Box::pin(stream::once(async move { this.fetch_one(query).await }))
        })
    }

    async fn fetch_one(&self, query: Q) -> Result<I> {
        let token = self.wait_for_token(&query).await;
        tracing::trace!("cursor token available, fetching page");
        let page = (self.fetch)(query, token).await?;
        self.merge_neighbors(page.neighbors);
        Ok(page.items)
    }

    async fn wait_for_token(&self, query: &Q) -> T {
        loop {
            // Register interest in the next notification *before* re-checking the table, so a
            // `learn` that races in between the first check and this point isn't missed.
            let notified = self.notify.notified();
            if let Some(token) = self.table.lock().unwrap().get(query) {
                return token.clone();
            }
            notified.await;
        }
    }

    fn merge_neighbors(&self, neighbors: Vec<(Q, T)>) {
        if neighbors.is_empty() {
            return;
        }
        {
            let mut table = self.table.lock().unwrap();
            for (query, token) in neighbors {
                table.learn(query, token);
            }
        }
        self.notify.notify_waiters();
    }
}
