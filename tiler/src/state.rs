use std::{collections::HashMap, hash::Hash};

use crate::{
    limiter::Limiter,
    order::{Order, OrderMetadata},
    tile::Tile,
};

/// The tiler's internal state: the retained queries, their tiles, and the active order/limiter.
///
/// `tiles` holds only queries currently retained — on or off, but not evicted. `queries` tracks
/// the same membership as `tiles.keys()`, kept in the order the current [`Order`] policy
/// dictates (insertion order under `Unspecified`, comparator order otherwise).
pub struct QueryState<Q, I> {
    pub(crate) queries: Vec<Q>,
    pub(crate) most_recently_turned_on: Option<Q>,
    pub(crate) most_recently_emitted: Option<Q>,
    pub(crate) tiles: HashMap<Q, Tile<I>>,
    pub(crate) order: Order<Q, I>,
    pub(crate) limiter: Limiter<Q, I>,
}

impl<Q, I> QueryState<Q, I>
where
    Q: Clone + Eq + Hash,
{
    pub fn new(order: Order<Q, I>, limiter: Limiter<Q, I>) -> Self {
        Self {
            queries: Vec::new(),
            most_recently_turned_on: None,
            most_recently_emitted: None,
            tiles: HashMap::new(),
            order,
            limiter,
        }
    }

    pub fn order(&self) -> &Order<Q, I> {
        &self.order
    }

    pub fn limiter(&self) -> &Limiter<Q, I> {
        &self.limiter
    }

    pub fn tiles(&self) -> &HashMap<Q, Tile<I>> {
        &self.tiles
    }

    pub fn queries(&self) -> &[Q] {
        &self.queries
    }

    pub fn most_recently_turned_on(&self) -> Option<&Q> {
        self.most_recently_turned_on.as_ref()
    }

    pub fn metadata(&self) -> OrderMetadata<Q> {
        OrderMetadata {
            queries: self.queries.clone(),
            most_recently_turned_on: self.most_recently_turned_on.clone(),
            most_recently_emitted: self.most_recently_emitted.clone(),
        }
    }

    /// Records a tile for `query`, inserting it into `queries` (in the current order) if it's
    /// not already retained.
    pub(crate) fn put_tile(&mut self, query: Q, tile: Tile<I>) {
        let is_new = !self.tiles.contains_key(&query);
        self.tiles.insert(query.clone(), tile);
        if is_new {
            self.insert_query(query);
        }
    }

    /// Removes `query` from both `tiles` and `queries`. Idempotent.
    pub(crate) fn evict(&mut self, query: &Q) {
        self.tiles.remove(query);
        self.queries.retain(|q| q != query);
    }

    pub(crate) fn set_order(&mut self, order: Order<Q, I>) {
        self.order = order;
        self.resort();
    }

    fn resort(&mut self) {
        if let Some(cmp) = self.order.comparator() {
            self.queries.sort_by(|a, b| cmp(a, b));
        }
    }

    fn insert_query(&mut self, query: Q) {
        match self.order.comparator() {
            Some(cmp) => {
                let pos = self.queries.partition_point(|existing| cmp(existing, &query) != std::cmp::Ordering::Greater);
                self.queries.insert(pos, query);
            }
            None => self.queries.push(query),
        }
    }
}
