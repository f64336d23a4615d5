use std::{cmp::Ordering, collections::HashMap, sync::Arc};

use crate::{tile::Tile, tiled_list::TiledList};

/// A total order over queries, supplied externally.
pub type Comparator<Q> = Arc<dyn Fn(&Q, &Q) -> Ordering + Send + Sync>;

/// A snapshot of order-relevant metadata, passed to `CustomList`/`CustomMap` transforms.
///
/// Per the open question on staleness (see DESIGN.md): the metadata observes the *new* order,
/// snapshotted at assembly time, not whatever order was active when a concurrent `OrderChange`
/// was still in flight.
#[derive(Clone, Debug)]
pub struct OrderMetadata<Q> {
    pub queries: Vec<Q>,
    pub most_recently_turned_on: Option<Q>,
    pub most_recently_emitted: Option<Q>,
}

type CustomListFn<Q, I> = Arc<dyn Fn(&OrderMetadata<Q>, &HashMap<Q, Tile<I>>) -> TiledList<Q, I> + Send + Sync>;
type CustomMapFn<Q, I> = Arc<dyn Fn(&OrderMetadata<Q>, &HashMap<Q, Tile<I>>) -> Vec<(Q, I)> + Send + Sync>;

/// The ordering policy used by the output assembler.
#[derive(Clone)]
pub enum Order<Q, I> {
    /// Iteration order equals insertion order over retained queries.
    Unspecified,
    /// Queries iterated by `comparator` ascending.
    Sorted(Comparator<Q>),
    /// Iterated outward from the most-recently-turned-on query, alternating left/right.
    PivotSorted(Comparator<Q>),
    /// A user-supplied projection of metadata + tile map into a `TiledList`.
    CustomList(Comparator<Q>, CustomListFn<Q, I>),
    /// A user-supplied projection of metadata + tile map into an ordered `(query, item)` list.
    CustomMap(Comparator<Q>, CustomMapFn<Q, I>),
}

impl<Q, I> Order<Q, I> {
    /// The comparator that should be used to keep the retained-query list sorted, if any.
    ///
    /// `Unspecified` has none: its backing list is maintained in insertion order instead.
    pub fn comparator(&self) -> Option<&Comparator<Q>> {
        match self {
            Order::Unspecified => None,
            Order::Sorted(cmp) | Order::PivotSorted(cmp) => Some(cmp),
            Order::CustomList(cmp, _) | Order::CustomMap(cmp, _) => Some(cmp),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Order::Unspecified => "Unspecified",
            Order::Sorted(_) => "Sorted",
            Order::PivotSorted(_) => "PivotSorted",
            Order::CustomList(_, _) => "CustomList",
            Order::CustomMap(_, _) => "CustomMap",
        }
    }
}

impl<Q, I> std::fmt::Debug for Order<Q, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Order").field(&self.name()).finish()
    }
}
