use crate::tiled_list::TiledList;

/// A query→item map whose iteration order is the assembly order, not insertion-into-hash order.
#[derive(Clone, Debug)]
pub struct OrderedMap<Q, I> {
    pairs: Vec<(Q, I)>,
}

impl<Q, I> OrderedMap<Q, I> {
    pub(crate) fn new(pairs: Vec<(Q, I)>) -> Self {
        Self { pairs }
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn get(&self, query: &Q) -> Option<&I>
    where
        Q: PartialEq,
    {
        self.pairs.iter().find(|(q, _)| q == query).map(|(_, i)| i)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Q, &I)> {
        self.pairs.iter().map(|(q, i)| (q, i))
    }
}

impl<Q, I> Default for OrderedMap<Q, I> {
    fn default() -> Self {
        Self { pairs: Vec::new() }
    }
}

/// A single emission from the engine: either a [`TiledList`] or an [`OrderedMap`], depending on
/// the engine's configured output shape.
#[derive(Clone, Debug)]
pub enum Snapshot<Q, I> {
    List(TiledList<Q, I>),
    Map(OrderedMap<Q, I>),
}

impl<Q, I> Snapshot<Q, I> {
    pub fn as_list(&self) -> Option<&TiledList<Q, I>> {
        match self {
            Snapshot::List(list) => Some(list),
            Snapshot::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&OrderedMap<Q, I>> {
        match self {
            Snapshot::Map(map) => Some(map),
            Snapshot::List(_) => None,
        }
    }
}
