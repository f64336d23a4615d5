use crate::{ErrorKind, Result};

/// An ordered sequence of items in which contiguous index ranges (tiles) are each associated
/// with the query that produced them.
///
/// A `TiledList` is produced fresh by the output assembler on every emission (see the
/// "Immutable snapshots" design note); consumers should treat it as read-only.
#[derive(Clone, Debug)]
pub struct TiledList<Q, I> {
    items: Vec<I>,
    // (query, start_inclusive) for each tile, plus a trailing sentinel end.
    // Tiles are stored as (query, start) pairs; the end of tile k is the start of tile k+1,
    // or `items.len()` for the last tile.
    tiles: Vec<(Q, usize)>,
}

impl<Q, I> Default for TiledList<Q, I> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            tiles: Vec::new(),
        }
    }
}

impl<Q, I> TiledList<Q, I> {
    /// The total number of items across all tiles.
    pub fn size(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The number of contiguous query ranges in this list.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }

    /// The `[start_inclusive, end_exclusive)` range of the `k`-th tile.
    pub fn tile_at(&self, k: usize) -> Result<(usize, usize)> {
        let (_, start) = self
            .tiles
            .get(k)
            .ok_or_else(|| ErrorKind::IndexOutOfBounds.with_message(format!("tile index {k} out of bounds")))?;
        let end = self
            .tiles
            .get(k + 1)
            .map(|(_, next_start)| *next_start)
            .unwrap_or(self.items.len());
        Ok((*start, end))
    }

    /// The query that produced the item at index `i`.
    pub fn query_at(&self, i: usize) -> Result<&Q> {
        if i >= self.items.len() {
            return Err(ErrorKind::IndexOutOfBounds.with_message(format!("item index {i} out of bounds")));
        }
        // `tiles` is sorted by `start`, so find the last tile whose start is <= i.
        let tile_index = self.tiles.partition_point(|(_, start)| *start <= i) - 1;
        Ok(&self.tiles[tile_index].0)
    }

    pub fn item_at(&self, i: usize) -> Result<&I> {
        self.items
            .get(i)
            .ok_or_else(|| ErrorKind::IndexOutOfBounds.with_message(format!("item index {i} out of bounds")))
    }

    /// Iterates over every `(query, item)` pair in list order.
    pub fn iter(&self) -> impl Iterator<Item = (&Q, &I)> {
        (0..self.items.len()).map(move |i| {
            let tile_index = self.tiles.partition_point(|(_, start)| *start <= i) - 1;
            (&self.tiles[tile_index].0, &self.items[i])
        })
    }
}

/// Builds a [`TiledList`] by appending whole tiles.
///
/// This is the data structure's own construction API, independent of the engine: the assembler
/// uses it internally, and it's also useful on its own for testing `TiledList`'s invariants.
pub struct TiledListBuilder<Q, I> {
    list: TiledList<Q, I>,
}

impl<Q, I> TiledListBuilder<Q, I> {
    pub fn new() -> Self {
        Self {
            list: TiledList::default(),
        }
    }

    /// Appends a tile of items for `query`.
    ///
    /// If the previous tile was for the same query, the items are merged into that tile
    /// (tiles for a single query are always contiguous); a query may otherwise appear at most
    /// once among non-adjacent `add_all` calls without producing two separate tiles for it.
    pub fn add_all(&mut self, query: Q, items: impl IntoIterator<Item = I>) -> &mut Self
    where
        Q: PartialEq,
    {
        let start = self.list.items.len();
        let mut added_any = false;
        for item in items {
            self.list.items.push(item);
            added_any = true;
        }
        if !added_any {
            return self;
        }
        match self.list.tiles.last() {
            Some((last_query, _)) if *last_query == query => {
                // Extend the current tile; nothing to record, the new items already belong to it.
            }
            _ => self.list.tiles.push((query, start)),
        }
        self
    }

    pub fn build(self) -> TiledList<Q, I> {
        self.list
    }

    /// The items accumulated into the list so far, in assembly order.
    pub(crate) fn items(&self) -> &[I] {
        &self.list.items
    }
}

impl<Q, I> Default for TiledListBuilder<Q, I> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_list_has_no_size_or_tiles() {
        let list: TiledList<&str, i32> = TiledListBuilder::new().build();
        assert_eq!(list.size(), 0);
        assert_eq!(list.tile_count(), 0);
        assert!(list.query_at(0).is_err());
    }

    #[test]
    fn round_trips_appended_items() {
        let mut builder = TiledListBuilder::new();
        builder.add_all("a", vec![1, 2, 3]);
        builder.add_all("b", vec![4, 5]);
        let list = builder.build();

        assert_eq!(list.size(), 5);
        assert_eq!(list.tile_count(), 2);
        assert_eq!(list.tile_at(0).unwrap(), (0, 3));
        assert_eq!(list.tile_at(1).unwrap(), (3, 5));
        for i in 0..3 {
            assert_eq!(*list.query_at(i).unwrap(), "a");
        }
        for i in 3..5 {
            assert_eq!(*list.query_at(i).unwrap(), "b");
        }
        assert_eq!(
            list.iter().map(|(_, i)| *i).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn adjacent_add_alls_for_same_query_stay_one_tile() {
        let mut builder = TiledListBuilder::new();
        builder.add_all("a", vec![1, 2]);
        builder.add_all("a", vec![3]);
        let list = builder.build();
        assert_eq!(list.tile_count(), 1);
        assert_eq!(list.tile_at(0).unwrap(), (0, 3));
    }

    #[test]
    fn out_of_bounds_tile_access_fails() {
        let list: TiledList<&str, i32> = TiledListBuilder::new().build();
        assert!(list.tile_at(0).is_err());
        let mut builder = TiledListBuilder::new();
        builder.add_all("a", vec![1]);
        let list = builder.build();
        assert!(list.tile_at(1).is_err());
        assert!(list.item_at(1).is_err());
    }
}
