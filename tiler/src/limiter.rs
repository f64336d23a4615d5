use std::sync::Arc;

/// Whether an engine produces `TiledList` or ordered-map snapshots.
///
/// Fixed for the lifetime of an [`Engine`](crate::engine::Engine); every `Limiter` supplied to
/// it (initial or via `LimiterChange`) must match.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputShape {
    List,
    Map,
}

/// A predicate used by the assembler to bound output length.
///
/// The predicate must be monotonic (once true on a prefix, remains true under extension); the
/// assembler only relies on this for efficiency; it stops appending as soon as the predicate
/// returns `true`, so a non-monotonic predicate still yields a deterministic, well-defined
/// result, just not necessarily the one the caller expected.
#[derive(Clone)]
pub enum Limiter<Q, I> {
    /// A predicate on the items accumulated so far in a list assembly.
    List(Arc<dyn Fn(&[I]) -> bool + Send + Sync>),
    /// A predicate on the `(query, item)` pairs accumulated so far in a map assembly.
    Map(Arc<dyn Fn(&[(Q, I)]) -> bool + Send + Sync>),
}

impl<Q, I> Limiter<Q, I> {
    pub fn shape(&self) -> OutputShape {
        match self {
            Limiter::List(_) => OutputShape::List,
            Limiter::Map(_) => OutputShape::Map,
        }
    }

    /// A limiter that never stops assembly (bounded only by how many queries are retained).
    pub fn unbounded(shape: OutputShape) -> Self {
        match shape {
            OutputShape::List => Limiter::List(Arc::new(|_items: &[I]| false)),
            OutputShape::Map => Limiter::Map(Arc::new(|_pairs: &[(Q, I)]| false)),
        }
    }

    /// A list-limiter that stops once the accumulated list reaches `size` items.
    pub fn list_max_size(size: usize) -> Self {
        Limiter::List(Arc::new(move |items: &[I]| items.len() >= size))
    }

    /// A map-limiter that stops once the accumulated map reaches `size` entries.
    pub fn map_max_size(size: usize) -> Self {
        Limiter::Map(Arc::new(move |pairs: &[(Q, I)]| pairs.len() >= size))
    }
}

impl<Q, I> std::fmt::Debug for Limiter<Q, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Limiter::{:?}", self.shape())
    }
}
