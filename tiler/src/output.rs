use crate::{limiter::Limiter, order::Order, tile::Tile, Error};

/// An event produced by a [`Valve`](crate::valve::Valve) or the
/// [`Multiplexer`](crate::multiplexer::Multiplexer), consumed by the
/// [`Tiler`](crate::tiler::Tiler) fold.
pub enum Output<Q, I> {
    /// A producer emitted an item for `q`.
    Data(Q, Tile<I>),
    /// `q`'s valve just transitioned `Off` → `On`.
    TurnedOn(Q),
    /// `q`'s valve was evicted and has terminated.
    Eviction(Q),
    /// `q`'s producer failed; the valve evicted itself as a result.
    ValveError(Q, Error),
    /// Forwarded directly from an `OrderChange` input.
    OrderChange(Order<Q, I>),
    /// Forwarded directly from a `LimiterChange` input.
    LimiterChange(Limiter<Q, I>),
}

impl<Q: std::fmt::Debug, I> std::fmt::Debug for Output<Q, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Output::Data(q, _) => write!(f, "Output::Data({q:?})"),
            Output::TurnedOn(q) => write!(f, "Output::TurnedOn({q:?})"),
            Output::Eviction(q) => write!(f, "Output::Eviction({q:?})"),
            Output::ValveError(q, e) => write!(f, "Output::ValveError({q:?}, {e})"),
            Output::OrderChange(o) => write!(f, "Output::OrderChange({:?})", o.name()),
            Output::LimiterChange(l) => write!(f, "Output::LimiterChange({:?})", l.shape()),
        }
    }
}
