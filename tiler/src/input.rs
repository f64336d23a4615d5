use crate::{limiter::Limiter, order::Order};

/// A request to change the subscription state of a single query.
#[derive(Clone, Debug)]
pub enum Request<Q> {
    /// Begin or keep a subscription for `q`. Idempotent while already on.
    On(Q),
    /// Stop consuming `q`; retain its last tile.
    Off(Q),
    /// Stop consuming `q`; drop its last tile.
    Evict(Q),
}

/// The full input taxonomy the engine accepts.
pub enum Input<Q, I> {
    Request(Request<Q>),
    /// Replace the active ordering policy. Preserves tiles.
    OrderChange(Order<Q, I>),
    /// Replace the active limiter. The new limiter's shape must match the engine's output
    /// shape, or the engine fails with [`ErrorKind::ShapeMismatch`](crate::ErrorKind::ShapeMismatch).
    LimiterChange(Limiter<Q, I>),
    /// A logical aggregate of inputs. Not transactional: intermediate snapshots may be
    /// emitted while a batch is being applied.
    Batch(Vec<Input<Q, I>>),
}

impl<Q, I> Input<Q, I> {
    pub fn on(q: Q) -> Self {
        Input::Request(Request::On(q))
    }

    pub fn off(q: Q) -> Self {
        Input::Request(Request::Off(q))
    }

    pub fn evict(q: Q) -> Self {
        Input::Request(Request::Evict(q))
    }
}

impl<Q: std::fmt::Debug, I> std::fmt::Debug for Input<Q, I> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Input::Request(r) => write!(f, "Input::Request({r:?})"),
            Input::OrderChange(o) => write!(f, "Input::OrderChange({:?})", o.name()),
            Input::LimiterChange(l) => write!(f, "Input::LimiterChange({:?})", l.shape()),
            Input::Batch(items) => write!(f, "Input::Batch(len={})", items.len()),
        }
    }
}
