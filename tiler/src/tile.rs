use std::time::Instant;

/// The engine's record of the latest produced item for a query.
///
/// `flow_on_at` records when the subscription that produced `item` began (the moment the
/// owning [`Valve`](crate::valve::Valve) last transitioned `Off` → `On`). It's used for
/// diagnostics and as a tie-breaker in custom orderings; it is not reset by `Off`, only by a
/// fresh `On`.
#[derive(Clone, Debug)]
pub struct Tile<I> {
    pub flow_on_at: Instant,
    pub item: I,
}

impl<I> Tile<I> {
    pub fn new(flow_on_at: Instant, item: I) -> Self {
        Self { flow_on_at, item }
    }
}
