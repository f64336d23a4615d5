use std::hash::Hash;

use crate::{limiter::OutputShape, order::Order, output::Output, state::QueryState, ErrorKind, Result};

/// The fold/state-machine core: turns a stream of [`Output`] events into updates to a
/// [`QueryState`], deciding after each one whether the assembler should run again.
///
/// This is deliberately synchronous and side-effect-free apart from mutating `state` — all the
/// concurrency lives in the valves and the multiplexer that feed it.
pub(crate) struct Tiler<Q, I> {
    state: QueryState<Q, I>,
    output_shape: OutputShape,
}

impl<Q, I> Tiler<Q, I>
where
    Q: Clone + Eq + Hash,
{
    pub(crate) fn new(order: Order<Q, I>, limiter: crate::limiter::Limiter<Q, I>) -> Self {
        let output_shape = limiter.shape();
        Self {
            state: QueryState::new(order, limiter),
            output_shape,
        }
    }

    pub(crate) fn state(&self) -> &QueryState<Q, I> {
        &self.state
    }

    /// Folds one event into the state, returning whether the assembler should run and emit a
    /// fresh snapshot as a result.
    ///
    /// | Event            | State change                                        | Emits |
    /// |-------------------|-----------------------------------------------------|-------|
    /// | `Data`            | records the tile, sets `most_recently_emitted`       | yes   |
    /// | `TurnedOn`        | records the new pivot reference                      | iff `q` already has cached data |
    /// | `Eviction`        | drops the query's tile and retained-query slot       | yes   |
    /// | `ValveError`      | logged, then folded exactly like `Eviction`          | yes   |
    /// | `OrderChange`     | replaces the order, re-sorting retained queries      | yes   |
    /// | `LimiterChange`   | replaces the limiter, shape-checked                  | yes   |
    pub(crate) fn apply(&mut self, event: Output<Q, I>) -> Result<bool> {
        match event {
            Output::Data(query, tile) => {
                self.state.most_recently_emitted = Some(query.clone());
                self.state.put_tile(query, tile);
                Ok(true)
            }
            Output::TurnedOn(query) => {
                // A fresh subscription with no cached data yet shouldn't cause a snapshot on its
                // own — the first meaningful emission for it is its first `Data`. A query that
                // already has a tile (re-`On` after an `Off`) does re-emit immediately, since its
                // position as the new pivot is itself a material change.
                let has_cached_data = self.state.tiles().contains_key(&query);
                self.state.most_recently_turned_on = Some(query);
                Ok(has_cached_data)
            }
            Output::Eviction(query) => {
                self.state.evict(&query);
                Ok(true)
            }
            Output::ValveError(query, err) => {
                tracing::warn!(query_error = %err, "query evicted after a producer error");
                self.state.evict(&query);
                Ok(true)
            }
            Output::OrderChange(order) => {
                self.state.set_order(order);
                Ok(true)
            }
            Output::LimiterChange(limiter) => {
                if limiter.shape() != self.output_shape {
                    return Err(ErrorKind::ShapeMismatch.with_message(format!(
                        "limiter change carries a {:?} limiter, engine output shape is fixed at {:?}",
                        limiter.shape(),
                        self.output_shape
                    )));
                }
                self.state.limiter = limiter;
                Ok(true)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{limiter::Limiter, tile::Tile};
    use std::time::Instant;

    fn tiler() -> Tiler<&'static str, i32> {
        Tiler::new(Order::Unspecified, Limiter::unbounded(OutputShape::List))
    }

    #[test]
    fn turned_on_without_cached_data_does_not_emit() {
        let mut t = tiler();
        assert!(!t.apply(Output::TurnedOn("a")).unwrap());
        assert_eq!(t.state().most_recently_turned_on(), Some(&"a"));
    }

    #[test]
    fn turned_on_with_cached_data_emits() {
        let mut t = tiler();
        t.apply(Output::Data("a", Tile::new(Instant::now(), 1))).unwrap();
        assert!(t.apply(Output::TurnedOn("a")).unwrap());
    }

    #[test]
    fn eviction_always_emits_and_drops_the_tile() {
        let mut t = tiler();
        t.apply(Output::Data("a", Tile::new(Instant::now(), 1))).unwrap();
        assert!(t.apply(Output::Eviction("a")).unwrap());
        assert!(!t.state().tiles().contains_key(&"a"));
    }

    #[test]
    fn limiter_change_with_mismatched_shape_is_fatal() {
        let mut t = tiler();
        let err = t.apply(Output::LimiterChange(Limiter::map_max_size(1))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ShapeMismatch);
    }
}
