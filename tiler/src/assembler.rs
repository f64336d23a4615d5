//! Materializes a [`QueryState`] into a [`Snapshot`], under the state's active order and
//! limiter.

use std::hash::Hash;

use crate::{
    limiter::Limiter,
    order::Order,
    snapshot::{OrderedMap, Snapshot},
    state::QueryState,
    tiled_list::TiledListBuilder,
    ErrorKind, Result,
};

pub(crate) fn assemble<Q, I>(state: &QueryState<Q, I>) -> Result<Snapshot<Q, I>>
where
    Q: Clone + Eq + Hash,
    I: Clone,
{
    match state.order() {
        Order::CustomMap(_, f) => {
            let metadata = state.metadata();
            let pairs = run_transform(std::panic::AssertUnwindSafe(|| f(&metadata, state.tiles())))?;
            Ok(Snapshot::Map(OrderedMap::new(pairs)))
        }
        Order::CustomList(_, f) => {
            let metadata = state.metadata();
            let list = run_transform(std::panic::AssertUnwindSafe(|| f(&metadata, state.tiles())))?;
            Ok(Snapshot::List(list))
        }
        _ => match state.limiter() {
            Limiter::List(_) => Ok(Snapshot::List(assemble_list(state)?)),
            Limiter::Map(_) => Ok(Snapshot::Map(assemble_map(state)?)),
        },
    }
}

/// Runs a `CustomList`/`CustomMap` transform, catching a panic and turning it into
/// [`ErrorKind::CustomTransformFailed`] instead of unwinding the engine's task (spec §7: "the
/// engine does not attempt to mask transform bugs", but it also must not take the whole engine
/// down with it).
fn run_transform<T>(f: impl FnOnce() -> T + std::panic::UnwindSafe) -> Result<T> {
    std::panic::catch_unwind(f).map_err(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "custom order transform panicked".to_string());
        ErrorKind::CustomTransformFailed.with_message(message)
    })
}

fn assemble_list<Q, I>(state: &QueryState<Q, I>) -> Result<crate::tiled_list::TiledList<Q, I>>
where
    Q: Clone + Eq + Hash,
    I: Clone,
{
    let limiter = match state.limiter() {
        Limiter::List(f) => f.clone(),
        Limiter::Map(_) => return Err(ErrorKind::ShapeMismatch.with_message("list assembly requires a list-limiter")),
    };

    if matches!(state.order(), Order::PivotSorted(_)) {
        return Ok(assemble_pivot_list(state, &*limiter));
    }

    let mut builder = TiledListBuilder::new();
    for q in state.queries() {
        let Some(tile) = state.tiles().get(q) else {
            continue;
        };
        builder.add_all(q.clone(), std::iter::once(tile.item.clone()));
        if limiter(builder.items()) {
            break;
        }
    }
    Ok(builder.build())
}

fn assemble_map<Q, I>(state: &QueryState<Q, I>) -> Result<OrderedMap<Q, I>>
where
    Q: Clone + Eq + Hash,
    I: Clone,
{
    let limiter = match state.limiter() {
        Limiter::Map(f) => f.clone(),
        Limiter::List(_) => return Err(ErrorKind::ShapeMismatch.with_message("map assembly requires a map-limiter")),
    };

    if matches!(state.order(), Order::PivotSorted(_)) {
        return Ok(assemble_pivot_map(state, &*limiter));
    }

    let mut pairs: Vec<(Q, I)> = Vec::new();
    for q in state.queries() {
        let Some(tile) = state.tiles().get(q) else {
            continue;
        };
        pairs.push((q.clone(), tile.item.clone()));
        if limiter(&pairs) {
            break;
        }
    }
    Ok(OrderedMap::new(pairs))
}

/// Locates the pivot's index in the sorted `queries` list, if it's still retained.
fn pivot_index<Q, I>(state: &QueryState<Q, I>) -> Option<usize>
where
    Q: Clone + Eq + Hash,
{
    let pivot = state.most_recently_turned_on()?;
    let cmp = state
        .order()
        .comparator()
        .expect("PivotSorted always carries a comparator");
    state.queries().binary_search_by(|probe| cmp(probe, pivot)).ok()
}

/// Walks outward from the pivot, alternating left (prepend) and right (append), calling `push`
/// with each retained query in final left-to-right position, until `push` reports the limiter
/// is satisfied or both sides are exhausted.
fn pivot_walk<Q, I>(state: &QueryState<Q, I>, idx: usize, mut push: impl FnMut(&Q, bool) -> bool)
where
    Q: Clone + Eq + Hash,
{
    let queries = state.queries();
    if push(&queries[idx], false) {
        return;
    }

    let mut left = idx as isize - 1;
    let mut right = idx + 1;
    let mut stopped = false;

    while !stopped && (left >= 0 || right < queries.len()) {
        if left >= 0 {
            let q = &queries[left as usize];
            if state.tiles().contains_key(q) && push(q, true) {
                stopped = true;
            }
            left -= 1;
        }
        if !stopped && right < queries.len() {
            let q = &queries[right];
            if state.tiles().contains_key(q) && push(q, false) {
                stopped = true;
            }
            right += 1;
        }
    }
}

fn assemble_pivot_list<Q, I>(state: &QueryState<Q, I>, limiter: &(dyn Fn(&[I]) -> bool + Send + Sync)) -> crate::tiled_list::TiledList<Q, I>
where
    Q: Clone + Eq + Hash,
    I: Clone,
{
    let Some(idx) = pivot_index(state) else {
        return TiledListBuilder::new().build();
    };

    // `queries`/`tiles` and `q`'s tile are both looked up fresh inside the closure (rather than
    // threading references out of `pivot_walk`) to sidestep the borrow checker fighting the
    // closure over `builder`.
    let mut builder = TiledListBuilder::new();
    pivot_walk(state, idx, |q, prepend| {
        let tile = state.tiles().get(q).expect("pivot_walk only visits retained queries");
        if prepend {
            // `TiledListBuilder` only supports appending; for the left side we build a small
            // reversed staging buffer and splice it in once, since prepend-per-item would
            // require rebuilding tile boundaries on every step.
            prepend_into(&mut builder, q.clone(), tile.item.clone());
        } else {
            builder.add_all(q.clone(), std::iter::once(tile.item.clone()));
        }
        limiter(builder.items())
    });
    builder.build()
}

/// Prepends a single-item tile to a [`TiledListBuilder`] under construction.
///
/// `TiledListBuilder` is append-only by design (it mirrors how the engine actually produces
/// tiles, outside-in), so pivot expansion, which grows in both directions, rebuilds the builder
/// with the new tile in front rather than extending the API with a general-purpose prepend.
fn prepend_into<Q: Clone, I: Clone>(builder: &mut TiledListBuilder<Q, I>, query: Q, item: I) {
    let rest = std::mem::take(builder);
    let mut rebuilt = TiledListBuilder::new();
    rebuilt.add_all(query, std::iter::once(item));
    for (q, i) in rest.build().iter() {
        rebuilt.add_all(q.clone(), std::iter::once(i.clone()));
    }
    *builder = rebuilt;
}

fn assemble_pivot_map<Q, I>(state: &QueryState<Q, I>, limiter: &(dyn Fn(&[(Q, I)]) -> bool + Send + Sync)) -> OrderedMap<Q, I>
where
    Q: Clone + Eq + Hash,
    I: Clone,
{
    let Some(idx) = pivot_index(state) else {
        return OrderedMap::default();
    };

    let mut pairs: Vec<(Q, I)> = Vec::new();
    pivot_walk(state, idx, |q, prepend| {
        let tile = state.tiles().get(q).expect("pivot_walk only visits retained queries");
        if prepend {
            pairs.insert(0, (q.clone(), tile.item.clone()));
        } else {
            pairs.push((q.clone(), tile.item.clone()));
        }
        limiter(&pairs)
    });
    OrderedMap::new(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::limiter::{Limiter, OutputShape};
    use std::sync::Arc;

    #[test]
    fn a_panicking_custom_list_transform_surfaces_as_custom_transform_failed() {
        let order: Order<&str, i32> = Order::CustomList(
            Arc::new(|a: &&str, b: &&str| a.cmp(b)),
            Arc::new(|_meta, _tiles| panic!("transform bug")),
        );
        let state = QueryState::new(order, Limiter::unbounded(OutputShape::List));

        let err = assemble(&state).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CustomTransformFailed);
    }

    #[test]
    fn a_panicking_custom_map_transform_surfaces_as_custom_transform_failed() {
        let order: Order<&str, i32> = Order::CustomMap(
            Arc::new(|a: &&str, b: &&str| a.cmp(b)),
            Arc::new(|_meta, _tiles| panic!("transform bug")),
        );
        let state = QueryState::new(order, Limiter::unbounded(OutputShape::Map));

        let err = assemble(&state).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CustomTransformFailed);
    }
}
