//! The pivoting driver (spec §4.6): the canonical way the engine is driven.
//!
//! Turns a stream of "current query" signals plus a [`PivotRequest`] into the exact
//! [`On`](crate::Request::On)/[`Off`](crate::Request::Off)/[`Evict`](crate::Request::Evict)/
//! [`OrderChange`](crate::Input::OrderChange) inputs needed to keep the engine's active set
//! matched to the user's focus, in the emission order the core expects.

use std::{
    collections::HashSet,
    hash::Hash,
    sync::Arc,
};

use crate::{
    input::Input,
    order::{Comparator, Order},
};

/// A neighbor function: given a query, returns the adjacent one on that side, or `None` if
/// there is no neighbor (a floor/ceiling of the underlying key space).
pub type NeighborFn<Q> = Arc<dyn Fn(&Q) -> Option<Q> + Send + Sync>;

/// Configuration for one pivoting step: how many queries to keep active, how many to retain
/// idle, and how to walk the key space outward from the current query.
#[derive(Clone)]
pub struct PivotRequest<Q> {
    /// How many queries (including the current one) should be `On`.
    pub on_count: usize,
    /// How many further queries, just outside `on`, should be kept `Off` (retained, not fetched).
    pub off_count: usize,
    pub next_query: NeighborFn<Q>,
    pub previous_query: NeighborFn<Q>,
    /// The total order used for [`Order::PivotSorted`]. Re-emitted as an `OrderChange` only when
    /// it differs (by `Arc` identity) from the comparator of the previous step.
    pub comparator: Comparator<Q>,
}

impl<Q> std::fmt::Debug for PivotRequest<Q> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PivotRequest")
            .field("on_count", &self.on_count)
            .field("off_count", &self.off_count)
            .finish()
    }
}

/// The result of one pivoting step: the exact set diffs to apply, already ordered the way §4.6
/// requires within each category (farthest from the pivot first, closest last, so that the
/// pivot's own `On` is the last thing to take effect and "wins" the race to become the new
/// `most_recently_turned_on`).
#[derive(Clone, Debug, Default)]
pub struct PivotStep<Q> {
    pub evict: Vec<Q>,
    pub off: Vec<Q>,
    pub on: Vec<Q>,
    /// `Some(cmp)` iff the comparator changed since the previous step and an `OrderChange`
    /// should be emitted.
    pub comparator: Option<Comparator<Q>>,
}

impl<Q> PivotStep<Q> {
    /// Converts this step into the `Input` batch the core consumes, in the order §4.6 specifies:
    /// evict, then off, then on, then an order change if the comparator changed.
    pub fn into_inputs<I>(self) -> Vec<Input<Q, I>> {
        let mut inputs = Vec::with_capacity(self.evict.len() + self.off.len() + self.on.len() + 1);
        inputs.extend(self.evict.into_iter().map(Input::evict));
        inputs.extend(self.off.into_iter().map(Input::off));
        inputs.extend(self.on.into_iter().map(Input::on));
        if let Some(cmp) = self.comparator {
            inputs.push(Input::OrderChange(Order::PivotSorted(cmp)));
        }
        inputs
    }

    pub fn is_empty(&self) -> bool {
        self.evict.is_empty() && self.off.is_empty() && self.on.is_empty() && self.comparator.is_none()
    }
}

/// Walks outward from `seed` alternating `next`/`previous`, collecting up to `total` queries in
/// increasing-distance-from-`seed` order (`seed` itself first). When one side runs out of
/// neighbors, the walk continues exclusively on the other side instead of stopping early; it
/// only stops once both sides are exhausted or `total` queries have been collected.
///
/// `on` and `off` (spec §4.6) are just the first `on_count` and next `off_count` entries of one
/// such walk: they're derived by the same outward expansion, `on` being the inner ring and `off`
/// the ring just beyond it. Splitting one walk this way is what guarantees `off`'s own distance
/// ordering lines up with `on`'s.
fn walk_outward<Q: Clone>(seed: Q, total: usize, next: &NeighborFn<Q>, previous: &NeighborFn<Q>) -> Vec<Q> {
    if total == 0 {
        return Vec::new();
    }

    let mut order = vec![seed.clone()];
    let mut front = seed.clone();
    let mut back = seed;
    let mut turn_next = true;
    let mut next_blocked = false;
    let mut previous_blocked = false;

    while order.len() < total && !(next_blocked && previous_blocked) {
        let use_next = if next_blocked {
            false
        } else if previous_blocked {
            true
        } else {
            turn_next
        };

        if use_next {
            match next(&back) {
                Some(n) => {
                    back = n.clone();
                    order.push(n);
                }
                None => {
                    next_blocked = true;
                    continue;
                }
            }
        } else {
            match previous(&front) {
                Some(p) => {
                    front = p.clone();
                    order.push(p);
                }
                None => {
                    previous_blocked = true;
                    continue;
                }
            }
        }
        turn_next = !turn_next;
    }

    order
}

/// Drives the engine's active set from a sequence of "current query" signals (spec §4.6).
///
/// Stateful across steps: each call to [`step`](Self::step) diffs the new `on`/`off` membership
/// against the previous step's to derive `evict`, and remembers the last comparator it emitted
/// an `OrderChange` for so unchanged comparators aren't re-sent every step.
pub struct PivotDriver<Q> {
    previous_on: Vec<Q>,
    previous_off: Vec<Q>,
    last_comparator: Option<Comparator<Q>>,
}

impl<Q> Default for PivotDriver<Q> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Q> PivotDriver<Q>
where
    Q: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            previous_on: Vec::new(),
            previous_off: Vec::new(),
            last_comparator: None,
        }
    }

    /// Computes the next step for a newly-current query `current` under `request`.
    #[tracing::instrument(level = "debug", skip_all)]
    pub fn step(&mut self, current: Q, request: &PivotRequest<Q>) -> PivotStep<Q> {
        let total = request.on_count + request.off_count;
        let walk = walk_outward(current, total, &request.next_query, &request.previous_query);

        let on: Vec<Q> = walk.iter().take(request.on_count).cloned().collect();
        let off: Vec<Q> = walk.iter().skip(request.on_count).cloned().collect();

        let new_membership: HashSet<&Q> = on.iter().chain(off.iter()).collect();
        let evict: Vec<Q> = self
            .previous_on
            .iter()
            .chain(self.previous_off.iter())
            .filter(|q| !new_membership.contains(q))
            .cloned()
            .rev()
            .collect();

        let comparator_changed = match &self.last_comparator {
            Some(previous) => !Arc::ptr_eq(previous, &request.comparator),
            None => true,
        };
        let comparator = if comparator_changed {
            self.last_comparator = Some(request.comparator.clone());
            Some(request.comparator.clone())
        } else {
            None
        };

        let mut on_emit = on.clone();
        on_emit.reverse();
        let mut off_emit = off.clone();
        off_emit.reverse();

        self.previous_on = on;
        self.previous_off = off;

        tracing::debug!(
            evict = evict.len(),
            off = off_emit.len(),
            on = on_emit.len(),
            order_change = comparator.is_some(),
            "pivot step computed"
        );

        PivotStep {
            evict,
            off: off_emit,
            on: on_emit,
            comparator,
        }
    }
}

/// The reactive variant of [`PivotDriver`] (spec §4.6): reacts to the most recent
/// `(query, request)` pair, applying `distinct` on each axis before recombining so that an
/// unrelated update on one axis doesn't force a redundant step when the other hasn't moved.
///
/// "Distinct" on the request axis compares `on_count`, `off_count`, and the comparator's `Arc`
/// identity; `next_query`/`previous_query` are assumed to characterize the same key space for
/// the lifetime of one driver and aren't compared.
pub struct ReactivePivotDriver<Q> {
    inner: PivotDriver<Q>,
    last_query: Option<Q>,
    last_request_key: Option<(usize, usize, *const ())>,
    current: Option<Q>,
    request: Option<PivotRequest<Q>>,
}

impl<Q> ReactivePivotDriver<Q>
where
    Q: Clone + Eq + Hash,
{
    pub fn new() -> Self {
        Self {
            inner: PivotDriver::new(),
            last_query: None,
            last_request_key: None,
            current: None,
            request: None,
        }
    }

    /// Records a new "current query" signal.
    pub fn set_current(&mut self, query: Q) {
        self.current = Some(query);
    }

    /// Records a new pivot request.
    pub fn set_request(&mut self, request: PivotRequest<Q>) {
        self.request = Some(request);
    }

    /// Combines the most recent query and request, if either is distinct from what the last
    /// step observed, into a new [`PivotStep`]. Returns `None` when nothing has changed, or
    /// when no query/request pair has been observed yet.
    pub fn maybe_step(&mut self) -> Option<PivotStep<Q>> {
        let query = self.current.clone()?;
        let request = self.request.clone()?;

        let request_key = (
            request.on_count,
            request.off_count,
            Arc::as_ptr(&request.comparator) as *const (),
        );
        let query_distinct = self.last_query.as_ref() != Some(&query);
        let request_distinct = self.last_request_key != Some(request_key);
        if !query_distinct && !request_distinct {
            return None;
        }

        self.last_query = Some(query.clone());
        self.last_request_key = Some(request_key);
        Some(self.inner.step(query, &request))
    }
}

impl<Q> Default for ReactivePivotDriver<Q>
where
    Q: Clone + Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}
