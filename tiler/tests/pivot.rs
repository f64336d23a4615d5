//! `Order::PivotSorted` assembles outward from the most-recently-turned-on query, alternating
//! sides, and stops as soon as the limiter says the accumulated window is big enough (spec §4.3,
//! §4.5).

mod support;

use tiler::{Input, Limiter, Order};

fn pages(queries: impl IntoIterator<Item = i64>) -> Vec<(i64, Vec<i32>)> {
    queries.into_iter().map(|q| (q, vec![q as i32])).collect()
}

#[tokio::test]
async fn window_brackets_the_pivot_once_the_limiter_is_satisfied() {
    let (handle, mut stream) = support::engine_with(pages(10..=14), Order::Unspecified, Limiter::unbounded(tiler::OutputShape::List));

    for q in [10, 11, 13, 14] {
        support::send(&handle, Input::on(q));
    }
    support::wait_for(&mut stream, |s| support::list_items(s).len() == 4).await;

    support::send(
        &handle,
        Input::Batch(vec![
            Input::OrderChange(Order::PivotSorted(support::ascending())),
            Input::LimiterChange(Limiter::list_max_size(3)),
            Input::on(12),
        ]),
    );

    let settled = support::wait_for(&mut stream, |s| support::list_items(s).contains(&12)).await;
    assert_eq!(support::list_queries(&settled), vec![11, 12, 13]);
}

#[tokio::test]
async fn re_centering_on_a_different_pivot_slides_the_window() {
    let (handle, mut stream) = support::engine_with(pages(0..=5), Order::PivotSorted(support::ascending()), Limiter::unbounded(tiler::OutputShape::List));

    for q in [0, 1, 3, 4] {
        support::send(&handle, Input::on(q));
    }
    support::wait_for(&mut stream, |s| support::list_items(s).len() == 4).await;

    support::send(&handle, Input::Batch(vec![Input::LimiterChange(Limiter::list_max_size(3)), Input::on(2)]));
    let settled = support::wait_for(&mut stream, |s| support::list_items(s).contains(&2)).await;
    assert_eq!(support::list_queries(&settled), vec![1, 2, 3]);

    support::send(&handle, Input::on(5));
    let settled = support::wait_for(&mut stream, |s| support::list_items(s).contains(&5)).await;
    assert_eq!(support::list_queries(&settled), vec![3, 4, 5]);
}

#[tokio::test]
async fn an_unchanged_comparator_identity_is_not_required_to_resend_an_order_change() {
    let cmp = support::ascending();
    let (handle, mut stream) = support::engine_with(pages(0..=2), Order::PivotSorted(cmp.clone()), Limiter::unbounded(tiler::OutputShape::List));

    support::send(&handle, Input::on(1));
    support::wait_for(&mut stream, |s| support::list_items(s).contains(&1)).await;

    // Resending an `OrderChange` (even with the very same comparator) always folds through the
    // engine itself: the `Arc`-identity dedup in pivot.rs is a `PivotDriver` concern, not
    // something `OrderChange` enforces on its own.
    support::send(&handle, Input::OrderChange(Order::PivotSorted(cmp)));
    let settled = support::wait_for(&mut stream, |s| support::list_items(s).contains(&1)).await;
    assert_eq!(support::list_queries(&settled), vec![1]);
}
