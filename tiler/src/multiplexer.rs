use std::{collections::HashMap, hash::Hash};

use tokio::sync::mpsc;

use crate::{
    input::{Input, Request},
    output::Output,
    valve::{ProducerFactory, ValveHandle},
};

/// Fans requests out to per-query [`Valve`](crate::valve::Valve) tasks and funnels their events
/// (plus directly-forwarded order/limiter changes) into one channel for the
/// [`Tiler`](crate::tiler::Tiler) to fold.
///
/// Valves are created lazily: a query has no valve, and consumes no resources, until its first
/// `On`.
pub(crate) struct Multiplexer<Q, I> {
    valves: HashMap<Q, ValveHandle<Q>>,
    producer: ProducerFactory<Q, I>,
    events: mpsc::UnboundedSender<Output<Q, I>>,
}

impl<Q, I> Multiplexer<Q, I>
where
    Q: Clone + Eq + Hash + Send + Sync + 'static,
    I: Send + 'static,
{
    pub(crate) fn new(producer: ProducerFactory<Q, I>, events: mpsc::UnboundedSender<Output<Q, I>>) -> Self {
        Self {
            valves: HashMap::new(),
            producer,
            events,
        }
    }

    /// Applies one input, recursing through `Batch`. `OrderChange`/`LimiterChange` are forwarded
    /// directly onto the events channel rather than routed through any valve.
    pub(crate) fn dispatch(&mut self, input: Input<Q, I>) {
        match input {
            Input::Request(request) => self.dispatch_request(request),
            Input::OrderChange(order) => {
                let _ = self.events.send(Output::OrderChange(order));
            }
            Input::LimiterChange(limiter) => {
                let _ = self.events.send(Output::LimiterChange(limiter));
            }
            Input::Batch(inputs) => {
                for input in inputs {
                    self.dispatch(input);
                }
            }
        }
    }

    fn dispatch_request(&mut self, request: Request<Q>) {
        match &request {
            Request::On(query) => {
                let handle = self
                    .valves
                    .entry(query.clone())
                    .or_insert_with(|| ValveHandle::spawn(query.clone(), self.producer.clone(), self.events.clone()));
                handle.send(request);
            }
            Request::Off(query) | Request::Evict(query) => {
                if let Some(handle) = self.valves.get(query) {
                    handle.send(request);
                }
            }
        }
    }

    /// Drops the valve handle for `query`, aborting its task if it hasn't already exited on its
    /// own. Called once the fold loop has observed the valve's `Eviction` event.
    pub(crate) fn remove(&mut self, query: &Q) {
        self.valves.remove(query);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use std::sync::Arc;

    fn counting_producer() -> ProducerFactory<&'static str, i32> {
        Arc::new(|_q| Box::pin(stream::iter(vec![Ok(1), Ok(2)])))
    }

    #[tokio::test]
    async fn on_spawns_exactly_one_valve_per_query() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut mux = Multiplexer::new(counting_producer(), tx);

        mux.dispatch(Input::on("a"));
        mux.dispatch(Input::on("a"));
        assert_eq!(mux.valves.len(), 1);

        let mut saw_turned_on = false;
        let mut data_count = 0;
        for _ in 0..3 {
            match rx.recv().await.unwrap() {
                Output::TurnedOn(q) => {
                    assert_eq!(q, "a");
                    saw_turned_on = true;
                }
                Output::Data(q, _) => {
                    assert_eq!(q, "a");
                    data_count += 1;
                }
                other => panic!("unexpected output: {other:?}"),
            }
        }
        assert!(saw_turned_on);
        assert_eq!(data_count, 2);
    }

    #[tokio::test]
    async fn evict_removes_the_valve_after_its_eviction_event() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut mux = Multiplexer::new(counting_producer(), tx);
        mux.dispatch(Input::on("a"));
        mux.dispatch(Input::evict("a"));

        loop {
            match rx.recv().await.unwrap() {
                Output::Eviction(q) => {
                    assert_eq!(q, "a");
                    mux.remove(&q);
                    break;
                }
                _ => continue,
            }
        }
        assert!(mux.valves.is_empty());
    }
}
