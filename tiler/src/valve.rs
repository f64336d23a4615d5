use std::{sync::Arc, time::Instant};

use futures::{stream::BoxStream, StreamExt};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::{input::Request, output::Output, tile::Tile, Result};

/// Creates the stream a [`Valve`] drains while it's `On`, given the query it was turned on for.
///
/// Produced by [`EngineConfig`](crate::engine::EngineConfig); called once per `Off` → `On`
/// transition.
pub type ProducerFactory<Q, I> = Arc<dyn Fn(&Q) -> BoxStream<'static, Result<I>> + Send + Sync>;

enum ValveState {
    Off,
    On { flow_on_at: Instant },
    Terminated,
}

/// A handle to a query's spawned valve task.
///
/// Dropping the handle aborts the task: the multiplexer only ever drops a handle after routing
/// an `Evict` to it and observing the resulting `Eviction` event, so in normal operation the
/// abort is a no-op against an already-finished task.
pub(crate) struct ValveHandle<Q> {
    requests: mpsc::UnboundedSender<Request<Q>>,
    task: JoinHandle<()>,
}

impl<Q> ValveHandle<Q>
where
    Q: Clone + Send + Sync + 'static,
{
    pub(crate) fn spawn<I>(query: Q, producer: ProducerFactory<Q, I>, events: mpsc::UnboundedSender<Output<Q, I>>) -> Self
    where
        I: Send + 'static,
    {
        let (requests, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(run(query, producer, rx, events));
        Self { requests, task }
    }

    /// Routes a request to this query's valve. Silently dropped if the valve already
    /// terminated; the multiplexer learns of termination from the `Eviction` event instead.
    pub(crate) fn send(&self, request: Request<Q>) {
        let _ = self.requests.send(request);
    }
}

impl<Q> Drop for ValveHandle<Q> {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// Drives a single query's `Off` → `On` → `Off` → ... → `Terminated` lifecycle (spec §4.2).
///
/// Runs as its own task so a slow or stalled producer for one query never blocks the fold loop
/// or any other query's producer; the only shared state it touches is the `events` channel.
#[tracing::instrument(level = "debug", skip_all)]
async fn run<Q, I>(query: Q, producer: ProducerFactory<Q, I>, mut requests: mpsc::UnboundedReceiver<Request<Q>>, events: mpsc::UnboundedSender<Output<Q, I>>)
where
    Q: Clone,
{
    let mut state = ValveState::Off;
    let mut stream: Option<BoxStream<'static, Result<I>>> = None;

    loop {
        if matches!(state, ValveState::Terminated) {
            return;
        }

        let next_item = async {
            match &mut stream {
                Some(s) => s.next().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            biased;

            request = requests.recv() => {
                match request {
                    Some(Request::On(_)) => {
                        if matches!(state, ValveState::Off) {
                            tracing::trace!("valve turning on");
                            state = ValveState::On { flow_on_at: Instant::now() };
                            stream = Some(producer(&query));
                            if events.send(Output::TurnedOn(query.clone())).is_err() {
                                return;
                            }
                        }
                    }
                    Some(Request::Off(_)) => {
                        tracing::trace!("valve turning off");
                        stream = None;
                        state = ValveState::Off;
                    }
                    Some(Request::Evict(_)) => {
                        tracing::debug!("valve evicted");
                        state = ValveState::Terminated;
                        let _ = events.send(Output::Eviction(query.clone()));
                        return;
                    }
                    None => {
                        // The multiplexer dropped its handle to us without routing an `Evict`
                        // first (e.g. the whole engine is shutting down). Terminate quietly.
                        return;
                    }
                }
            }

            item = next_item, if stream.is_some() => {
                let ValveState::On { flow_on_at } = state else {
                    unreachable!("stream is only populated while the valve is On");
                };
                match item {
                    Some(Ok(item)) => {
                        if events.send(Output::Data(query.clone(), Tile::new(flow_on_at, item))).is_err() {
                            return;
                        }
                    }
                    Some(Err(err)) => {
                        tracing::warn!(error = %err, "producer failed, evicting query");
                        stream = None;
                        state = ValveState::Terminated;
                        let _ = events.send(Output::ValveError(query.clone(), err));
                        let _ = events.send(Output::Eviction(query.clone()));
                        return;
                    }
                    None => {
                        // The producer's stream ended on its own. The valve stays On (a fresh
                        // `On` request is what would restart production); its last tile is
                        // retained as-is.
                        stream = None;
                    }
                }
            }
        }
    }
}
