use std::hash::Hash;

use futures::Stream;
use tokio::sync::mpsc;

use crate::{
    assembler,
    input::Input,
    limiter::{Limiter, OutputShape},
    multiplexer::Multiplexer,
    order::Order,
    output::Output,
    snapshot::Snapshot,
    tiler::Tiler,
    ErrorKind, Result,
};

pub use crate::valve::ProducerFactory;

/// The engine's fixed configuration: how to produce items for a query, the initial ordering and
/// limiting policy, and their shape compatibility.
///
/// Validated eagerly at construction: a config that can't produce a coherent output shape fails
/// immediately instead of surfacing as a confusing runtime error on the first emission.
pub struct EngineConfig<Q, I> {
    order: Order<Q, I>,
    limiter: Limiter<Q, I>,
    producer: ProducerFactory<Q, I>,
}

impl<Q, I> EngineConfig<Q, I> {
    pub fn new(order: Order<Q, I>, limiter: Limiter<Q, I>, producer: ProducerFactory<Q, I>) -> Result<Self> {
        validate_shape_compatibility(&order, &limiter)?;
        Ok(Self { order, limiter, producer })
    }

    /// Replaces the limiter, re-validating shape compatibility with the current order.
    pub fn with_limiter(mut self, limiter: Limiter<Q, I>) -> Result<Self> {
        validate_shape_compatibility(&self.order, &limiter)?;
        self.limiter = limiter;
        Ok(self)
    }
}

fn validate_shape_compatibility<Q, I>(order: &Order<Q, I>, limiter: &Limiter<Q, I>) -> Result<()> {
    let required = match order {
        Order::CustomList(..) => Some(OutputShape::List),
        Order::CustomMap(..) => Some(OutputShape::Map),
        Order::Unspecified | Order::Sorted(_) | Order::PivotSorted(_) => None,
    };
    match required {
        Some(required) if required != limiter.shape() => Err(ErrorKind::ShapeMismatch.with_message(format!(
            "{} order produces a {:?} snapshot, but the limiter is shaped for {:?}",
            order.name(),
            required,
            limiter.shape()
        ))),
        _ => Ok(()),
    }
}

/// The sending half of an [`Engine`]'s input channel. Cheaply cloned; every clone feeds the same
/// running engine.
pub struct EngineHandle<Q, I> {
    inputs: mpsc::UnboundedSender<Input<Q, I>>,
}

impl<Q, I> EngineHandle<Q, I> {
    /// Enqueues an input for the engine to fold in. Fails with
    /// [`ErrorKind::EngineStopped`](crate::ErrorKind::EngineStopped) once the engine's `run`
    /// stream has been dropped.
    pub fn send(&self, input: Input<Q, I>) -> Result<()> {
        self.inputs
            .send(input)
            .map_err(|_| ErrorKind::EngineStopped.with_message("the engine has stopped accepting input"))
    }
}

impl<Q, I> Clone for EngineHandle<Q, I> {
    fn clone(&self) -> Self {
        Self {
            inputs: self.inputs.clone(),
        }
    }
}

/// Owns the multiplexer and tiler for one tiling session. Consumed by [`Engine::run`] to produce
/// the actual snapshot stream.
pub struct Engine<Q, I> {
    multiplexer: Multiplexer<Q, I>,
    tiler: Tiler<Q, I>,
    events_rx: mpsc::UnboundedReceiver<Output<Q, I>>,
    inputs_rx: mpsc::UnboundedReceiver<Input<Q, I>>,
}

impl<Q, I> Engine<Q, I>
where
    Q: Clone + Eq + Hash + Send + Sync + 'static,
    I: Clone + Send + 'static,
{
    pub fn new(config: EngineConfig<Q, I>) -> (EngineHandle<Q, I>, Self) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (inputs_tx, inputs_rx) = mpsc::unbounded_channel();

        let multiplexer = Multiplexer::new(config.producer, events_tx);
        let tiler = Tiler::new(config.order, config.limiter);

        (
            EngineHandle { inputs: inputs_tx },
            Self {
                multiplexer,
                tiler,
                events_rx,
                inputs_rx,
            },
        )
    }

    /// Runs the engine, producing one [`Snapshot`] per emission point (spec §5's single
    /// suspension-point model: inputs and valve events are both awaited from one place, and
    /// nothing else runs concurrently with the fold itself).
    ///
    /// The stream ends once every [`EngineHandle`] has been dropped and all valves have drained,
    /// or immediately after a fatal error (anything other than
    /// [`ErrorKind::IndexOutOfBounds`](crate::ErrorKind::IndexOutOfBounds), which this path never
    /// produces).
    pub fn run(self) -> impl Stream<Item = Result<Snapshot<Q, I>>> {
        let state = RunState {
            multiplexer: self.multiplexer,
            tiler: self.tiler,
            events_rx: self.events_rx,
            inputs_rx: self.inputs_rx,
            stopped: false,
        };

        futures::stream::unfold(state, |mut state| async move {
            if state.stopped {
                return None;
            }

            loop {
                tokio::select! {
                    biased;

                    input = state.inputs_rx.recv() => {
                        match input {
                            Some(input) => state.multiplexer.dispatch(input),
                            None => {
                                state.stopped = true;
                                return None;
                            }
                        }
                    }

                    event = state.events_rx.recv() => {
                        match event {
                            Some(event) => {
                                let evicted = match &event {
                                    Output::Eviction(q) => Some(q.clone()),
                                    _ => None,
                                };
                                match state.tiler.apply(event) {
                                    Ok(should_emit) => {
                                        if let Some(q) = evicted {
                                            state.multiplexer.remove(&q);
                                        }
                                        if should_emit {
                                            let snapshot = assembler::assemble(state.tiler.state());
                                            return Some((snapshot, state));
                                        }
                                    }
                                    Err(err) => {
                                        state.stopped = true;
                                        return Some((Err(err), state));
                                    }
                                }
                            }
                            None => {
                                state.stopped = true;
                                return None;
                            }
                        }
                    }
                }
            }
        })
    }
}

struct RunState<Q, I> {
    multiplexer: Multiplexer<Q, I>,
    tiler: Tiler<Q, I>,
    events_rx: mpsc::UnboundedReceiver<Output<Q, I>>,
    inputs_rx: mpsc::UnboundedReceiver<Input<Q, I>>,
    stopped: bool,
}
