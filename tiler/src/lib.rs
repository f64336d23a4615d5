// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! A reactive tiling pagination engine.
//!
//! The engine turns a stream of [`Input`] control values (on/off/evict a query, change the
//! ordering policy, change the limiter) into a stream of [`Snapshot`]s: a coherent,
//! query-tagged view of whatever a family of per-query producers most recently emitted.
//!
//! The moving parts, leaves first:
//!
//! - [`tiled_list`] — the output data structure, a sequence of contiguous per-query ranges.
//! - [`valve`] — owns one query's producer subscription lifecycle.
//! - [`multiplexer`] — routes inputs to valves, creating them lazily.
//! - [`tiler`] — folds valve/multiplexer output into [`state::QueryState`].
//! - [`assembler`] — materializes that state into a [`Snapshot`] under the active order/limiter.
//! - [`engine`] — wires the above into a single `Stream<Item = Result<Snapshot<Q, I>>>`.
//! - [`pivot`] — the canonical driver that turns "current query" signals into engine inputs.
//! - [`cursor`] — adapts cursor/token-based pagination to the engine's producer contract.

// Warnings are errors when building on CI.
#![cfg_attr(not(debug_assertions), deny(warnings))]

mod assembler;
mod error;
mod input;
mod multiplexer;
mod order;
mod output;
mod snapshot;
mod state;
mod tile;
mod tiler;
mod valve;

pub mod cursor;
pub mod engine;
pub mod limiter;
pub mod pivot;
pub mod tiled_list;

pub(crate) use error::Result;
pub use error::{Error, ErrorKind};

pub use engine::{Engine, EngineConfig, EngineHandle, ProducerFactory};
pub use input::{Input, Request};
pub use limiter::{Limiter, OutputShape};
pub use order::{Comparator, Order, OrderMetadata};
pub use snapshot::{OrderedMap, Snapshot};
pub use tile::Tile;
pub use tiled_list::{TiledList, TiledListBuilder};
