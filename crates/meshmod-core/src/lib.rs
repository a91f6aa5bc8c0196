//! # Mesh Module Core
//!
//! This crate provides the module layer of a mesh firmware: small
//! self-contained functional units ("modules") that talk to their
//! counterparts on other nodes through typed action packets, keep a
//! versioned configuration record in persistent storage, and react to
//! timer ticks and radio events on a single cooperative execution
//! context.
//!
//! ## Overview
//!
//! - **Packets**: fixed little-endian wire codec for module-to-module
//!   action packets ([`packet`])
//! - **Modules**: the module contract and its dispatch registry
//!   ([`module`], [`registry`])
//! - **Links**: mirror of the radio stack's connection lifecycle plus
//!   per-link signal telemetry ([`link`], [`sampler`])
//! - **Configuration**: packed, versioned, migratable per-module records
//!   ([`config`])
//! - **Node shell**: ties modules, links, and backends together
//!   ([`node`]), with terminal command routing ([`command`])
//! - **Shipped modules**: status reporter and beacon ([`modules`])
//!
//! ## Event Flow
//!
//! ```text
//! radio frames ──► Node::on_frame ──► decode ──► every module, in order
//! radio events ──► Node::radio_event ──► link table ──► every module
//! timer ticks ──► Node::timer_tick ──► every module
//! terminal ──► Node::command ──► module chain ──► config fallback
//! ```
//!
//! ## Example
//!
//! ```rust
//! use meshmod_core::modules::{BeaconModule, StatusModule};
//! use meshmod_core::node::Node;
//! use meshmod_core::packet::NodeId;
//! use meshmod_core::transport::{FrameQueue, LoopbackTransport, MemoryStore, NullRadio};
//!
//! let queue = FrameQueue::new();
//! let mut node = Node::new(
//!     NodeId::new(1),
//!     [0x1234, 0x5678],
//!     Box::new(LoopbackTransport::new(queue.clone())),
//!     Box::new(MemoryStore::new()),
//!     Box::new(NullRadio::new()),
//! );
//! node.register_module(Box::new(StatusModule::new()));
//! node.register_module(Box::new(BeaconModule::new()));
//! node.boot();
//!
//! // Ask ourselves for our own status through the loopback
//! node.command("action", &["this", "status", "get_status"]);
//! let (_target, frame) = queue.pop().unwrap();
//! assert!(node.on_frame(&frame));
//! ```

pub mod command;
pub mod config;
pub mod link;
pub mod module;
pub mod modules;
pub mod node;
pub mod packet;
pub mod registry;
pub mod sampler;
pub mod transport;

pub use link::{Link, LinkId, LinkTable};
pub use module::{Module, ModuleContext, NodeState};
pub use node::Node;
pub use packet::{ActionPacket, DecodeError, MessageType, ModuleId, NodeId};
pub use registry::ModuleRegistry;
pub use sampler::SampleAccumulator;
pub use transport::{ConfigStore, RadioControl, RadioEvent, Transport};
