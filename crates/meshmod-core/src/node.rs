//! The node shell
//!
//! Ties the registry, the link table, and the external backends into one
//! unit of firmware: boots the modules against the configuration store,
//! ingests raw frames from the transport, advances the cooperative
//! timer, and mirrors radio lifecycle events into the link table before
//! fanning them out to the modules.
//!
//! Everything here runs on a single logical execution context.
//! Asynchronous radio and timer events arrive as interleaved calls,
//! never as preemptive threads, so handler invocations need no locking
//! but must not block.

use crate::command;
use crate::config::check_alignment;
use crate::link::LinkTable;
use crate::module::{Module, ModuleContext, NodeState};
use crate::packet::{ActionPacket, NodeId};
use crate::registry::ModuleRegistry;
use crate::transport::{ConfigStore, RadioControl, RadioEvent, Transport};
use tracing::{debug, info, warn};

/// One mesh node: modules, links, and backend handles
pub struct Node {
    state: NodeState,
    registry: ModuleRegistry,
    links: LinkTable,
    transport: Box<dyn Transport>,
    store: Box<dyn ConfigStore>,
    radio: Box<dyn RadioControl>,
}

impl Node {
    /// Create a node with the given identity and backends
    ///
    /// Modules are registered afterwards, then [`Node::boot`] loads
    /// their configuration.
    pub fn new(
        node_id: NodeId,
        chip_id: [u32; 2],
        transport: Box<dyn Transport>,
        store: Box<dyn ConfigStore>,
        radio: Box<dyn RadioControl>,
    ) -> Self {
        Self {
            state: NodeState::new(node_id, chip_id),
            registry: ModuleRegistry::new(),
            links: LinkTable::default(),
            transport,
            store,
            radio,
        }
    }

    /// Register a module; registration order is dispatch order and is
    /// fixed for the process lifetime
    pub fn register_module(&mut self, module: Box<dyn Module>) {
        self.registry.register(module);
    }

    /// Load (or default) every module's configuration
    ///
    /// For each module in registration order: fetch the stored record,
    /// apply it (which migrates older versions in place), and on a
    /// missing or unmigratable record fall back to the hard-coded
    /// defaults and persist those. Ends with the `config_loaded` hook.
    pub fn boot(&mut self) {
        let mut ctx = ModuleContext {
            node: &mut self.state,
            links: &mut self.links,
            transport: self.transport.as_mut(),
            radio: self.radio.as_mut(),
        };
        for module in self.registry.iter_mut() {
            let id = module.module_id();
            let restored = match self.store.load(id) {
                Some(bytes) => match module.apply_config(&bytes) {
                    Ok(()) => true,
                    Err(err) => {
                        warn!(module = %id, %err, "stored configuration unusable, resetting");
                        false
                    }
                },
                None => false,
            };
            if !restored {
                module.reset_to_defaults();
                let bytes = module.config_bytes();
                if let Err(err) = check_alignment(&bytes) {
                    warn!(module = %id, %err, "refusing to persist misaligned record");
                } else {
                    self.store.save(id, &bytes);
                }
            }
            module.config_loaded(&mut ctx);
            info!(module = %id, name = module.name(), restored, "module configured");
        }
    }

    /// Ingest one raw frame from the transport
    ///
    /// A frame that fails to decode is dropped here with a log line -
    /// fatal to that frame only, no retry. Returns whether any module
    /// handled the decoded packet.
    pub fn on_frame(&mut self, frame: &[u8]) -> bool {
        let packet = match ActionPacket::from_bytes(frame) {
            Ok(packet) => packet,
            Err(err) => {
                debug!(%err, len = frame.len(), "dropping undecodable frame");
                return false;
            }
        };
        self.dispatch(&packet)
    }

    /// Offer a decoded packet to every module in registration order
    pub fn dispatch(&mut self, packet: &ActionPacket) -> bool {
        let mut ctx = ModuleContext {
            node: &mut self.state,
            links: &mut self.links,
            transport: self.transport.as_mut(),
            radio: self.radio.as_mut(),
        };
        self.registry.dispatch_packet(&mut ctx, packet)
    }

    /// Advance the application timer and poll every module
    pub fn timer_tick(&mut self, elapsed_ms: u32) {
        self.state.app_timer_ms = self.state.app_timer_ms.wrapping_add(elapsed_ms);
        let now_ms = self.state.app_timer_ms;
        let mut ctx = ModuleContext {
            node: &mut self.state,
            links: &mut self.links,
            transport: self.transport.as_mut(),
            radio: self.radio.as_mut(),
        };
        self.registry.dispatch_tick(&mut ctx, elapsed_ms, now_ms);
    }

    /// Process one asynchronous radio event
    ///
    /// Link lifecycle is mirrored into the link table first (the
    /// accumulator is created at link-up and destroyed at teardown),
    /// then the event fans out to the modules.
    pub fn radio_event(&mut self, event: RadioEvent) {
        let lifecycle_link = match event {
            RadioEvent::Connected { link, partner } => {
                if !self.links.connect(link, partner) {
                    warn!(?link, %partner, "link table full, ignoring connection");
                    return;
                }
                Some(link)
            }
            RadioEvent::HandshakeComplete { link } => {
                match self.links.get_mut(link) {
                    Some(l) => l.handshake_done = true,
                    None => {
                        warn!(?link, "handshake for unknown link");
                        return;
                    }
                }
                Some(link)
            }
            RadioEvent::Disconnected { link } => {
                self.links.disconnect(link);
                Some(link)
            }
            RadioEvent::SignalSample { .. } => None,
        };

        let mut ctx = ModuleContext {
            node: &mut self.state,
            links: &mut self.links,
            transport: self.transport.as_mut(),
            radio: self.radio.as_mut(),
        };
        self.registry.dispatch_radio_event(&mut ctx, &event);
        if let Some(link) = lifecycle_link {
            self.registry.dispatch_link_changed(&mut ctx, link);
        }
    }

    /// Route one parsed terminal command
    ///
    /// Returns `false` when nothing claimed it; the caller reports that
    /// to the user.
    pub fn command(&mut self, name: &str, args: &[&str]) -> bool {
        let mut ctx = ModuleContext {
            node: &mut self.state,
            links: &mut self.links,
            transport: self.transport.as_mut(),
            radio: self.radio.as_mut(),
        };
        command::route(&mut self.registry, &mut ctx, name, args)
    }

    /// Node-wide state
    pub fn state(&self) -> &NodeState {
        &self.state
    }

    /// Active links
    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    /// Registered modules
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }
}

impl std::fmt::Debug for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Node")
            .field("node_id", &self.state.node_id)
            .field("modules", &self.registry)
            .field("links", &self.links.len())
            .finish()
    }
}
