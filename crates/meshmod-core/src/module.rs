//! The module contract
//!
//! A module is a self-contained functional unit with a stable id, a
//! human-readable name, a versioned configuration record, and a set of
//! event handlers. Modules are constructed once at boot, registered in
//! a fixed order, and live for the process lifetime.
//!
//! Dispatch is broadcast-to-all with self-filtering: every module sees
//! every inbound packet and every text command, and decides locally
//! whether it applies (for packets, by comparing `packet.module_id`
//! against its own id; for commands, by matching its name in the
//! argument list). Handlers run on the single cooperative execution
//! context and must never block; any packet they emit is fire-and-forget
//! through the transport.

use crate::config::ConfigError;
use crate::link::{LinkId, LinkTable};
use crate::packet::{ActionPacket, ModuleId, NodeId};
use crate::transport::{RadioControl, RadioEvent, Transport};
use tracing::warn;

/// Node-wide state shared with module handlers
#[derive(Debug, Clone)]
pub struct NodeState {
    /// This node's mesh address
    pub node_id: NodeId,
    /// Hardware chip identifier pair, reported in status answers
    pub chip_id: [u32; 2],
    /// Application timer, milliseconds since boot
    pub app_timer_ms: u32,
    /// LED forced on by a remote SET_LED action
    pub led_on: bool,
}

impl NodeState {
    /// Create boot-time state for a node
    pub fn new(node_id: NodeId, chip_id: [u32; 2]) -> Self {
        Self {
            node_id,
            chip_id,
            app_timer_ms: 0,
            led_on: false,
        }
    }
}

/// Everything a module handler may touch besides its own state
///
/// Borrowed for the duration of one handler invocation; the cooperative
/// execution model guarantees no other handler runs concurrently.
pub struct ModuleContext<'a> {
    /// Node-wide state
    pub node: &'a mut NodeState,
    /// Active radio links and their telemetry accumulators
    pub links: &'a mut LinkTable,
    /// Outbound frame interface
    pub transport: &'a mut dyn Transport,
    /// Per-link sampling control in the radio stack
    pub radio: &'a mut dyn RadioControl,
}

impl ModuleContext<'_> {
    /// Encode and send an action packet, fire-and-forget
    ///
    /// A transport refusal is logged and otherwise ignored; this core
    /// never retries sends.
    pub fn send_packet(&mut self, packet: &ActionPacket, reliable: bool) -> bool {
        let ok = self
            .transport
            .send(packet.receiver, &packet.to_bytes(), reliable);
        if !ok {
            warn!(
                receiver = %packet.receiver,
                module = %packet.module_id,
                action = packet.action_type,
                "transport refused frame"
            );
        }
        ok
    }
}

/// The capability set every module implements
///
/// All handlers default to no-ops so a module only spells out what it
/// reacts to. Implementations must stay total over malformed input: an
/// unknown action type within the module's own id is ignored, never an
/// error.
pub trait Module {
    /// Stable module type identifier (wire discriminator + config key)
    fn module_id(&self) -> ModuleId;

    /// Human-readable name used for text-command matching only
    fn name(&self) -> &'static str;

    /// Whether the module currently participates in the mesh
    fn is_active(&self) -> bool;

    /// Repopulate the configuration record with hard-coded defaults
    ///
    /// Called on first boot and when a stored record cannot be
    /// migrated.
    fn reset_to_defaults(&mut self);

    /// Serialize the configuration record for the store
    ///
    /// The result length must be a multiple of 4.
    fn config_bytes(&self) -> Vec<u8>;

    /// Apply a stored configuration record
    ///
    /// Branches on the stored version tag: the current version parses
    /// directly, older known versions are migrated in place, anything
    /// else fails with [`ConfigError::UnknownVersion`] and the caller
    /// falls back to [`Module::reset_to_defaults`].
    fn apply_config(&mut self, bytes: &[u8]) -> Result<(), ConfigError>;

    /// Configuration bytes are available (freshly defaulted or restored)
    ///
    /// Must tolerate a freshly zero-initialized or partially-migrated
    /// record without crashing.
    fn config_loaded(&mut self, _ctx: &mut ModuleContext<'_>) {}

    /// Periodic global clock tick (cooperative polling, no per-module timers)
    fn timer_tick(&mut self, _ctx: &mut ModuleContext<'_>, _elapsed_ms: u32, _now_ms: u32) {}

    /// One inbound action packet, regardless of its module id
    ///
    /// The module must itself test `packet.module_id` and silently
    /// ignore packets addressed elsewhere. Returns whether the packet
    /// was handled.
    fn packet_received(&mut self, _ctx: &mut ModuleContext<'_>, _packet: &ActionPacket) -> bool {
        false
    }

    /// One parsed text command, regardless of addressing
    ///
    /// Module-scoped commands match when `args[1]` equals the module
    /// name; `args[2..]` select the subcommand. Return `false` to let
    /// the generic configuration fallback run.
    fn command(&mut self, _ctx: &mut ModuleContext<'_>, _name: &str, _args: &[&str]) -> bool {
        false
    }

    /// A link finished connecting, completed its handshake, or went down
    fn link_changed(&mut self, _ctx: &mut ModuleContext<'_>, _link: LinkId) {}

    /// Raw asynchronous radio event, including signal samples
    fn radio_event(&mut self, _ctx: &mut ModuleContext<'_>, _event: &RadioEvent) {}

    /// Read a named configuration field as text (generic accessor)
    fn config_get(&self, _key: &str) -> Option<String> {
        None
    }

    /// Write a named configuration field from text (generic accessor)
    fn config_set(&mut self, key: &str, _value: &str) -> Result<(), ConfigError> {
        Err(ConfigError::UnknownField(key.to_string()))
    }
}
