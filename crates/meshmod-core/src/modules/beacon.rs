//! Beacon module
//!
//! Periodically broadcasts a small configurable payload to every
//! reachable node, best-effort. Beacons are one-way presence signals:
//! a received beacon is logged and never answered, so they generate no
//! response traffic however many nodes hear them.

use crate::config::{check_alignment, parse_bool, parse_u32, ConfigError, ConfigHeader};
use crate::module::{Module, ModuleContext};
use crate::packet::{ActionPacket, MessageType, ModuleId, NodeId};
use tracing::{debug, info};

/// Stable module id of the beacon module
pub const MODULE_ID: ModuleId = ModuleId::new(2);

const CONFIG_VERSION: u8 = 1;

/// Trigger action opcodes
pub mod trigger {
    /// Periodic presence broadcast carrying the configured payload
    pub const BEACON: u8 = 0;
    /// Toggle verbose debug beaconing on the receiving node
    pub const SET_DEBUG: u8 = 1;
}

/// Longest beacon payload the config record can hold
pub const MAX_BEACON_PAYLOAD: usize = 12;

/// Beacon configuration record, 24 bytes packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeaconConfig {
    /// Common header
    pub header: ConfigHeader,
    /// Broadcast every N ms, 0 disables
    pub interval_ms: u32,
    /// Bytes broadcast in each beacon
    pub payload: Vec<u8>,
}

impl BeaconConfig {
    /// Serialized record length (multiple of 4)
    pub const LEN: usize = 24;

    fn defaults() -> Self {
        Self {
            header: ConfigHeader::new(MODULE_ID, CONFIG_VERSION),
            interval_ms: 0,
            payload: Vec::new(),
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.interval_ms.to_le_bytes());
        bytes.push(self.payload.len() as u8);
        bytes.extend_from_slice(&[0; 3]);
        let mut buf = [0u8; MAX_BEACON_PAYLOAD];
        buf[..self.payload.len()].copy_from_slice(&self.payload);
        bytes.extend_from_slice(&buf);
        bytes
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let header = ConfigHeader::from_bytes(bytes)?;
        if header.module_version != CONFIG_VERSION {
            return Err(ConfigError::UnknownVersion(header.module_version));
        }
        if bytes.len() != Self::LEN {
            return Err(ConfigError::WrongLength {
                got: bytes.len(),
                expected: Self::LEN,
            });
        }
        let len = usize::min(bytes[8] as usize, MAX_BEACON_PAYLOAD);
        Ok(Self {
            header,
            interval_ms: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            payload: bytes[12..12 + len].to_vec(),
        })
    }
}

/// The beacon broadcaster
#[derive(Debug)]
pub struct BeaconModule {
    config: BeaconConfig,
    last_beacon_ms: u32,
    /// Verbose logging of sent and received beacons
    debug_beaconing: bool,
}

impl BeaconModule {
    /// Create the module with default configuration (boot replaces it)
    pub fn new() -> Self {
        Self {
            config: BeaconConfig::defaults(),
            last_beacon_ms: 0,
            debug_beaconing: false,
        }
    }

    /// Current configuration (read-only)
    pub fn config(&self) -> &BeaconConfig {
        &self.config
    }

    fn send_beacon(&self, ctx: &mut ModuleContext<'_>) {
        // Payload is bounded well under the frame limit by the config
        // record layout
        if let Ok(packet) =
            ActionPacket::trigger(ctx.node.node_id, NodeId::BROADCAST, MODULE_ID, trigger::BEACON)
                .with_payload(&self.config.payload)
        {
            ctx.send_packet(&packet, false);
            if self.debug_beaconing {
                info!(len = self.config.payload.len(), "beacon sent");
            }
        }
    }
}

impl Default for BeaconModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for BeaconModule {
    fn module_id(&self) -> ModuleId {
        MODULE_ID
    }

    fn name(&self) -> &'static str {
        "beacon"
    }

    fn is_active(&self) -> bool {
        self.config.header.module_active
    }

    fn reset_to_defaults(&mut self) {
        self.config = BeaconConfig::defaults();
        self.last_beacon_ms = 0;
    }

    fn config_bytes(&self) -> Vec<u8> {
        let bytes = self.config.to_bytes();
        debug_assert!(check_alignment(&bytes).is_ok());
        bytes
    }

    fn apply_config(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.config = BeaconConfig::from_bytes(bytes)?;
        Ok(())
    }

    fn timer_tick(&mut self, ctx: &mut ModuleContext<'_>, _elapsed_ms: u32, now_ms: u32) {
        if !self.is_active() || self.config.interval_ms == 0 {
            return;
        }
        if now_ms.wrapping_sub(self.last_beacon_ms) > self.config.interval_ms {
            self.send_beacon(ctx);
            self.last_beacon_ms = now_ms;
        }
    }

    fn packet_received(&mut self, _ctx: &mut ModuleContext<'_>, packet: &ActionPacket) -> bool {
        if !packet.is_for_module(MODULE_ID)
            || !self.is_active()
            || packet.message_type != MessageType::TriggerAction
        {
            return false;
        }
        match packet.action_type {
            trigger::BEACON => {
                if self.debug_beaconing {
                    info!(from = %packet.sender, len = packet.payload().len(), "beacon received");
                } else {
                    debug!(from = %packet.sender, "beacon received");
                }
                true
            }
            trigger::SET_DEBUG => {
                self.debug_beaconing = !self.debug_beaconing;
                info!(enabled = self.debug_beaconing, "debug beaconing toggled");
                true
            }
            _ => false,
        }
    }

    fn command(&mut self, ctx: &mut ModuleContext<'_>, name: &str, args: &[&str]) -> bool {
        if name != "action" || args.len() < 3 || args[1] != self.name() {
            return false;
        }
        let destination = if args[0] == "this" {
            ctx.node.node_id
        } else {
            match args[0].parse::<u16>() {
                Ok(raw) => NodeId::new(raw),
                Err(_) => return false,
            }
        };
        match args[2] {
            "broadcast_debug" => {
                let packet = ActionPacket::trigger(
                    ctx.node.node_id,
                    destination,
                    MODULE_ID,
                    trigger::SET_DEBUG,
                );
                ctx.send_packet(&packet, true);
                true
            }
            _ => false,
        }
    }

    fn config_get(&self, key: &str) -> Option<String> {
        match key {
            "interval_ms" => Some(self.config.interval_ms.to_string()),
            "active" => Some((self.config.header.module_active as u8).to_string()),
            _ => None,
        }
    }

    fn config_set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "interval_ms" => {
                self.config.interval_ms = parse_u32(key, value)?;
                Ok(())
            }
            "active" => {
                self.config.header.module_active = parse_bool(key, value)?;
                Ok(())
            }
            _ => Err(ConfigError::UnknownField(key.to_string())),
        }
    }
}
