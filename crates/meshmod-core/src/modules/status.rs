//! Status reporter module
//!
//! Answers status and connection queries from other nodes, periodically
//! broadcasts the same reports on configurable intervals, and drives the
//! per-link signal-strength measurement whose averages the connection
//! report carries.
//!
//! Action namespace (module id 5):
//!
//! | trigger         | value | response      | value |
//! |-----------------|-------|---------------|-------|
//! | `SET_LED`       | 0     |               |       |
//! | `GET_STATUS`    | 1     | `STATUS`      | 1     |
//! | `GET_CONNECTIONS` | 2   | `CONNECTIONS` | 2     |
//!
//! Responses received from other nodes are emitted as structured JSON
//! log lines for the terminal surface.

use crate::config::{check_alignment, parse_bool, parse_u32, ConfigError, ConfigHeader};
use crate::link::{LinkId, MAX_LINKS};
use crate::module::{Module, ModuleContext};
use crate::packet::{ActionPacket, MessageType, ModuleId, NodeId};
use crate::transport::RadioEvent;
use tracing::{debug, info};

/// Stable module id of the status reporter
pub const MODULE_ID: ModuleId = ModuleId::new(5);

/// Current configuration record version
const CONFIG_VERSION: u8 = 2;

/// Trigger action opcodes (meaningful only within this module)
pub mod trigger {
    pub const SET_LED: u8 = 0;
    pub const GET_STATUS: u8 = 1;
    pub const GET_CONNECTIONS: u8 = 2;
}

/// Response action opcodes
pub mod response {
    pub const STATUS: u8 = 1;
    pub const CONNECTIONS: u8 = 2;
}

/// How aggressively to sample link signal strength
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SamplingMode {
    /// Never sample
    Off = 0,
    /// Reserved for timer-driven duty cycling
    Low = 1,
    /// Reserved for timer-driven duty cycling
    Medium = 2,
    /// Sample continuously from handshake completion
    High = 3,
}

impl SamplingMode {
    fn from_byte(byte: u8) -> Self {
        match byte {
            1 => SamplingMode::Low,
            2 => SamplingMode::Medium,
            3 => SamplingMode::High,
            _ => SamplingMode::Off,
        }
    }
}

/// Status reporter configuration record, 16 bytes packed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusConfig {
    /// Common header
    pub header: ConfigHeader,
    /// Broadcast a status report every N ms, 0 disables
    pub status_interval_ms: u32,
    /// Broadcast a connection report every N ms, 0 disables
    pub connection_interval_ms: u32,
    /// Link signal sampling behavior
    pub sampling_mode: SamplingMode,
}

impl StatusConfig {
    /// Serialized record length (multiple of 4)
    pub const LEN: usize = 16;

    /// Serialized record length of the retired v1 layout
    const LEN_V1: usize = 8;

    fn defaults() -> Self {
        Self {
            header: ConfigHeader::new(MODULE_ID, CONFIG_VERSION),
            status_interval_ms: 0,
            connection_interval_ms: 30_000,
            sampling_mode: SamplingMode::High,
        }
    }

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.extend_from_slice(&self.header.to_bytes());
        bytes.extend_from_slice(&self.status_interval_ms.to_le_bytes());
        bytes.extend_from_slice(&self.connection_interval_ms.to_le_bytes());
        bytes.push(self.sampling_mode as u8);
        bytes.extend_from_slice(&[0; 3]);
        bytes
    }

    /// Parse a stored record, migrating older versions in place
    fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let header = ConfigHeader::from_bytes(bytes)?;
        match header.module_version {
            CONFIG_VERSION => {
                if bytes.len() != Self::LEN {
                    return Err(ConfigError::WrongLength {
                        got: bytes.len(),
                        expected: Self::LEN,
                    });
                }
                Ok(Self {
                    header,
                    status_interval_ms: u32::from_le_bytes([
                        bytes[4], bytes[5], bytes[6], bytes[7],
                    ]),
                    connection_interval_ms: u32::from_le_bytes([
                        bytes[8], bytes[9], bytes[10], bytes[11],
                    ]),
                    sampling_mode: SamplingMode::from_byte(bytes[12]),
                })
            }
            // v1 predates the status interval and the sampling mode;
            // carry the connection interval over, default the rest
            1 => {
                if bytes.len() != Self::LEN_V1 {
                    return Err(ConfigError::WrongLength {
                        got: bytes.len(),
                        expected: Self::LEN_V1,
                    });
                }
                let mut migrated = Self::defaults();
                migrated.header.module_active = header.module_active;
                migrated.connection_interval_ms =
                    u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);
                Ok(migrated)
            }
            other => Err(ConfigError::UnknownVersion(other)),
        }
    }
}

/// Status report payload: chip identifiers and link slot occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusPayload {
    pub chip_id_a: u32,
    pub chip_id_b: u32,
    pub free_slots: u8,
    pub link_count: u8,
}

impl StatusPayload {
    const LEN: usize = 10;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        bytes.extend_from_slice(&self.chip_id_a.to_le_bytes());
        bytes.extend_from_slice(&self.chip_id_b.to_le_bytes());
        bytes.push(self.free_slots);
        bytes.push(self.link_count);
        bytes
    }

    /// Parse a received status payload
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        Some(Self {
            chip_id_a: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            chip_id_b: u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
            free_slots: bytes[8],
            link_count: bytes[9],
        })
    }
}

/// Connection report payload: partner ids and signal averages for the
/// node's fixed link slots (zeroed where no link is up)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionsPayload {
    pub partners: [u16; MAX_LINKS],
    pub rssi: [i8; MAX_LINKS],
}

impl ConnectionsPayload {
    const LEN: usize = MAX_LINKS * 2 + MAX_LINKS;

    fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(Self::LEN);
        for partner in self.partners {
            bytes.extend_from_slice(&partner.to_le_bytes());
        }
        for rssi in self.rssi {
            bytes.push(rssi as u8);
        }
        bytes
    }

    /// Parse a received connection payload
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < Self::LEN {
            return None;
        }
        let mut partners = [0u16; MAX_LINKS];
        let mut rssi = [0i8; MAX_LINKS];
        for (i, partner) in partners.iter_mut().enumerate() {
            *partner = u16::from_le_bytes([bytes[i * 2], bytes[i * 2 + 1]]);
        }
        for (i, value) in rssi.iter_mut().enumerate() {
            *value = bytes[MAX_LINKS * 2 + i] as i8;
        }
        Some(Self { partners, rssi })
    }
}

/// The status reporter
#[derive(Debug)]
pub struct StatusModule {
    config: StatusConfig,
    last_status_ms: u32,
    last_connection_ms: u32,
}

impl StatusModule {
    /// Create the module with default configuration (boot replaces it)
    pub fn new() -> Self {
        Self {
            config: StatusConfig::defaults(),
            last_status_ms: 0,
            last_connection_ms: 0,
        }
    }

    /// Current configuration (read-only)
    pub fn config(&self) -> &StatusConfig {
        &self.config
    }

    fn build_status(ctx: &ModuleContext<'_>) -> StatusPayload {
        StatusPayload {
            chip_id_a: ctx.node.chip_id[0],
            chip_id_b: ctx.node.chip_id[1],
            free_slots: ctx.links.free_slots() as u8,
            link_count: ctx.links.len() as u8,
        }
    }

    fn build_connections(ctx: &ModuleContext<'_>) -> ConnectionsPayload {
        let mut payload = ConnectionsPayload {
            partners: [0; MAX_LINKS],
            rssi: [0; MAX_LINKS],
        };
        for (slot, link) in ctx.links.iter().take(MAX_LINKS).enumerate() {
            payload.partners[slot] = link.partner.to_u16();
            payload.rssi[slot] = link.rssi.average().unwrap_or(0);
        }
        payload
    }

    fn send_status(&self, ctx: &mut ModuleContext<'_>, to: NodeId) {
        // Both report payloads are fixed-size and well under the frame
        // limit, so the overflow arm is unreachable
        let payload = Self::build_status(ctx).to_bytes();
        if let Ok(packet) = ActionPacket::response(ctx.node.node_id, to, MODULE_ID, response::STATUS)
            .with_payload(&payload)
        {
            ctx.send_packet(&packet, true);
        }
    }

    fn send_connections(&self, ctx: &mut ModuleContext<'_>, to: NodeId) {
        let payload = Self::build_connections(ctx).to_bytes();
        if let Ok(packet) =
            ActionPacket::response(ctx.node.node_id, to, MODULE_ID, response::CONNECTIONS)
                .with_payload(&payload)
        {
            ctx.send_packet(&packet, true);
        }
    }

    /// Ask a remote node for its status
    pub fn request_status(&self, ctx: &mut ModuleContext<'_>, target: NodeId) {
        debug!(%target, "requesting status");
        let packet = ActionPacket::trigger(ctx.node.node_id, target, MODULE_ID, trigger::GET_STATUS);
        ctx.send_packet(&packet, true);
    }

    fn start_all_measurements(ctx: &mut ModuleContext<'_>) {
        for link in ctx.links.iter_mut() {
            if link.start_rssi_measurement() {
                ctx.radio.start_signal_sampling(link.id);
                debug!(link = ?link.id, "signal measurement started");
            }
        }
    }

    fn stop_all_measurements(ctx: &mut ModuleContext<'_>) {
        for link in ctx.links.iter_mut() {
            if link.stop_rssi_measurement() {
                ctx.radio.stop_signal_sampling(link.id);
                debug!(link = ?link.id, "signal measurement stopped");
            }
        }
    }

    fn handle_trigger(&mut self, ctx: &mut ModuleContext<'_>, packet: &ActionPacket) -> bool {
        match packet.action_type {
            trigger::SET_LED => {
                let on = packet.payload().first().copied().unwrap_or(0) != 0;
                ctx.node.led_on = on;
                info!(on, "led override");
                true
            }
            trigger::GET_STATUS => {
                self.send_status(ctx, packet.sender);
                true
            }
            trigger::GET_CONNECTIONS => {
                self.send_connections(ctx, packet.sender);
                true
            }
            // Unknown action within our namespace: ignored, not an error
            _ => false,
        }
    }

    fn handle_response(&mut self, packet: &ActionPacket) -> bool {
        match packet.action_type {
            response::STATUS => {
                let Some(status) = StatusPayload::from_bytes(packet.payload()) else {
                    return false;
                };
                let report = serde_json::json!({
                    "module": MODULE_ID.to_u8(),
                    "type": "response",
                    "msg": "status",
                    "node_id": packet.sender.to_u16(),
                    "chip_id_a": status.chip_id_a,
                    "chip_id_b": status.chip_id_b,
                    "free_slots": status.free_slots,
                    "links": status.link_count,
                });
                info!(target: "statusmod", %report, "status report received");
                true
            }
            response::CONNECTIONS => {
                let Some(connections) = ConnectionsPayload::from_bytes(packet.payload()) else {
                    return false;
                };
                let report = serde_json::json!({
                    "module": MODULE_ID.to_u8(),
                    "type": "response",
                    "msg": "connections",
                    "node_id": packet.sender.to_u16(),
                    "partners": connections.partners,
                    "rssi": connections.rssi,
                });
                info!(target: "statusmod", %report, "connection report received");
                true
            }
            _ => false,
        }
    }

    fn parse_destination(ctx: &ModuleContext<'_>, arg: &str) -> Option<NodeId> {
        if arg == "this" {
            return Some(ctx.node.node_id);
        }
        arg.parse::<u16>().ok().map(NodeId::new)
    }
}

impl Default for StatusModule {
    fn default() -> Self {
        Self::new()
    }
}

impl Module for StatusModule {
    fn module_id(&self) -> ModuleId {
        MODULE_ID
    }

    fn name(&self) -> &'static str {
        "status"
    }

    fn is_active(&self) -> bool {
        self.config.header.module_active
    }

    fn reset_to_defaults(&mut self) {
        self.config = StatusConfig::defaults();
        self.last_status_ms = 0;
        self.last_connection_ms = 0;
    }

    fn config_bytes(&self) -> Vec<u8> {
        let bytes = self.config.to_bytes();
        debug_assert!(check_alignment(&bytes).is_ok());
        bytes
    }

    fn apply_config(&mut self, bytes: &[u8]) -> Result<(), ConfigError> {
        self.config = StatusConfig::from_bytes(bytes)?;
        Ok(())
    }

    fn config_loaded(&mut self, _ctx: &mut ModuleContext<'_>) {
        debug!(
            status_interval_ms = self.config.status_interval_ms,
            connection_interval_ms = self.config.connection_interval_ms,
            mode = ?self.config.sampling_mode,
            "status reporter configured"
        );
    }

    fn timer_tick(&mut self, ctx: &mut ModuleContext<'_>, _elapsed_ms: u32, now_ms: u32) {
        if !self.is_active() {
            return;
        }
        if self.config.connection_interval_ms != 0
            && now_ms.wrapping_sub(self.last_connection_ms) > self.config.connection_interval_ms
        {
            self.send_connections(ctx, NodeId::BROADCAST);
            self.last_connection_ms = now_ms;
        }
        if self.config.status_interval_ms != 0
            && now_ms.wrapping_sub(self.last_status_ms) > self.config.status_interval_ms
        {
            self.send_status(ctx, NodeId::BROADCAST);
            self.last_status_ms = now_ms;
        }
    }

    fn packet_received(&mut self, ctx: &mut ModuleContext<'_>, packet: &ActionPacket) -> bool {
        if !packet.is_for_module(MODULE_ID) || !self.is_active() {
            return false;
        }
        match packet.message_type {
            MessageType::TriggerAction => self.handle_trigger(ctx, packet),
            MessageType::ActionResponse => self.handle_response(packet),
        }
    }

    fn command(&mut self, ctx: &mut ModuleContext<'_>, name: &str, args: &[&str]) -> bool {
        // Measurement control applies to every link, not one module-
        // addressed target
        match name {
            "rssistart" => {
                Self::start_all_measurements(ctx);
                return true;
            }
            "rssistop" => {
                Self::stop_all_measurements(ctx);
                return true;
            }
            _ => {}
        }

        if name != "action" || args.len() < 3 || args[1] != self.name() {
            return false;
        }
        let Some(destination) = Self::parse_destination(ctx, args[0]) else {
            return false;
        };
        match args[2] {
            "led" if args.len() == 4 => {
                let on = args[3] == "on";
                if let Ok(packet) = ActionPacket::trigger(
                    ctx.node.node_id,
                    destination,
                    MODULE_ID,
                    trigger::SET_LED,
                )
                .with_payload(&[on as u8])
                {
                    ctx.send_packet(&packet, true);
                }
                true
            }
            "get_status" => {
                self.request_status(ctx, destination);
                true
            }
            "get_connections" => {
                let packet = ActionPacket::trigger(
                    ctx.node.node_id,
                    destination,
                    MODULE_ID,
                    trigger::GET_CONNECTIONS,
                );
                ctx.send_packet(&packet, true);
                true
            }
            _ => false,
        }
    }

    fn link_changed(&mut self, ctx: &mut ModuleContext<'_>, link: LinkId) {
        // Begin measuring as soon as a link can carry traffic
        if self.config.sampling_mode != SamplingMode::High {
            return;
        }
        if let Some(l) = ctx.links.get_mut(link) {
            if l.handshake_done && !l.rssi.is_accumulating() && l.start_rssi_measurement() {
                ctx.radio.start_signal_sampling(link);
                debug!(?link, "signal measurement started on handshake");
            }
        }
    }

    fn radio_event(&mut self, ctx: &mut ModuleContext<'_>, event: &RadioEvent) {
        if let RadioEvent::SignalSample { link, rssi } = event {
            if let Some(l) = ctx.links.get_mut(*link) {
                l.rssi.on_sample(*rssi);
            }
        }
    }

    fn config_get(&self, key: &str) -> Option<String> {
        match key {
            "status_interval_ms" => Some(self.config.status_interval_ms.to_string()),
            "connection_interval_ms" => Some(self.config.connection_interval_ms.to_string()),
            "sampling_mode" => Some((self.config.sampling_mode as u8).to_string()),
            "active" => Some((self.config.header.module_active as u8).to_string()),
            _ => None,
        }
    }

    fn config_set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        match key {
            "status_interval_ms" => {
                self.config.status_interval_ms = parse_u32(key, value)?;
                Ok(())
            }
            "connection_interval_ms" => {
                self.config.connection_interval_ms = parse_u32(key, value)?;
                Ok(())
            }
            "sampling_mode" => {
                let raw = parse_u32(key, value)?;
                if raw > 3 {
                    return Err(ConfigError::BadValue {
                        field: key.to_string(),
                        value: value.to_string(),
                    });
                }
                self.config.sampling_mode = SamplingMode::from_byte(raw as u8);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkTable;
    use crate::module::NodeState;
    use crate::transport::{FrameQueue, LoopbackTransport, NullRadio};

    struct Fixture {
        state: NodeState,
        links: LinkTable,
        transport: LoopbackTransport,
        radio: NullRadio,
        queue: FrameQueue,
    }

    impl Fixture {
        fn new(node_id: u16) -> Self {
            let queue = FrameQueue::new();
            Self {
                state: NodeState::new(NodeId::new(node_id), [0xAAA, 0xBBB]),
                links: LinkTable::default(),
                transport: LoopbackTransport::new(queue.clone()),
                radio: NullRadio::new(),
                queue,
            }
        }

        fn ctx(&mut self) -> ModuleContext<'_> {
            ModuleContext {
                node: &mut self.state,
                links: &mut self.links,
                transport: &mut self.transport,
                radio: &mut self.radio,
            }
        }

        fn sent_packet(&self) -> Option<ActionPacket> {
            self.queue
                .pop()
                .map(|(_, frame)| ActionPacket::from_bytes(&frame).unwrap())
        }
    }

    #[test]
    fn test_config_roundtrip_and_defaults() {
        let config = StatusConfig::defaults();
        let bytes = config.to_bytes();
        assert_eq!(bytes.len(), StatusConfig::LEN);
        assert_eq!(bytes.len() % 4, 0);
        assert_eq!(StatusConfig::from_bytes(&bytes).unwrap(), config);
        assert_eq!(config.connection_interval_ms, 30_000);
        assert_eq!(config.status_interval_ms, 0);
        assert_eq!(config.sampling_mode, SamplingMode::High);
    }

    #[test]
    fn test_config_migrates_v1() {
        // v1 layout: header + connection interval only
        let mut v1 = Vec::new();
        v1.extend_from_slice(&[MODULE_ID.to_u8(), 1, 1, 0]);
        v1.extend_from_slice(&60_000u32.to_le_bytes());

        let migrated = StatusConfig::from_bytes(&v1).unwrap();
        assert_eq!(migrated.header.module_version, CONFIG_VERSION);
        assert_eq!(migrated.connection_interval_ms, 60_000);
        // New fields take defaults
        assert_eq!(migrated.status_interval_ms, 0);
        assert_eq!(migrated.sampling_mode, SamplingMode::High);
    }

    #[test]
    fn test_config_unknown_version_rejected() {
        let mut record = StatusConfig::defaults().to_bytes();
        record[1] = 99;
        assert_eq!(
            StatusConfig::from_bytes(&record),
            Err(ConfigError::UnknownVersion(99))
        );
    }

    #[test]
    fn test_get_status_answers_the_sender() {
        let mut fx = Fixture::new(12);
        fx.links.connect(LinkId(1), NodeId::new(5));
        let mut module = StatusModule::new();

        let request = ActionPacket::trigger(
            NodeId::new(5),
            NodeId::new(12),
            MODULE_ID,
            trigger::GET_STATUS,
        );
        assert!(module.packet_received(&mut fx.ctx(), &request));

        let reply = fx.sent_packet().unwrap();
        assert_eq!(reply.message_type, MessageType::ActionResponse);
        assert_eq!(reply.receiver, NodeId::new(5));
        assert_eq!(reply.action_type, response::STATUS);
        let status = StatusPayload::from_bytes(reply.payload()).unwrap();
        assert_eq!(status.chip_id_a, 0xAAA);
        assert_eq!(status.chip_id_b, 0xBBB);
        assert_eq!(status.link_count, 1);
        assert_eq!(status.free_slots, (MAX_LINKS - 1) as u8);
    }

    #[test]
    fn test_get_connections_reports_partners_and_averages() {
        let mut fx = Fixture::new(12);
        fx.links.connect(LinkId(1), NodeId::new(40));
        {
            let link = fx.links.get_mut(LinkId(1)).unwrap();
            link.start_rssi_measurement();
            for _ in 0..=crate::sampler::WINDOW {
                link.rssi.on_sample(-48);
            }
        }
        let mut module = StatusModule::new();

        let request = ActionPacket::trigger(
            NodeId::new(5),
            NodeId::new(12),
            MODULE_ID,
            trigger::GET_CONNECTIONS,
        );
        assert!(module.packet_received(&mut fx.ctx(), &request));

        let reply = fx.sent_packet().unwrap();
        assert_eq!(reply.action_type, response::CONNECTIONS);
        let connections = ConnectionsPayload::from_bytes(reply.payload()).unwrap();
        assert_eq!(connections.partners[0], 40);
        assert_eq!(connections.rssi[0], -48);
        assert_eq!(connections.partners[1], 0);
    }

    #[test]
    fn test_set_led() {
        let mut fx = Fixture::new(12);
        let mut module = StatusModule::new();

        let on = ActionPacket::trigger(NodeId::new(5), NodeId::new(12), MODULE_ID, trigger::SET_LED)
            .with_payload(&[1])
            .unwrap();
        assert!(module.packet_received(&mut fx.ctx(), &on));
        assert!(fx.state.led_on);

        let off =
            ActionPacket::trigger(NodeId::new(5), NodeId::new(12), MODULE_ID, trigger::SET_LED)
                .with_payload(&[0])
                .unwrap();
        assert!(module.packet_received(&mut fx.ctx(), &off));
        assert!(!fx.state.led_on);
    }

    #[test]
    fn test_foreign_module_packet_ignored() {
        let mut fx = Fixture::new(12);
        let mut module = StatusModule::new();

        let packet = ActionPacket::trigger(
            NodeId::new(5),
            NodeId::new(12),
            ModuleId::new(99),
            trigger::GET_STATUS,
        );
        assert!(!module.packet_received(&mut fx.ctx(), &packet));
        assert!(fx.queue.is_empty());
        assert!(!fx.state.led_on);
    }

    #[test]
    fn test_unknown_action_ignored_silently() {
        let mut fx = Fixture::new(12);
        let mut module = StatusModule::new();

        let packet = ActionPacket::trigger(NodeId::new(5), NodeId::new(12), MODULE_ID, 0xEE);
        assert!(!module.packet_received(&mut fx.ctx(), &packet));
        assert!(fx.queue.is_empty());
    }

    #[test]
    fn test_timer_broadcasts_on_interval() {
        let mut fx = Fixture::new(12);
        let mut module = StatusModule::new();
        module.config.connection_interval_ms = 30_000;

        module.timer_tick(&mut fx.ctx(), 10_000, 10_000);
        assert!(fx.queue.is_empty());

        module.timer_tick(&mut fx.ctx(), 25_000, 35_000);
        let report = fx.sent_packet().unwrap();
        assert_eq!(report.receiver, NodeId::BROADCAST);
        assert_eq!(report.action_type, response::CONNECTIONS);

        // Interval restarts from the broadcast
        module.timer_tick(&mut fx.ctx(), 10_000, 45_000);
        assert!(fx.queue.is_empty());
    }

    #[test]
    fn test_zero_interval_disables_reporting() {
        let mut fx = Fixture::new(12);
        let mut module = StatusModule::new();
        module.config.connection_interval_ms = 0;
        module.config.status_interval_ms = 0;

        module.timer_tick(&mut fx.ctx(), 600_000, 600_000);
        assert!(fx.queue.is_empty());
    }

    #[test]
    fn test_handshake_starts_measurement_in_high_mode() {
        let mut fx = Fixture::new(12);
        fx.links.connect(LinkId(3), NodeId::new(7));
        fx.links.get_mut(LinkId(3)).unwrap().handshake_done = true;
        let mut module = StatusModule::new();

        module.link_changed(&mut fx.ctx(), LinkId(3));
        assert!(fx.links.get(LinkId(3)).unwrap().rssi.is_accumulating());
        assert_eq!(fx.radio.sampling, vec![LinkId(3)]);
    }

    #[test]
    fn test_handshake_ignored_when_sampling_off() {
        let mut fx = Fixture::new(12);
        fx.links.connect(LinkId(3), NodeId::new(7));
        fx.links.get_mut(LinkId(3)).unwrap().handshake_done = true;
        let mut module = StatusModule::new();
        module.config.sampling_mode = SamplingMode::Off;

        module.link_changed(&mut fx.ctx(), LinkId(3));
        assert!(!fx.links.get(LinkId(3)).unwrap().rssi.is_accumulating());
        assert!(fx.radio.sampling.is_empty());
    }

    #[test]
    fn test_signal_samples_feed_the_link_accumulator() {
        let mut fx = Fixture::new(12);
        fx.links.connect(LinkId(1), NodeId::new(7));
        fx.links.get_mut(LinkId(1)).unwrap().start_rssi_measurement();
        let mut module = StatusModule::new();

        for _ in 0..=crate::sampler::WINDOW {
            module.radio_event(
                &mut fx.ctx(),
                &RadioEvent::SignalSample {
                    link: LinkId(1),
                    rssi: -40,
                },
            );
        }
        let link = fx.links.get(LinkId(1)).unwrap();
        assert_eq!(link.rssi.average(), Some(-40));
        assert_eq!(link.rssi.sample_count(), 0);
    }

    #[test]
    fn test_rssistart_and_rssistop_commands() {
        let mut fx = Fixture::new(12);
        fx.links.connect(LinkId(1), NodeId::new(7));
        fx.links.connect(LinkId(2), NodeId::new(8));
        let mut module = StatusModule::new();

        assert!(module.command(&mut fx.ctx(), "rssistart", &[]));
        assert!(fx.links.iter().all(|l| l.rssi.is_accumulating()));
        assert_eq!(fx.radio.sampling.len(), 2);

        assert!(module.command(&mut fx.ctx(), "rssistop", &[]));
        assert!(fx.links.iter().all(|l| !l.rssi.is_accumulating()));
        assert!(fx.radio.sampling.is_empty());
    }

    #[test]
    fn test_action_command_builds_trigger() {
        let mut fx = Fixture::new(12);
        let mut module = StatusModule::new();

        assert!(module.command(
            &mut fx.ctx(),
            "action",
            &["635", "status", "get_status"]
        ));
        let packet = fx.sent_packet().unwrap();
        assert_eq!(packet.message_type, MessageType::TriggerAction);
        assert_eq!(packet.sender, NodeId::new(12));
        assert_eq!(packet.receiver, NodeId::new(635));
        assert_eq!(packet.action_type, trigger::GET_STATUS);

        // "this" reroutes to our own node
        assert!(module.command(&mut fx.ctx(), "action", &["this", "status", "led", "on"]));
        let led = fx.sent_packet().unwrap();
        assert_eq!(led.receiver, NodeId::new(12));
        assert_eq!(led.payload(), &[1]);
    }

    #[test]
    fn test_command_for_other_module_not_claimed() {
        let mut fx = Fixture::new(12);
        let mut module = StatusModule::new();
        assert!(!module.command(&mut fx.ctx(), "action", &["this", "beacon", "get_status"]));
        assert!(!module.command(&mut fx.ctx(), "version", &[]));
    }

    #[test]
    fn test_generic_config_accessors() {
        let mut module = StatusModule::new();
        assert_eq!(
            module.config_get("connection_interval_ms"),
            Some("30000".to_string())
        );
        module.config_set("status_interval_ms", "5000").unwrap();
        assert_eq!(module.config().status_interval_ms, 5000);
        assert!(module.config_set("sampling_mode", "9").is_err());
        assert!(module.config_set("bogus", "1").is_err());
        assert_eq!(module.config_get("bogus"), None);
    }
}
