//! Action packet types and wire codec
//!
//! Modules on different nodes talk to each other through small typed
//! "action packets". The wire layout is fixed and little-endian:
//!
//! ```text
//! ┌──────────────┬────────────┬──────────────┬────────────┬──────────────┬─────────────┐
//! │ msg type (1) │ sender (2) │ receiver (2) │ module (1) │ action (1)   │ payload (N) │
//! └──────────────┴────────────┴──────────────┴────────────┴──────────────┴─────────────┘
//! ```
//!
//! The pair `(module_id, action_type)` is the only routing key: an action
//! type is meaningful only inside the namespace of its module, and two
//! modules may reuse the same integer for unrelated actions. The message
//! type only distinguishes a solicitation from an answer.
//!
//! The codec performs no semantic validation of `module_id` or
//! `action_type` - unknown values are valid at this layer and get ignored
//! by the module layer instead.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Node identifier within the mesh
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u16);

impl NodeId {
    /// Broadcast address - "deliver to all reachable nodes".
    /// Never a valid unicast target.
    pub const BROADCAST: NodeId = NodeId(0xFFFF);

    /// Unknown/unset address
    pub const UNKNOWN: NodeId = NodeId(0x0000);

    /// Create a NodeId from a raw u16
    pub fn new(value: u16) -> Self {
        NodeId(value)
    }

    /// Get the raw u16 value
    pub fn to_u16(self) -> u16 {
        self.0
    }

    /// Check if this is the broadcast address
    pub fn is_broadcast(self) -> bool {
        self == Self::BROADCAST
    }

    /// Check if this is unknown/unset
    pub fn is_unknown(self) -> bool {
        self == Self::UNKNOWN
    }
}

impl fmt::Debug for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NodeId({:04x})", self.0)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_broadcast() {
            write!(f, "broadcast")
        } else {
            write!(f, "{:04x}", self.0)
        }
    }
}

/// Module type identifier
///
/// Stable across firmware versions: used as a wire-format discriminator
/// and as the key for persisted module configuration.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ModuleId(u8);

impl ModuleId {
    /// Create a ModuleId from a raw u8
    pub const fn new(value: u8) -> Self {
        ModuleId(value)
    }

    /// Get the raw u8 value
    pub fn to_u8(self) -> u8 {
        self.0
    }
}

impl fmt::Debug for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ModuleId({})", self.0)
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of action packet: a solicitation or an answer
///
/// The broader protocol family reserves other message kinds (mesh
/// maintenance, clustering); those never reach the module layer and the
/// codec rejects them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum MessageType {
    /// Request a module on the receiving node to perform an action
    TriggerAction = 51,
    /// Answer to a previously received trigger
    ActionResponse = 52,
}

impl MessageType {
    /// Parse from the wire discriminator byte
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            51 => Some(MessageType::TriggerAction),
            52 => Some(MessageType::ActionResponse),
            _ => None,
        }
    }
}

/// Errors produced by the wire codec
///
/// All of these are fatal to the single frame only: the frame is dropped
/// and no retry happens at this layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Frame shorter than the fixed packet header
    #[error("frame of {0} bytes is shorter than the {HEADER} byte header")]
    Truncated(usize),
    /// Payload exceeds the transport frame limit
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD} byte limit")]
    PayloadOverflow(usize),
    /// Message kind not carried by the module protocol
    #[error("unknown message kind {0}")]
    UnknownKind(u8),
}

/// Fixed header size in bytes
pub const HEADER: usize = 7;

/// Maximum payload bytes per packet, set by the transport frame limit
pub const MAX_PAYLOAD: usize = 20;

/// The unit of module-to-module communication
///
/// Action packets are ephemeral: built on send, consumed on receipt,
/// never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActionPacket {
    /// Solicitation or answer
    pub message_type: MessageType,
    /// Originating node
    pub sender: NodeId,
    /// Destination node, [`NodeId::BROADCAST`] for all nodes
    pub receiver: NodeId,
    /// Module namespace the action belongs to
    pub module_id: ModuleId,
    /// Opcode, meaningful only within `module_id`
    pub action_type: u8,
    /// Bounded payload, at most [`MAX_PAYLOAD`] bytes
    payload: Vec<u8>,
}

impl ActionPacket {
    /// Create a trigger (request) packet with an empty payload
    pub fn trigger(sender: NodeId, receiver: NodeId, module_id: ModuleId, action_type: u8) -> Self {
        Self {
            message_type: MessageType::TriggerAction,
            sender,
            receiver,
            module_id,
            action_type,
            payload: Vec::new(),
        }
    }

    /// Create a response (answer) packet with an empty payload
    pub fn response(sender: NodeId, receiver: NodeId, module_id: ModuleId, action_type: u8) -> Self {
        Self {
            message_type: MessageType::ActionResponse,
            sender,
            receiver,
            module_id,
            action_type,
            payload: Vec::new(),
        }
    }

    /// Attach a payload, enforcing the transport frame limit
    pub fn with_payload(mut self, payload: &[u8]) -> Result<Self, DecodeError> {
        if payload.len() > MAX_PAYLOAD {
            return Err(DecodeError::PayloadOverflow(payload.len()));
        }
        self.payload = payload.to_vec();
        Ok(self)
    }

    /// Get the payload bytes
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Check whether this packet addresses the given module
    pub fn is_for_module(&self, module_id: ModuleId) -> bool {
        self.module_id == module_id
    }

    /// Serialize to the wire format
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(HEADER + self.payload.len());
        bytes.push(self.message_type as u8);
        bytes.extend_from_slice(&self.sender.to_u16().to_le_bytes());
        bytes.extend_from_slice(&self.receiver.to_u16().to_le_bytes());
        bytes.push(self.module_id.to_u8());
        bytes.push(self.action_type);
        bytes.extend_from_slice(&self.payload);
        bytes
    }

    /// Deserialize from the wire format
    ///
    /// Never reads past `frame`; short frames fail with
    /// [`DecodeError::Truncated`] and oversized ones with
    /// [`DecodeError::PayloadOverflow`].
    pub fn from_bytes(frame: &[u8]) -> Result<Self, DecodeError> {
        if frame.len() < HEADER {
            return Err(DecodeError::Truncated(frame.len()));
        }
        if frame.len() - HEADER > MAX_PAYLOAD {
            return Err(DecodeError::PayloadOverflow(frame.len() - HEADER));
        }
        let message_type =
            MessageType::from_byte(frame[0]).ok_or(DecodeError::UnknownKind(frame[0]))?;
        Ok(Self {
            message_type,
            sender: NodeId::new(u16::from_le_bytes([frame[1], frame[2]])),
            receiver: NodeId::new(u16::from_le_bytes([frame[3], frame[4]])),
            module_id: ModuleId::new(frame[5]),
            action_type: frame[6],
            payload: frame[HEADER..].to_vec(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id() {
        let id = NodeId::new(0x1234);
        assert_eq!(id.to_u16(), 0x1234);
        assert!(!id.is_broadcast());
        assert!(NodeId::BROADCAST.is_broadcast());
        assert!(NodeId::UNKNOWN.is_unknown());
    }

    #[test]
    fn test_message_type_from_byte() {
        assert_eq!(MessageType::from_byte(51), Some(MessageType::TriggerAction));
        assert_eq!(MessageType::from_byte(52), Some(MessageType::ActionResponse));
        assert_eq!(MessageType::from_byte(0), None);
    }

    #[test]
    fn test_packet_roundtrip() {
        let packet = ActionPacket::trigger(NodeId::new(5), NodeId::new(12), ModuleId::new(3), 1)
            .with_payload(&[0xAA, 0xBB, 0xCC])
            .unwrap();

        let bytes = packet.to_bytes();
        let recovered = ActionPacket::from_bytes(&bytes).unwrap();

        assert_eq!(recovered, packet);
        assert_eq!(recovered.payload(), &[0xAA, 0xBB, 0xCC]);
    }

    #[test]
    fn test_roundtrip_empty_payload() {
        let packet =
            ActionPacket::response(NodeId::new(12), NodeId::new(5), ModuleId::new(200), 255);
        let recovered = ActionPacket::from_bytes(&packet.to_bytes()).unwrap();
        assert_eq!(recovered, packet);
        assert!(recovered.payload().is_empty());
    }

    #[test]
    fn test_wire_layout_is_little_endian() {
        let packet = ActionPacket::trigger(
            NodeId::new(0x0102),
            NodeId::new(0x0304),
            ModuleId::new(9),
            7,
        );
        let bytes = packet.to_bytes();
        assert_eq!(bytes, vec![51, 0x02, 0x01, 0x04, 0x03, 9, 7]);
    }

    #[test]
    fn test_decode_truncated() {
        // Every length below the header size must fail, never read OOB
        let frame = [51u8, 0, 0, 0, 0, 0, 0];
        for len in 0..HEADER {
            assert_eq!(
                ActionPacket::from_bytes(&frame[..len]),
                Err(DecodeError::Truncated(len))
            );
        }
        assert!(ActionPacket::from_bytes(&frame).is_ok());
    }

    #[test]
    fn test_decode_payload_overflow() {
        let mut frame = vec![51u8, 0, 0, 0, 0, 0, 0];
        frame.extend(std::iter::repeat(0u8).take(MAX_PAYLOAD + 1));
        assert_eq!(
            ActionPacket::from_bytes(&frame),
            Err(DecodeError::PayloadOverflow(MAX_PAYLOAD + 1))
        );
    }

    #[test]
    fn test_decode_unknown_kind() {
        let frame = [7u8, 0, 0, 0, 0, 0, 0];
        assert_eq!(
            ActionPacket::from_bytes(&frame),
            Err(DecodeError::UnknownKind(7))
        );
    }

    #[test]
    fn test_unknown_module_and_action_pass_the_codec() {
        // Semantic validation belongs to the module layer
        let frame = [52u8, 1, 0, 2, 0, 0xEE, 0xFE];
        let packet = ActionPacket::from_bytes(&frame).unwrap();
        assert_eq!(packet.module_id, ModuleId::new(0xEE));
        assert_eq!(packet.action_type, 0xFE);
    }

    #[test]
    fn test_with_payload_enforces_limit() {
        let big = vec![0u8; MAX_PAYLOAD + 1];
        let result = ActionPacket::trigger(NodeId::new(1), NodeId::new(2), ModuleId::new(3), 0)
            .with_payload(&big);
        assert_eq!(result, Err(DecodeError::PayloadOverflow(MAX_PAYLOAD + 1)));
    }

    #[test]
    fn test_broadcast_receiver_roundtrips() {
        let packet =
            ActionPacket::trigger(NodeId::new(5), NodeId::BROADCAST, ModuleId::new(1), 0);
        let recovered = ActionPacket::from_bytes(&packet.to_bytes()).unwrap();
        assert!(recovered.receiver.is_broadcast());
    }
}
