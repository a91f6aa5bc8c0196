//! External interfaces consumed by the firmware core
//!
//! The radio stack, the persistent configuration store, and the radio
//! sampling control surface all live outside this crate. They are
//! consumed through the narrow traits defined here, which also makes the
//! whole core testable against in-memory backends.
//!
//! The reference backends at the bottom ([`LoopbackTransport`],
//! [`MemoryStore`], [`NullRadio`]) back the test suite and the CLI
//! simulation. The execution model is single-threaded and cooperative,
//! so the loopback queue is plain `Rc<RefCell<...>>` with no locking.

use crate::link::LinkId;
use crate::packet::{ModuleId, NodeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::collections::VecDeque;
use std::rc::Rc;

/// Frame-level send interface to the radio stack
///
/// The transport either accepts the frame for delivery or reports an
/// immediate failure; nothing here retries, backs off, or awaits
/// link-layer acknowledgment. Broadcast is requested by passing
/// [`NodeId::BROADCAST`] as the target and never fails for lack of a
/// recipient.
pub trait Transport {
    /// Hand a frame to the transport.
    ///
    /// `reliable` requests link-layer acknowledgment; `false` permits
    /// best-effort delivery.
    fn send(&mut self, target: NodeId, frame: &[u8], reliable: bool) -> bool;
}

/// Persistent per-module configuration records
///
/// Record length is fixed per module and must be a multiple of 4.
pub trait ConfigStore {
    /// Fetch the stored record for a module, if one exists
    fn load(&mut self, id: ModuleId) -> Option<Vec<u8>>;
    /// Persist a module's record
    fn save(&mut self, id: ModuleId, bytes: &[u8]);
}

/// Control surface for per-link signal sampling in the radio stack
///
/// Starting makes the stack deliver [`RadioEvent::SignalSample`] events
/// for the link; stopping halts them.
pub trait RadioControl {
    /// Ask the radio stack to begin delivering signal samples
    fn start_signal_sampling(&mut self, link: LinkId) -> bool;
    /// Ask the radio stack to stop delivering signal samples
    fn stop_signal_sampling(&mut self, link: LinkId) -> bool;
}

/// Asynchronous events delivered by the radio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioEvent {
    /// A physical link to a partner node came up
    Connected { link: LinkId, partner: NodeId },
    /// The mesh handshake on a link finished; it now carries traffic
    HandshakeComplete { link: LinkId },
    /// A link was torn down
    Disconnected { link: LinkId },
    /// One signal-strength measurement for a link, in dBm
    SignalSample { link: LinkId, rssi: i8 },
}

/// One frame waiting for delivery in the loopback queue
pub type QueuedFrame = (NodeId, Vec<u8>);

/// Shared in-memory frame queue connecting loopback transports
///
/// Frames are tagged with their target node; a test or simulation pump
/// pops them and feeds each to the matching node (or to every node for
/// broadcast targets).
#[derive(Debug, Clone, Default)]
pub struct FrameQueue {
    frames: Rc<RefCell<VecDeque<QueuedFrame>>>,
}

impl FrameQueue {
    /// Create an empty queue
    pub fn new() -> Self {
        Self::default()
    }

    /// Pop the oldest undelivered frame
    pub fn pop(&self) -> Option<QueuedFrame> {
        self.frames.borrow_mut().pop_front()
    }

    /// Number of undelivered frames
    pub fn len(&self) -> usize {
        self.frames.borrow().len()
    }

    /// Whether no frames are waiting
    pub fn is_empty(&self) -> bool {
        self.frames.borrow().is_empty()
    }
}

/// In-memory transport delivering into a shared [`FrameQueue`]
#[derive(Debug, Clone)]
pub struct LoopbackTransport {
    queue: FrameQueue,
}

impl LoopbackTransport {
    /// Create a transport feeding the given queue
    pub fn new(queue: FrameQueue) -> Self {
        Self { queue }
    }
}

impl Transport for LoopbackTransport {
    fn send(&mut self, target: NodeId, frame: &[u8], _reliable: bool) -> bool {
        self.queue
            .frames
            .borrow_mut()
            .push_back((target, frame.to_vec()));
        true
    }
}

/// In-memory configuration store
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: HashMap<ModuleId, Vec<u8>>,
}

impl MemoryStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seed a record, e.g. to test version migration
    pub fn seed(&mut self, id: ModuleId, bytes: Vec<u8>) {
        self.records.insert(id, bytes);
    }
}

impl ConfigStore for MemoryStore {
    fn load(&mut self, id: ModuleId) -> Option<Vec<u8>> {
        self.records.get(&id).cloned()
    }

    fn save(&mut self, id: ModuleId, bytes: &[u8]) {
        self.records.insert(id, bytes.to_vec());
    }
}

/// Radio control stub that accepts every request
///
/// Tests drive sampling by injecting [`RadioEvent::SignalSample`]
/// events directly.
#[derive(Debug, Default)]
pub struct NullRadio {
    /// Links with sampling currently requested
    pub sampling: Vec<LinkId>,
}

impl NullRadio {
    /// Create a stub radio
    pub fn new() -> Self {
        Self::default()
    }
}

impl RadioControl for NullRadio {
    fn start_signal_sampling(&mut self, link: LinkId) -> bool {
        if !self.sampling.contains(&link) {
            self.sampling.push(link);
        }
        true
    }

    fn stop_signal_sampling(&mut self, link: LinkId) -> bool {
        self.sampling.retain(|l| *l != link);
        true
    }
}
