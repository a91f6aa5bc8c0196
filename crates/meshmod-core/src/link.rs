//! Link lifecycle and the fixed-size link table
//!
//! A link is one established radio connection to a partner node. The
//! radio stack owns the actual connection; this table mirrors its
//! lifecycle (connected, handshake complete, torn down) and owns the
//! per-link telemetry accumulator so that signal samples always have a
//! single, non-shared home.

use crate::packet::NodeId;
use crate::sampler::SampleAccumulator;

/// Handle identifying one radio link, assigned by the radio stack
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LinkId(pub u16);

/// One established radio link to a partner node
#[derive(Debug, Clone)]
pub struct Link {
    /// Radio stack handle for this link
    pub id: LinkId,
    /// The node on the other end
    pub partner: NodeId,
    /// Physical connection is up
    pub connected: bool,
    /// Mesh handshake finished; the link carries module traffic
    pub handshake_done: bool,
    /// Signal-strength accumulator owned by this link
    pub rssi: SampleAccumulator,
}

impl Link {
    /// Create a freshly connected link (handshake still pending)
    pub fn new(id: LinkId, partner: NodeId) -> Self {
        Self {
            id,
            partner,
            connected: true,
            handshake_done: false,
            rssi: SampleAccumulator::new(),
        }
    }

    /// Start signal-strength measurement on this link
    ///
    /// Valid only while connected; returns whether measurement started.
    pub fn start_rssi_measurement(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        self.rssi.start();
        true
    }

    /// Stop signal-strength measurement on this link
    ///
    /// Valid only while connected. The last completed average remains
    /// the reported value.
    pub fn stop_rssi_measurement(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        self.rssi.stop();
        true
    }
}

/// Fixed-capacity table of active links
///
/// Capacity matches the radio stack's connection limit. Slots are
/// reused after a link is torn down.
#[derive(Debug)]
pub struct LinkTable {
    links: Vec<Link>,
    capacity: usize,
}

/// Default maximum concurrent links, matching the radio stack limit
pub const MAX_LINKS: usize = 4;

impl LinkTable {
    /// Create an empty table with the given capacity
    pub fn new(capacity: usize) -> Self {
        Self {
            links: Vec::with_capacity(capacity),
            capacity,
        }
    }

    /// Register a newly connected link
    ///
    /// Returns `false` when the table is full; the radio stack should
    /// never let that happen, but a misbehaving one must not corrupt us.
    pub fn connect(&mut self, id: LinkId, partner: NodeId) -> bool {
        // A reconnect on the same handle replaces the stale entry and
        // never counts against capacity
        self.disconnect(id);
        if self.links.len() >= self.capacity {
            return false;
        }
        self.links.push(Link::new(id, partner));
        true
    }

    /// Tear down a link, destroying its accumulator
    pub fn disconnect(&mut self, id: LinkId) {
        self.links.retain(|l| l.id != id);
    }

    /// Look up a link by handle
    pub fn get(&self, id: LinkId) -> Option<&Link> {
        self.links.iter().find(|l| l.id == id)
    }

    /// Look up a link by handle, mutably
    pub fn get_mut(&mut self, id: LinkId) -> Option<&mut Link> {
        self.links.iter_mut().find(|l| l.id == id)
    }

    /// Iterate over active links
    pub fn iter(&self) -> impl Iterator<Item = &Link> {
        self.links.iter()
    }

    /// Iterate over active links, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Link> {
        self.links.iter_mut()
    }

    /// Number of active links
    pub fn len(&self) -> usize {
        self.links.len()
    }

    /// Whether no links are up
    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Remaining free link slots
    pub fn free_slots(&self) -> usize {
        self.capacity - self.links.len()
    }
}

impl Default for LinkTable {
    fn default() -> Self {
        Self::new(MAX_LINKS)
    }
}
