//! Module registry and packet dispatcher
//!
//! Holds the ordered set of modules and fans every event out to all of
//! them in registration order. Dispatch is deliberately
//! broadcast-to-all with module self-filtering (a chain of
//! responsibility), not an indexed lookup: module ids are sparse, module
//! counts are single digits, packet rates are low, and modules may carry
//! side effects that must run for every packet. Do not "optimize" this
//! into a routing table.

use crate::link::LinkId;
use crate::module::{Module, ModuleContext};
use crate::packet::ActionPacket;
use crate::transport::RadioEvent;
use tracing::debug;

/// Ordered collection of the node's modules
///
/// Indexed by registration order, which is fixed at boot.
#[derive(Default)]
pub struct ModuleRegistry {
    modules: Vec<Box<dyn Module>>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a module; registration order is dispatch order
    pub fn register(&mut self, module: Box<dyn Module>) {
        self.modules.push(module);
    }

    /// Number of registered modules
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    /// Whether no modules are registered
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Iterate modules in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn Module> {
        self.modules.iter().map(|m| m.as_ref())
    }

    /// Iterate modules in registration order, mutably
    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Box<dyn Module>> {
        self.modules.iter_mut()
    }

    /// Find a module by its text-command name, mutably
    pub fn find_by_name_mut(&mut self, name: &str) -> Option<&mut Box<dyn Module>> {
        self.modules.iter_mut().find(|m| m.name() == name)
    }

    /// Offer an inbound packet to every module, in registration order
    ///
    /// Every module sees the packet exactly once and self-filters on
    /// its module id. Returns whether any module handled it.
    pub fn dispatch_packet(&mut self, ctx: &mut ModuleContext<'_>, packet: &ActionPacket) -> bool {
        let mut handled = false;
        for module in &mut self.modules {
            handled |= module.packet_received(ctx, packet);
        }
        if !handled {
            debug!(
                module = %packet.module_id,
                action = packet.action_type,
                "packet not claimed by any module"
            );
        }
        handled
    }

    /// Fan a timer tick out to every module
    pub fn dispatch_tick(&mut self, ctx: &mut ModuleContext<'_>, elapsed_ms: u32, now_ms: u32) {
        for module in &mut self.modules {
            module.timer_tick(ctx, elapsed_ms, now_ms);
        }
    }

    /// Fan a radio event out to every module
    pub fn dispatch_radio_event(&mut self, ctx: &mut ModuleContext<'_>, event: &RadioEvent) {
        for module in &mut self.modules {
            module.radio_event(ctx, event);
        }
    }

    /// Fan a link lifecycle change out to every module
    pub fn dispatch_link_changed(&mut self, ctx: &mut ModuleContext<'_>, link: LinkId) {
        for module in &mut self.modules {
            module.link_changed(ctx, link);
        }
    }

    /// Offer a text command to every module, in registration order
    ///
    /// Returns whether any module claimed it.
    pub fn dispatch_command(
        &mut self,
        ctx: &mut ModuleContext<'_>,
        name: &str,
        args: &[&str],
    ) -> bool {
        for module in &mut self.modules {
            if module.command(ctx, name, args) {
                return true;
            }
        }
        false
    }
}

impl std::fmt::Debug for ModuleRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.modules.iter().map(|m| m.name()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::link::LinkTable;
    use crate::module::NodeState;
    use crate::packet::{ModuleId, NodeId};
    use crate::transport::{FrameQueue, LoopbackTransport, NullRadio};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Records every delivery it observes into a shared log, and every
    /// packet it actually acted on into a second one.
    struct ProbeModule {
        id: ModuleId,
        log: Rc<RefCell<Vec<u8>>>,
        actions: Rc<RefCell<Vec<u8>>>,
    }

    impl Module for ProbeModule {
        fn module_id(&self) -> ModuleId {
            self.id
        }

        fn name(&self) -> &'static str {
            "probe"
        }

        fn is_active(&self) -> bool {
            true
        }

        fn reset_to_defaults(&mut self) {}

        fn config_bytes(&self) -> Vec<u8> {
            vec![self.id.to_u8(), 1, 1, 0]
        }

        fn apply_config(&mut self, _bytes: &[u8]) -> Result<(), ConfigError> {
            Ok(())
        }

        fn packet_received(
            &mut self,
            _ctx: &mut ModuleContext<'_>,
            packet: &ActionPacket,
        ) -> bool {
            self.log.borrow_mut().push(self.id.to_u8());
            if !packet.is_for_module(self.id) {
                return false;
            }
            self.actions.borrow_mut().push(self.id.to_u8());
            true
        }
    }

    fn probe(
        id: u8,
        log: &Rc<RefCell<Vec<u8>>>,
        actions: &Rc<RefCell<Vec<u8>>>,
    ) -> Box<ProbeModule> {
        Box::new(ProbeModule {
            id: ModuleId::new(id),
            log: log.clone(),
            actions: actions.clone(),
        })
    }

    fn dispatch(registry: &mut ModuleRegistry, packet: &ActionPacket) -> bool {
        let mut state = NodeState::new(NodeId::new(1), [0, 0]);
        let mut links = LinkTable::default();
        let mut transport = LoopbackTransport::new(FrameQueue::new());
        let mut radio = NullRadio::new();
        let mut ctx = ModuleContext {
            node: &mut state,
            links: &mut links,
            transport: &mut transport,
            radio: &mut radio,
        };
        registry.dispatch_packet(&mut ctx, packet)
    }

    #[test]
    fn test_every_module_sees_every_packet_in_order() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let actions = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(probe(3, &log, &actions));
        registry.register(probe(7, &log, &actions));
        registry.register(probe(5, &log, &actions));

        let packet = ActionPacket::trigger(NodeId::new(2), NodeId::new(1), ModuleId::new(5), 1);
        assert!(dispatch(&mut registry, &packet));

        // All three saw it exactly once, in registration order, even
        // though module 5 claimed it
        assert_eq!(*log.borrow(), vec![3, 7, 5]);
    }

    #[test]
    fn test_non_addressed_modules_take_no_action() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let actions = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(probe(3, &log, &actions));
        registry.register(probe(5, &log, &actions));

        let packet = ActionPacket::trigger(NodeId::new(2), NodeId::new(1), ModuleId::new(5), 1);
        dispatch(&mut registry, &packet);
        dispatch(&mut registry, &packet);

        // Both deliveries observed by both modules, but only the
        // addressed module ever acted
        assert_eq!(*log.borrow(), vec![3, 5, 3, 5]);
        assert_eq!(*actions.borrow(), vec![5, 5]);
    }

    #[test]
    fn test_unclaimed_packet_reports_unhandled() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let actions = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(probe(3, &log, &actions));

        let packet =
            ActionPacket::trigger(NodeId::new(2), NodeId::new(1), ModuleId::new(99), 1);
        assert!(!dispatch(&mut registry, &packet));
        assert_eq!(*log.borrow(), vec![3]);
        assert!(actions.borrow().is_empty());
    }

    #[test]
    fn test_find_by_name() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let actions = Rc::new(RefCell::new(Vec::new()));
        let mut registry = ModuleRegistry::new();
        registry.register(probe(3, &log, &actions));
        assert!(registry.find_by_name_mut("probe").is_some());
        assert!(registry.find_by_name_mut("missing").is_none());
    }
}
