//! Terminal command routing
//!
//! The firmware-wide command table and tokenizer live outside this core;
//! by the time a command reaches us it is already a name plus an ordered
//! argument list. Routing is a delegation chain: every module gets a
//! chance to claim the command (modules self-match on their name in
//! `args[1]`), and if none does, the generic configuration accessor is
//! the terminal fallback:
//!
//! ```text
//! get_config <module> <field>
//! set_config <module> <field> <value>
//! ```
//!
//! An unrecognized command returns "not handled" up the chain; reporting
//! that to the user is the outermost caller's job, never a crash here.

use crate::module::ModuleContext;
use crate::registry::ModuleRegistry;
use tracing::{info, warn};

/// Route one text command through the module chain and the config fallback
///
/// Returns whether anything handled it.
pub fn route(
    registry: &mut ModuleRegistry,
    ctx: &mut ModuleContext<'_>,
    name: &str,
    args: &[&str],
) -> bool {
    if registry.dispatch_command(ctx, name, args) {
        return true;
    }
    route_config_fallback(registry, name, args)
}

/// Generic configuration get/set by module name and field name
fn route_config_fallback(registry: &mut ModuleRegistry, name: &str, args: &[&str]) -> bool {
    match (name, args) {
        ("get_config", [module_name, field]) => {
            let Some(module) = registry.find_by_name_mut(module_name) else {
                return false;
            };
            match module.config_get(field) {
                Some(value) => {
                    info!(module = module_name, field, value, "config read");
                    true
                }
                None => {
                    warn!(module = module_name, field, "unknown config field");
                    false
                }
            }
        }
        ("set_config", [module_name, field, value]) => {
            let Some(module) = registry.find_by_name_mut(module_name) else {
                return false;
            };
            match module.config_set(field, value) {
                Ok(()) => {
                    info!(module = module_name, field, value, "config written");
                    true
                }
                Err(err) => {
                    warn!(module = module_name, field, %err, "config write rejected");
                    false
                }
            }
        }
        _ => false,
    }
}
