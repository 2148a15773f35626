// Style Registry - Built-in and catalog styles by name
// Built-ins register first, catalog patterns after in catalog order

use std::sync::Arc;
use crate::registry::Registry;
use super::pattern::{PatternStyle, StylePattern};
use super::styles::{ParametricArp, Pad, Rhythm, Style};

pub type StyleRegistry = Registry<dyn Style>;

/// Registry with the built-in styles
pub fn builtin_styles() -> StyleRegistry {
    let mut registry = StyleRegistry::new();
    registry.register("Pad", || Box::new(Pad));
    registry.register("Rhythm", || Box::new(Rhythm));
    registry.register("Arp", || Box::new(ParametricArp::up()));
    registry.register("Arp_Trance", || Box::new(ParametricArp::trance()));
    registry.register("Arp_LoFi", || Box::new(ParametricArp::lofi()));
    registry.register("Arp_Healing", || Box::new(ParametricArp::healing()));
    registry
}

/// Register catalog patterns under their own names
pub fn register_patterns(registry: &mut StyleRegistry, patterns: Vec<StylePattern>) {
    for pattern in patterns {
        let name = pattern.name.clone();
        if registry.contains(&name) {
            log::warn!("Catalog pattern '{}' replaces an existing style", name);
        }
        let shared = Arc::new(pattern);
        registry.register(name, move || Box::new(PatternStyle::new(Arc::clone(&shared))));
    }
}
