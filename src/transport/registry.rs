use std::collections::HashMap;

use log::warn;

use crate::relay::Directive;

/// Message type names every installation defines
pub const TYPE_ERROR: &str = "TYPE_ERROR";
pub const TYPE_HEARTBEAT: &str = "TYPE_HEARTBEAT";
pub const TYPE_TRACEBUF2: &str = "TYPE_TRACEBUF2";

/// Installation-wide [Registry]: resolves symbolic names to numeric ids.
pub trait Registry {
    /// Module id registered under this name
    fn module_id(&self, name: &str) -> Option<u8>;

    /// Ring key registered under this name
    fn ring_key(&self, name: &str) -> Option<i64>;

    /// Message type registered under this name
    fn message_type(&self, name: &str) -> Option<u8>;

    /// Local installation id
    fn local_installation(&self) -> Option<u8>;
}

/// [StaticRegistry] holds the name tables in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticRegistry {
    modules: HashMap<String, u8>,
    rings: HashMap<String, i64>,
    messages: HashMap<String, u8>,
    installations: HashMap<String, u8>,
    local: Option<u8>,
}

impl StaticRegistry {
    /// Empty [StaticRegistry]
    pub fn new() -> Self {
        Self::default()
    }

    /// [StaticRegistry] preloaded with the standard message types
    pub fn with_standard_types() -> Self {
        Self::default()
            .with_message_type(TYPE_ERROR, 2)
            .with_message_type(TYPE_HEARTBEAT, 3)
            .with_message_type(TYPE_TRACEBUF2, 19)
    }

    pub fn with_module(mut self, name: &str, id: u8) -> Self {
        self.modules.insert(name.to_string(), id);
        self
    }

    pub fn with_ring(mut self, name: &str, key: i64) -> Self {
        self.rings.insert(name.to_string(), key);
        self
    }

    pub fn with_message_type(mut self, name: &str, id: u8) -> Self {
        self.messages.insert(name.to_string(), id);
        self
    }

    pub fn with_installation(mut self, name: &str, id: u8) -> Self {
        self.installations.insert(name.to_string(), id);
        self
    }

    /// Defines the local installation id
    pub fn with_local_installation(mut self, id: u8) -> Self {
        self.local = Some(id);
        self
    }

    /// Defines the local installation by name, once it is registered
    pub fn with_local_installation_name(mut self, name: &str) -> Self {
        self.local = self.installations.get(name).copied();
        self
    }

    /// Extends this [StaticRegistry] with `Module`, `Ring`, `Message`
    /// and `Installation` table directives. Any other directive is ignored.
    pub fn extend_from_directives(mut self, directives: &[Directive]) -> Self {
        for directive in directives {
            let key = directive.key.as_str();
            if !matches!(key, "Module" | "Ring" | "Message" | "Installation") {
                continue;
            }

            let (name, value) = match (directive.arg(0), directive.arg(1)) {
                (Some(name), Some(value)) => (name.to_string(), value),
                _ => {
                    warn!("{}: incomplete table entry", directive);
                    continue;
                },
            };

            let stored = match key {
                "Ring" => match value.parse::<i64>() {
                    Ok(k) => {
                        self.rings.insert(name, k);
                        true
                    },
                    Err(_) => false,
                },
                _ => match value.parse::<u8>() {
                    Ok(id) => {
                        let table = match key {
                            "Module" => &mut self.modules,
                            "Message" => &mut self.messages,
                            _ => &mut self.installations,
                        };
                        table.insert(name, id);
                        true
                    },
                    Err(_) => false,
                },
            };

            if !stored {
                warn!("{}: invalid table id", directive);
            }
        }
        self
    }
}

impl Registry for StaticRegistry {
    fn module_id(&self, name: &str) -> Option<u8> {
        self.modules.get(name).copied()
    }

    fn ring_key(&self, name: &str) -> Option<i64> {
        self.rings.get(name).copied()
    }

    fn message_type(&self, name: &str) -> Option<u8> {
        self.messages.get(name).copied()
    }

    fn local_installation(&self) -> Option<u8> {
        self.local
    }
}

#[cfg(test)]
mod test {
    use super::{Registry, StaticRegistry, TYPE_HEARTBEAT, TYPE_TRACEBUF2};
    use crate::relay::DirectiveReader;

    #[test]
    fn standard_types() {
        let registry = StaticRegistry::with_standard_types();
        assert_eq!(registry.message_type(TYPE_TRACEBUF2), Some(19));
        assert_eq!(registry.message_type(TYPE_HEARTBEAT), Some(3));
        assert_eq!(registry.module_id("MOD_GNSS"), None);
        assert_eq!(registry.local_installation(), None);
    }

    #[test]
    fn table_directives() {
        let directives = DirectiveReader::parse_str(
            "# installation tables
Ring WAVE_RING 1000
Ring BAD_RING key
Module MOD_GNSS 151
Module MOD_BROKEN abc
Message TYPE_TRACEBUF2 19
Installation INST_LOCAL 13
Installation",
            "earthworm.d",
        )
        .unwrap();

        let registry = StaticRegistry::new()
            .extend_from_directives(&directives)
            .with_local_installation_name("INST_LOCAL");

        assert_eq!(registry.ring_key("WAVE_RING"), Some(1000));
        assert_eq!(registry.ring_key("BAD_RING"), None);
        assert_eq!(registry.module_id("MOD_GNSS"), Some(151));
        assert_eq!(registry.module_id("MOD_BROKEN"), None);
        assert_eq!(registry.message_type("TYPE_TRACEBUF2"), Some(19));
        assert_eq!(registry.local_installation(), Some(13));
    }
}
