//! Configuration access port trait.

/// Raw `[section] key` lookups. Typed parsing and defaults live in
/// `domain::config_validation`, so every source reports errors the same way.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
