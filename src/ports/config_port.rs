//! Configuration access port trait.

/// Raw `[section] key` lookups. Parsing and validation of the values
/// belongs to the domain.
pub trait ConfigPort {
    /// Trimmed value, or `None` when the key is missing or blank.
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
}
