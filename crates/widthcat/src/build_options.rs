use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

/// Ordered preprocessor defines used to specialise a device kernel at compile time.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BuildOptions {
    defines: Vec<(String, String)>,
}

impl BuildOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing an earlier definition in place.
    pub fn define(&mut self, key: impl Into<String>, value: impl ToString) {
        let key = key.into();
        let value = value.to_string();
        match self.defines.iter_mut().find(|(existing, _)| *existing == key) {
            Some((_, slot)) => *slot = value,
            None => self.defines.push((key, value)),
        }
    }

    /// Defines `key` with a float rendered at full precision.
    pub fn define_float(&mut self, key: impl Into<String>, value: f32) {
        self.define(key, float_to_string_with_full_precision(value));
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.defines
            .iter()
            .find(|(existing, _)| existing == key)
            .map(|(_, value)| value.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.defines.iter().map(|(key, _)| key.as_str())
    }

    pub fn len(&self) -> usize {
        self.defines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defines.is_empty()
    }

    /// Compiler flags in definition order, e.g. `-DVEC_SIZE=8`.
    pub fn options(&self) -> Vec<String> {
        self.defines
            .iter()
            .map(|(key, value)| format!("-D{key}={value}"))
            .collect()
    }

    /// Stable cache key for `kernel_name` compiled with these options.
    pub fn fingerprint(&self, kernel_name: &str) -> u64 {
        let mut hasher = DefaultHasher::new();
        kernel_name.hash(&mut hasher);
        self.defines.hash(&mut hasher);
        hasher.finish()
    }
}

/// Shortest decimal that parses back to exactly `value`, suffixed with `f`
/// when it is not integral so the device compiler reads it as a float literal.
pub fn float_to_string_with_full_precision(value: f32) -> String {
    let mut text = value.to_string();
    if value.fract() != 0.0 {
        text.push('f');
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn define_replaces_in_place() {
        let mut options = BuildOptions::new();
        options.define("DATA_TYPE", "float");
        options.define("VEC_SIZE", 8);
        options.define("DATA_TYPE", "uchar");
        assert_eq!(options.options(), vec!["-DDATA_TYPE=uchar", "-DVEC_SIZE=8"]);
    }

    #[test]
    fn full_precision_floats_round_trip() {
        assert_eq!(float_to_string_with_full_precision(128.0), "128");
        assert_eq!(float_to_string_with_full_precision(-3.0), "-3");
        let text = float_to_string_with_full_precision(0.1);
        assert_eq!(text, "0.1f");
        let parsed: f32 = text.trim_end_matches('f').parse().unwrap();
        assert_eq!(parsed, 0.1);
    }
}
