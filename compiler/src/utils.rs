use serde_json;

/// Quote a name for error messages.
pub fn quote(text: &str) -> String {
    serde_json::to_string(text).unwrap()
}

/// Number of bits needed to represent `value`; 0 for 0.
pub fn bit_length(value: u64) -> u32 {
    64 - value.leading_zeros()
}
