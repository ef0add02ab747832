//! Object key conventions.
//!
//! Originals and derived outputs live under distinct namespaces so a
//! listing of either never mixes the two.

/// Namespace for uploaded originals.
pub const SOURCE_PREFIX: &str = "uploads/";

/// Namespace for compressed outputs.
pub const RESULT_PREFIX: &str = "compressed-videos/";

/// Key of an uploaded original.
pub fn source_key(file_name: &str) -> String {
    format!("{SOURCE_PREFIX}{file_name}")
}

/// Key of a compressed output.
pub fn result_key(compressed_filename: &str) -> String {
    format!("{RESULT_PREFIX}{compressed_filename}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespaces_are_disjoint() {
        let src = source_key("clip.mov");
        let out = result_key("clip-compressed-1.mp4");
        assert!(src.starts_with(SOURCE_PREFIX));
        assert!(out.starts_with(RESULT_PREFIX));
        assert!(!out.starts_with(SOURCE_PREFIX));
    }

    #[test]
    fn test_keys_preserve_file_names() {
        assert_eq!(source_key("a.mp4"), "uploads/a.mp4");
        assert_eq!(result_key("a-compressed-9.mp4"), "compressed-videos/a-compressed-9.mp4");
    }
}
