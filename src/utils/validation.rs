//! Centralized validation and helper functions.

/// Maximum number of contigs a decoder will extract from a single resource (DOS protection)
pub const MAX_CONTIGS: usize = 100_000;

/// Validate that a string is a valid MD5 checksum (32 hex characters).
///
/// # Examples
///
/// ```
/// use hts_codecs::utils::validation::is_valid_md5;
///
/// assert!(is_valid_md5("6aef897c3d6ff0c78aff06ac189178dd"));
/// assert!(!is_valid_md5("not-an-md5"));
/// assert!(!is_valid_md5("6aef897c3d6ff0c78aff06ac189178d")); // 31 chars
/// ```
#[must_use]
pub fn is_valid_md5(s: &str) -> bool {
    s.len() == 32 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Normalize an MD5 string to lowercase.
/// Returns None if the input is not a valid MD5.
#[must_use]
pub fn normalize_md5(s: &str) -> Option<String> {
    if is_valid_md5(s) {
        Some(s.to_lowercase())
    } else {
        None
    }
}

/// Check if adding another contig would exceed `limit`.
///
/// Call this with the current count BEFORE adding a new contig.
/// Returns an error message if adding would exceed the limit, None if safe to add.
#[must_use]
pub fn check_contig_limit(count: usize, limit: usize) -> Option<String> {
    if count >= limit {
        Some(format!(
            "Too many contigs: adding another would exceed maximum of {limit}"
        ))
    } else {
        None
    }
}

/// True if `content` starts with the gzip member magic bytes
#[must_use]
pub fn is_gzip(content: &[u8]) -> bool {
    content.len() >= 2 && content[0] == 0x1f && content[1] == 0x8b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_md5() {
        assert_eq!(
            normalize_md5("6AEF897C3D6FF0C78AFF06AC189178DD"),
            Some("6aef897c3d6ff0c78aff06ac189178dd".to_string())
        );
        assert_eq!(normalize_md5("xyz"), None);
    }

    #[test]
    fn test_check_contig_limit() {
        assert!(check_contig_limit(0, MAX_CONTIGS).is_none());
        assert!(check_contig_limit(MAX_CONTIGS - 1, MAX_CONTIGS).is_none());
        assert!(check_contig_limit(MAX_CONTIGS, MAX_CONTIGS).is_some());
        assert!(check_contig_limit(2, 2).is_some());
    }

    #[test]
    fn test_magic_helpers() {
        assert!(is_gzip(&[0x1f, 0x8b, 0x08]));
        assert!(!is_gzip(&[0x1f]));
    }
}
