//! Resolving opaque proof references.
//!
//! Proof media is uploaded elsewhere; the client only hands the room an
//! opaque key. A [`MediaResolver`] turns that key into something other
//! clients can open. The room never inspects the content.

/// Maps a proof key to a viewable location.
pub trait MediaResolver: Send + Sync + 'static {
    /// Returns a URL for `key`, or `None` if the key cannot be resolved.
    fn resolve(&self, key: &str) -> Option<String>;
}

/// Hands the key back unchanged. Useful when clients already upload to a
/// public URL.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughMedia;

impl MediaResolver for PassthroughMedia {
    fn resolve(&self, key: &str) -> Option<String> {
        Some(key.to_string())
    }
}

/// Joins the key onto a base URL, e.g. a CDN bucket.
#[derive(Debug, Clone)]
pub struct PrefixMedia {
    base_url: String,
}

impl PrefixMedia {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

impl MediaResolver for PrefixMedia {
    fn resolve(&self, key: &str) -> Option<String> {
        let key = key.trim().trim_start_matches('/');
        if key.is_empty() {
            return None;
        }
        Some(format!("{}/{}", self.base_url.trim_end_matches('/'), key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_media_joins_without_double_slash() {
        let media = PrefixMedia::new("https://cdn.example.com/proofs/");
        assert_eq!(
            media.resolve("/abc.jpg").as_deref(),
            Some("https://cdn.example.com/proofs/abc.jpg")
        );
        assert_eq!(media.resolve("  "), None);
    }

    #[test]
    fn test_passthrough_returns_key() {
        assert_eq!(PassthroughMedia.resolve("k1").as_deref(), Some("k1"));
    }
}
