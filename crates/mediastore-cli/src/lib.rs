//! Shared helpers for the mediastore CLI binary.

use serde::Serialize;

/// One key and the URL produced for it.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct KeyUrl {
    pub key: String,
    pub url: String,
}

/// Pair batch results back up with their keys.
pub fn zip_urls(keys: &[String], urls: Vec<String>) -> Vec<KeyUrl> {
    keys.iter()
        .cloned()
        .zip(urls)
        .map(|(key, url)| KeyUrl { key, url })
        .collect()
}

/// Initialize tracing for CLI binaries.
///
/// Logs go to stderr so stdout stays machine-readable JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_urls_keeps_key_order() {
        let keys = vec!["a.jpg".to_string(), "b.jpg".to_string()];
        let urls = vec!["http://x/a.jpg".to_string(), "http://x/b.jpg".to_string()];

        assert_eq!(
            zip_urls(&keys, urls),
            vec![
                KeyUrl { key: "a.jpg".into(), url: "http://x/a.jpg".into() },
                KeyUrl { key: "b.jpg".into(), url: "http://x/b.jpg".into() },
            ]
        );
    }

    #[test]
    fn key_url_serializes_as_object() {
        let value = serde_json::to_value(KeyUrl {
            key: "a.jpg".into(),
            url: String::new(),
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({ "key": "a.jpg", "url": "" }));
    }
}
