//! Bounded LRU response cache with per-entry TTL (§4.7).

use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use sha2::{Digest, Sha256};

use crate::messages::anthropic::{AnthropicChatRequest, AnthropicChatResponse};

const DEFAULT_CAPACITY: u64 = 1_000;
const DEFAULT_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone, Copy, Default)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub size: u64,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 { 0.0 } else { self.hits as f64 / total as f64 }
    }
}

pub struct ResponseCache {
    inner: mini_moka::sync::Cache<String, AnthropicChatResponse>,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY, DEFAULT_TTL)
    }
}

impl ResponseCache {
    pub fn new(capacity: u64, ttl: Duration) -> Self {
        Self {
            inner: mini_moka::sync::Cache::builder()
                .max_capacity(capacity)
                .time_to_live(ttl)
                .build(),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// A request is only eligible for caching when non-streaming and at
    /// (effectively) zero temperature (§4.7).
    pub fn is_cacheable(request: &AnthropicChatRequest) -> bool {
        !request.stream.unwrap_or(false) && request.temperature.is_none_or(|t| t == 0.0)
    }

    pub fn get(&self, request: &AnthropicChatRequest, model: &str) -> Option<AnthropicChatResponse> {
        let key = fingerprint(request, model);
        let hit = self.inner.get(&key);

        if hit.is_some() {
            self.hits.fetch_add(1, Ordering::Relaxed);
        } else {
            self.misses.fetch_add(1, Ordering::Relaxed);
        }

        hit
    }

    pub fn put(&self, request: &AnthropicChatRequest, model: &str, response: AnthropicChatResponse) {
        let key = fingerprint(request, model);
        self.inner.insert(key, response);
    }

    pub fn stats(&self) -> CacheStats {
        self.inner.sync();

        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            size: self.inner.entry_count(),
        }
    }
}

/// Stable hash over the fields that determine the response: model, messages,
/// tools, tool_choice, max_tokens, temperature. Field order is fixed so the
/// same logical request always yields the same key (§9).
fn fingerprint(request: &AnthropicChatRequest, model: &str) -> String {
    let mut hasher = Sha256::new();

    hasher.update(model.as_bytes());
    hasher.update(b"\0");

    if let Ok(messages) = serde_json::to_vec(&request.messages) {
        hasher.update(&messages);
    }
    hasher.update(b"\0");

    if let Ok(tools) = serde_json::to_vec(&request.tools) {
        hasher.update(&tools);
    }
    hasher.update(b"\0");

    if let Ok(tool_choice) = serde_json::to_vec(&request.tool_choice) {
        hasher.update(&tool_choice);
    }
    hasher.update(b"\0");

    hasher.update(request.max_tokens.to_le_bytes());
    hasher.update(request.temperature.unwrap_or(0.0).to_le_bytes());

    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::anthropic::{AnthropicMessage, AnthropicMessageContent, AnthropicRole};

    fn request(temperature: Option<f32>, stream: Option<bool>) -> AnthropicChatRequest {
        AnthropicChatRequest {
            model: "claude-3-5-sonnet-20241022".to_string(),
            messages: vec![AnthropicMessage {
                role: AnthropicRole::User,
                content: AnthropicMessageContent::Text("hi".to_string()),
            }],
            max_tokens: 100,
            system: None,
            temperature,
            top_p: None,
            top_k: None,
            stop_sequences: None,
            stream,
            metadata: None,
            tools: None,
            tool_choice: None,
        }
    }

    #[test]
    fn only_non_streaming_zero_temperature_requests_are_cacheable() {
        assert!(ResponseCache::is_cacheable(&request(None, None)));
        assert!(ResponseCache::is_cacheable(&request(Some(0.0), Some(false))));
        assert!(!ResponseCache::is_cacheable(&request(Some(0.5), None)));
        assert!(!ResponseCache::is_cacheable(&request(None, Some(true))));
    }

    #[test]
    fn identical_requests_hash_to_the_same_fingerprint() {
        let a = fingerprint(&request(None, None), "gpt-4o-mini");
        let b = fingerprint(&request(None, None), "gpt-4o-mini");
        assert_eq!(a, b);
    }

    #[test]
    fn cache_hit_after_put() {
        let cache = ResponseCache::new(10, Duration::from_secs(60));
        let req = request(None, None);

        assert!(cache.get(&req, "gpt-4o-mini").is_none());

        let response = AnthropicChatResponse {
            id: "msg_1".to_string(),
            r#type: "message".to_string(),
            role: AnthropicRole::Assistant,
            content: vec![],
            model: "gpt-4o-mini".to_string(),
            stop_reason: None,
            stop_sequence: None,
            usage: Default::default(),
        };
        cache.put(&req, "gpt-4o-mini", response);

        assert!(cache.get(&req, "gpt-4o-mini").is_some());

        let stats = cache.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
    }
}
