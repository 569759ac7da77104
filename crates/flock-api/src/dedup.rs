//! Process-local suppression of retried webhook deliveries.

use std::{
  collections::HashMap,
  sync::Mutex,
  time::{Duration, Instant},
};

pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Remembers `endpoint::entry_id` keys for a fixed time-to-live.
#[derive(Debug)]
pub struct DedupCache {
  ttl:  Duration,
  seen: Mutex<HashMap<String, Instant>>,
}

impl Default for DedupCache {
  fn default() -> Self { Self::new(DEFAULT_TTL) }
}

impl DedupCache {
  pub fn new(ttl: Duration) -> Self { Self { ttl, seen: Mutex::new(HashMap::new()) } }

  /// Returns `true` when the delivery is new and marks it seen. Payloads
  /// without an entry id always pass.
  pub fn check(&self, endpoint: &str, entry_id: Option<&str>) -> bool {
    self.check_at(endpoint, entry_id, Instant::now())
  }

  pub fn check_at(&self, endpoint: &str, entry_id: Option<&str>, now: Instant) -> bool {
    let Some(entry_id) = entry_id else { return true };
    let key = format!("{endpoint}::{entry_id}");

    let mut seen = self.seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    seen.retain(|_, at| now.saturating_duration_since(*at) < self.ttl);
    if seen.contains_key(&key) {
      return false;
    }
    seen.insert(key, now);
    true
  }

  pub fn len(&self) -> usize {
    self.seen.lock().map(|s| s.len()).unwrap_or_default()
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn second_delivery_within_ttl_is_suppressed() {
    let cache = DedupCache::new(Duration::from_secs(300));
    let t0 = Instant::now();
    assert!(cache.check_at("helps-member/submit", Some("202:17"), t0));
    assert!(!cache.check_at("helps-member/submit", Some("202:17"), t0 + Duration::from_secs(60)));
  }

  #[test]
  fn endpoints_are_keyed_separately() {
    let cache = DedupCache::default();
    let t0 = Instant::now();
    assert!(cache.check_at("helps-member/submit", Some("1"), t0));
    assert!(cache.check_at("helps-member/update", Some("1"), t0));
    assert_eq!(cache.len(), 2);
  }

  #[test]
  fn entries_expire() {
    let cache = DedupCache::new(Duration::from_secs(10));
    let t0 = Instant::now();
    assert!(cache.check_at("e", Some("1"), t0));
    assert!(cache.check_at("e", Some("1"), t0 + Duration::from_secs(11)));
  }

  #[test]
  fn missing_entry_id_always_passes() {
    let cache = DedupCache::default();
    assert!(cache.check("e", None));
    assert!(cache.check("e", None));
    assert!(cache.is_empty());
  }
}
