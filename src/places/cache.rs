//! In-memory geocoding cache.
//!
//! Keyed by (place name, district, province), folded for case and
//! diacritics. Entries live for the whole process run and are never
//! expired; failures are not cached so a transient outage does not pin a
//! place to "no coordinates" forever.

use crate::geo::Coords;
use crate::text::fold_turkish;
use std::collections::HashMap;

pub struct GeocodeCache {
    entries: HashMap<String, Coords>,
    hits: u64,
    misses: u64,
}

impl GeocodeCache {
    pub fn new() -> Self {
        Self { entries: HashMap::new(), hits: 0, misses: 0 }
    }

    fn key(name: &str, district: &str, province: &str) -> String {
        format!(
            "{}|{}|{}",
            fold_turkish(name),
            fold_turkish(district),
            fold_turkish(province)
        )
    }

    pub fn get(&mut self, name: &str, district: &str, province: &str) -> Option<Coords> {
        match self.entries.get(&Self::key(name, district, province)) {
            Some(coords) => {
                self.hits += 1;
                Some(*coords)
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    pub fn put(&mut self, name: &str, district: &str, province: &str, coords: Coords) {
        self.entries.insert(Self::key(name, district, province), coords);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// (hits, misses) counters, for logging and tests.
    pub fn stats(&self) -> (u64, u64) {
        (self.hits, self.misses)
    }
}

impl Default for GeocodeCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_get() {
        let mut cache = GeocodeCache::new();
        cache.put("X Parkı", "Merkez", "Yalova", Coords::new(40.66, 29.28));
        let got = cache.get("X Parkı", "Merkez", "Yalova").unwrap();
        assert_eq!(got.lat, 40.66);
        assert_eq!(cache.stats(), (1, 0));
    }

    #[test]
    fn test_key_is_folded() {
        let mut cache = GeocodeCache::new();
        cache.put("X PARKI", "MERKEZ", "YALOVA", Coords::new(1.0, 2.0));
        assert!(cache.get("x parkı", "merkez", "yalova").is_some());
    }

    #[test]
    fn test_miss() {
        let mut cache = GeocodeCache::new();
        assert!(cache.get("yok", "Merkez", "Yalova").is_none());
        assert_eq!(cache.stats(), (0, 1));
    }

    #[test]
    fn test_same_name_different_district() {
        let mut cache = GeocodeCache::new();
        cache.put("Çarşı", "Merkez", "Yalova", Coords::new(1.0, 1.0));
        assert!(cache.get("Çarşı", "Termal", "Yalova").is_none());
        assert_eq!(cache.len(), 1);
    }
}
