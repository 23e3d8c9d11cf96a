//! Geocoding backfill via OpenStreetMap Nominatim.
//!
//! Lookups walk a ladder of increasingly qualified queries, from the bare
//! place name up to "name, district, province, Türkiye". When the
//! district centroid is known, candidates farther than the tolerance are
//! rejected and the nearest surviving candidate wins; without a centroid
//! the first candidate is accepted as-is.
//!
//! Every failure mode here (HTTP error, empty result set, everything out
//! of tolerance) is non-fatal: the ladder advances, and an exhausted
//! ladder reports no coordinates.

use super::cache::GeocodeCache;
use crate::geo::{self, Coords};
use serde::Deserialize;
use std::fmt;
use std::time::Duration;

/// Distance tolerance from the district centroid, in kilometers.
/// Generous on purpose: Nominatim places some results at the province
/// level rather than the exact site.
pub const CENTROID_TOLERANCE_KM: f64 = 75.0;

/// Fixed pre-call delay honoring Nominatim's usage policy.
pub const REQUEST_DELAY: Duration = Duration::from_millis(500);

const USER_AGENT: &str = "gezgin/0.3 (travel-info server)";

// ─── Transport ───────────────────────────────────────────────────

#[derive(Debug)]
pub enum GeocodeError {
    Network(String),
    InvalidResponse(String),
}

impl fmt::Display for GeocodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network error: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "invalid geocoder response: {}", msg),
        }
    }
}

impl std::error::Error for GeocodeError {}

#[derive(Deserialize, Debug, Clone)]
pub struct NominatimResult {
    pub lat: String,
    pub lon: String,
}

/// Outbound-call seam; tests substitute a canned transport and count calls.
pub trait GeocodeTransport: Send {
    fn search(&self, url: &str) -> Result<Vec<NominatimResult>, GeocodeError>;
}

/// Live Nominatim transport over ureq.
pub struct HttpTransport;

impl GeocodeTransport for HttpTransport {
    fn search(&self, url: &str) -> Result<Vec<NominatimResult>, GeocodeError> {
        let response = ureq::get(url)
            .set("User-Agent", USER_AGENT)
            .set("Accept-Language", "tr")
            .call()
            .map_err(|e| GeocodeError::Network(e.to_string()))?;

        response
            .into_json()
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))
    }
}

// ─── Client ──────────────────────────────────────────────────────

pub struct GeocodeClient {
    transport: Box<dyn GeocodeTransport>,
    cache: GeocodeCache,
    delay: Duration,
    tolerance_km: f64,
    offline: bool,
}

impl GeocodeClient {
    pub fn new() -> Self {
        Self::with_transport(Box::new(HttpTransport), REQUEST_DELAY)
    }

    pub fn with_transport(transport: Box<dyn GeocodeTransport>, delay: Duration) -> Self {
        Self {
            transport,
            cache: GeocodeCache::new(),
            delay,
            tolerance_km: CENTROID_TOLERANCE_KM,
            offline: false,
        }
    }

    /// Skip all outbound calls; only the cache answers.
    pub fn set_offline(&mut self, offline: bool) {
        self.offline = offline;
    }

    pub fn cache(&self) -> &GeocodeCache {
        &self.cache
    }

    /// Resolve a place name to coordinates, or `None` when every query
    /// variant fails. Successful lookups are cached for the process
    /// lifetime; persisting them is the caller's job.
    pub fn geocode(
        &mut self,
        name: &str,
        district: &str,
        province: &str,
        centroid: Option<Coords>,
    ) -> Option<Coords> {
        if let Some(coords) = self.cache.get(name, district, province) {
            return Some(coords);
        }
        if self.offline {
            return None;
        }

        for query in query_ladder(name, district, province) {
            std::thread::sleep(self.delay);

            let url = self.build_url(&query, centroid);
            let results = match self.transport.search(&url) {
                Ok(results) => results,
                Err(err) => {
                    eprintln!(
                        "[{}] geocode \"{}\": {}",
                        chrono::Utc::now().format("%H:%M:%S"),
                        query,
                        err
                    );
                    continue;
                }
            };

            if let Some(coords) = self.pick_candidate(&results, centroid) {
                self.cache.put(name, district, province, coords);
                return Some(coords);
            }
        }

        None
    }

    fn build_url(&self, query: &str, centroid: Option<Coords>) -> String {
        let mut url = format!(
            "https://nominatim.openstreetmap.org/search?q={}&format=json&limit=10&addressdetails=1&countrycodes=tr",
            urlencode(query),
        );
        if let Some(center) = centroid {
            // Bias (not restrict) results toward the district.
            url.push_str("&viewbox=");
            url.push_str(&urlencode(&geo::viewbox(center, 30.0)));
        }
        url
    }

    /// With a centroid: nearest candidate within tolerance, if any.
    /// Without one: the first candidate with parseable coordinates.
    fn pick_candidate(
        &self,
        results: &[NominatimResult],
        centroid: Option<Coords>,
    ) -> Option<Coords> {
        let mut best: Option<(Coords, f64)> = None;

        for result in results {
            let (Ok(lat), Ok(lon)) = (result.lat.parse::<f64>(), result.lon.parse::<f64>())
            else {
                continue;
            };
            let coords = Coords::new(lat, lon);

            let Some(center) = centroid else {
                return Some(coords);
            };

            let distance = geo::haversine_km(center, coords);
            if distance > self.tolerance_km {
                continue;
            }
            if best.map_or(true, |(_, d)| distance < d) {
                best = Some((coords, distance));
            }
        }

        best.map(|(coords, _)| coords)
    }
}

impl Default for GeocodeClient {
    fn default() -> Self {
        Self::new()
    }
}

/// The query ladder, least to most qualified. Matches the order the
/// batch geocoding pass used.
fn query_ladder(name: &str, district: &str, province: &str) -> Vec<String> {
    vec![
        name.to_string(),
        format!("{}, Türkiye", name),
        format!("{}, {}", name, district),
        format!("{}, {}, Türkiye", name, district),
        format!("{}, {}", name, province),
        format!("{}, {}, Türkiye", name, province),
        format!("{}, {}, {}, Türkiye", name, district, province),
    ]
}

fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            ' ' => "%20".to_string(),
            '&' => "%26".to_string(),
            '=' => "%3D".to_string(),
            '+' => "%2B".to_string(),
            ',' => "%2C".to_string(),
            _ if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' || c == '~' => {
                c.to_string()
            }
            _ => {
                let mut buf = [0u8; 4];
                c.encode_utf8(&mut buf)
                    .bytes()
                    .map(|b| format!("%{:02X}", b))
                    .collect()
            }
        })
        .collect()
}
