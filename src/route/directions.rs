//! Turn-by-turn directions via the OpenRouteService directions API.
//!
//! The client posts the selection's coordinates to the GeoJSON endpoint
//! for the chosen travel profile and reduces the response to per-leg
//! segments plus totals. Totals are always summed from the legs; the
//! response's own summary block is ignored so the displayed numbers can
//! never disagree with the listed legs.
//!
//! `RoutePlanner` owns the selection, the travel mode, and the displayed
//! route. Every recompute is tagged with a sequence number; a response
//! carrying a stale tag is dropped, so a slow reply for an old selection
//! can never overwrite the route for the current one.

use super::selection::{PlaceKey, RouteSelection, SelectedPlace};
use crate::geo::Coords;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

const ORS_ENDPOINT: &str = "https://api.openrouteservice.org/v2/directions";

// ─── Travel modes ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TravelMode {
    Driving,
    Walking,
    Cycling,
}

impl TravelMode {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "driving" => Some(Self::Driving),
            "walking" => Some(Self::Walking),
            "cycling" => Some(Self::Cycling),
            _ => None,
        }
    }

    /// The OpenRouteService profile name for this mode.
    pub fn profile(&self) -> &'static str {
        match self {
            Self::Driving => "driving-car",
            Self::Walking => "foot-walking",
            Self::Cycling => "cycling-regular",
        }
    }
}

impl Default for TravelMode {
    fn default() -> Self {
        Self::Driving
    }
}

impl fmt::Display for TravelMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Driving => "driving",
            Self::Walking => "walking",
            Self::Cycling => "cycling",
        };
        f.write_str(name)
    }
}

// ─── Errors ──────────────────────────────────────────────────────

/// Directions failures are retryable: the selection is untouched and the
/// previously displayed route stays up.
#[derive(Debug)]
pub enum DirectionsError {
    /// Fewer than two selected places.
    NotRoutable,
    Upstream(String),
    InvalidResponse(String),
}

impl fmt::Display for DirectionsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotRoutable => write!(f, "en az iki yer seçilmelidir"),
            Self::Upstream(msg) => write!(f, "rota servisi hatası: {}", msg),
            Self::InvalidResponse(msg) => write!(f, "geçersiz rota yanıtı: {}", msg),
        }
    }
}

impl std::error::Error for DirectionsError {}

// ─── Response shapes ─────────────────────────────────────────────

/// One leg between consecutive places, in meters and seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteSegment {
    pub distance: f64,
    pub duration: f64,
}

/// Whole-route totals, summed from the legs.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RouteSummary {
    pub distance: f64,
    pub duration: f64,
}

/// A computed route: the ordered legs, their totals, and the geometry
/// passed through for map rendering.
#[derive(Debug, Clone, Serialize)]
pub struct ComputedRoute {
    pub mode: TravelMode,
    pub segments: Vec<RouteSegment>,
    pub summary: RouteSummary,
    pub geometry: Value,
}

#[derive(Deserialize)]
struct OrsResponse {
    #[serde(default)]
    features: Vec<OrsFeature>,
}

#[derive(Deserialize)]
struct OrsFeature {
    properties: OrsProperties,
    #[serde(default)]
    geometry: Value,
}

#[derive(Deserialize)]
struct OrsProperties {
    #[serde(default)]
    segments: Vec<OrsSegment>,
}

/// A response segment. Depending on the profile, distance and duration
/// arrive either as flat fields or nested under `summary`.
#[derive(Deserialize)]
struct OrsSegment {
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    summary: Option<OrsSegmentSummary>,
}

#[derive(Deserialize)]
struct OrsSegmentSummary {
    #[serde(default)]
    distance: Option<f64>,
    #[serde(default)]
    duration: Option<f64>,
}

impl OrsSegment {
    fn flatten(&self) -> RouteSegment {
        let nested = self.summary.as_ref();
        RouteSegment {
            distance: self
                .distance
                .or_else(|| nested.and_then(|s| s.distance))
                .unwrap_or(0.0),
            duration: self
                .duration
                .or_else(|| nested.and_then(|s| s.duration))
                .unwrap_or(0.0),
        }
    }
}

// ─── Transport ───────────────────────────────────────────────────

/// Outbound-call seam; tests substitute a canned transport.
pub trait DirectionsTransport: Send {
    fn post(&self, url: &str, body: &Value) -> Result<Value, DirectionsError>;
}

/// Live OpenRouteService transport over ureq.
pub struct HttpTransport {
    api_key: String,
}

impl HttpTransport {
    pub fn new(api_key: String) -> Self {
        Self { api_key }
    }
}

impl DirectionsTransport for HttpTransport {
    fn post(&self, url: &str, body: &Value) -> Result<Value, DirectionsError> {
        let response = ureq::post(url)
            .set("Authorization", &self.api_key)
            .set("Content-Type", "application/json")
            .send_json(body.clone())
            .map_err(|e| DirectionsError::Upstream(e.to_string()))?;

        response
            .into_json()
            .map_err(|e| DirectionsError::InvalidResponse(e.to_string()))
    }
}

// ─── Client ──────────────────────────────────────────────────────

pub struct DirectionsClient {
    transport: Box<dyn DirectionsTransport>,
}

impl DirectionsClient {
    pub fn new(api_key: String) -> Self {
        Self::with_transport(Box::new(HttpTransport::new(api_key)))
    }

    pub fn with_transport(transport: Box<dyn DirectionsTransport>) -> Self {
        Self { transport }
    }

    /// Request directions through the given coordinates in order.
    pub fn route(
        &self,
        coords: &[Coords],
        mode: TravelMode,
    ) -> Result<ComputedRoute, DirectionsError> {
        if coords.len() < 2 {
            return Err(DirectionsError::NotRoutable);
        }

        let url = format!("{}/{}/geojson", ORS_ENDPOINT, mode.profile());
        // ORS takes [lon, lat] pairs.
        let body = serde_json::json!({
            "coordinates": coords.iter().map(|c| [c.lon, c.lat]).collect::<Vec<_>>(),
        });

        let raw = self.transport.post(&url, &body)?;
        let parsed: OrsResponse = serde_json::from_value(raw)
            .map_err(|e| DirectionsError::InvalidResponse(e.to_string()))?;

        let feature = parsed
            .features
            .into_iter()
            .next()
            .ok_or_else(|| DirectionsError::InvalidResponse("rota bulunamadı".into()))?;

        let segments: Vec<RouteSegment> =
            feature.properties.segments.iter().map(OrsSegment::flatten).collect();
        let summary = RouteSummary {
            distance: segments.iter().map(|s| s.distance).sum(),
            duration: segments.iter().map(|s| s.duration).sum(),
        };

        Ok(ComputedRoute { mode, segments, summary, geometry: feature.geometry })
    }
}

// ─── Planner ─────────────────────────────────────────────────────

/// Coordinates the selection, travel mode, and displayed route.
pub struct RoutePlanner {
    selection: RouteSelection,
    mode: TravelMode,
    seq: u64,
    displayed: Option<ComputedRoute>,
}

impl RoutePlanner {
    pub fn new() -> Self {
        Self {
            selection: RouteSelection::new(),
            mode: TravelMode::default(),
            seq: 0,
            displayed: None,
        }
    }

    pub fn selection(&self) -> &RouteSelection {
        &self.selection
    }

    pub fn mode(&self) -> TravelMode {
        self.mode
    }

    pub fn displayed(&self) -> Option<&ComputedRoute> {
        self.displayed.as_ref()
    }

    pub fn add(&mut self, place: SelectedPlace) -> bool {
        let changed = self.selection.add(place);
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn remove(&mut self, key: &PlaceKey) -> bool {
        let changed = self.selection.remove(key);
        if changed {
            self.invalidate();
        }
        changed
    }

    pub fn clear(&mut self) {
        self.selection.clear();
        self.invalidate();
    }

    pub fn set_mode(&mut self, mode: TravelMode) {
        if self.mode != mode {
            self.mode = mode;
            self.invalidate();
        }
    }

    pub fn optimize(&mut self) {
        self.selection.optimize();
        self.invalidate();
    }

    /// Start a recompute for the current selection. The returned tag must
    /// accompany the response to `apply`.
    pub fn begin_request(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    /// Install a computed route. Only the most recently issued tag is
    /// accepted; responses for superseded requests return false and leave
    /// the displayed route alone.
    pub fn apply(&mut self, tag: u64, route: ComputedRoute) -> bool {
        if tag != self.seq {
            return false;
        }
        self.displayed = Some(route);
        true
    }

    fn invalidate(&mut self) {
        // Retire any in-flight request so its reply cannot land on the
        // changed selection.
        self.seq += 1;
        if !self.selection.is_routable() {
            self.displayed = None;
        }
    }
}

impl Default for RoutePlanner {
    fn default() -> Self {
        Self::new()
    }
}
