//! The place resolver.
//!
//! Reconciles three sources for one district: the generated content
//! record (preferred), the legacy HTML detail fields (fallback), and the
//! stored `places` rows. Candidates flow strictly in list order; each
//! candidate yields at most one output place.

use super::geocode::GeocodeClient;
use super::types::{Candidate, Place, PlaceError, ResolveFilters, DEFAULT_VISIT_MINUTES};
use crate::content::{parse_place_names_from_html, ContentStore};
use crate::geo::Coords;
use crate::places::Category;
use crate::storage::{DistrictRow, PlaceRow, Storage, StorageError};
use crate::text::fold_turkish;
use std::collections::HashSet;

/// Resolution result for one district.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ResolvedPlaces {
    pub district_id: i64,
    pub district_name: String,
    pub places: Vec<Place>,
}

pub struct PlaceResolver {
    geocoder: GeocodeClient,
}

impl PlaceResolver {
    pub fn new() -> Self {
        Self { geocoder: GeocodeClient::new() }
    }

    /// Build a resolver around a specific geocode client (tests, offline).
    pub fn with_geocoder(geocoder: GeocodeClient) -> Self {
        Self { geocoder }
    }

    pub fn set_offline(&mut self, offline: bool) {
        self.geocoder.set_offline(offline);
    }

    pub fn resolve(
        &mut self,
        storage: &Storage,
        content: &ContentStore,
        district_id: i64,
        filters: &ResolveFilters,
    ) -> Result<ResolvedPlaces, PlaceError> {
        let district = match storage.district_by_id(district_id) {
            Ok(district) => district,
            Err(StorageError::NotFound(msg)) => return Err(PlaceError::NotFound(msg)),
            Err(err) => return Err(PlaceError::Storage(err)),
        };

        let candidates = self.collect_candidates(storage, content, &district)?;
        let stored = storage
            .places_for_district(district_id)
            .map_err(PlaceError::Storage)?;
        let centroid = district.centroid();

        let mut places = Vec::new();
        // Guards the no-duplicate-names-per-category guarantee when two
        // candidates collapse onto the same place.
        let mut seen: HashSet<(Category, String)> = HashSet::new();

        for candidate in candidates {
            if let Some(wanted) = filters.category {
                if candidate.category != wanted {
                    continue;
                }
            }

            let resolved = match find_stored_match(&stored, &candidate) {
                Some(row) => self.resolve_stored(storage, &district, row, filters, centroid),
                None => self.resolve_synthetic(&district, &candidate, centroid),
            };

            if let Some(place) = resolved {
                let key = (place.category, fold_turkish(&place.name));
                if seen.insert(key) {
                    places.push(place);
                }
            }
        }

        Ok(ResolvedPlaces {
            district_id,
            district_name: district.name,
            places,
        })
    }

    /// Candidate names for the district: content record if one exists,
    /// otherwise the legacy HTML fields scraped per category.
    fn collect_candidates(
        &self,
        storage: &Storage,
        content: &ContentStore,
        district: &DistrictRow,
    ) -> Result<Vec<Candidate>, PlaceError> {
        if let Some(record) = content.get(&district.city_name, &district.name) {
            return Ok(record.candidates());
        }

        let Some(detail) = storage
            .district_detail(district.id)
            .map_err(PlaceError::Storage)?
        else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        let fields = [
            (detail.nature_places.as_deref(), Category::Nature),
            (detail.historical_places.as_deref(), Category::History),
            (detail.food_drink.as_deref(), Category::Food),
        ];
        for (html, category) in fields {
            if let Some(html) = html {
                out.extend(parse_place_names_from_html(html).into_iter().map(|name| {
                    Candidate { name, category }
                }));
            }
        }
        Ok(out)
    }

    /// A candidate matched a stored row: apply the cost filter, backfill
    /// missing coordinates, and emit the stored metadata.
    fn resolve_stored(
        &mut self,
        storage: &Storage,
        district: &DistrictRow,
        row: &PlaceRow,
        filters: &ResolveFilters,
        centroid: Option<Coords>,
    ) -> Option<Place> {
        if let Some(wanted) = filters.cost_level {
            if row.cost_level != wanted {
                return None;
            }
        }

        let (latitude, longitude) = match (row.latitude, row.longitude) {
            (Some(lat), Some(lon)) => (Some(lat), Some(lon)),
            _ => {
                match self.geocoder.geocode(
                    &row.name,
                    &district.name,
                    &district.city_name,
                    centroid,
                ) {
                    Some(coords) => {
                        // Persist so resolution is at-most-once per place.
                        // A failed write only logs: the response is the
                        // same either way.
                        if let Err(err) = storage.update_place_coords(row.id, coords) {
                            eprintln!(
                                "[{}] coord write-back failed for place {}: {}",
                                chrono::Utc::now().format("%H:%M:%S"),
                                row.id,
                                err
                            );
                        }
                        (Some(coords.lat), Some(coords.lon))
                    }
                    None => (centroid.map(|c| c.lat), centroid.map(|c| c.lon)),
                }
            }
        };

        Some(Place {
            id: Some(row.id),
            name: row.name.clone(),
            category: row.category,
            description: row.description.clone(),
            latitude,
            longitude,
            average_visit_time: row.average_visit_time,
            cost_level: row.cost_level,
        })
    }

    /// No stored row: geocode the candidate name directly and emit a
    /// synthetic place, falling back to the district centroid. With
    /// neither, the candidate is silently dropped.
    fn resolve_synthetic(
        &mut self,
        district: &DistrictRow,
        candidate: &Candidate,
        centroid: Option<Coords>,
    ) -> Option<Place> {
        let coords = self
            .geocoder
            .geocode(&candidate.name, &district.name, &district.city_name, centroid)
            .or(centroid)?;

        Some(Place {
            id: None,
            name: candidate.name.clone(),
            category: candidate.category,
            description: None,
            latitude: Some(coords.lat),
            longitude: Some(coords.lon),
            average_visit_time: DEFAULT_VISIT_MINUTES,
            cost_level: super::CostLevel::Free,
        })
    }
}

impl Default for PlaceResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// First stored row of the same category whose folded name equals,
/// contains, or is contained by the folded candidate name. Containment
/// either way is deliberately permissive: short names can false-positive,
/// and that tradeoff is kept rather than second-guessed.
fn find_stored_match<'a>(stored: &'a [PlaceRow], candidate: &Candidate) -> Option<&'a PlaceRow> {
    let needle = fold_turkish(&candidate.name);
    if needle.is_empty() {
        return None;
    }
    stored.iter().find(|row| {
        if row.category != candidate.category {
            return false;
        }
        let name = fold_turkish(&row.name);
        name == needle || name.contains(&needle) || needle.contains(&name)
    })
}
