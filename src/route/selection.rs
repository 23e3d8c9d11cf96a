//! The route selection: an ordered set of chosen places with pure
//! transition operations.
//!
//! States: empty → building (one place) → routable (two or more). Every
//! transition is a plain method on the value; rendering subscribes to the
//! result rather than being interleaved with it.

use crate::geo::{haversine_km, Coords};
use crate::places::Category;
use crate::text::fold_turkish;

/// Identity of a selected place. Stored places carry a database id;
/// synthesized places are identified by folded name so two of them never
/// collide the way shared null ids would.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PlaceKey {
    Stored(i64),
    Synthetic(String),
}

/// A place in the selection. Only places with resolved coordinates can
/// be selected; the optimizer and the directions request need them.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectedPlace {
    pub id: Option<i64>,
    pub name: String,
    pub category: Category,
    pub coords: Coords,
}

impl SelectedPlace {
    pub fn key(&self) -> PlaceKey {
        match self.id {
            Some(id) => PlaceKey::Stored(id),
            None => PlaceKey::Synthetic(fold_turkish(&self.name)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionState {
    Empty,
    Building,
    Routable,
}

#[derive(Debug, Clone, Default)]
pub struct RouteSelection {
    places: Vec<SelectedPlace>,
}

impl RouteSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> SelectionState {
        match self.places.len() {
            0 => SelectionState::Empty,
            1 => SelectionState::Building,
            _ => SelectionState::Routable,
        }
    }

    pub fn is_routable(&self) -> bool {
        self.state() == SelectionState::Routable
    }

    pub fn places(&self) -> &[SelectedPlace] {
        &self.places
    }

    pub fn len(&self) -> usize {
        self.places.len()
    }

    pub fn is_empty(&self) -> bool {
        self.places.is_empty()
    }

    /// Append a place unless it is already selected. Returns whether the
    /// selection changed.
    pub fn add(&mut self, place: SelectedPlace) -> bool {
        let key = place.key();
        if self.places.iter().any(|p| p.key() == key) {
            return false;
        }
        self.places.push(place);
        true
    }

    /// Remove a place by key. Returns whether the selection changed.
    pub fn remove(&mut self, key: &PlaceKey) -> bool {
        let before = self.places.len();
        self.places.retain(|p| p.key() != *key);
        self.places.len() != before
    }

    pub fn clear(&mut self) {
        self.places.clear();
    }

    /// Reorder with the greedy nearest-neighbor heuristic: keep the first
    /// place, then repeatedly append the closest unvisited place by
    /// great-circle distance. Ties keep first-encountered order. This is
    /// a heuristic, not a shortest-path guarantee.
    pub fn optimize(&mut self) {
        if self.places.len() < 2 {
            return;
        }

        let mut remaining = std::mem::take(&mut self.places);
        let first = remaining.remove(0);
        let mut current = first.coords;
        let mut ordered = vec![first];

        while !remaining.is_empty() {
            let mut nearest = 0;
            let mut nearest_distance = f64::INFINITY;
            for (i, place) in remaining.iter().enumerate() {
                let d = haversine_km(current, place.coords);
                if d < nearest_distance {
                    nearest_distance = d;
                    nearest = i;
                }
            }
            let next = remaining.remove(nearest);
            current = next.coords;
            ordered.push(next);
        }

        self.places = ordered;
    }

    /// Coordinates in selection order, for the directions request.
    pub fn coords(&self) -> Vec<Coords> {
        self.places.iter().map(|p| p.coords).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place(id: i64, name: &str, lat: f64, lon: f64) -> SelectedPlace {
        SelectedPlace {
            id: Some(id),
            name: name.into(),
            category: Category::Nature,
            coords: Coords::new(lat, lon),
        }
    }

    #[test]
    fn test_state_transitions() {
        let mut sel = RouteSelection::new();
        assert_eq!(sel.state(), SelectionState::Empty);

        sel.add(place(1, "A", 40.0, 29.0));
        assert_eq!(sel.state(), SelectionState::Building);

        sel.add(place(2, "B", 40.1, 29.1));
        assert_eq!(sel.state(), SelectionState::Routable);

        sel.remove(&PlaceKey::Stored(2));
        assert_eq!(sel.state(), SelectionState::Building);

        sel.clear();
        assert_eq!(sel.state(), SelectionState::Empty);
    }

    #[test]
    fn test_add_dedupes_by_id() {
        let mut sel = RouteSelection::new();
        assert!(sel.add(place(1, "A", 40.0, 29.0)));
        assert!(!sel.add(place(1, "A kopyası", 41.0, 30.0)));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_synthetic_places_dedupe_by_name() {
        let mut sel = RouteSelection::new();
        let synth = |name: &str| SelectedPlace {
            id: None,
            name: name.into(),
            category: Category::Food,
            coords: Coords::new(40.0, 29.0),
        };
        assert!(sel.add(synth("Balıkçı Lokantası")));
        assert!(!sel.add(synth("BALIKÇI LOKANTASI")));
        assert!(sel.add(synth("Başka Lokanta")));
        assert_eq!(sel.len(), 2);
    }

    #[test]
    fn test_remove_missing_is_noop() {
        let mut sel = RouteSelection::new();
        sel.add(place(1, "A", 40.0, 29.0));
        assert!(!sel.remove(&PlaceKey::Stored(7)));
        assert_eq!(sel.len(), 1);
    }

    #[test]
    fn test_optimize_matches_manual_greedy() {
        // Start at A (40.0). Nearest to A is C, then B from C.
        let mut sel = RouteSelection::new();
        sel.add(place(1, "A", 40.00, 29.00));
        sel.add(place(2, "B", 40.50, 29.00));
        sel.add(place(3, "C", 40.10, 29.00));
        sel.optimize();

        let order: Vec<&str> = sel.places().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(order, vec!["A", "C", "B"]);
    }

    #[test]
    fn test_optimize_visits_each_exactly_once() {
        let mut sel = RouteSelection::new();
        for (i, (lat, lon)) in [
            (40.65, 29.27),
            (40.61, 29.16),
            (40.70, 29.30),
            (40.57, 28.99),
            (40.66, 29.51),
        ]
        .iter()
        .enumerate()
        {
            sel.add(place(i as i64, &format!("P{}", i), *lat, *lon));
        }

        sel.optimize();

        let mut ids: Vec<i64> = sel.places().iter().map(|p| p.id.unwrap()).collect();
        assert_eq!(ids.len(), 5);
        ids.sort();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        // First place is pinned.
        assert_eq!(sel.places()[0].id, Some(0));
    }

    #[test]
    fn test_optimize_tie_keeps_first_encountered() {
        // B and C are equidistant from A; B was selected first.
        let mut sel = RouteSelection::new();
        sel.add(place(1, "A", 40.0, 29.0));
        sel.add(place(2, "B", 40.2, 29.0));
        sel.add(place(3, "C", 39.8, 29.0));
        sel.optimize();
        assert_eq!(sel.places()[1].name, "B");
    }

    #[test]
    fn test_optimize_small_selections_unchanged() {
        let mut sel = RouteSelection::new();
        sel.optimize();
        assert!(sel.is_empty());

        sel.add(place(1, "A", 40.0, 29.0));
        sel.optimize();
        assert_eq!(sel.len(), 1);
    }
}
