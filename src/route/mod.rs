//! Route planning: selection state, nearest-neighbor ordering, and
//! directions retrieval.

pub mod directions;
pub mod selection;

pub use directions::{
    ComputedRoute, DirectionsClient, DirectionsError, RoutePlanner, RouteSegment, RouteSummary,
    TravelMode,
};
pub use selection::{PlaceKey, RouteSelection, SelectedPlace, SelectionState};
