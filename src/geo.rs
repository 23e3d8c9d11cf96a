//! Great-circle geometry helpers.

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// A latitude/longitude pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coords {
    pub lat: f64,
    pub lon: f64,
}

impl Coords {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Haversine distance between two points, in kilometers.
pub fn haversine_km(a: Coords, b: Coords) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lon = (b.lon - a.lon).to_radians();
    let h = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());
    EARTH_RADIUS_KM * c
}

/// Bounding box around `center` with the given radius, formatted as the
/// `viewbox` parameter Nominatim expects: `min_lon,min_lat,max_lon,max_lat`.
pub fn viewbox(center: Coords, radius_km: f64) -> String {
    // ~111 km per degree of latitude; longitude shrinks with cos(lat).
    let lat_offset = radius_km / 111.0;
    let lon_offset = radius_km / (111.0 * center.lat.to_radians().cos());
    format!(
        "{},{},{},{}",
        center.lon - lon_offset,
        center.lat - lat_offset,
        center.lon + lon_offset,
        center.lat + lat_offset,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const YALOVA: Coords = Coords { lat: 40.65, lon: 29.2667 };
    const ISTANBUL: Coords = Coords { lat: 41.0082, lon: 28.9784 };

    #[test]
    fn test_haversine_zero() {
        assert_relative_eq!(haversine_km(YALOVA, YALOVA), 0.0);
    }

    #[test]
    fn test_haversine_symmetric() {
        assert_relative_eq!(
            haversine_km(YALOVA, ISTANBUL),
            haversine_km(ISTANBUL, YALOVA),
            epsilon = 1e-9
        );
    }

    #[test]
    fn test_haversine_known_distance() {
        // Yalova to Istanbul is roughly 46 km as the crow flies.
        let d = haversine_km(YALOVA, ISTANBUL);
        assert!((40.0..55.0).contains(&d), "got {}", d);
    }

    #[test]
    fn test_haversine_antipodal_bound() {
        let a = Coords::new(0.0, 0.0);
        let b = Coords::new(0.0, 180.0);
        let d = haversine_km(a, b);
        // Half the Earth's circumference.
        assert_relative_eq!(d, std::f64::consts::PI * 6371.0, epsilon = 1.0);
    }

    #[test]
    fn test_viewbox_ordering() {
        let vb = viewbox(YALOVA, 30.0);
        let parts: Vec<f64> = vb.split(',').map(|p| p.parse().unwrap()).collect();
        assert_eq!(parts.len(), 4);
        assert!(parts[0] < parts[2]); // min_lon < max_lon
        assert!(parts[1] < parts[3]); // min_lat < max_lat
    }
}
