//! SQLite storage layer.
//!
//! Schema and query shapes follow the legacy database (`gezgin`): cities,
//! districts with centroid coordinates, per-district HTML detail fields,
//! a `places` table with optional coordinates, plus users and the shared
//! route tables.

use crate::geo::Coords;
use crate::places::{Category, CostLevel};
use rusqlite::{params, Connection, OptionalExtension};
use std::fmt;
use std::path::Path;

// ─── Errors ──────────────────────────────────────────────────────

#[derive(Debug)]
pub enum StorageError {
    Open(String),
    Query(String),
    NotFound(String),
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Open(msg) => write!(f, "cannot open database: {}", msg),
            Self::Query(msg) => write!(f, "query failed: {}", msg),
            Self::NotFound(what) => write!(f, "{}", what),
        }
    }
}

impl std::error::Error for StorageError {}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Query(err.to_string())
    }
}

// ─── Row types ───────────────────────────────────────────────────

#[derive(Debug, Clone, serde::Serialize)]
pub struct CityRow {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Clone)]
pub struct DistrictRow {
    pub id: i64,
    pub name: String,
    pub city_id: i64,
    pub city_name: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl DistrictRow {
    /// District centroid, if both coordinates are present.
    pub fn centroid(&self) -> Option<Coords> {
        match (self.latitude, self.longitude) {
            (Some(lat), Some(lon)) => Some(Coords::new(lat, lon)),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DistrictDetailRow {
    pub general_info: Option<String>,
    pub nature_places: Option<String>,
    pub historical_places: Option<String>,
    pub food_drink: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PlaceRow {
    pub id: i64,
    pub name: String,
    pub category: Category,
    pub description: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub cost_level: CostLevel,
    pub average_visit_time: u32,
}

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: i64,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct SharedRouteRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub owner_id: i64,
    pub owner_email: String,
    pub created_at: String,
    pub participant_count: i64,
}

// ─── Storage ─────────────────────────────────────────────────────

pub struct Storage {
    conn: Connection,
}

impl Storage {
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        let conn = Connection::open(path).map_err(|e| StorageError::Open(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Self { conn };
        storage.ensure_schema()?;
        Ok(storage)
    }

    /// In-memory database (tests).
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn =
            Connection::open_in_memory().map_err(|e| StorageError::Open(e.to_string()))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Self { conn };
        storage.ensure_schema()?;
        Ok(storage)
    }

    fn ensure_schema(&self) -> Result<(), StorageError> {
        self.conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS cities (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL
            );
            CREATE TABLE IF NOT EXISTS districts (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                city_id INTEGER NOT NULL REFERENCES cities(id),
                latitude REAL,
                longitude REAL
            );
            CREATE TABLE IF NOT EXISTS district_details (
                id INTEGER PRIMARY KEY,
                district_id INTEGER NOT NULL UNIQUE REFERENCES districts(id),
                general_info TEXT,
                nature_places TEXT,
                historical_places TEXT,
                food_drink TEXT
            );
            CREATE TABLE IF NOT EXISTS places (
                id INTEGER PRIMARY KEY,
                district_id INTEGER NOT NULL REFERENCES districts(id),
                name TEXT NOT NULL,
                category TEXT NOT NULL,
                description TEXT,
                latitude REAL,
                longitude REAL,
                cost_level TEXT,
                average_visit_time INTEGER
            );
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY,
                email TEXT NOT NULL UNIQUE,
                password TEXT NOT NULL,
                age INTEGER NOT NULL,
                city_id INTEGER NOT NULL REFERENCES cities(id)
            );
            CREATE TABLE IF NOT EXISTS routes (
                id INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                description TEXT,
                owner_id INTEGER NOT NULL REFERENCES users(id),
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
            );
            CREATE TABLE IF NOT EXISTS route_participants (
                id INTEGER PRIMARY KEY,
                route_id INTEGER NOT NULL REFERENCES routes(id) ON DELETE CASCADE,
                user_id INTEGER NOT NULL REFERENCES users(id),
                UNIQUE (route_id, user_id)
            );",
        )?;
        Ok(())
    }

    // ─── Cities and districts ────────────────────────────────────

    pub fn list_cities(&self) -> Result<Vec<CityRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name FROM cities ORDER BY name ASC")?;
        let rows = stmt
            .query_map([], |row| {
                Ok(CityRow { id: row.get(0)?, name: row.get(1)? })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn districts_by_city(&self, city_id: i64) -> Result<Vec<(i64, String, i64)>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, city_id FROM districts WHERE city_id = ?1 ORDER BY name",
        )?;
        let rows = stmt
            .query_map([city_id], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn district_by_id(&self, district_id: i64) -> Result<DistrictRow, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT d.id, d.name, d.city_id, c.name, d.latitude, d.longitude
             FROM districts d JOIN cities c ON d.city_id = c.id
             WHERE d.id = ?1",
        )?;
        stmt.query_row([district_id], |row| {
            Ok(DistrictRow {
                id: row.get(0)?,
                name: row.get(1)?,
                city_id: row.get(2)?,
                city_name: row.get(3)?,
                latitude: row.get(4)?,
                longitude: row.get(5)?,
            })
        })
        .optional()?
        .ok_or_else(|| StorageError::NotFound("İlçe bulunamadı".into()))
    }

    pub fn city_exists(&self, city_id: i64) -> Result<bool, StorageError> {
        let found: Option<i64> = self
            .conn
            .query_row("SELECT id FROM cities WHERE id = ?1", [city_id], |row| row.get(0))
            .optional()?;
        Ok(found.is_some())
    }

    // ─── District details ────────────────────────────────────────

    pub fn district_detail(
        &self,
        district_id: i64,
    ) -> Result<Option<DistrictDetailRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT general_info, nature_places, historical_places, food_drink
             FROM district_details WHERE district_id = ?1",
        )?;
        let row = stmt
            .query_row([district_id], |row| {
                Ok(DistrictDetailRow {
                    general_info: row.get(0)?,
                    nature_places: row.get(1)?,
                    historical_places: row.get(2)?,
                    food_drink: row.get(3)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    pub fn upsert_district_detail(
        &self,
        district_id: i64,
        detail: &DistrictDetailRow,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO district_details
                (district_id, general_info, nature_places, historical_places, food_drink)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT (district_id) DO UPDATE SET
                general_info = ?2, nature_places = ?3,
                historical_places = ?4, food_drink = ?5",
            params![
                district_id,
                detail.general_info,
                detail.nature_places,
                detail.historical_places,
                detail.food_drink,
            ],
        )?;
        Ok(())
    }

    // ─── Places ──────────────────────────────────────────────────

    pub fn places_for_district(&self, district_id: i64) -> Result<Vec<PlaceRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, category, description, latitude, longitude,
                    cost_level, average_visit_time
             FROM places WHERE district_id = ?1 ORDER BY id",
        )?;
        let rows = stmt
            .query_map([district_id], |row| {
                let category: String = row.get(2)?;
                let cost: Option<String> = row.get(6)?;
                let visit: Option<u32> = row.get(7)?;
                Ok(PlaceRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    category: Category::parse(&category).unwrap_or(Category::Nature),
                    description: row.get(3)?,
                    latitude: row.get(4)?,
                    longitude: row.get(5)?,
                    cost_level: cost
                        .as_deref()
                        .and_then(CostLevel::parse)
                        .unwrap_or(CostLevel::Free),
                    average_visit_time: visit.unwrap_or(60),
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn update_place_coords(
        &self,
        place_id: i64,
        coords: Coords,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "UPDATE places SET latitude = ?1, longitude = ?2 WHERE id = ?3",
            params![coords.lat, coords.lon, place_id],
        )?;
        Ok(())
    }

    // ─── Users ───────────────────────────────────────────────────

    pub fn insert_user(
        &self,
        email: &str,
        password: &str,
        age: u32,
        city_id: i64,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO users (email, password, age, city_id) VALUES (?1, ?2, ?3, ?4)",
            params![email, password, age, city_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn user_by_email(&self, email: &str) -> Result<Option<UserRow>, StorageError> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, email, password FROM users WHERE email = ?1")?;
        let row = stmt
            .query_row([email], |row| {
                Ok(UserRow {
                    id: row.get(0)?,
                    email: row.get(1)?,
                    password: row.get(2)?,
                })
            })
            .optional()?;
        Ok(row)
    }

    // ─── Shared routes ───────────────────────────────────────────

    pub fn list_shared_routes(&self) -> Result<Vec<SharedRouteRow>, StorageError> {
        let mut stmt = self.conn.prepare(
            "SELECT r.id, r.name, r.description, r.owner_id, u.email,
                    r.created_at, COUNT(rp.id)
             FROM routes r
             JOIN users u ON r.owner_id = u.id
             LEFT JOIN route_participants rp ON r.id = rp.route_id
             GROUP BY r.id
             ORDER BY r.created_at DESC, r.id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(SharedRouteRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    description: row.get(2)?,
                    owner_id: row.get(3)?,
                    owner_email: row.get(4)?,
                    created_at: row.get(5)?,
                    participant_count: row.get(6)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn insert_shared_route(
        &self,
        name: &str,
        description: Option<&str>,
        owner_id: i64,
    ) -> Result<i64, StorageError> {
        self.conn.execute(
            "INSERT INTO routes (name, description, owner_id) VALUES (?1, ?2, ?3)",
            params![name, description, owner_id],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn shared_route_owner(&self, route_id: i64) -> Result<Option<i64>, StorageError> {
        let owner: Option<i64> = self
            .conn
            .query_row("SELECT owner_id FROM routes WHERE id = ?1", [route_id], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(owner)
    }

    pub fn delete_shared_route(&self, route_id: i64) -> Result<(), StorageError> {
        self.conn
            .execute("DELETE FROM routes WHERE id = ?1", [route_id])?;
        Ok(())
    }

    pub fn is_route_participant(
        &self,
        route_id: i64,
        user_id: i64,
    ) -> Result<bool, StorageError> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM route_participants WHERE route_id = ?1 AND user_id = ?2",
                [route_id, user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn add_route_participant(
        &self,
        route_id: i64,
        user_id: i64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "INSERT INTO route_participants (route_id, user_id) VALUES (?1, ?2)",
            [route_id, user_id],
        )?;
        Ok(())
    }

    pub fn remove_route_participant(
        &self,
        route_id: i64,
        user_id: i64,
    ) -> Result<(), StorageError> {
        self.conn.execute(
            "DELETE FROM route_participants WHERE route_id = ?1 AND user_id = ?2",
            [route_id, user_id],
        )?;
        Ok(())
    }

    // ─── Test fixtures ───────────────────────────────────────────

    #[cfg(test)]
    pub fn insert_city(&self, name: &str) -> i64 {
        self.conn
            .execute("INSERT INTO cities (name) VALUES (?1)", [name])
            .unwrap();
        self.conn.last_insert_rowid()
    }

    #[cfg(test)]
    pub fn insert_district(
        &self,
        name: &str,
        city_id: i64,
        centroid: Option<Coords>,
    ) -> i64 {
        self.conn
            .execute(
                "INSERT INTO districts (name, city_id, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4)",
                params![name, city_id, centroid.map(|c| c.lat), centroid.map(|c| c.lon)],
            )
            .unwrap();
        self.conn.last_insert_rowid()
    }

    #[cfg(test)]
    pub fn insert_place(
        &self,
        district_id: i64,
        name: &str,
        category: Category,
        coords: Option<Coords>,
    ) -> i64 {
        self.conn
            .execute(
                "INSERT INTO places (district_id, name, category, latitude, longitude)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    district_id,
                    name,
                    category.as_str(),
                    coords.map(|c| c.lat),
                    coords.map(|c| c.lon),
                ],
            )
            .unwrap();
        self.conn.last_insert_rowid()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded() -> (Storage, i64, i64) {
        let storage = Storage::open_in_memory().unwrap();
        let city = storage.insert_city("Yalova");
        let district =
            storage.insert_district("Merkez", city, Some(Coords::new(40.65, 29.2667)));
        (storage, city, district)
    }

    #[test]
    fn test_district_lookup() {
        let (storage, city, district) = seeded();
        let row = storage.district_by_id(district).unwrap();
        assert_eq!(row.name, "Merkez");
        assert_eq!(row.city_id, city);
        assert_eq!(row.city_name, "Yalova");
        assert!(row.centroid().is_some());
    }

    #[test]
    fn test_district_not_found() {
        let (storage, _, _) = seeded();
        match storage.district_by_id(999) {
            Err(StorageError::NotFound(_)) => {}
            other => panic!("expected NotFound, got {:?}", other.map(|r| r.name)),
        }
    }

    #[test]
    fn test_districts_ordered_by_name() {
        let (storage, city, _) = seeded();
        storage.insert_district("Çınarcık", city, None);
        storage.insert_district("Altınova", city, None);
        let names: Vec<String> = storage
            .districts_by_city(city)
            .unwrap()
            .into_iter()
            .map(|(_, name, _)| name)
            .collect();
        assert_eq!(names[0], "Altınova");
    }

    #[test]
    fn test_place_defaults() {
        let (storage, _, district) = seeded();
        storage.insert_place(district, "X Parkı", Category::Nature, None);
        let places = storage.places_for_district(district).unwrap();
        assert_eq!(places.len(), 1);
        assert_eq!(places[0].cost_level, CostLevel::Free);
        assert_eq!(places[0].average_visit_time, 60);
        assert!(places[0].latitude.is_none());
    }

    #[test]
    fn test_coord_write_back() {
        let (storage, _, district) = seeded();
        let id = storage.insert_place(district, "X Parkı", Category::Nature, None);
        storage
            .update_place_coords(id, Coords::new(40.66, 29.28))
            .unwrap();
        let places = storage.places_for_district(district).unwrap();
        assert_eq!(places[0].latitude, Some(40.66));
        assert_eq!(places[0].longitude, Some(29.28));
    }

    #[test]
    fn test_detail_upsert() {
        let (storage, _, district) = seeded();
        assert!(storage.district_detail(district).unwrap().is_none());

        let detail = DistrictDetailRow {
            general_info: Some("Yalova merkez ilçesi".into()),
            nature_places: Some("<ul><li>X Parkı</li></ul>".into()),
            ..Default::default()
        };
        storage.upsert_district_detail(district, &detail).unwrap();

        let detail2 = DistrictDetailRow {
            general_info: Some("güncellendi".into()),
            ..Default::default()
        };
        storage.upsert_district_detail(district, &detail2).unwrap();

        let loaded = storage.district_detail(district).unwrap().unwrap();
        assert_eq!(loaded.general_info.as_deref(), Some("güncellendi"));
        assert!(loaded.nature_places.is_none());
    }

    #[test]
    fn test_shared_route_lifecycle() {
        let (storage, city, _) = seeded();
        let owner = storage.insert_user("a@gmail.com", "secret", 30, city).unwrap();
        let member = storage.insert_user("b@gmail.com", "secret", 25, city).unwrap();

        let route = storage
            .insert_shared_route("Yalova turu", Some("hafta sonu"), owner)
            .unwrap();
        assert_eq!(storage.shared_route_owner(route).unwrap(), Some(owner));

        storage.add_route_participant(route, member).unwrap();
        assert!(storage.is_route_participant(route, member).unwrap());
        // Duplicate join violates the unique constraint.
        assert!(storage.add_route_participant(route, member).is_err());

        let listed = storage.list_shared_routes().unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].participant_count, 1);
        assert_eq!(listed[0].owner_email, "a@gmail.com");

        storage.delete_shared_route(route).unwrap();
        assert!(storage.list_shared_routes().unwrap().is_empty());
        // CASCADE removed the participant row.
        assert!(!storage.is_route_participant(route, member).unwrap());
    }

    #[test]
    fn test_open_creates_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gezgin.db");
        {
            let storage = Storage::open(&path).unwrap();
            storage.insert_city("Yalova");
        }
        let storage = Storage::open(&path).unwrap();
        assert_eq!(storage.list_cities().unwrap().len(), 1);
    }

    #[test]
    fn test_duplicate_email_rejected() {
        let (storage, city, _) = seeded();
        storage.insert_user("a@gmail.com", "x", 20, city).unwrap();
        assert!(storage.insert_user("a@gmail.com", "y", 21, city).is_err());
    }
}
