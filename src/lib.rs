//! Gezgin — travel-information server for Turkish provinces and
//! districts.
//!
//! Reconciles AI-generated structured content, legacy HTML detail
//! fields, and a relational places table into a single place list per
//! district; backfills missing coordinates via Nominatim with caching
//! and distance validation; and plans multi-stop routes (nearest
//! neighbor ordering + OpenRouteService directions).

pub mod auth;
pub mod content;
pub mod error;
pub mod geo;
pub mod places;
pub mod route;
pub mod server;
pub mod storage;
pub mod text;
