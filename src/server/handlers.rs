use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap};
use axum::response::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Instant;

use crate::auth::AuthUser;
use crate::content::merge_detail;
use crate::error::ApiError;
use crate::places::{Category, CostLevel, ResolveFilters, ResolvedPlaces};
use crate::storage::{CityRow, DistrictDetailRow, SharedRouteRow};
use crate::text::fold_turkish;

use super::state::AppState;

// ─── Auth helpers ────────────────────────────────────────────────

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthUser, ApiError> {
    let token = bearer_token(headers)
        .ok_or_else(|| ApiError::Unauthorized("Token gerekli".into()))?;
    Ok(state.auth.verify(token)?)
}

/// Like `require_user`, but a missing or bad token just means anonymous.
fn optional_user(state: &AppState, headers: &HeaderMap) -> Option<AuthUser> {
    bearer_token(headers).and_then(|token| state.auth.verify(token).ok())
}

// ─── GET /api/cities ─────────────────────────────────────────────

pub async fn cities(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CityRow>>, ApiError> {
    let storage = state.storage.lock().unwrap();
    Ok(Json(storage.list_cities()?))
}

// ─── GET /api/districts?city=<slug> ──────────────────────────────

#[derive(Deserialize)]
pub struct DistrictsQuery {
    pub city: Option<String>,
}

#[derive(Serialize)]
pub struct DistrictEntry {
    pub id: i64,
    pub name: String,
    pub district_name: String,
    pub city_id: i64,
}

pub async fn districts(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DistrictsQuery>,
) -> Result<Json<Vec<DistrictEntry>>, ApiError> {
    let slug = params
        .city
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Şehir parametresi gerekli".into()))?;
    let folded = fold_turkish(slug);

    let storage = state.storage.lock().unwrap();
    // The slug may differ from the stored name in case and diacritics;
    // match on folded forms. An unknown city is an empty list, not 404.
    let Some(city) = storage
        .list_cities()?
        .into_iter()
        .find(|c| fold_turkish(&c.name) == folded)
    else {
        return Ok(Json(Vec::new()));
    };

    let entries = storage
        .districts_by_city(city.id)?
        .into_iter()
        .map(|(id, name, city_id)| DistrictEntry {
            id,
            district_name: name.clone(),
            name,
            city_id,
        })
        .collect();
    Ok(Json(entries))
}

// ─── GET /api/district/{id} ──────────────────────────────────────

#[derive(Serialize)]
pub struct DistrictDetailResponse {
    pub id: i64,
    pub name: String,
    pub city_id: i64,
    pub city_name: String,
    pub general_info: String,
    pub nature_places: String,
    pub historical_places: String,
    pub food_drink: String,
}

pub async fn district_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<DistrictDetailResponse>, ApiError> {
    let storage = state.storage.lock().unwrap();
    let district = storage.district_by_id(id)?;
    let legacy = storage.district_detail(id)?;
    let record = state.content.get(&district.city_name, &district.name);
    let merged = merge_detail(record, legacy.as_ref());

    Ok(Json(DistrictDetailResponse {
        id: district.id,
        name: district.name,
        city_id: district.city_id,
        city_name: district.city_name,
        general_info: merged.general_info,
        nature_places: merged.nature_places,
        historical_places: merged.historical_places,
        food_drink: merged.food_drink,
    }))
}

// ─── POST /api/district/{id}/details ─────────────────────────────

#[derive(Deserialize)]
pub struct DetailUpdateBody {
    pub general_info: Option<String>,
    pub nature_places: Option<String>,
    pub historical_places: Option<String>,
    pub food_drink: Option<String>,
}

pub async fn update_district_detail(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Json(body): Json<DetailUpdateBody>,
) -> Result<Json<Value>, ApiError> {
    require_user(&state, &headers)?;

    let storage = state.storage.lock().unwrap();
    storage.district_by_id(id)?;
    storage.upsert_district_detail(
        id,
        &DistrictDetailRow {
            general_info: body.general_info,
            nature_places: body.nature_places,
            historical_places: body.historical_places,
            food_drink: body.food_drink,
        },
    )?;

    Ok(Json(json!({ "success": true, "message": "İlçe detayları kaydedildi" })))
}

// ─── GET /api/districts/{id}/places ──────────────────────────────

#[derive(Deserialize)]
pub struct PlacesQuery {
    pub category: Option<String>,
    pub cost_level: Option<String>,
}

pub async fn district_places(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
    Query(params): Query<PlacesQuery>,
) -> Result<Json<ResolvedPlaces>, ApiError> {
    require_user(&state, &headers)?;
    let start = Instant::now();

    let filters = ResolveFilters {
        category: match params.category.as_deref() {
            Some(raw) => Some(
                Category::parse(raw)
                    .ok_or_else(|| ApiError::Validation("Geçersiz kategori".into()))?,
            ),
            None => None,
        },
        cost_level: match params.cost_level.as_deref() {
            Some(raw) => Some(
                CostLevel::parse(raw)
                    .ok_or_else(|| ApiError::Validation("Geçersiz maliyet seviyesi".into()))?,
            ),
            None => None,
        },
    };

    let resolved = {
        let storage = state.storage.lock().unwrap();
        let mut resolver = state.resolver.lock().unwrap();
        resolver.resolve(&storage, &state.content, id, &filters)?
    };

    let elapsed = start.elapsed();
    eprintln!(
        "[{}] GET /api/districts/{}/places -> {} yer ({:.1}ms)",
        Utc::now().format("%H:%M:%S"),
        id,
        resolved.places.len(),
        elapsed.as_secs_f64() * 1000.0,
    );

    Ok(Json(resolved))
}

// ─── POST /api/register ──────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterBody {
    pub email: Option<String>,
    pub password: Option<String>,
    pub age: Option<i64>,
    pub city_id: Option<i64>,
}

pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> Result<Json<Value>, ApiError> {
    let user_id = {
        let storage = state.storage.lock().unwrap();
        state.auth.register(
            &storage,
            body.email.as_deref(),
            body.password.as_deref(),
            body.age,
            body.city_id,
        )?
    };

    eprintln!(
        "[{}] POST /api/register -> kullanıcı {}",
        Utc::now().format("%H:%M:%S"),
        user_id,
    );

    Ok(Json(json!({
        "success": true,
        "message": "Kullanıcı başarıyla kaydedildi",
        "userId": user_id,
    })))
}

// ─── POST /api/login ─────────────────────────────────────────────

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: Option<String>,
    pub password: Option<String>,
}

pub async fn login(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<Value>, ApiError> {
    let session = {
        let storage = state.storage.lock().unwrap();
        state
            .auth
            .login(&storage, body.email.as_deref(), body.password.as_deref())?
    };

    Ok(Json(json!({
        "success": true,
        "message": "Giriş başarılı",
        "token": session.token,
        "user": { "id": session.user.id, "email": session.user.email },
    })))
}

// ─── GET /api/verify ─────────────────────────────────────────────

pub async fn verify(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers)?;
    Ok(Json(json!({ "success": true, "user": user })))
}

// ─── GET /api/routes ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct RouteEntry {
    #[serde(flatten)]
    pub route: SharedRouteRow,
    pub is_owner: bool,
    pub is_participant: bool,
}

pub async fn list_routes(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<RouteEntry>>, ApiError> {
    let viewer = optional_user(&state, &headers);

    let storage = state.storage.lock().unwrap();
    let mut entries = Vec::new();
    for route in storage.list_shared_routes()? {
        let (is_owner, is_participant) = match &viewer {
            Some(user) => (
                route.owner_id == user.id,
                storage.is_route_participant(route.id, user.id)?,
            ),
            None => (false, false),
        };
        entries.push(RouteEntry { route, is_owner, is_participant });
    }
    Ok(Json(entries))
}

// ─── POST /api/routes ────────────────────────────────────────────

#[derive(Deserialize)]
pub struct CreateRouteBody {
    pub name: Option<String>,
    pub description: Option<String>,
}

pub async fn create_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(body): Json<CreateRouteBody>,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers)?;

    let name = body
        .name
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::Validation("Rota adı gerekli".into()))?;
    if name.chars().count() > 255 {
        return Err(ApiError::Validation(
            "Rota adı en fazla 255 karakter olabilir".into(),
        ));
    }
    let description = body
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let route_id = {
        let storage = state.storage.lock().unwrap();
        storage.insert_shared_route(name, description, user.id)?
    };

    Ok(Json(json!({
        "success": true,
        "message": "Rota başarıyla oluşturuldu",
        "route": {
            "id": route_id,
            "name": name,
            "description": description,
            "owner_id": user.id,
        },
    })))
}

// ─── DELETE /api/routes/{id} ─────────────────────────────────────

pub async fn delete_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers)?;

    let storage = state.storage.lock().unwrap();
    let owner = storage
        .shared_route_owner(id)?
        .ok_or_else(|| ApiError::NotFound("Rota bulunamadı".into()))?;
    if owner != user.id {
        return Err(ApiError::Forbidden("Bu rotayı silme yetkiniz yok".into()));
    }
    storage.delete_shared_route(id)?;

    Ok(Json(json!({ "success": true, "message": "Rota başarıyla silindi" })))
}

// ─── POST /api/routes/{id}/join ──────────────────────────────────

pub async fn join_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers)?;

    let storage = state.storage.lock().unwrap();
    storage
        .shared_route_owner(id)?
        .ok_or_else(|| ApiError::NotFound("Rota bulunamadı".into()))?;
    if storage.is_route_participant(id, user.id)? {
        return Err(ApiError::Validation("Bu rotaya zaten katılmışsınız".into()));
    }
    storage.add_route_participant(id, user.id)?;

    Ok(Json(json!({ "success": true, "message": "Rotaya başarıyla katıldınız" })))
}

// ─── DELETE /api/routes/{id}/leave ───────────────────────────────

pub async fn leave_route(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let user = require_user(&state, &headers)?;

    let storage = state.storage.lock().unwrap();
    storage
        .shared_route_owner(id)?
        .ok_or_else(|| ApiError::NotFound("Rota bulunamadı".into()))?;
    if !storage.is_route_participant(id, user.id)? {
        return Err(ApiError::Validation("Bu rotaya katılmamışsınız".into()));
    }
    storage.remove_route_participant(id, user.id)?;

    Ok(Json(json!({ "success": true, "message": "Rotadan başarıyla ayrıldınız" })))
}
