use actix_web::{
    get,
    web::{self, Data},
    HttpResponse, Responder,
};
use serde::Deserialize;

use super::{page, page_context};
use crate::{
    db::inventory, errors::AppError, geo::Coordinates, session::MaybeUser,
    structs::ResourceField, AppState,
};

#[get("/emergency-resources")]
pub async fn emergency_resources_handler(
    state: Data<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<impl Responder, AppError> {
    let config = &state.config;
    let mut context = page_context("Emergency Resources", user.as_ref());
    context.insert("tile_url", &config.map_tile_url);
    context.insert("default_lat", &config.map_default_lat);
    context.insert("default_lon", &config.map_default_lon);
    context.insert("embed_url", &config.dashboard_embed_url);
    page("emergency_resources.html", &context)
}

#[derive(Deserialize)]
pub struct NearbyQuery {
    lat: f64,
    lon: f64,
}

#[get("/api/hospitals/nearby")]
pub async fn nearby_hospitals_handler(
    web::Query(query): web::Query<NearbyQuery>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let at = Coordinates::new(query.lat, query.lon)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let hospitals = state.geocoder.nearby_hospitals(at).await?;
    let message = hospitals.is_empty().then_some("No hospitals found nearby.");
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "hospitals": hospitals,
        "message": message,
    })))
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct ResourceSearch {
    by: ResourceField,
    q: String,
}

#[get("/search-resources")]
pub async fn search_resources_handler(
    web::Query(query): web::Query<ResourceSearch>,
    state: Data<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<impl Responder, AppError> {
    let rows = inventory::search_resources(&state.db_pool, query.by, &query.q).await?;
    let mut context = page_context("Search Resources", user.as_ref());
    context.insert("resources", &rows);
    context.insert("by", &query.by);
    context.insert("q", query.q.trim());
    page("search_resources.html", &context)
}
