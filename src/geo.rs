//! Reverse geocoding and nearby-hospital search against a
//! Nominatim-compatible endpoint.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::utils::USER_AGENT;

const UNKNOWN_CITY: &str = "Unknown City";

#[derive(Debug, Error)]
pub enum GeoError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("City not found in response")]
    CityNotFound,

    #[error("Coordinates out of range: {0}, {1}")]
    InvalidCoordinates(f64, f64),
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Result<Self, GeoError> {
        if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
            return Err(GeoError::InvalidCoordinates(lat, lon));
        }
        Ok(Self { lat, lon })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hospital {
    pub name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Deserialize)]
struct ReverseResponse {
    address: Option<Address>,
}

#[derive(Debug, Deserialize)]
struct Address {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Place {
    lat: String,
    lon: String,
    display_name: String,
}

#[derive(Debug, Clone)]
pub struct Geocoder {
    base_url: String,
    radius_m: u32,
    limit: u32,
    client: reqwest::Client,
}

impl Geocoder {
    pub fn new(
        base_url: impl Into<String>,
        radius_m: u32,
        limit: u32,
        timeout: Duration,
    ) -> Result<Self, GeoError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            radius_m,
            limit,
            client,
        })
    }

    /// Name of the city, town or village at the given point.
    pub async fn reverse(&self, at: Coordinates) -> Result<String, GeoError> {
        let url = format!("{}/reverse", self.base_url);
        let body: ReverseResponse = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_owned()),
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        city_from(body)
    }

    pub async fn nearby_hospitals(&self, at: Coordinates) -> Result<Vec<Hospital>, GeoError> {
        let url = format!("{}/search", self.base_url);
        let places: Vec<Place> = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_owned()),
                ("q", "hospital".to_owned()),
                ("lat", at.lat.to_string()),
                ("lon", at.lon.to_string()),
                ("radius", self.radius_m.to_string()),
                ("limit", self.limit.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        let hospitals = hospitals_from(places);
        log::debug!("{} hospitals near {},{}", hospitals.len(), at.lat, at.lon);
        Ok(hospitals)
    }
}

fn city_from(body: ReverseResponse) -> Result<String, GeoError> {
    let address = body.address.ok_or(GeoError::CityNotFound)?;
    Ok(address
        .city
        .or(address.town)
        .or(address.village)
        .unwrap_or_else(|| UNKNOWN_CITY.to_owned()))
}

fn hospitals_from(places: Vec<Place>) -> Vec<Hospital> {
    places
        .into_iter()
        .filter_map(|place| {
            let lat = place.lat.parse().ok()?;
            let lon = place.lon.parse().ok()?;
            Some(Hospital {
                name: place.display_name,
                lat,
                lon,
            })
        })
        .collect()
}
