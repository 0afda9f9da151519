use actix_web::{get, Responder};
use serde::Serialize;

use super::{page, page_context};
use crate::{errors::AppError, session::MaybeUser};

#[derive(Debug, Serialize)]
pub struct CountryStats {
    pub country: &'static str,
    pub mortality_rate: f64,
    pub life_expectancy: f64,
    pub cases: u32,
    pub healthcare_spending: f64,
}

fn stats(
    country: &'static str,
    mortality_rate: f64,
    life_expectancy: f64,
    cases: u32,
    healthcare_spending: f64,
) -> CountryStats {
    CountryStats {
        country,
        mortality_rate,
        life_expectancy,
        cases,
        healthcare_spending,
    }
}

/// Mortality per 1000, life expectancy in years, reported cases, and
/// healthcare spending as % of GDP.
pub fn country_stats() -> [CountryStats; 8] {
    [
        stats("India", 12.3, 70.8, 5000, 3.5),
        stats("USA", 7.5, 78.9, 12000, 16.9),
        stats("UK", 8.1, 80.5, 8000, 10.2),
        stats("Germany", 9.2, 81.1, 6000, 11.3),
        stats("France", 6.8, 82.3, 7000, 11.5),
        stats("Japan", 5.2, 84.2, 3000, 10.9),
        stats("Canada", 7.1, 82.2, 4500, 11.2),
        stats("Australia", 6.9, 83.4, 4000, 9.6),
    ]
}

#[get("/dashboard")]
pub async fn dashboard_handler(MaybeUser(user): MaybeUser) -> Result<impl Responder, AppError> {
    let mut context = page_context("Disease Dashboards", user.as_ref());
    context.insert("stats", &country_stats());
    page("dashboard.html", &context)
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};

    use super::*;
    use crate::test_support::{self, body_text, test_app};

    #[actix_web::test]
    async fn renders_every_country() {
        let state = test_support::test_state().await;
        let app = test_app!(state);
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/dashboard").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_text(resp).await;
        for row in country_stats() {
            assert!(body.contains(row.country), "{}", row.country);
        }
    }
}
