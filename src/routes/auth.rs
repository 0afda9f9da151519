use actix_identity::Identity;
use actix_web::{
    get,
    http::StatusCode,
    post,
    web::{self, Data},
    HttpMessage, HttpRequest, HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};

use super::{form_error, page, page_context, see_other};
use crate::{
    db::{doctors, users},
    errors::{is_unique_violation, AppError},
    geo::Coordinates,
    session::CurrentUser,
    structs::{NewUser, UserType},
    utils::{self, MAX_PASSWORD_LEN, MIN_PASSWORD_LEN},
    AppState,
};

const LOCATION_REQUIRED: &str = "Location is required. Please enable location services.";

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SignUp {
    user_name: String,
    email: String,
    phone_number: String,
    #[serde(skip_serializing)]
    password: String,
    city: String,
    latitude: String,
    longitude: String,
}

fn validate_sign_up(form: &SignUp) -> Result<(), String> {
    if form.user_name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.phone_number.trim().is_empty()
        || form.password.is_empty()
    {
        return Err("All fields are required".into());
    }
    if !utils::is_valid_phone(form.phone_number.trim()) {
        return Err("Phone number must be exactly 10 digits.".into());
    }
    if !utils::is_valid_email(form.email.trim()) {
        return Err("Invalid email address".into());
    }
    if form.password.len() < MIN_PASSWORD_LEN {
        return Err(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters long"
        ));
    }
    if form.password.len() > MAX_PASSWORD_LEN {
        return Err(format!(
            "Password must be at most {MAX_PASSWORD_LEN} characters long"
        ));
    }
    Ok(())
}

/// City from the browser's coordinates, else the typed-in city.
async fn resolve_location(state: &AppState, form: &SignUp) -> Result<String, &'static str> {
    let (lat, lon) = (form.latitude.trim(), form.longitude.trim());
    if !lat.is_empty() && !lon.is_empty() {
        let coordinates = match (lat.parse::<f64>(), lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Coordinates::new(lat, lon).map_err(|_| LOCATION_REQUIRED)?,
            _ => return Err(LOCATION_REQUIRED),
        };
        return state.geocoder.reverse(coordinates).await.map_err(|e| {
            log::warn!("Reverse geocoding failed: {}", e);
            "Unable to fetch city name. Please try again."
        });
    }
    match form.city.trim() {
        "" => Err(LOCATION_REQUIRED),
        city => Ok(city.to_owned()),
    }
}

#[get("/sign-up")]
pub async fn sign_up_handler() -> Result<impl Responder, AppError> {
    page("sign_up.html", &page_context("Sign Up", None))
}

#[post("/sign-up")]
pub async fn sign_up_form_handler(
    web::Form(form): web::Form<SignUp>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let mut context = page_context("Sign Up", None);
    context.insert("form", &form);

    if let Err(message) = validate_sign_up(&form) {
        return form_error(StatusCode::BAD_REQUEST, "sign_up.html", context, &message);
    }
    let location = match resolve_location(&state, &form).await {
        Ok(location) => location,
        Err(message) => {
            return form_error(StatusCode::BAD_REQUEST, "sign_up.html", context, message)
        }
    };

    let email = form.email.trim().to_lowercase();
    let user_type = if state.config.is_admin_email(&email) {
        UserType::Admin
    } else {
        UserType::Regular
    };
    let new_user = NewUser {
        user_name: form.user_name.trim().to_owned(),
        email,
        phone_number: form.phone_number.trim().to_owned(),
        location,
        user_type,
        pwd_hash: utils::hash_password(&form.password)?,
    };

    let user = match users::create_user(&state.db_pool, new_user).await {
        Ok(user) => user,
        Err(e) if is_unique_violation(&e) => {
            return form_error(
                StatusCode::CONFLICT,
                "sign_up.html",
                context,
                "Email already registered",
            );
        }
        Err(e) => return Err(e.into()),
    };

    Identity::login(&request.extensions(), user.user_id.clone())?;
    Ok(see_other("/"))
}

#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
pub struct SignIn {
    email: String,
    #[serde(skip_serializing)]
    password: String,
}

#[get("/sign-in")]
pub async fn sign_in_handler() -> Result<impl Responder, AppError> {
    page("sign_in.html", &page_context("Login", None))
}

#[post("/sign-in")]
pub async fn sign_in_form_handler(
    web::Form(form): web::Form<SignIn>,
    state: Data<AppState>,
    request: HttpRequest,
) -> Result<HttpResponse, AppError> {
    let mut context = page_context("Login", None);
    context.insert("form", &form);

    if form.email.trim().is_empty() || form.password.is_empty() {
        return form_error(
            StatusCode::BAD_REQUEST,
            "sign_in.html",
            context,
            "All fields are required",
        );
    }

    let email = form.email.trim().to_lowercase();
    let user = users::get_user_by_email(&state.db_pool, &email).await?;
    let user = match user {
        Some(user) if utils::verify_password(&form.password, &user.pwd_hash)? => user,
        _ => {
            log::warn!("Failed sign-in for {}", email);
            return form_error(
                StatusCode::UNAUTHORIZED,
                "sign_in.html",
                context,
                "Invalid credentials",
            );
        }
    };

    Identity::login(&request.extensions(), user.user_id.clone())?;
    log::info!("User {} signed in", user.user_id);
    if user.is_admin() {
        Ok(see_other("/admin/dashboard"))
    } else {
        Ok(see_other("/"))
    }
}

#[post("/sign-out")]
pub async fn sign_out_handler(identity: Option<Identity>) -> impl Responder {
    if let Some(identity) = identity {
        identity.logout();
    }
    see_other("/sign-in")
}

#[get("/profile")]
pub async fn profile_handler(
    state: Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    let doctor = doctors::get_by_user(&state.db_pool, &user.user_id).await?;
    let mut context = page_context("Profile", Some(&user));
    context.insert("user", &user);
    context.insert("doctor", &doctor);
    page("profile.html", &context)
}

#[derive(Deserialize)]
pub struct CoordinatesQuery {
    lat: f64,
    lon: f64,
}

#[get("/api/geocode/reverse")]
pub async fn reverse_geocode_handler(
    web::Query(query): web::Query<CoordinatesQuery>,
    state: Data<AppState>,
) -> Result<impl Responder, AppError> {
    let at = Coordinates::new(query.lat, query.lon)
        .map_err(|e| AppError::BadRequest(e.to_string()))?;
    let city = state.geocoder.reverse(at).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "city": city })))
}
