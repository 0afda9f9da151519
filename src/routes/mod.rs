use actix_files::NamedFile;
use actix_web::{
    get,
    http::{header, Method, StatusCode},
    web::{self, Data},
    Either, HttpResponse, Responder,
};
use tera::Context;

use crate::{
    db::alerts,
    errors::AppError,
    session::MaybeUser,
    structs::{AlertLevel, User},
    AppState, TEMPLATES,
};

pub mod admin;
pub mod auth;
pub mod campaigns;
pub mod dashboard;
pub mod diagnosis;
pub mod doctors;
pub mod resources;

const HOME_ALERT_LIMIT: i64 = 10;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index_handler)
        .service(favicon_handler)
        .service(latest_alerts_handler)
        .service(dashboard::dashboard_handler)
        .service(auth::sign_up_handler)
        .service(auth::sign_up_form_handler)
        .service(auth::sign_in_handler)
        .service(auth::sign_in_form_handler)
        .service(auth::sign_out_handler)
        .service(auth::profile_handler)
        .service(auth::reverse_geocode_handler)
        .service(resources::emergency_resources_handler)
        .service(resources::nearby_hospitals_handler)
        .service(resources::search_resources_handler)
        .service(diagnosis::self_diagnosis_handler)
        .service(diagnosis::self_diagnosis_form_handler)
        .service(campaigns::legacy_create_redirect)
        .service(campaigns::create_campaign_handler)
        .service(campaigns::create_campaign_form_handler)
        .service(campaigns::all_campaigns_handler)
        .service(campaigns::show_campaign_handler)
        .service(campaigns::fund_campaign_handler)
        .service(doctors::authenticate_handler)
        .service(doctors::authenticate_form_handler)
        .service(doctors::create_post_handler)
        .service(doctors::create_post_form_handler)
        .service(doctors::all_posts_handler)
        .service(admin::dashboard_handler)
        .service(admin::all_users_handler)
        .service(admin::delete_user_handler)
        .service(admin::campaigns_handler)
        .service(admin::advance_campaign_handler)
        .service(admin::delete_campaign_handler)
        .service(admin::doctors_handler)
        .service(admin::verify_doctor_handler)
        .service(admin::delete_doctor_handler)
        .service(admin::alerts_handler)
        .service(admin::create_alert_handler)
        .service(admin::delete_alert_handler)
        .service(admin::resources_handler)
        .service(admin::create_resource_handler)
        .service(admin::update_resource_handler)
        .service(admin::delete_resource_handler);
}

/// Context every page starts from: title, version and the signed-in user.
pub fn page_context(title: &str, user: Option<&User>) -> Context {
    let mut context = Context::new();
    context.insert("title", title);
    context.insert("version", env!("CARGO_PKG_VERSION"));
    if let Some(user) = user {
        context.insert("current_user", user);
        context.insert("is_admin", &user.is_admin());
    }
    context
}

pub fn render(template: &str, context: &Context) -> Result<String, AppError> {
    TEMPLATES.render(template, context).map_err(|e| {
        log::error!("Failed to render template {}: {}", template, e);
        AppError::TemplateError(e)
    })
}

pub fn page(template: &str, context: &Context) -> Result<HttpResponse, AppError> {
    page_with_status(StatusCode::OK, template, context)
}

pub fn page_with_status(
    status: StatusCode,
    template: &str,
    context: &Context,
) -> Result<HttpResponse, AppError> {
    let rendered = render(template, context)?;
    Ok(HttpResponse::build(status)
        .content_type("text/html; charset=utf-8")
        .body(rendered))
}

/// Re-renders a form with a single error message.
pub fn form_error(
    status: StatusCode,
    template: &str,
    mut context: Context,
    message: &str,
) -> Result<HttpResponse, AppError> {
    log::debug!("Rejected {} submission: {}", template, message);
    context.insert("error", message);
    page_with_status(status, template, &context)
}

pub fn see_other(location: &str) -> HttpResponse {
    HttpResponse::SeeOther()
        .append_header((header::LOCATION, location))
        .finish()
}

#[get("/")]
pub async fn index_handler(
    state: Data<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<impl Responder, AppError> {
    let mut latest = alerts::latest_alerts(&state.db_pool, HOME_ALERT_LIMIT).await?;
    latest.sort_by_key(|alert| alert.level != AlertLevel::High);

    let mut context = page_context("Swasta Setu", user.as_ref());
    context.insert("alerts", &latest);
    page("home.html", &context)
}

#[get("/api/alerts")]
pub async fn latest_alerts_handler(state: Data<AppState>) -> Result<impl Responder, AppError> {
    let latest = alerts::latest_alerts(&state.db_pool, HOME_ALERT_LIMIT).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "alerts": latest })))
}

#[get("/favicon.ico")]
pub async fn favicon_handler() -> Result<impl Responder, AppError> {
    Ok(NamedFile::open("static/favicon.svg")?)
}

pub async fn default_handler(req_method: Method) -> Result<impl Responder, std::io::Error> {
    match req_method {
        Method::GET => {
            let file = NamedFile::open("static/404.html")?
                .customize()
                .with_status(StatusCode::NOT_FOUND);
            Ok(Either::Left(file))
        }
        _ => Ok(Either::Right(HttpResponse::MethodNotAllowed().finish())),
    }
}
