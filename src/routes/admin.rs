//! Back-office pages. Every handler takes an `AdminUser`, so anonymous
//! requests are redirected to `/sign-in` and regular users get 403.

use actix_web::{
    get,
    http::StatusCode,
    post,
    web::{self, Data},
    HttpResponse, Responder,
};
use serde::{Deserialize, Serialize};

use super::{form_error, page, page_context, see_other};
use crate::{
    db::{alerts, campaigns, doctors, inventory, users},
    errors::AppError,
    session::AdminUser,
    structs::{AlertLevel, CampaignStatus, NewAlert, ResourceInput, User},
    AppState,
};

#[get("/admin/dashboard")]
pub async fn dashboard_handler(
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<impl Responder, AppError> {
    let pool = &state.db_pool;
    let mut context = page_context("Admin Dashboard", Some(&admin));
    context.insert("alert_count", &alerts::count_alerts(pool).await?);
    context.insert("user_count", &users::count_regular_users(pool).await?);
    context.insert("campaign_count", &campaigns::count_campaigns(pool).await?);
    context.insert("doctor_count", &doctors::count_doctors(pool).await?);
    page("admin/dashboard.html", &context)
}

#[get("/admin/all-users")]
pub async fn all_users_handler(
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<impl Responder, AppError> {
    let list = users::list_regular_users_in(&state.db_pool, &admin.location).await?;
    let mut context = page_context("Users", Some(&admin));
    context.insert("users", &list);
    context.insert("location", &admin.location);
    page("admin/users.html", &context)
}

#[post("/admin/all-users/{user_id}/delete")]
pub async fn delete_user_handler(
    path: web::Path<String>,
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<impl Responder, AppError> {
    let user_id = path.into_inner();
    let links = users::delete_regular_user(&state.db_pool, &user_id)
        .await?
        .ok_or(AppError::NotFound)?;
    for link in &links {
        state.storage.remove_linked(link).await;
    }
    log::info!("Admin {} deleted user {}", admin.user_id, user_id);
    Ok(see_other("/admin/all-users"))
}

#[get("/admin/campaigns")]
pub async fn campaigns_handler(
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<impl Responder, AppError> {
    let list = campaigns::list_for_review(&state.db_pool).await?;
    let mut context = page_context("Manage Campaigns", Some(&admin));
    context.insert("campaigns", &list);
    page("admin/campaigns.html", &context)
}

/// Moves a campaign one step along pending, approved, takedown. A takedown
/// removes the campaign entirely.
#[post("/admin/campaigns/{id}/advance")]
pub async fn advance_campaign_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    AdminUser(_): AdminUser,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let campaign = campaigns::get_campaign(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound)?;

    match campaign.status.next() {
        Some(CampaignStatus::Takedown) | None => remove_campaign(&state, id).await?,
        Some(next) => {
            campaigns::set_status(&state.db_pool, id, next)
                .await?
                .ok_or(AppError::NotFound)?;
        }
    }
    Ok(see_other("/admin/campaigns"))
}

#[post("/admin/campaigns/{id}/delete")]
pub async fn delete_campaign_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    AdminUser(_): AdminUser,
) -> Result<impl Responder, AppError> {
    remove_campaign(&state, path.into_inner()).await?;
    Ok(see_other("/admin/campaigns"))
}

/// Row first, then its image. A failed image delete is only logged.
async fn remove_campaign(state: &AppState, id: i64) -> Result<(), AppError> {
    let campaign = campaigns::delete_campaign(&state.db_pool, id)
        .await?
        .ok_or(AppError::NotFound)?;
    state.storage.remove_linked(&campaign.image_link).await;
    Ok(())
}

#[get("/admin/verify-doctors")]
pub async fn doctors_handler(
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<impl Responder, AppError> {
    let list = doctors::list_doctors(&state.db_pool).await?;
    let mut context = page_context("Verify Doctors", Some(&admin));
    context.insert("doctors", &list);
    page("admin/doctors.html", &context)
}

#[post("/admin/verify-doctors/{id}/verify")]
pub async fn verify_doctor_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    AdminUser(_): AdminUser,
) -> Result<impl Responder, AppError> {
    if !doctors::verify_doctor(&state.db_pool, path.into_inner()).await? {
        return Err(AppError::NotFound);
    }
    Ok(see_other("/admin/verify-doctors"))
}

#[post("/admin/verify-doctors/{id}/delete")]
pub async fn delete_doctor_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    AdminUser(_): AdminUser,
) -> Result<impl Responder, AppError> {
    let doctor = doctors::delete_doctor(&state.db_pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;
    state.storage.remove_linked(&doctor.id_card_link).await;
    Ok(see_other("/admin/verify-doctors"))
}

#[derive(Deserialize, Serialize)]
pub struct AlertForm {
    #[serde(default)]
    title: String,
    #[serde(default)]
    message: String,
    level: AlertLevel,
}

async fn alerts_page(
    state: &AppState,
    admin: &User,
    status: StatusCode,
    error: Option<(&AlertForm, &str)>,
) -> Result<HttpResponse, AppError> {
    let list = alerts::list_alerts(&state.db_pool).await?;
    let mut context = page_context("Alerts", Some(admin));
    context.insert("alerts", &list);
    match error {
        Some((form, message)) => {
            context.insert("form", form);
            form_error(status, "admin/alerts.html", context, message)
        }
        None => page("admin/alerts.html", &context),
    }
}

#[get("/admin/alerts")]
pub async fn alerts_handler(
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<HttpResponse, AppError> {
    alerts_page(&state, &admin, StatusCode::OK, None).await
}

#[post("/admin/alerts")]
pub async fn create_alert_handler(
    web::Form(form): web::Form<AlertForm>,
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<HttpResponse, AppError> {
    let (title, message) = (form.title.trim(), form.message.trim());
    if title.is_empty() || message.is_empty() {
        return alerts_page(
            &state,
            &admin,
            StatusCode::BAD_REQUEST,
            Some((&form, "Title and message cannot be empty.")),
        )
        .await;
    }
    alerts::create_alert(
        &state.db_pool,
        NewAlert {
            user_id: admin.user_id.clone(),
            user_name: admin.user_name.clone(),
            title: title.to_owned(),
            message: message.to_owned(),
            level: form.level,
        },
    )
    .await?;
    Ok(see_other("/admin/alerts"))
}

#[post("/admin/alerts/{id}/delete")]
pub async fn delete_alert_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    AdminUser(_): AdminUser,
) -> Result<impl Responder, AppError> {
    if !alerts::delete_alert(&state.db_pool, path.into_inner()).await? {
        return Err(AppError::NotFound);
    }
    Ok(see_other("/admin/alerts"))
}

#[derive(Deserialize)]
pub struct EditQuery {
    edit: Option<i64>,
}

/// Inventory form as posted. Counts arrive as text so a blank box can be
/// reported instead of failing deserialization.
#[derive(Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ResourceForm {
    hospital: String,
    location: String,
    icu_beds: String,
    normal_beds: String,
    ventilators: String,
}

impl ResourceForm {
    fn validate(&self) -> Result<ResourceInput, &'static str> {
        let (hospital, location) = (self.hospital.trim(), self.location.trim());
        if hospital.is_empty() || location.is_empty() {
            return Err("Hospital and location are required.");
        }
        let count = |value: &str| -> Result<i64, &'static str> {
            match value.trim() {
                "" => Ok(0),
                v => v
                    .parse::<i64>()
                    .ok()
                    .filter(|n| *n >= 0)
                    .ok_or("Bed and ventilator counts must be non-negative whole numbers."),
            }
        };
        Ok(ResourceInput {
            hospital: hospital.to_owned(),
            location: location.to_owned(),
            icu_beds: count(&self.icu_beds)?,
            normal_beds: count(&self.normal_beds)?,
            ventilators: count(&self.ventilators)?,
        })
    }
}

async fn resources_page(
    state: &AppState,
    admin: &User,
    editing: Option<i64>,
    rejected: Option<(&ResourceForm, &str)>,
) -> Result<HttpResponse, AppError> {
    let list = inventory::list_resources(&state.db_pool).await?;
    let mut context = page_context("Resource Management", Some(admin));
    context.insert("resources", &list);
    context.insert("action", "/admin/resource-management");
    if let Some(id) = editing {
        let resource = inventory::get_resource(&state.db_pool, id)
            .await?
            .ok_or(AppError::NotFound)?;
        context.insert("action", &format!("/admin/resource-management/{id}"));
        context.insert("values", &resource);
        context.insert("editing", &true);
    }
    match rejected {
        Some((form, message)) => {
            context.insert("values", form);
            form_error(StatusCode::BAD_REQUEST, "admin/resources.html", context, message)
        }
        None => page("admin/resources.html", &context),
    }
}

#[get("/admin/resource-management")]
pub async fn resources_handler(
    web::Query(query): web::Query<EditQuery>,
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<HttpResponse, AppError> {
    resources_page(&state, &admin, query.edit, None).await
}

#[post("/admin/resource-management")]
pub async fn create_resource_handler(
    web::Form(form): web::Form<ResourceForm>,
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<HttpResponse, AppError> {
    let input = match form.validate() {
        Ok(input) => input,
        Err(message) => return resources_page(&state, &admin, None, Some((&form, message))).await,
    };
    inventory::create_resource(&state.db_pool, input).await?;
    Ok(see_other("/admin/resource-management"))
}

#[post("/admin/resource-management/{id}")]
pub async fn update_resource_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<ResourceForm>,
    state: Data<AppState>,
    AdminUser(admin): AdminUser,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let input = match form.validate() {
        Ok(input) => input,
        Err(message) => {
            return resources_page(&state, &admin, Some(id), Some((&form, message))).await
        }
    };
    inventory::update_resource(&state.db_pool, id, input)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(see_other("/admin/resource-management"))
}

#[post("/admin/resource-management/{id}/delete")]
pub async fn delete_resource_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    AdminUser(_): AdminUser,
) -> Result<impl Responder, AppError> {
    if !inventory::delete_resource(&state.db_pool, path.into_inner()).await? {
        return Err(AppError::NotFound);
    }
    Ok(see_other("/admin/resource-management"))
}
