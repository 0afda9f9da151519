use actix_multipart::Multipart;
use actix_web::{
    get,
    http::StatusCode,
    post,
    web::{self, Data},
    HttpResponse, Responder,
};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};

use super::{form_error, page, page_context, see_other};
use crate::{
    db::campaigns,
    errors::AppError,
    forms::MultipartForm,
    session::{CurrentUser, MaybeUser},
    storage::Folder,
    structs::{CampaignStatus, NewCampaign, DEADLINE_FORMAT},
    utils::{self, parse_rupees},
    AppState,
};

/// Values echoed back into the form after a rejected submission.
#[derive(Serialize, Default)]
struct CampaignDraft {
    title: String,
    description: String,
    target_amount: String,
    upi_id: String,
    deadline: String,
}

impl CampaignDraft {
    fn from_form(form: &MultipartForm) -> Self {
        Self {
            title: form.text("title").to_owned(),
            description: form.text("description").to_owned(),
            target_amount: form.text("target_amount").to_owned(),
            upi_id: form.text("upi_id").to_owned(),
            deadline: form.text("deadline").to_owned(),
        }
    }

    /// Checks the text fields, returning `(target paise, deadline)`.
    fn validate(&self, today: NaiveDate) -> Result<(i64, NaiveDate), &'static str> {
        if self.title.is_empty()
            || self.description.is_empty()
            || self.target_amount.is_empty()
            || self.upi_id.is_empty()
            || self.deadline.is_empty()
        {
            return Err("All fields are required.");
        }
        let target = parse_rupees(&self.target_amount)
            .filter(|paise| *paise > 0)
            .ok_or("Target amount must be a positive amount in rupees.")?;
        if !utils::is_valid_upi_id(&self.upi_id) {
            return Err("Invalid UPI ID.");
        }
        let deadline = NaiveDate::parse_from_str(&self.deadline, DEADLINE_FORMAT)
            .map_err(|_| "Deadline must be a date (YYYY-MM-DD).")?;
        if deadline < today {
            return Err("Deadline cannot be in the past.");
        }
        Ok((target, deadline))
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

#[get("/create-campaigns")]
pub async fn legacy_create_redirect() -> impl Responder {
    see_other("/campaigns/create")
}

#[get("/campaigns/create")]
pub async fn create_campaign_handler(
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    let mut context = page_context("Create Campaign", Some(&user));
    context.insert("form", &CampaignDraft::default());
    page("campaigns/create.html", &context)
}

#[post("/campaigns/create")]
pub async fn create_campaign_form_handler(
    payload: Multipart,
    state: Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse, AppError> {
    let mut form = MultipartForm::read(payload, state.config.max_upload_bytes).await?;
    let draft = CampaignDraft::from_form(&form);
    let mut context = page_context("Create Campaign", Some(&user));
    context.insert("form", &draft);

    let Some(image) = form.take_file("image") else {
        return form_error(
            StatusCode::BAD_REQUEST,
            "campaigns/create.html",
            context,
            "All fields are required.",
        );
    };
    let (target_amount, deadline) = match draft.validate(today()) {
        Ok(valid) => valid,
        Err(message) => {
            return form_error(StatusCode::BAD_REQUEST, "campaigns/create.html", context, message)
        }
    };
    image.ensure_image()?;

    let name = utils::sanitize_file_name(&format!("{}_{}", user.user_id, image.file_name));
    let stored = state.storage.put(Folder::Campaigns, &name, &image.bytes).await?;

    let created = campaigns::create_campaign(
        &state.db_pool,
        NewCampaign {
            title: draft.title,
            description: draft.description,
            image_link: stored.public_url.clone(),
            target_amount,
            upi_id: draft.upi_id,
            deadline,
            user_id: user.user_id,
            user_name: user.user_name,
        },
    )
    .await;
    let campaign = match created {
        Ok(campaign) => campaign,
        Err(e) => {
            state.storage.remove_linked(&stored.public_url).await;
            return Err(e.into());
        }
    };
    Ok(see_other(&format!("/campaigns/{}", campaign.id)))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[get("/campaigns")]
pub async fn all_campaigns_handler(
    web::Query(query): web::Query<SearchQuery>,
    state: Data<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<impl Responder, AppError> {
    let list = campaigns::list_approved(&state.db_pool, &query.q).await?;
    let mut context = page_context("Campaigns", user.as_ref());
    context.insert("campaigns", &list);
    context.insert("q", query.q.trim());
    page("campaigns/list.html", &context)
}

#[get("/campaigns/{id}")]
pub async fn show_campaign_handler(
    path: web::Path<i64>,
    state: Data<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<impl Responder, AppError> {
    let campaign = campaigns::get_campaign(&state.db_pool, path.into_inner())
        .await?
        .ok_or(AppError::NotFound)?;

    // unapproved campaigns stay private to their author and admins
    if campaign.status != CampaignStatus::Approved {
        let allowed = user
            .as_ref()
            .is_some_and(|u| u.is_admin() || u.user_id == campaign.user_id);
        if !allowed {
            return Err(AppError::NotFound);
        }
    }

    let today = today();
    let mut context = page_context(&campaign.title, user.as_ref());
    context.insert("days_left", &campaign.days_left(today));
    context.insert("accepts_funds", &campaign.accepts_funds(today));
    context.insert("progress", &campaign.progress_percent());
    context.insert("campaign", &campaign);
    page("campaigns/show.html", &context)
}

#[derive(Deserialize)]
pub struct Contribution {
    #[serde(default)]
    amount: String,
}

#[post("/campaigns/{id}/fund")]
pub async fn fund_campaign_handler(
    path: web::Path<i64>,
    web::Form(form): web::Form<Contribution>,
    state: Data<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<impl Responder, AppError> {
    let id = path.into_inner();
    let amount = parse_rupees(&form.amount)
        .filter(|paise| *paise > 0)
        .ok_or_else(|| AppError::BadRequest("Please enter a valid amount.".into()))?;

    let today = today();
    let today_str = today.format(DEADLINE_FORMAT).to_string();
    let Some(campaign) = campaigns::add_contribution(&state.db_pool, id, amount, &today_str).await?
    else {
        return match campaigns::get_campaign(&state.db_pool, id).await? {
            Some(c) if c.accepts_funds(today) => Err(AppError::BadRequest(
                "This contribution would take the campaign past the maximum amount.".into(),
            )),
            Some(c) if c.status == CampaignStatus::Approved => Err(AppError::BadRequest(
                "This campaign is no longer accepting funds.".into(),
            )),
            _ => Err(AppError::NotFound),
        };
    };
    log::info!("Campaign {} received {} paise", campaign.id, amount);

    let mut context = page_context("Thank you", user.as_ref());
    context.insert("amount", &amount);
    context.insert("campaign", &campaign);
    page("campaigns/funded.html", &context)
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header, test};

    use super::*;
    use crate::{
        db::users,
        structs::UserType,
        test_support::{
            self, body_text, session_cookie, sign_up_request, test_app, MultipartBody,
            ADMIN_EMAIL,
        },
    };

    fn draft() -> CampaignDraft {
        CampaignDraft {
            title: "Dialysis for Ravi".into(),
            description: "Weekly sessions".into(),
            target_amount: "15000.50".into(),
            upi_id: "ravi.fund@okaxis".into(),
            deadline: "2030-01-31".into(),
        }
    }

    #[actix_web::test]
    async fn draft_validation() {
        let today = NaiveDate::from_ymd_opt(2030, 1, 1).unwrap();
        assert_eq!(
            draft().validate(today).unwrap(),
            (1_500_050, NaiveDate::from_ymd_opt(2030, 1, 31).unwrap())
        );

        let mut zero = draft();
        zero.target_amount = "0".into();
        assert!(zero.validate(today).is_err());

        let mut bad_upi = draft();
        bad_upi.upi_id = "ravi.fund".into();
        assert_eq!(bad_upi.validate(today).unwrap_err(), "Invalid UPI ID.");

        let late = NaiveDate::from_ymd_opt(2030, 2, 1).unwrap();
        assert_eq!(
            draft().validate(late).unwrap_err(),
            "Deadline cannot be in the past."
        );

        assert_eq!(
            CampaignDraft::default().validate(today).unwrap_err(),
            "All fields are required."
        );
    }

    #[actix_web::test]
    async fn create_approve_fund_takedown() {
        let state = test_support::test_state().await;
        let pool = state.db_pool.clone();
        let app = test_app!(state);

        let resp = test::call_service(
            &app,
            sign_up_request("asha", "asha@example.org", "Noida").to_request(),
        )
        .await;
        let author = session_cookie(&resp);
        let resp =
            test::call_service(&app, sign_up_request("root", ADMIN_EMAIL, "Noida").to_request())
                .await;
        let admin = session_cookie(&resp);

        let req = MultipartBody::new()
            .text("title", "Dialysis for Ravi")
            .text("description", "Weekly sessions")
            .text("target_amount", "1000")
            .text("upi_id", "ravi.fund@okaxis")
            .text("deadline", "2099-12-31")
            .file("image", "ravi.png", "image/png", b"\x89PNG")
            .attach(test::TestRequest::post().uri("/campaigns/create").cookie(author.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        let location = resp.headers().get(header::LOCATION).unwrap().to_str().unwrap().to_owned();
        let id: i64 = location.trim_start_matches("/campaigns/").parse().unwrap();

        let campaign = campaigns::get_campaign(&pool, id).await.unwrap().unwrap();
        assert_eq!(campaign.status, CampaignStatus::Pending);
        assert_eq!(campaign.target_amount, 100_000);
        assert!(campaign.image_link.starts_with("/uploads/campaigns/"));

        // pending: author sees it, anonymous does not, nobody can fund it
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri(&location).cookie(author.clone()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let resp =
            test::call_service(&app, test::TestRequest::get().uri(&location).to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let fund = |amount: &'static str| {
            test::TestRequest::post()
                .uri(&format!("/campaigns/{id}/fund"))
                .set_form([("amount", amount)])
                .to_request()
        };
        assert_eq!(test::call_service(&app, fund("50")).await.status(), StatusCode::NOT_FOUND);

        let listing =
            test::call_service(&app, test::TestRequest::get().uri("/campaigns").to_request()).await;
        assert!(!body_text(listing).await.contains("Dialysis for Ravi"));

        let advance = || {
            test::TestRequest::post()
                .uri(&format!("/admin/campaigns/{id}/advance"))
                .cookie(admin.clone())
                .to_request()
        };
        assert_eq!(test::call_service(&app, advance()).await.status(), StatusCode::SEE_OTHER);

        let listing = test::call_service(
            &app,
            test::TestRequest::get().uri("/campaigns?q=dialysis").to_request(),
        )
        .await;
        assert!(body_text(listing).await.contains("Dialysis for Ravi"));

        let resp = test::call_service(&app, fund("50")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(body_text(resp).await.contains("50.00"));
        assert_eq!(test::call_service(&app, fund("0")).await.status(), StatusCode::BAD_REQUEST);
        test::call_service(&app, fund("25.50")).await;
        let campaign = campaigns::get_campaign(&pool, id).await.unwrap().unwrap();
        assert_eq!(campaign.current_amount, 7_550);

        // amounts past the cap are refused and the pages keep rendering
        for huge in ["90000000000000000", "90000000000000000", "100000000000"] {
            let resp = test::call_service(&app, fund(huge)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{huge}");
        }
        let resp = test::call_service(&app, fund("100000000000")).await;
        assert!(body_text(resp).await.contains("maximum amount"));
        let campaign = campaigns::get_campaign(&pool, id).await.unwrap().unwrap();
        assert_eq!(campaign.current_amount, 7_550);
        for uri in ["/campaigns", location.as_str()] {
            let resp =
                test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
            assert_eq!(resp.status(), StatusCode::OK, "{uri}");
        }
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/admin/campaigns").cookie(admin.clone()).to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(test::call_service(&app, advance()).await.status(), StatusCode::SEE_OTHER);
        assert!(campaigns::get_campaign(&pool, id).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn non_image_upload_is_rejected() {
        let state = test_support::test_state().await;
        let pool = state.db_pool.clone();
        let app = test_app!(state);
        let resp = test::call_service(
            &app,
            sign_up_request("asha", "asha@example.org", "Noida").to_request(),
        )
        .await;
        let cookie = session_cookie(&resp);

        let req = MultipartBody::new()
            .text("title", "Dialysis for Ravi")
            .text("description", "Weekly sessions")
            .text("target_amount", "1000")
            .text("upi_id", "ravi.fund@okaxis")
            .text("deadline", "2099-12-31")
            .file("image", "notes.txt", "text/plain", b"hello")
            .attach(test::TestRequest::post().uri("/campaigns/create").cookie(cookie))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(campaigns::count_campaigns(&pool).await.unwrap(), 0);
        assert!(users::get_user_by_email(&pool, "asha@example.org")
            .await
            .unwrap()
            .is_some_and(|u| u.user_type == UserType::Regular));
    }

    #[actix_web::test]
    async fn failed_insert_removes_the_stored_image() {
        let state = test_support::test_state().await;
        let pool = state.db_pool.clone();
        let folder = state.storage.root().join(Folder::Campaigns.as_str());
        let app = test_app!(state);
        let resp = test::call_service(
            &app,
            sign_up_request("asha", "asha@example.org", "Noida").to_request(),
        )
        .await;
        let cookie = session_cookie(&resp);
        sqlx::query("DROP TABLE campaigns").execute(&pool).await.unwrap();

        let req = MultipartBody::new()
            .text("title", "Dialysis for Ravi")
            .text("description", "Weekly sessions")
            .text("target_amount", "1000")
            .text("upi_id", "ravi.fund@okaxis")
            .text("deadline", "2099-12-31")
            .file("image", "ravi.png", "image/png", b"\x89PNG")
            .attach(test::TestRequest::post().uri("/campaigns/create").cookie(cookie))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
    }

    #[actix_web::test]
    async fn oversized_upload_is_refused() {
        let state = test_support::test_state().await;
        let limit = state.config.max_upload_bytes;
        let app = test_app!(state);
        let resp = test::call_service(
            &app,
            sign_up_request("asha", "asha@example.org", "Noida").to_request(),
        )
        .await;
        let cookie = session_cookie(&resp);

        let req = MultipartBody::new()
            .text("title", "Dialysis for Ravi")
            .file("image", "big.png", "image/png", &vec![0u8; limit + 1])
            .attach(test::TestRequest::post().uri("/campaigns/create").cookie(cookie))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[actix_web::test]
    async fn legacy_path_redirects() {
        let state = test_support::test_state().await;
        let app = test_app!(state);
        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/create-campaigns").to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/campaigns/create"
        );
    }
}
