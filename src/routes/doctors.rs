use actix_multipart::Multipart;
use actix_web::{get, http::StatusCode, post, web::Data, HttpResponse, Responder};
use tera::Context;

use super::{form_error, page, page_context, see_other};
use crate::{
    db::{doctors, posts},
    errors::{is_unique_violation, AppError},
    forms::MultipartForm,
    session::{CurrentUser, MaybeUser},
    storage::Folder,
    structs::{NewDoctor, NewPost, User},
    utils::sanitize_file_name,
    AppState,
};

const ALREADY_SUBMITTED: &str = "You have already submitted your details for verification.";
const NOT_VERIFIED: &str = "Only verified doctors can create posts.";

#[get("/doctors/authenticate")]
pub async fn authenticate_handler(
    state: Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<impl Responder, AppError> {
    let doctor = doctors::get_by_user(&state.db_pool, &user.user_id).await?;
    let mut context = page_context("Doctor Verification", Some(&user));
    context.insert("doctor", &doctor);
    page("doctors/authenticate.html", &context)
}

#[post("/doctors/authenticate")]
pub async fn authenticate_form_handler(
    payload: Multipart,
    state: Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse, AppError> {
    let mut form = MultipartForm::read(payload, state.config.max_upload_bytes).await?;
    let hospital = form.text("hospital").to_owned();
    let location = form.text("location").to_owned();
    let mut context = page_context("Doctor Verification", Some(&user));
    context.insert("hospital", &hospital);
    context.insert("location", &location);

    let id_card = match form.take_file("id_card") {
        Some(file) if !hospital.is_empty() && !location.is_empty() => file,
        _ => {
            return form_error(
                StatusCode::BAD_REQUEST,
                "doctors/authenticate.html",
                context,
                "All fields are required.",
            )
        }
    };
    id_card.ensure_image()?;

    if doctors::get_by_user(&state.db_pool, &user.user_id).await?.is_some() {
        return form_error(
            StatusCode::CONFLICT,
            "doctors/authenticate.html",
            context,
            ALREADY_SUBMITTED,
        );
    }

    let name = sanitize_file_name(&format!("{}_{}", user.user_name, id_card.file_name));
    let stored = state
        .storage
        .put(Folder::DoctorImages, &name, &id_card.bytes)
        .await?;

    let new_doctor = NewDoctor {
        user_id: user.user_id.clone(),
        user_name: user.user_name.clone(),
        hospital,
        location,
        id_card_link: stored.public_url.clone(),
    };
    match doctors::create_doctor(&state.db_pool, new_doctor).await {
        Ok(_) => Ok(see_other("/profile")),
        Err(e) if is_unique_violation(&e) => {
            // lost a race with a parallel submission
            state.storage.remove_linked(&stored.public_url).await;
            form_error(
                StatusCode::CONFLICT,
                "doctors/authenticate.html",
                context,
                ALREADY_SUBMITTED,
            )
        }
        Err(e) => {
            state.storage.remove_linked(&stored.public_url).await;
            Err(e.into())
        }
    }
}

/// A verified doctor's post form, or the response that replaces it.
async fn post_gate(
    state: &AppState,
    user: &User,
) -> Result<Result<Context, HttpResponse>, AppError> {
    let mut context = page_context("Create Post", Some(user));
    context.insert("locked", &false);
    match doctors::get_by_user(&state.db_pool, &user.user_id).await? {
        None => Ok(Err(see_other("/doctors/authenticate"))),
        Some(doctor) if !doctor.is_verified() => {
            log::info!("Unverified doctor {} tried to post", doctor.id);
            context.insert("locked", &true);
            Ok(Err(form_error(
                StatusCode::FORBIDDEN,
                "doctors/create_post.html",
                context,
                NOT_VERIFIED,
            )?))
        }
        Some(_) => Ok(Ok(context)),
    }
}

#[get("/doctors/create-post")]
pub async fn create_post_handler(
    state: Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse, AppError> {
    match post_gate(&state, &user).await? {
        Ok(context) => page("doctors/create_post.html", &context),
        Err(response) => Ok(response),
    }
}

#[post("/doctors/create-post")]
pub async fn create_post_form_handler(
    payload: Multipart,
    state: Data<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<HttpResponse, AppError> {
    let mut context = match post_gate(&state, &user).await? {
        Ok(context) => context,
        Err(response) => return Ok(response),
    };

    let mut form = MultipartForm::read(payload, state.config.max_upload_bytes).await?;
    let title = form.text("title").to_owned();
    let content = form.text("content").to_owned();
    let location = form.text("location").to_owned();
    context.insert("post_title", &title);
    context.insert("content", &content);
    context.insert("location", &location);

    if title.is_empty() || content.is_empty() || location.is_empty() {
        return form_error(
            StatusCode::BAD_REQUEST,
            "doctors/create_post.html",
            context,
            "Title, content, and location are required.",
        );
    }

    let image_link = match form.take_file("image") {
        Some(image) => {
            image.ensure_image()?;
            let name = sanitize_file_name(&format!("{}_{}", user.user_id, image.file_name));
            let stored = state.storage.put(Folder::Posts, &name, &image.bytes).await?;
            Some(stored.public_url)
        }
        None => None,
    };

    let created = posts::create_post(
        &state.db_pool,
        NewPost {
            user_id: user.user_id,
            user_name: user.user_name,
            title,
            content,
            location,
            image_link: image_link.clone(),
        },
    )
    .await;
    if let Err(e) = created {
        if let Some(link) = image_link {
            state.storage.remove_linked(&link).await;
        }
        return Err(e.into());
    }
    Ok(see_other("/doctors/all-post"))
}

#[get("/doctors/all-post")]
pub async fn all_posts_handler(
    state: Data<AppState>,
    MaybeUser(user): MaybeUser,
) -> Result<impl Responder, AppError> {
    let list = posts::list_posts(&state.db_pool).await?;
    let mut context = page_context("Doctor Posts", user.as_ref());
    context.insert("posts", &list);
    page("doctors/all_posts.html", &context)
}

#[cfg(test)]
mod tests {
    use actix_web::{http::header, test};

    use super::*;
    use crate::test_support::{
        self, body_text, session_cookie, sign_up_request, test_app, MultipartBody,
    };

    fn credentials() -> MultipartBody {
        MultipartBody::new()
            .text("hospital", "Sharda Hospital")
            .text("location", "Greater Noida")
            .file("id_card", "card.png", "image/png", b"\x89PNG")
    }

    fn post_body() -> MultipartBody {
        MultipartBody::new()
            .text("title", "Heatwave advice")
            .text("content", "Drink water every hour.")
            .text("location", "Noida")
    }

    #[actix_web::test]
    async fn posting_requires_a_verified_doctor() {
        let state = test_support::test_state().await;
        let pool = state.db_pool.clone();
        let app = test_app!(state);
        let resp = test::call_service(
            &app,
            sign_up_request("dr rao", "rao@example.org", "Noida").to_request(),
        )
        .await;
        let cookie = session_cookie(&resp);

        // no record yet
        let resp = test::call_service(
            &app,
            test::TestRequest::get()
                .uri("/doctors/create-post")
                .cookie(cookie.clone())
                .to_request(),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            resp.headers().get(header::LOCATION).unwrap(),
            "/doctors/authenticate"
        );

        let req = credentials()
            .attach(test::TestRequest::post().uri("/doctors/authenticate").cookie(cookie.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::SEE_OTHER);
        let doctor = doctors::list_doctors(&pool).await.unwrap().remove(0);
        assert_eq!(doctor.id_card_link, "/uploads/doctorImages/dr_rao_card_png");

        let again = credentials()
            .attach(test::TestRequest::post().uri("/doctors/authenticate").cookie(cookie.clone()))
            .to_request();
        assert_eq!(test::call_service(&app, again).await.status(), StatusCode::CONFLICT);

        // pending record
        let req = post_body()
            .attach(test::TestRequest::post().uri("/doctors/create-post").cookie(cookie.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
        assert!(body_text(resp).await.contains(NOT_VERIFIED));

        assert!(doctors::verify_doctor(&pool, doctor.id).await.unwrap());
        let req = post_body()
            .attach(test::TestRequest::post().uri("/doctors/create-post").cookie(cookie.clone()))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::SEE_OTHER);
        assert_eq!(resp.headers().get(header::LOCATION).unwrap(), "/doctors/all-post");

        let resp = test::call_service(
            &app,
            test::TestRequest::get().uri("/doctors/all-post").to_request(),
        )
        .await;
        assert!(body_text(resp).await.contains("Heatwave advice"));
    }

    #[actix_web::test]
    async fn failed_post_insert_removes_its_image() {
        let state = test_support::test_state().await;
        let pool = state.db_pool.clone();
        let folder = state.storage.root().join(Folder::Posts.as_str());
        let app = test_app!(state);
        let resp = test::call_service(
            &app,
            sign_up_request("dr rao", "rao@example.org", "Noida").to_request(),
        )
        .await;
        let cookie = session_cookie(&resp);
        let req = credentials()
            .attach(test::TestRequest::post().uri("/doctors/authenticate").cookie(cookie.clone()))
            .to_request();
        test::call_service(&app, req).await;
        let doctor = doctors::list_doctors(&pool).await.unwrap().remove(0);
        doctors::verify_doctor(&pool, doctor.id).await.unwrap();
        sqlx::query("DROP TABLE posts").execute(&pool).await.unwrap();

        let req = post_body()
            .file("image", "chart.png", "image/png", b"\x89PNG")
            .attach(test::TestRequest::post().uri("/doctors/create-post").cookie(cookie))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(std::fs::read_dir(&folder).unwrap().count(), 0);
    }

    #[actix_web::test]
    async fn authenticate_requires_every_field() {
        let state = test_support::test_state().await;
        let app = test_app!(state);
        let resp = test::call_service(
            &app,
            sign_up_request("dr rao", "rao@example.org", "Noida").to_request(),
        )
        .await;
        let cookie = session_cookie(&resp);

        let req = MultipartBody::new()
            .text("hospital", "Sharda Hospital")
            .text("location", "")
            .file("id_card", "card.png", "image/png", b"\x89PNG")
            .attach(test::TestRequest::post().uri("/doctors/authenticate").cookie(cookie))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_text(resp).await.contains("All fields are required."));
    }
}
