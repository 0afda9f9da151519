//! Shared fixtures for handler tests.

use actix_web::{
    body::MessageBody,
    cookie::Cookie,
    dev::ServiceResponse,
    http::header,
    test::{self, TestRequest},
    web, App, HttpServer,
};

use crate::{config::Config, db, AppState};

pub const PASSWORD: &str = "s3cret-pass";
pub const ADMIN_EMAIL: &str = "root@example.org";
const BOUNDARY: &str = "swasta-setu-test-boundary";

/// Fresh in-memory database and scratch upload dir. Outbound services point
/// at a closed port so they fail fast.
pub async fn test_state() -> AppState {
    test_state_with(|_| {}).await
}

/// Like `test_state`, with the config adjusted before the state is built.
pub async fn test_state_with(adjust: impl FnOnce(&mut Config)) -> AppState {
    let upload_dir = std::env::temp_dir().join(format!("swasta-setu-{}", uuid::Uuid::new_v4()));
    let mut config = Config {
        upload_dir: upload_dir.to_string_lossy().into_owned(),
        max_upload_bytes: 64 * 1024,
        admin_emails: vec![ADMIN_EMAIL.to_owned()],
        geocoder_url: "http://127.0.0.1:9".to_owned(),
        gemini_base_url: "http://127.0.0.1:9".to_owned(),
        gemini_api_key: None,
        http_timeout_secs: 1,
        ..Config::default()
    };
    adjust(&mut config);
    AppState::new(config, db::memory_pool().await).await.unwrap()
}

/// Runs a throwaway HTTP server with `routes` on a free local port and
/// returns its base URL. Stands in for the geocoder and Gemini endpoints.
pub fn serve<F>(routes: F) -> String
where
    F: Fn(&mut web::ServiceConfig) + Send + Clone + 'static,
{
    let server = HttpServer::new(move || App::new().configure(routes.clone()))
        .workers(1)
        .disable_signals()
        .bind(("127.0.0.1", 0))
        .expect("bind a local port");
    let addr = server.addrs()[0];
    actix_web::rt::spawn(server.run());
    format!("http://{addr}")
}

/// Builds the routed app around `state` with cookie sessions.
macro_rules! test_app {
    ($state:expr) => {{
        let state: $crate::AppState = $state;
        let upload_root = state.storage.root().to_path_buf();
        actix_web::test::init_service(
            actix_web::App::new()
                .wrap(actix_identity::IdentityMiddleware::default())
                .wrap(
                    actix_session::SessionMiddleware::builder(
                        actix_session::storage::CookieSessionStore::default(),
                        actix_web::cookie::Key::from(&[7u8; 64][..]),
                    )
                    .cookie_secure(false)
                    .build(),
                )
                .app_data(actix_web::web::Data::new(state))
                .service(actix_files::Files::new(
                    $crate::storage::PUBLIC_PREFIX,
                    upload_root,
                ))
                .configure($crate::routes::configure)
                .default_service(actix_web::web::to($crate::routes::default_handler)),
        )
        .await
    }};
}
pub(crate) use test_app;

pub fn sign_up_request(user_name: &str, email: &str, city: &str) -> TestRequest {
    TestRequest::post().uri("/sign-up").set_form([
        ("user_name", user_name),
        ("email", email),
        ("phone_number", "9876543210"),
        ("password", PASSWORD),
        ("city", city),
    ])
}

/// The session cookie set by a sign-up or sign-in response.
pub fn session_cookie<B>(resp: &ServiceResponse<B>) -> Cookie<'static> {
    resp.response()
        .cookies()
        .find(|cookie| cookie.name() == "id")
        .expect("response sets a session cookie")
        .into_owned()
}

pub async fn body_text<B: MessageBody>(resp: ServiceResponse<B>) -> String {
    String::from_utf8(test::read_body(resp).await.to_vec()).unwrap()
}

/// Hand-rolled `multipart/form-data` body.
#[derive(Default)]
pub struct MultipartBody {
    body: Vec<u8>,
}

impl MultipartBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: &str, value: &str) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
        self
    }

    pub fn file(mut self, name: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Self {
        self.body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        self.body.extend_from_slice(bytes);
        self.body.extend_from_slice(b"\r\n");
        self
    }

    pub fn attach(mut self, request: TestRequest) -> TestRequest {
        self.body
            .extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        request
            .insert_header((
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            ))
            .set_payload(self.body)
    }
}
