//! Request extractors that resolve the session identity to a `users` row.

use actix_identity::Identity;
use actix_web::{dev::Payload, web::Data, FromRequest, HttpRequest};
use futures_util::future::LocalBoxFuture;

use crate::{db::users, errors::AppError, structs::User, AppState};

/// The signed-in user, if any.
pub struct MaybeUser(pub Option<User>);

/// A signed-in user. Anonymous requests are sent to `/sign-in`.
pub struct CurrentUser(pub User);

/// A signed-in admin. Other users get 403.
pub struct AdminUser(pub User);

async fn load_user(
    state: Option<Data<AppState>>,
    identity: Option<Identity>,
) -> Result<Option<User>, AppError> {
    let Some(identity) = identity else {
        return Ok(None);
    };
    let state = state.ok_or_else(|| AppError::ConfigError("application state missing".into()))?;
    let user_id = identity.id()?;
    let user = users::get_user_by_id(&state.db_pool, &user_id).await?;
    if user.is_none() {
        // account deleted while the cookie was still live
        log::warn!("Session refers to unknown user {}", user_id);
        identity.logout();
    }
    Ok(user)
}

impl FromRequest for MaybeUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let identity = Identity::extract(req);
        let state = req.app_data::<Data<AppState>>().cloned();
        Box::pin(async move {
            let identity = identity.await.ok();
            load_user(state, identity).await.map(MaybeUser)
        })
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = MaybeUser::from_request(req, payload);
        Box::pin(async move {
            match user.await?.0 {
                Some(user) => Ok(CurrentUser(user)),
                None => Err(AppError::Unauthenticated),
            }
        })
    }
}

impl FromRequest for AdminUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, payload: &mut Payload) -> Self::Future {
        let user = CurrentUser::from_request(req, payload);
        Box::pin(async move {
            let CurrentUser(user) = user.await?;
            if !user.is_admin() {
                log::warn!("User {} tried to reach an admin page", user.user_id);
                return Err(AppError::Forbidden);
            }
            Ok(AdminUser(user))
        })
    }
}
