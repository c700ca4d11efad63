use axum::extract::{FromRequestParts, Path};
use axum::http::request::Parts;
use axum::response::{IntoResponse, Response};

use crate::auth::session::{self, get_cookie_value};
use crate::db::models::User;
use crate::error::AppError;
use crate::flash::{self, FLASH_COOKIE};
use crate::routes::{redirect_with_flash, Page, UnauthorizedTemplate};
use crate::state::AppState;

/// Represents the currently authenticated user.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub is_admin: bool,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        CurrentUser {
            id: user.id,
            name: user.name,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

/// Everything a handler needs to know about the visitor, resolved once per
/// request from the session and flash cookies.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub user: Option<CurrentUser>,
    pub flash: Option<String>,
    pub blog_title: String,
}

impl RequestContext {
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(|u| u.is_admin)
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let flash = get_cookie_value(&parts.headers, FLASH_COOKIE).and_then(flash::decode);

        let user = match get_cookie_value(&parts.headers, &state.config.auth.cookie_name) {
            Some(token) => {
                let conn = state.db.get()?;
                session::find_user(&conn, token)?.map(CurrentUser::from)
            }
            None => None,
        };

        Ok(RequestContext {
            user,
            flash,
            blog_title: state.config.blog.title.clone(),
        })
    }
}

/// Admin-only guard. Anonymous visitors are sent to the login page, other
/// users get the unauthorized view.
pub struct AdminContext {
    pub admin: CurrentUser,
    pub ctx: RequestContext,
}

pub enum AdminRejection {
    LoginRequired,
    Forbidden(RequestContext),
    Failed(AppError),
}

impl IntoResponse for AdminRejection {
    fn into_response(self) -> Response {
        match self {
            AdminRejection::LoginRequired => {
                redirect_with_flash("/login", "You need to log in as admin to access this page.")
            }
            AdminRejection::Forbidden(ctx) => Page::new(UnauthorizedTemplate { ctx })
                .with_status(axum::http::StatusCode::FORBIDDEN)
                .into_response(),
            AdminRejection::Failed(err) => err.into_response(),
        }
    }
}

impl FromRequestParts<AppState> for AdminContext {
    type Rejection = AdminRejection;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ctx = RequestContext::from_request_parts(parts, state)
            .await
            .map_err(AdminRejection::Failed)?;

        match ctx.user.clone() {
            None => Err(AdminRejection::LoginRequired),
            Some(user) if user.is_admin => Ok(AdminContext { admin: user, ctx }),
            Some(user) => {
                tracing::warn!("User {} denied access to {}", user.id, parts.uri.path());
                Err(AdminRejection::Forbidden(ctx))
            }
        }
    }
}

/// Numeric `{id}` path segment. Anything that is not an integer names no
/// post, so it is a 404 rather than axum's 400 rejection.
pub struct PostId(pub i64);

impl<S: Send + Sync> FromRequestParts<S> for PostId {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(id) = Path::<i64>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound)?;
        Ok(PostId(id))
    }
}
