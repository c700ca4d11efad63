pub mod assets;
pub mod auth;
pub mod contact;
pub mod home;
pub mod posts;

use askama::Template;
use axum::http::{header, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::extractors::RequestContext;
use crate::flash;
use crate::state::AppState;

/// A rendered page. Every page template carries the request context so the
/// layout can show the nav and any pending flash.
pub trait View: Template {
    fn ctx(&self) -> &RequestContext;
}

macro_rules! impl_view {
    ($($ty:ty),* $(,)?) => {
        $(impl $crate::routes::View for $ty {
            fn ctx(&self) -> &$crate::extractors::RequestContext {
                &self.ctx
            }
        })*
    };
}
pub(crate) use impl_view;

#[derive(Template)]
#[template(path = "pages/unauthorized.html")]
pub struct UnauthorizedTemplate {
    pub ctx: RequestContext,
}

impl_view!(UnauthorizedTemplate);

/// Wrapper to render askama templates as axum responses. Clears the flash
/// cookie once its message has been shown.
pub struct Page<T: View> {
    view: T,
    status: StatusCode,
}

impl<T: View> Page<T> {
    pub fn new(view: T) -> Self {
        Self {
            view,
            status: StatusCode::OK,
        }
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }
}

impl<T: View> IntoResponse for Page<T> {
    fn into_response(self) -> Response {
        let shown_flash = self.view.ctx().flash.is_some();
        match self.view.render() {
            Ok(body) => {
                let mut response = (
                    self.status,
                    [(header::CONTENT_TYPE, "text/html; charset=utf-8")],
                    body,
                )
                    .into_response();
                if shown_flash {
                    if let Ok(value) = flash::clear_cookie().parse() {
                        response.headers_mut().append(header::SET_COOKIE, value);
                    }
                }
                response
            }
            Err(e) => {
                tracing::error!("Template render error: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
            }
        }
    }
}

/// 303 to `to`, leaving `message` for the next page.
pub fn redirect_with_flash(to: &str, message: &str) -> Response {
    (
        AppendHeaders([(header::SET_COOKIE, flash::set_cookie(message))]),
        Redirect::to(to),
    )
        .into_response()
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home::index))
        .route("/about", get(home::about))
        .route("/assets/{*path}", get(assets::serve))
        .merge(auth::router())
        .merge(posts::router())
        .merge(contact::router())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
