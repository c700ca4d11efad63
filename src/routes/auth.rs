use askama::Template;
use axum::extract::State;
use axum::http::header;
use axum::response::{AppendHeaders, IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};
use rusqlite::Connection;

use crate::auth::{self, session, AuthError};
use crate::error::AppResult;
use crate::extractors::RequestContext;
use crate::flash;
use crate::forms::{FormErrors, LoginForm, RegisterForm};
use crate::routes::{impl_view, redirect_with_flash, Page};
use crate::state::AppState;

// -- Templates --

#[derive(Template)]
#[template(path = "pages/register.html")]
pub struct RegisterTemplate {
    pub ctx: RequestContext,
    pub form: RegisterForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/login.html")]
pub struct LoginTemplate {
    pub ctx: RequestContext,
    pub form: LoginForm,
    pub errors: FormErrors,
}

impl_view!(RegisterTemplate, LoginTemplate);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", get(register_page).post(register))
        .route("/login", get(login_page).post(login))
        .route("/logout", get(logout))
}

/// Session cookie plus the "logged in" flash, then home.
fn start_session(state: &AppState, user_id: i64) -> AppResult<Response> {
    let conn = state.db.get()?;
    let token = session::create_session(&conn, user_id, state.config.auth.session_hours)?;

    Ok((
        AppendHeaders([
            (
                header::SET_COOKIE,
                session::session_cookie(
                    &state.config.auth.cookie_name,
                    &token,
                    state.config.auth.session_hours,
                ),
            ),
            (
                header::SET_COOKIE,
                flash::set_cookie("Logged in successfully."),
            ),
        ]),
        Redirect::to("/"),
    )
        .into_response())
}

/// Run `f` with a pooled connection on the blocking pool. Registration and
/// login hash with bcrypt, which would otherwise stall a runtime worker.
async fn with_blocking_conn<T, F>(state: &AppState, f: F) -> AppResult<T>
where
    F: FnOnce(&Connection) -> T + Send + 'static,
    T: Send + 'static,
{
    let pool = state.db.clone();
    tokio::task::spawn_blocking(move || -> AppResult<T> {
        let conn = pool.get()?;
        Ok(f(&conn))
    })
    .await?
}

// -- Registration --

/// GET /register
pub async fn register_page(ctx: RequestContext) -> Response {
    if ctx.user.is_some() {
        return Redirect::to("/").into_response();
    }
    Page::new(RegisterTemplate {
        ctx,
        form: RegisterForm::default(),
        errors: FormErrors::new(),
    })
    .into_response()
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(mut form): Form<RegisterForm>,
) -> AppResult<Response> {
    if ctx.user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    if let Err(errors) = form.validate(state.config.auth.min_password_length) {
        form.password.clear();
        return Ok(Page::new(RegisterTemplate { ctx, form, errors }).into_response());
    }

    let (name, email, password) = (form.name.clone(), form.email.clone(), form.password.clone());
    let cost = state.config.auth.bcrypt_cost;
    let user = with_blocking_conn(&state, move |conn| {
        auth::register(conn, &name, &email, &password, cost)
    })
    .await?;

    match user {
        Ok(user) => {
            tracing::info!("Registered user {} (admin: {})", user.id, user.is_admin);
            start_session(&state, user.id)
        }
        Err(AuthError::DuplicateEmail) => Ok(redirect_with_flash(
            "/login",
            &AuthError::DuplicateEmail.to_string(),
        )),
        Err(err) => Err(err.into()),
    }
}

// -- Login --

/// GET /login
pub async fn login_page(ctx: RequestContext) -> Response {
    if ctx.user.is_some() {
        return Redirect::to("/").into_response();
    }
    Page::new(LoginTemplate {
        ctx,
        form: LoginForm::default(),
        errors: FormErrors::new(),
    })
    .into_response()
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(mut form): Form<LoginForm>,
) -> AppResult<Response> {
    if ctx.user.is_some() {
        return Ok(Redirect::to("/").into_response());
    }

    if let Err(errors) = form.validate() {
        form.password.clear();
        return Ok(Page::new(LoginTemplate { ctx, form, errors }).into_response());
    }

    let (email, password) = (form.email.clone(), form.password.clone());
    let outcome =
        with_blocking_conn(&state, move |conn| auth::authenticate(conn, &email, &password)).await?;

    match outcome {
        Ok(user) => {
            tracing::info!("User {} logged in", user.id);
            start_session(&state, user.id)
        }
        Err(err @ (AuthError::UserNotFound | AuthError::InvalidPassword)) => {
            tracing::warn!("Failed login for {}: {}", form.email, err);
            Ok(redirect_with_flash("/login", &err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}

// -- Logout handler --

/// GET /logout: delete session and redirect
pub async fn logout(
    State(state): State<AppState>,
    request: axum::http::Request<axum::body::Body>,
) -> AppResult<Response> {
    let cookie_name = &state.config.auth.cookie_name;

    if let Some(token) = session::get_cookie_value(request.headers(), cookie_name) {
        let conn = state.db.get()?;
        session::delete_session(&conn, token)?;
    }

    Ok((
        AppendHeaders([(header::SET_COOKIE, session::clear_session_cookie(cookie_name))]),
        Redirect::to("/"),
    )
        .into_response())
}
