use askama::Template;
use axum::extract::State;
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::{Form, Router};

use crate::db::models::{is_unique_violation, BlogPost, Comment};
use crate::db::{comments, posts};
use crate::error::{AppError, AppResult};
use crate::extractors::{AdminContext, PostId, RequestContext};
use crate::forms::{CommentForm, FormErrors, PostForm};
use crate::routes::{impl_view, redirect_with_flash, Page};
use crate::state::AppState;

const DUPLICATE_TITLE: &str = "A post with that title already exists.";

#[derive(Template)]
#[template(path = "pages/post.html")]
pub struct PostTemplate {
    pub ctx: RequestContext,
    pub post: BlogPost,
    pub comments: Vec<Comment>,
    pub form: CommentForm,
    pub errors: FormErrors,
}

#[derive(Template)]
#[template(path = "pages/make_post.html")]
pub struct MakePostTemplate {
    pub ctx: RequestContext,
    pub form: PostForm,
    pub errors: FormErrors,
    /// Set when editing an existing post
    pub post_id: Option<i64>,
}

impl_view!(PostTemplate, MakePostTemplate);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/post/{id}", get(show_post).post(add_comment))
        .route("/new-post", get(new_post_page).post(create_post))
        .route("/edit-post/{id}", get(edit_post_page).post(update_post))
        .route("/delete/{id}", get(delete_post))
}

/// Today's date the way posts display it, e.g. "October 14, 2026".
pub fn publish_date() -> String {
    chrono::Local::now().format("%B %d, %Y").to_string()
}

fn render_post(
    state: &AppState,
    ctx: RequestContext,
    id: i64,
    form: CommentForm,
    errors: FormErrors,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    let post = posts::find(&conn, id)?.ok_or(AppError::NotFound)?;
    let comments = comments::list_for_post(&conn, id)?;

    Ok(Page::new(PostTemplate {
        ctx,
        post,
        comments,
        form,
        errors,
    })
    .into_response())
}

// -- Viewing and commenting --

/// GET /post/{id}
pub async fn show_post(
    State(state): State<AppState>,
    ctx: RequestContext,
    PostId(id): PostId,
) -> AppResult<Response> {
    render_post(&state, ctx, id, CommentForm::default(), FormErrors::new())
}

/// POST /post/{id}: comment as the logged-in user
pub async fn add_comment(
    State(state): State<AppState>,
    ctx: RequestContext,
    PostId(id): PostId,
    Form(mut form): Form<CommentForm>,
) -> AppResult<Response> {
    {
        let conn = state.db.get()?;
        if posts::find(&conn, id)?.is_none() {
            return Err(AppError::NotFound);
        }
    }

    let Some(user) = ctx.user.clone() else {
        return Ok(redirect_with_flash(
            "/login",
            "You need to login or register to comment.",
        ));
    };

    if let Err(errors) = form.validate() {
        return render_post(&state, ctx, id, form, errors);
    }

    {
        let conn = state.db.get()?;
        comments::insert(&conn, id, user.id, &form.comment_text)?;
    }
    tracing::info!("User {} commented on post {}", user.id, id);

    render_post(&state, ctx, id, CommentForm::default(), FormErrors::new())
}

// -- Authoring (admin only) --

/// GET /new-post
pub async fn new_post_page(admin: AdminContext) -> Page<MakePostTemplate> {
    Page::new(MakePostTemplate {
        ctx: admin.ctx,
        form: PostForm::default(),
        errors: FormErrors::new(),
        post_id: None,
    })
}

/// POST /new-post
pub async fn create_post(
    State(state): State<AppState>,
    admin: AdminContext,
    Form(mut form): Form<PostForm>,
) -> AppResult<Response> {
    let rerender = |ctx: RequestContext, form: PostForm, errors: FormErrors| {
        Page::new(MakePostTemplate {
            ctx,
            form,
            errors,
            post_id: None,
        })
        .into_response()
    };

    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => return Ok(rerender(admin.ctx, form, errors)),
    };

    let conn = state.db.get()?;
    match posts::insert(&conn, &draft, admin.admin.id, &publish_date()) {
        Ok(id) => {
            tracing::info!("Admin {} created post {}", admin.admin.id, id);
            Ok(Redirect::to("/").into_response())
        }
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("title", DUPLICATE_TITLE);
            Ok(rerender(admin.ctx, form, errors))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /edit-post/{id}: form prefilled from the stored post
pub async fn edit_post_page(
    State(state): State<AppState>,
    admin: AdminContext,
    PostId(id): PostId,
) -> AppResult<Page<MakePostTemplate>> {
    let conn = state.db.get()?;
    let post = posts::find(&conn, id)?.ok_or(AppError::NotFound)?;

    Ok(Page::new(MakePostTemplate {
        ctx: admin.ctx,
        form: PostForm::from_post(&post),
        errors: FormErrors::new(),
        post_id: Some(id),
    }))
}

/// POST /edit-post/{id}: overwrite fields, author becomes the editor
pub async fn update_post(
    State(state): State<AppState>,
    admin: AdminContext,
    PostId(id): PostId,
    Form(mut form): Form<PostForm>,
) -> AppResult<Response> {
    let rerender = |ctx: RequestContext, form: PostForm, errors: FormErrors| {
        Page::new(MakePostTemplate {
            ctx,
            form,
            errors,
            post_id: Some(id),
        })
        .into_response()
    };

    let conn = state.db.get()?;
    if posts::find(&conn, id)?.is_none() {
        return Err(AppError::NotFound);
    }

    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => return Ok(rerender(admin.ctx, form, errors)),
    };

    match posts::update(&conn, id, &draft, admin.admin.id) {
        Ok(true) => {
            tracing::info!("Admin {} edited post {}", admin.admin.id, id);
            Ok(Redirect::to(&format!("/post/{}", id)).into_response())
        }
        Ok(false) => Err(AppError::NotFound),
        Err(e) if is_unique_violation(&e) => {
            let mut errors = FormErrors::new();
            errors.add("title", DUPLICATE_TITLE);
            Ok(rerender(admin.ctx, form, errors))
        }
        Err(e) => Err(e.into()),
    }
}

/// GET /delete/{id}
pub async fn delete_post(
    State(state): State<AppState>,
    admin: AdminContext,
    PostId(id): PostId,
) -> AppResult<Response> {
    let conn = state.db.get()?;
    if !posts::delete(&conn, id)? {
        return Err(AppError::NotFound);
    }
    tracing::info!("Admin {} deleted post {}", admin.admin.id, id);

    Ok(Redirect::to("/").into_response())
}

#[cfg(test)]
mod tests {
    use super::publish_date;
    use crate::db::models::{gravatar_url, PostDraft};
    use crate::db::{comments, posts};
    use crate::routes::test_support::*;
    use crate::state::AppState;
    use axum::http::StatusCode;

    fn seed_post(state: &AppState, author_id: i64, title: &str) -> i64 {
        let conn = state.db.get().unwrap();
        posts::insert(
            &conn,
            &PostDraft {
                title: title.into(),
                subtitle: "Sub".into(),
                body: "<p>Body</p>".into(),
                img_url: "https://example.com/a.jpg".into(),
            },
            author_id,
            "May 01, 2024",
        )
        .unwrap()
    }

    const NEW_POST: &str =
        "title=Fresh&subtitle=Sub&img_url=https%3A%2F%2Fexample.com%2Fb.jpg&body=%3Cp%3EHi%3C%2Fp%3E";

    #[test]
    fn publish_date_spells_out_the_month() {
        let date = publish_date();
        let month = date.split_whitespace().next().unwrap();
        assert!(month.chars().all(char::is_alphabetic));
        assert!(date.contains(", "));
    }

    #[tokio::test]
    async fn missing_post_is_404() {
        let state = test_state();
        let response = send(&state, get("/post/42", None)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn non_numeric_post_ids_are_404() {
        let state = test_state();
        let (_, cookie) = seed_user(&state, "admin@x.com", "Admin");

        for request in [
            get("/post/abc", None),
            post_form("/post/abc", Some(&cookie), "comment_text=hi"),
            get("/edit-post/abc", Some(&cookie)),
            post_form("/edit-post/abc", Some(&cookie), NEW_POST),
            get("/delete/1.5", Some(&cookie)),
        ] {
            let uri = request.uri().to_string();
            let response = send(&state, request).await;
            assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
        }
    }

    #[tokio::test]
    async fn comments_show_the_author_gravatar() {
        let state = test_state();
        let (admin, _) = seed_user(&state, "admin@x.com", "Admin");
        let (reader, _) = seed_user(&state, "Reader@X.com", "Reader");
        let id = seed_post(&state, admin.id, "Faces");
        {
            let conn = state.db.get().unwrap();
            comments::insert(&conn, id, reader.id, "hello").unwrap();
        }

        let response = send(&state, get(&format!("/post/{}", id), None)).await;
        let body = body_text(response).await;
        let expected = format!("src=\"{}\"", gravatar_url("reader@x.com"));
        assert!(body.contains(&expected), "{body}");
    }

    #[tokio::test]
    async fn post_page_renders_comments() {
        let state = test_state();
        let (admin, _) = seed_user(&state, "admin@x.com", "Admin");
        let (reader, _) = seed_user(&state, "r@x.com", "Reader");
        let id = seed_post(&state, admin.id, "Readable");
        {
            let conn = state.db.get().unwrap();
            comments::insert(&conn, id, reader.id, "Great <b>post</b>").unwrap();
        }

        let response = send(&state, get(&format!("/post/{}", id), None)).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("Readable"));
        assert!(body.contains("<p>Body</p>"));
        assert!(body.contains("Reader"));
        assert!(body.contains("Great &lt;b&gt;post"));
        assert!(!body.contains("<b>post"));
    }

    #[tokio::test]
    async fn anonymous_comment_redirects_to_login_without_writing() {
        let state = test_state();
        let (admin, _) = seed_user(&state, "admin@x.com", "Admin");
        let id = seed_post(&state, admin.id, "Quiet");

        let response = send(
            &state,
            post_form(&format!("/post/{}", id), None, "comment_text=hello"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/login"));

        let conn = state.db.get().unwrap();
        assert!(comments::list_for_post(&conn, id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn logged_in_comment_is_saved_and_page_rerendered() {
        let state = test_state();
        let (admin, _) = seed_user(&state, "admin@x.com", "Admin");
        let (_, cookie) = seed_user(&state, "r@x.com", "Reader");
        let id = seed_post(&state, admin.id, "Chatty");

        let response = send(
            &state,
            post_form(&format!("/post/{}", id), Some(&cookie), "comment_text=First%21"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("First!"));

        let conn = state.db.get().unwrap();
        let saved = comments::list_for_post(&conn, id).unwrap();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].author_name, "Reader");
    }

    #[tokio::test]
    async fn blank_comment_shows_inline_error() {
        let state = test_state();
        let (_, cookie) = seed_user(&state, "admin@x.com", "Admin");
        let id = seed_post(&state, 1, "Strict");

        let response = send(
            &state,
            post_form(&format!("/post/{}", id), Some(&cookie), "comment_text=+++"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("This field is required."));

        let conn = state.db.get().unwrap();
        assert!(comments::list_for_post(&conn, id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn admin_routes_send_visitors_to_login() {
        let state = test_state();
        let (admin, _) = seed_user(&state, "admin@x.com", "Admin");
        let id = seed_post(&state, admin.id, "Guarded");

        for uri in [
            "/new-post".to_string(),
            format!("/edit-post/{}", id),
            format!("/delete/{}", id),
        ] {
            let response = send(&state, get(&uri, None)).await;
            assert_eq!(response.status(), StatusCode::SEE_OTHER, "{uri}");
            assert_eq!(location(&response), Some("/login"));
            assert!(set_cookies(&response)
                .iter()
                .any(|c| c.starts_with("quill_flash=You+need+to+log+in+as+admin")));
        }
    }

    #[tokio::test]
    async fn admin_routes_forbid_regular_users() {
        let state = test_state();
        let (admin, _) = seed_user(&state, "admin@x.com", "Admin");
        let (_, cookie) = seed_user(&state, "a@x.com", "A");
        let id = seed_post(&state, admin.id, "Guarded");

        let response = send(&state, post_form("/new-post", Some(&cookie), NEW_POST)).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(body_text(response).await.contains("not authorized"));

        let edit = format!("/edit-post/{}", id);
        for request in [
            get(&edit, Some(&cookie)),
            post_form(&edit, Some(&cookie), NEW_POST),
            get(&format!("/delete/{}", id), Some(&cookie)),
        ] {
            let uri = request.uri().to_string();
            let response = send(&state, request).await;
            assert_eq!(response.status(), StatusCode::FORBIDDEN, "{uri}");
        }

        let conn = state.db.get().unwrap();
        let all = posts::list(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Guarded");
        assert_eq!(all[0].author_id, admin.id);
    }

    #[tokio::test]
    async fn admin_creates_a_post() {
        let state = test_state();
        let (admin, cookie) = seed_user(&state, "admin@x.com", "Admin");

        let response = send(&state, post_form("/new-post", Some(&cookie), NEW_POST)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/"));

        let conn = state.db.get().unwrap();
        let all = posts::list(&conn).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].title, "Fresh");
        assert_eq!(all[0].body, "<p>Hi</p>");
        assert_eq!(all[0].author_id, admin.id);
        assert_eq!(all[0].date, publish_date());
    }

    #[tokio::test]
    async fn duplicate_title_is_a_form_error() {
        let state = test_state();
        let (admin, cookie) = seed_user(&state, "admin@x.com", "Admin");
        seed_post(&state, admin.id, "Fresh");

        let response = send(&state, post_form("/new-post", Some(&cookie), NEW_POST)).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("already exists"));
    }

    #[tokio::test]
    async fn edit_form_is_prefilled() {
        let state = test_state();
        let (admin, cookie) = seed_user(&state, "admin@x.com", "Admin");
        let id = seed_post(&state, admin.id, "Draft title");

        let response = send(&state, get(&format!("/edit-post/{}", id), Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_text(response).await;
        assert!(body.contains("value=\"Draft title\""));
        assert!(body.contains(&format!("action=\"/edit-post/{}\"", id)));
    }

    #[tokio::test]
    async fn admin_edit_and_delete_missing_post_are_404() {
        let state = test_state();
        let (_, cookie) = seed_user(&state, "admin@x.com", "Admin");

        let response = send(&state, get("/edit-post/9", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(&state, post_form("/edit-post/9", Some(&cookie), NEW_POST)).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let response = send(&state, get("/delete/9", Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn admin_edit_reassigns_author_and_keeps_comments() {
        let state = test_state();
        let (admin, cookie) = seed_user(&state, "admin@x.com", "Admin");
        let (writer, _) = seed_user(&state, "w@x.com", "Writer");
        let id = seed_post(&state, writer.id, "Original");
        {
            let conn = state.db.get().unwrap();
            comments::insert(&conn, id, writer.id, "keep me").unwrap();
        }

        let response = send(
            &state,
            post_form(&format!("/edit-post/{}", id), Some(&cookie), NEW_POST),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some(format!("/post/{}", id).as_str()));

        let conn = state.db.get().unwrap();
        let post = posts::find(&conn, id).unwrap().unwrap();
        assert_eq!(post.title, "Fresh");
        assert_eq!(post.img_url, "https://example.com/b.jpg");
        assert_eq!(post.author_id, admin.id);
        assert_eq!(post.date, "May 01, 2024");
        assert_eq!(comments::list_for_post(&conn, id).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn admin_delete_removes_post_and_comments() {
        let state = test_state();
        let (admin, cookie) = seed_user(&state, "admin@x.com", "Admin");
        let id = seed_post(&state, admin.id, "Doomed");
        {
            let conn = state.db.get().unwrap();
            comments::insert(&conn, id, admin.id, "bye").unwrap();
        }

        let response = send(&state, get(&format!("/delete/{}", id), Some(&cookie))).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(location(&response), Some("/"));

        let conn = state.db.get().unwrap();
        assert!(posts::find(&conn, id).unwrap().is_none());
        let orphans: i64 = conn
            .query_row("SELECT COUNT(*) FROM comments", [], |row| row.get(0))
            .unwrap();
        assert_eq!(orphans, 0);
    }
}
