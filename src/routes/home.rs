use askama::Template;
use axum::extract::State;

use crate::db::models::BlogPost;
use crate::db::posts;
use crate::error::AppResult;
use crate::extractors::RequestContext;
use crate::routes::{impl_view, Page};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/index.html")]
pub struct HomeTemplate {
    pub ctx: RequestContext,
    pub heading: String,
    pub posts: Vec<BlogPost>,
}

#[derive(Template)]
#[template(path = "pages/about.html")]
pub struct AboutTemplate {
    pub ctx: RequestContext,
}

impl_view!(HomeTemplate, AboutTemplate);

/// GET /: feed of every post
pub async fn index(
    State(state): State<AppState>,
    ctx: RequestContext,
) -> AppResult<Page<HomeTemplate>> {
    let conn = state.db.get()?;
    let posts = posts::list(&conn)?;

    let heading = match ctx.user {
        Some(ref user) => user.name.clone(),
        None => ctx.blog_title.clone(),
    };

    Ok(Page::new(HomeTemplate {
        ctx,
        heading,
        posts,
    }))
}

/// GET /about
pub async fn about(ctx: RequestContext) -> Page<AboutTemplate> {
    Page::new(AboutTemplate { ctx })
}
