use askama::Template;
use axum::extract::State;
use axum::routing::get;
use axum::{Form, Router};

use crate::extractors::RequestContext;
use crate::forms::{ContactForm, FormErrors};
use crate::routes::{impl_view, Page};
use crate::state::AppState;

#[derive(Template)]
#[template(path = "pages/contact.html")]
pub struct ContactTemplate {
    pub ctx: RequestContext,
    pub form: ContactForm,
    pub errors: FormErrors,
    pub sent: bool,
    pub failed: bool,
}

impl_view!(ContactTemplate);

pub fn router() -> Router<AppState> {
    Router::new().route("/contact", get(contact_page).post(submit))
}

/// GET /contact
pub async fn contact_page(ctx: RequestContext) -> Page<ContactTemplate> {
    Page::new(ContactTemplate {
        ctx,
        form: ContactForm::default(),
        errors: FormErrors::new(),
        sent: false,
        failed: false,
    })
}

/// POST /contact: validate, then hand off to the notifier
pub async fn submit(
    State(state): State<AppState>,
    ctx: RequestContext,
    Form(mut form): Form<ContactForm>,
) -> Page<ContactTemplate> {
    let message = match form.validate() {
        Ok(message) => message,
        Err(errors) => {
            return Page::new(ContactTemplate {
                ctx,
                form,
                errors,
                sent: false,
                failed: false,
            })
        }
    };

    let sent = match state.notifier.notify(&message).await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!("Contact message from {} not delivered: {}", message.email, e);
            false
        }
    };

    Page::new(ContactTemplate {
        ctx,
        form: if sent { ContactForm::default() } else { form },
        errors: FormErrors::new(),
        sent,
        failed: !sent,
    })
}
