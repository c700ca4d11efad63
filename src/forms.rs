//! Submitted forms and their field constraints.
//!
//! Every form deserializes with missing fields defaulting to empty strings,
//! so a bad submission always reaches `validate` and comes back as field
//! errors rather than an extractor rejection.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::db::models::{BlogPost, PostDraft};
use crate::notify::ContactMessage;

/// Field name to message, for inline display next to each input.
#[derive(Debug, Default, Clone)]
pub struct FormErrors(BTreeMap<&'static str, String>);

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        // Keep the first failure per field
        self.0.entry(field).or_insert_with(|| message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn into_result(self) -> Result<(), FormErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

fn require(errors: &mut FormErrors, field: &'static str, value: &str) {
    if value.trim().is_empty() {
        errors.add(field, "This field is required.");
    }
}

/// Loose shape check: one `@`, a non-empty local part, a dotted domain and
/// no whitespace.
pub fn is_valid_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split('.')
                    .filter(|label| !label.is_empty())
                    .count()
                    >= 2
                && !domain.starts_with('.')
                && !domain.ends_with('.')
        }
        None => false,
    }
}

/// Absolute http(s) URL with a host.
pub fn is_valid_url(value: &str) -> bool {
    match url::Url::parse(value) {
        Ok(url) => matches!(url.scheme(), "http" | "https") && url.host_str().is_some(),
        Err(_) => false,
    }
}

fn check_email(errors: &mut FormErrors, field: &'static str, value: &str) {
    require(errors, field, value);
    if !value.is_empty() && !is_valid_email(value) {
        errors.add(field, "Invalid email address.");
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct RegisterForm {
    pub name: String,
    pub email: String,
    pub password: String,
}

impl RegisterForm {
    pub fn validate(&mut self, min_password_length: usize) -> Result<(), FormErrors> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();

        let mut errors = FormErrors::new();
        require(&mut errors, "name", &self.name);
        check_email(&mut errors, "email", &self.email);
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        } else if self.password.chars().count() < min_password_length {
            errors.add(
                "password",
                format!(
                    "Password must be at least {} characters long.",
                    min_password_length
                ),
            );
        }
        errors.into_result()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    pub fn validate(&mut self) -> Result<(), FormErrors> {
        self.email = self.email.trim().to_string();

        let mut errors = FormErrors::new();
        check_email(&mut errors, "email", &self.email);
        if self.password.is_empty() {
            errors.add("password", "This field is required.");
        }
        errors.into_result()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct PostForm {
    pub title: String,
    pub subtitle: String,
    pub img_url: String,
    pub body: String,
}

impl PostForm {
    /// Prefill from an existing post for editing.
    pub fn from_post(post: &BlogPost) -> Self {
        Self {
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            img_url: post.img_url.clone(),
            body: post.body.clone(),
        }
    }

    pub fn validate(&mut self) -> Result<PostDraft, FormErrors> {
        self.title = self.title.trim().to_string();
        self.subtitle = self.subtitle.trim().to_string();
        self.img_url = self.img_url.trim().to_string();

        let mut errors = FormErrors::new();
        require(&mut errors, "title", &self.title);
        require(&mut errors, "subtitle", &self.subtitle);
        require(&mut errors, "img_url", &self.img_url);
        if !self.img_url.is_empty() && !is_valid_url(&self.img_url) {
            errors.add("img_url", "Invalid URL.");
        }
        require(&mut errors, "body", &self.body);
        errors.into_result()?;

        Ok(PostDraft {
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            body: self.body.clone(),
            img_url: self.img_url.clone(),
        })
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CommentForm {
    pub comment_text: String,
}

impl CommentForm {
    pub fn validate(&mut self) -> Result<(), FormErrors> {
        self.comment_text = self.comment_text.trim().to_string();

        let mut errors = FormErrors::new();
        require(&mut errors, "comment_text", &self.comment_text);
        errors.into_result()
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct ContactForm {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub message: String,
}

impl ContactForm {
    pub fn validate(&mut self) -> Result<ContactMessage, FormErrors> {
        self.name = self.name.trim().to_string();
        self.email = self.email.trim().to_string();
        self.phone = self.phone.trim().to_string();

        let mut errors = FormErrors::new();
        require(&mut errors, "name", &self.name);
        check_email(&mut errors, "email", &self.email);
        require(&mut errors, "message", &self.message);
        errors.into_result()?;

        Ok(ContactMessage {
            name: self.name.clone(),
            email: self.email.clone(),
            phone: Some(self.phone.clone()).filter(|p| !p.is_empty()),
            message: self.message.trim().to_string(),
        })
    }
}
