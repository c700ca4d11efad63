//! One-shot notices carried in a cookie until the next rendered page.

use url::form_urlencoded;

pub const FLASH_COOKIE: &str = "quill_flash";

/// `Set-Cookie` value carrying `message`.
pub fn set_cookie(message: &str) -> String {
    let encoded: String = form_urlencoded::byte_serialize(message.as_bytes()).collect();
    format!(
        "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age=300",
        FLASH_COOKIE, encoded
    )
}

pub fn clear_cookie() -> String {
    format!("{}=; HttpOnly; SameSite=Lax; Path=/; Max-Age=0", FLASH_COOKIE)
}

/// Decode a cookie value produced by [`set_cookie`].
pub fn decode(value: &str) -> Option<String> {
    // byte_serialize escapes '=' and '&', so the whole message is one key
    form_urlencoded::parse(value.as_bytes())
        .next()
        .map(|(key, _)| key.into_owned())
        .filter(|message| !message.is_empty())
}
