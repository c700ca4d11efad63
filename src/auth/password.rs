/// Salted bcrypt hash of `plaintext` at the given cost.
pub fn hash(plaintext: &str, cost: u32) -> Result<String, bcrypt::BcryptError> {
    bcrypt::hash(plaintext, cost)
}

/// Compare `plaintext` against a stored hash. A malformed hash never verifies.
pub fn verify(plaintext: &str, stored_hash: &str) -> bool {
    bcrypt::verify(plaintext, stored_hash).unwrap_or(false)
}
