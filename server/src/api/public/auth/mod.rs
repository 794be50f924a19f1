pub mod login;
pub mod logout;
pub mod register;

/// Trim and lowercase an email address as it is stored.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
