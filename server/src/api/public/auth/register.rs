use crate::api::{ApiError, ApiResult, ErrorResponse};
use crate::auth::{create_session, hash_password};
use crate::db::DbPool;
use crate::get_conn;
use crate::models::{NewUser, User};
use crate::schema::users;
use axum::{extract::State, http::StatusCode, Json};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use super::normalize_email;

const MIN_PASSWORD_LEN: usize = 8;
const MAX_EMAIL_LEN: usize = 255;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub user_id: Uuid,
    pub token: String,
}

/// Loose address check: one `@` with something on both sides and a dot in
/// the domain.
fn looks_like_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.chars().any(char::is_whitespace)
}

fn validate(req: &RegisterRequest) -> Result<String, ApiError> {
    let email = normalize_email(&req.email);
    if email.len() > MAX_EMAIL_LEN || !looks_like_email(&email) {
        return Err(ApiError::bad_request("Invalid email address"));
    }
    if req.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::bad_request(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(email)
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    tag = "auth",
    request_body(content = RegisterRequest, example = json!({"email": "cook@example.com", "password": "correct horse"})),
    responses(
        (status = 201, description = "User created successfully", body = RegisterResponse),
        (status = 400, description = "Invalid request", body = ErrorResponse),
        (status = 409, description = "Email already registered", body = ErrorResponse)
    )
)]
pub async fn register(
    State(pool): State<Arc<DbPool>>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let email = validate(&req)?;

    let password_hash = hash_password(&req.password).map_err(|e| {
        ApiError::Internal(format!("Failed to hash password: {}", e))
    })?;

    let mut conn = get_conn!(pool);

    let (user, token) = conn.transaction(|conn| {
        let user: User = diesel::insert_into(users::table)
            .values(&NewUser {
                email: &email,
                password_hash: &password_hash,
            })
            .returning(User::as_returning())
            .get_result(conn)
            .map_err(ApiError::unique_violation("Email already registered"))?;

        let token = create_session(conn, user.id)
            .map_err(|e| ApiError::Internal(format!("Failed to create session: {}", e)))?;

        Ok::<_, ApiError>((user, token))
    })?;

    tracing::info!(user_id = %user.id, "registered user");

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            user_id: user.id,
            token,
        }),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[test]
    fn test_email_is_trimmed_and_lowercased() {
        let email = validate(&request("  Cook@Example.COM ", "longenough")).unwrap();
        assert_eq!(email, "cook@example.com");
    }

    #[test]
    fn test_rejects_malformed_emails() {
        for email in [
            "",
            "cook",
            "cook@",
            "@example.com",
            "cook@example",
            "co ok@example.com",
            "a@b@c.com",
        ] {
            assert!(
                matches!(validate(&request(email, "longenough")), Err(ApiError::BadRequest(_))),
                "accepted {:?}",
                email
            );
        }
    }

    #[test]
    fn test_rejects_short_passwords() {
        let err = validate(&request("cook@example.com", "short")).unwrap_err();
        assert_eq!(err.to_string(), "Password must be at least 8 characters");
        assert!(validate(&request("cook@example.com", "12345678")).is_ok());
    }
}
