//! Custom Axum extractors.
//!
//! - `CorrelationId`: Extract or generate request correlation IDs
//! - `AuthenticatedUser`: Identity forwarded by the upstream authenticator
//! - `AdminUser`: An authenticated user with the admin role

use crate::error::AppError;
use crate::middleware::CORRELATION_ID_HEADER;
use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use train_station_core::{Requester, UserId};
use uuid::Uuid;

/// Header carrying the authenticated user's id.
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Header carrying the user's role.
pub const USER_ROLE_HEADER: &str = "X-User-Role";

/// Role value marking an administrator.
pub const ADMIN_ROLE: &str = "admin";

/// Correlation ID for request tracing.
///
/// Reads the id stored by the correlation middleware, falls back to the
/// `X-Correlation-ID` header, or generates a new UUID v4.
#[derive(Debug, Clone, Copy)]
pub struct CorrelationId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for CorrelationId
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let correlation_id = parts
            .extensions
            .get::<Self>()
            .map(|id| id.0)
            .or_else(|| {
                parts
                    .headers
                    .get(CORRELATION_ID_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| Uuid::parse_str(s).ok())
            })
            .unwrap_or_else(Uuid::new_v4);

        Ok(Self(correlation_id))
    }
}

/// The caller, as identified by `X-User-Id` and `X-User-Role`.
///
/// Requests without a valid `X-User-Id` are rejected with 401.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub Requester);

impl AuthenticatedUser {
    /// The caller's user id.
    #[must_use]
    pub const fn user(&self) -> UserId {
        self.0.user
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user: UserId = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| AppError::unauthorized(format!("missing {USER_ID_HEADER} header")))?
            .to_str()
            .ok()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| AppError::unauthorized(format!("invalid {USER_ID_HEADER} header")))?;

        let is_admin = parts
            .headers
            .get(USER_ROLE_HEADER)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|role| role.trim().eq_ignore_ascii_case(ADMIN_ROLE));

        let requester = if is_admin {
            Requester::admin(user)
        } else {
            Requester::customer(user)
        };
        Ok(Self(requester))
    }
}

/// An authenticated administrator. Other callers get 403.
#[derive(Debug, Clone, Copy)]
pub struct AdminUser(pub Requester);

#[async_trait]
impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthenticatedUser(requester) =
            AuthenticatedUser::from_request_parts(parts, state).await?;
        if !requester.is_admin {
            return Err(AppError::forbidden("administrator role required"));
        }
        Ok(Self(requester))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)] // Test code can use unwrap/expect
mod tests {
    use super::*;
    use axum::http::{Request, StatusCode};

    fn parts(headers: &[(&str, &str)]) -> Parts {
        let mut builder = Request::builder();
        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }
        builder.body(()).expect("Valid request").into_parts().0
    }

    #[tokio::test]
    async fn test_correlation_id_from_header() {
        let uuid = Uuid::new_v4();
        let id = uuid.to_string();
        let mut parts = parts(&[(CORRELATION_ID_HEADER, id.as_str())]);
        let correlation_id = CorrelationId::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(correlation_id.0, uuid);
    }

    #[tokio::test]
    async fn test_customer_identity() {
        let user = UserId::new();
        let id = user.to_string();
        let mut parts = parts(&[(USER_ID_HEADER, id.as_str())]);
        let caller = AuthenticatedUser::from_request_parts(&mut parts, &())
            .await
            .unwrap();
        assert_eq!(caller.user(), user);
        assert!(!caller.0.is_admin);
    }

    #[tokio::test]
    async fn test_missing_or_invalid_user_is_unauthorized() {
        let mut missing = parts(&[]);
        let err = AuthenticatedUser::from_request_parts(&mut missing, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let mut invalid = parts(&[(USER_ID_HEADER, "not-a-uuid")]);
        let err = AuthenticatedUser::from_request_parts(&mut invalid, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_admin_role_required() {
        let user = UserId::new().to_string();
        let mut customer = parts(&[(USER_ID_HEADER, user.as_str())]);
        let err = AdminUser::from_request_parts(&mut customer, &())
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::FORBIDDEN);

        let mut admin = parts(&[(USER_ID_HEADER, user.as_str()), (USER_ROLE_HEADER, "Admin")]);
        let admin = AdminUser::from_request_parts(&mut admin, &()).await.unwrap();
        assert!(admin.0.is_admin);
    }
}
