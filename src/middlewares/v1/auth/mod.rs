use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::time::Instant;

use actix_web::dev::Payload;
use actix_web::http::header::AUTHORIZATION;
use actix_web::web::Data;
use actix_web::{FromRequest, HttpRequest};

use crate::auth::AuthGateway;
use crate::errors::Error;
use crate::models::v1::User;

/// Caller identity resolved from `Authorization: Bearer <token>`
///
/// Fails with 401 for a missing or rejected token, 503 while the breaker in
/// front of the authentication service is open and 502 when the service
/// could not be reached.
#[derive(Clone, PartialEq, Eq)]
pub struct Auth {
    pub user: User,
}

impl fmt::Debug for Auth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Auth")
            .field("user_id", &self.user.id)
            .field("username", &self.user.username)
            .finish()
    }
}

/// Extract the token from a `Bearer` authorization header value
pub fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

impl FromRequest for Auth {
    type Error = Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self, Self::Error>>>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let start = Instant::now();

        let token = req
            .headers()
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(bearer_token)
            .map(str::to_string);

        let Some(token) = token else {
            return Box::pin(async {
                tracing::debug!("Missing or malformed authorization header");
                Err(Error::unauthorized("Missing bearer token"))
            });
        };

        let gateway = req.app_data::<Data<AuthGateway>>().cloned();

        Box::pin(async move {
            let Some(gateway) = gateway else {
                tracing::error!("AuthGateway is not registered as app data");
                return Err(Error::InternalServerError {
                    message: "Authentication is not configured".to_string(),
                });
            };

            let response = gateway.validate_token(&token).await?;

            match (response.valid, response.user) {
                (true, Some(user)) => {
                    tracing::debug!(user_id = %user.id, elapsed = ?start.elapsed(), "Authenticated");
                    Ok(Auth { user })
                }
                _ => Err(Error::unauthorized("Invalid token")),
            }
        })
    }
}
