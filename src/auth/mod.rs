//! Access to the external authentication service
//!
//! [`AuthGateway`] is the only entry point request handlers use. It consults
//! the shared [`CircuitBreaker`](crate::resilience::CircuitBreaker) before
//! every remote call and feeds the outcome back afterwards.

mod client;
mod gateway;

pub use client::{
    AuthServiceClient, HttpAuthClient, RemoteUser, TransportError, ValidateTokenReply,
    ValidateTokenRequest,
};
pub use gateway::{AuthError, AuthGateway, ValidateTokenResponse};
