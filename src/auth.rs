//! Authenticated-user extraction (spec.md §6 "Auth" collaborator).
//!
//! The real token-verification step — JWT decode, session lookup, whatever
//! a deployment uses — is out of scope (spec.md §1): this module only
//! defines the contract permissioned routes need from it, as an axum
//! extractor, the way the teacher's other collaborator boundaries (DB pool,
//! config) are plain constructor arguments rather than framework magic.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use std::sync::Arc;

use crate::error::TileServerError;
use crate::layers::AuthenticatedUser;

/// Verifies a request's credentials and produces the caller's identity.
///
/// A production deployment supplies a real implementation (JWT decode
/// against an external IdP, session-store lookup, ...); `tests/` wires a
/// stub implementation so permissioned routes are exercised without one.
pub trait UserProvider: Send + Sync {
    fn authenticate(&self, parts: &Parts) -> Result<AuthenticatedUser, TileServerError>;
}

/// A `UserProvider` that always rejects — the default until a deployment
/// supplies its own, so permissioned routes fail closed rather than open.
#[derive(Debug, Default)]
pub struct DenyAll;

impl UserProvider for DenyAll {
    fn authenticate(&self, _parts: &Parts) -> Result<AuthenticatedUser, TileServerError> {
        Err(TileServerError::Unauthorized)
    }
}

/// axum extractor for `GET /tiles-with-permission/...` and any other route
/// that requires spec.md §6's `{id, role}` user object. Rejects with 401
/// when the configured `UserProvider` cannot produce one.
pub struct AuthUser(pub AuthenticatedUser);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    Arc<dyn UserProvider>: axum::extract::FromRef<S>,
{
    type Rejection = TileServerError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let provider = Arc::<dyn UserProvider>::from_ref(state);
        provider.authenticate(parts).map(AuthUser)
    }
}

/// Like [`AuthUser`] but optional — used by routes that behave differently
/// for anonymous vs. authenticated callers (none currently; kept for
/// symmetry with the teacher's own optional-auth extractors elsewhere).
pub struct MaybeAuthUser(pub Option<AuthenticatedUser>);

impl<S> FromRequestParts<S> for MaybeAuthUser
where
    S: Send + Sync,
    Arc<dyn UserProvider>: axum::extract::FromRef<S>,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let provider = Arc::<dyn UserProvider>::from_ref(state);
        Ok(MaybeAuthUser(provider.authenticate(parts).ok()))
    }
}
