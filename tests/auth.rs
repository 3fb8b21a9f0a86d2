//! `UserProvider` extractor contract (spec.md §6 Auth collaborator).

use axum::extract::FromRequestParts;
use axum::http::Request;
use tileserver_rs::auth::{AuthUser, DenyAll, MaybeAuthUser, UserProvider};
use tileserver_rs::layers::AuthenticatedUser;

#[derive(Clone)]
struct StaticUser(AuthenticatedUser);

impl UserProvider for StaticUser {
    fn authenticate(&self, _parts: &axum::http::request::Parts) -> Result<AuthenticatedUser, tileserver_rs::TileServerError> {
        Ok(self.0.clone())
    }
}

#[test]
fn deny_all_always_rejects() {
    let provider = DenyAll;
    let req = Request::builder().uri("/tiles/layer/1/2/3").body(()).unwrap();
    let (parts, ()) = req.into_parts();
    assert!(provider.authenticate(&parts).is_err());
}

#[tokio::test]
async fn auth_user_extractor_rejects_with_deny_all_state() {
    let req = Request::builder().uri("/tiles-with-permission/layer/1/2/3").body(()).unwrap();
    let (mut parts, ()) = req.into_parts();
    let provider: std::sync::Arc<dyn UserProvider> = std::sync::Arc::new(DenyAll);

    let result = AuthUser::from_request_parts(&mut parts, &provider).await;
    assert!(result.is_err());
}

#[tokio::test]
async fn auth_user_extractor_accepts_with_configured_provider() {
    let req = Request::builder().uri("/tiles-with-permission/layer/1/2/3").body(()).unwrap();
    let (mut parts, ()) = req.into_parts();
    let user = AuthenticatedUser { id: 42, role: 3, attributes: Default::default() };
    let provider: std::sync::Arc<dyn UserProvider> = std::sync::Arc::new(StaticUser(user));

    let AuthUser(resolved) = AuthUser::from_request_parts(&mut parts, &provider).await.unwrap();
    assert_eq!(resolved.id, 42);
    assert_eq!(resolved.role, 3);
}

#[tokio::test]
async fn maybe_auth_user_never_rejects() {
    let req = Request::builder().uri("/tiles/layer/1/2/3").body(()).unwrap();
    let (mut parts, ()) = req.into_parts();
    let provider: std::sync::Arc<dyn UserProvider> = std::sync::Arc::new(DenyAll);

    let MaybeAuthUser(resolved) = MaybeAuthUser::from_request_parts(&mut parts, &provider).await.unwrap();
    assert!(resolved.is_none());
}
