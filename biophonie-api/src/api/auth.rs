//! Bearer token authentication
//!
//! `Authorization: Bearer <token>` is hashed and matched against the accounts
//! table. Restricted routes go through [`require_user`] or [`require_admin`],
//! which put the resolved [`Caller`] in the request extensions. Public routes
//! that behave differently for admins use the [`MaybeCaller`] extractor.

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use biophonie_common::auth::parse_bearer;
use biophonie_common::db::Account;
use tracing::{debug, warn};

use super::error::ApiError;
use crate::db::accounts::find_account_by_token;
use crate::AppState;

/// The authenticated account behind a request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caller {
    pub user_id: i64,
    pub name: String,
    pub admin: bool,
}

impl From<Account> for Caller {
    fn from(account: Account) -> Self {
        Self {
            user_id: account.id,
            name: account.name,
            admin: account.admin,
        }
    }
}

/// Resolve the caller from the request headers
///
/// `Ok(None)` when no credential was presented. A credential that is malformed
/// or matches no account is an error.
async fn resolve_caller(state: &AppState, headers: &HeaderMap) -> Result<Option<Caller>, ApiError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };

    let token = value
        .to_str()
        .ok()
        .and_then(parse_bearer)
        .ok_or_else(|| ApiError::Unauthorized("malformed authorization header".to_string()))?;

    match find_account_by_token(&state.db, token).await? {
        Some(account) => Ok(Some(Caller::from(account))),
        None => {
            warn!("Rejected unknown API token");
            Err(ApiError::Unauthorized("invalid token".to_string()))
        }
    }
}

/// Any registered account may pass
pub async fn require_user(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = resolve_caller(&state, request.headers())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("missing authorization token".to_string()))?;

    debug!("Authenticated {} ({})", caller.name, caller.user_id);
    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Only admin accounts may pass
pub async fn require_admin(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let caller = resolve_caller(&state, request.headers())
        .await?
        .ok_or_else(|| ApiError::Unauthorized("missing authorization token".to_string()))?;

    if !caller.admin {
        warn!("Account {} denied on admin route {}", caller.name, request.uri().path());
        return Err(ApiError::Unauthorized("restricted to admins".to_string()));
    }

    request.extensions_mut().insert(caller);
    Ok(next.run(request).await)
}

/// Caller of a public route, if a valid credential was presented
///
/// Unknown or malformed credentials are treated as anonymous here.
#[derive(Debug, Clone)]
pub struct MaybeCaller(pub Option<Caller>);

impl MaybeCaller {
    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(|c| c.admin)
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeCaller {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match resolve_caller(state, &parts.headers).await {
            Ok(caller) => Ok(MaybeCaller(caller)),
            Err(ApiError::Unauthorized(reason)) => {
                debug!("Ignoring credential on public route: {}", reason);
                Ok(MaybeCaller(None))
            }
            Err(e) => Err(e),
        }
    }
}
