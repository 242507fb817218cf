/// HTTP middleware utilities for blog-service
///
/// Sessions are signed HS256 tokens stored in a cookie. `SessionMiddleware`
/// never rejects a request: it resolves the cookie to a user when it can and
/// leaves the request anonymous otherwise. Views opt into login with the
/// `CurrentUser` extractor, which redirects anonymous visitors to the login
/// page with a `next` parameter.
pub mod permissions;

pub use permissions::*;

use crate::config::SessionConfig;
use crate::db::BlogStore;
use crate::error::AppError;
use crate::handlers::AppState;
use crate::models::User;
use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::{web, Error, FromRequest, HttpMessage, HttpRequest};
use chrono::{Duration, Utc};
use futures::future::LocalBoxFuture;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::future::{ready, Ready};
use std::rc::Rc;
use std::sync::Arc;
use tracing::{debug, warn};
use uuid::Uuid;

const SESSION_ALGORITHM: Algorithm = Algorithm::HS256;

// =====================================================================
// Session tokens
// =====================================================================

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user ID as UUID string)
    pub sub: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub username: String,
}

#[derive(Clone)]
pub struct SessionKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
    cookie_name: String,
}

impl SessionKeys {
    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            encoding: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding: DecodingKey::from_secret(config.secret.as_bytes()),
            ttl: Duration::hours(config.ttl_hours),
            cookie_name: config.cookie_name.clone(),
        }
    }

    pub fn cookie_name(&self) -> &str {
        &self.cookie_name
    }

    /// Sign a session token for `user`
    pub fn issue(&self, user: &User) -> crate::error::Result<String> {
        let now = Utc::now();
        let claims = SessionClaims {
            sub: user.id.to_string(),
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            username: user.username.clone(),
        };

        encode(&Header::new(SESSION_ALGORITHM), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("failed to sign session: {}", e)))
    }

    /// Claims of a valid, unexpired token
    pub fn verify(&self, token: &str) -> Option<SessionClaims> {
        let validation = Validation::new(SESSION_ALGORITHM);
        match decode::<SessionClaims>(token, &self.decoding, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                None
            }
        }
    }
}

// =====================================================================
// Session resolution
// =====================================================================

/// Resolves the session cookie to a `User` stored in request extensions
pub struct SessionMiddleware {
    keys: Arc<SessionKeys>,
    store: Arc<dyn BlogStore>,
}

impl SessionMiddleware {
    pub fn new(keys: Arc<SessionKeys>, store: Arc<dyn BlogStore>) -> Self {
        Self { keys, store }
    }
}

impl<S, B> Transform<S, ServiceRequest> for SessionMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = SessionMiddlewareService<S>;
    type Future = Ready<std::result::Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(SessionMiddlewareService {
            service: Rc::new(service),
            keys: self.keys.clone(),
            store: self.store.clone(),
        }))
    }
}

pub struct SessionMiddlewareService<S> {
    service: Rc<S>,
    keys: Arc<SessionKeys>,
    store: Arc<dyn BlogStore>,
}

impl<S, B> Service<ServiceRequest> for SessionMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, std::result::Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let keys = self.keys.clone();
        let store = self.store.clone();

        Box::pin(async move {
            let user_id = req
                .cookie(keys.cookie_name())
                .and_then(|cookie| keys.verify(cookie.value()))
                .and_then(|claims| Uuid::parse_str(&claims.sub).ok());

            if let Some(user_id) = user_id {
                match store.get_user(user_id).await {
                    Ok(Some(user)) => {
                        req.extensions_mut().insert(user);
                    }
                    Ok(None) => debug!(%user_id, "Session refers to an unknown user"),
                    Err(e) => warn!(%user_id, error = %e, "Failed to load session user"),
                }
            }

            service.call(req).await
        })
    }
}

// =====================================================================
// Extractors
// =====================================================================

/// Whoever is looking at the page; `None` for anonymous visitors
#[derive(Debug, Clone)]
pub struct Viewer(pub Option<User>);

impl Viewer {
    pub fn user(&self) -> Option<&User> {
        self.0.as_ref()
    }
}

impl FromRequest for Viewer {
    type Error = Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        ready(Ok(Viewer(req.extensions().get::<User>().cloned())))
    }
}

/// Logged-in user; anonymous requests are redirected to the login page
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        let user = req.extensions().get::<User>().cloned();
        ready(user.map(CurrentUser).ok_or_else(|| {
            let login_url = req
                .app_data::<web::Data<AppState>>()
                .map(|state| state.settings.login_url.clone())
                .unwrap_or_else(|| "/auth/login/".to_string());
            AppError::LoginRequired(login_redirect(&login_url, req))
        }))
    }
}

/// `login_url?next=<full path>`, with `/` left unescaped in `next`
pub fn login_redirect(login_url: &str, req: &HttpRequest) -> String {
    let full_path = match req.query_string() {
        "" => req.path().to_string(),
        query => format!("{}?{}", req.path(), query),
    };
    let next = urlencoding::encode(&full_path).replace("%2F", "/");
    let separator = if login_url.contains('?') { '&' } else { '?' };
    format!("{}{}next={}", login_url, separator, next)
}
