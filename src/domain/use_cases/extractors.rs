use actix_web::{FromRequest, HttpRequest, HttpMessage};
use futures_util::future::{ready, Ready};
use crate::{entities::token::Claims, errors::AuthError};

/// Claims of the signed-in caller, placed on the request by the auth
/// middleware. Responds 401 when absent.
#[derive(Debug)]
pub struct AuthClaims(pub Claims);

impl AuthClaims {
    pub fn uid(&self) -> &str {
        &self.0.sub
    }
}

impl FromRequest for AuthClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) => ready(Ok(AuthClaims(claims.clone()))),
            None => ready(Err(AuthError::MissingCredentials.into())),
        }
    }
}

/// Like [`AuthClaims`], but the caller must carry the `admin` role (403
/// otherwise).
#[derive(Debug)]
pub struct AdminClaims(pub Claims);

impl FromRequest for AdminClaims {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        match req.extensions().get::<Claims>() {
            Some(claims) if claims.is_admin() => ready(Ok(AdminClaims(claims.clone()))),
            Some(_) => ready(Err(AuthError::Forbidden("Admin access required".into()).into())),
            None => ready(Err(AuthError::MissingCredentials.into())),
        }
    }
}