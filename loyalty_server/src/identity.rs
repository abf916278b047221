//! Caller identity
//!
//! The loyalty server does not authenticate anyone itself. It sits behind a front proxy that does, and that proxy
//! passes the authenticated user's numeric id in the `X-User-Id` header. Handlers take a [`UserId`] argument to get
//! at it; requests without a valid id are rejected with 401 before the handler runs.
use std::{
    fmt::Display,
    future::{ready, Ready},
};

use actix_web::{dev::Payload, FromRequest, HttpRequest};
use log::*;

use crate::errors::ServerError;

pub const USER_ID_HEADER: &str = "X-User-Id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserId(pub i64);

impl UserId {
    pub fn value(&self) -> i64 {
        self.0
    }

    fn from_header_value(value: &str) -> Result<Self, ServerError> {
        match value.trim().parse::<i64>() {
            Ok(id) if id > 0 => Ok(Self(id)),
            Ok(id) => Err(ServerError::Unauthorized(format!("{id} is not a valid user id"))),
            Err(e) => Err(ServerError::Unauthorized(format!("{value} is not a valid user id. {e}"))),
        }
    }
}

impl Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromRequest for UserId {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let result = req
            .headers()
            .get(USER_ID_HEADER)
            .ok_or_else(|| ServerError::Unauthorized(format!("The {USER_ID_HEADER} header is missing")))
            .and_then(|v| {
                v.to_str().map_err(|e| ServerError::Unauthorized(format!("{USER_ID_HEADER} is not readable. {e}")))
            })
            .and_then(UserId::from_header_value);
        if let Err(e) = &result {
            debug!("💻️ Rejecting request to {}. {e}", req.path());
        }
        ready(result)
    }
}
