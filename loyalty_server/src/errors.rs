use actix_web::{
    error::ResponseError,
    http::{header::ContentType, StatusCode},
    HttpResponse,
};
use loyalty_engine::{traits::LedgerError, OrderApiError, WithdrawalApiError};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Could not initialize server. {0}")]
    InitializeError(String),
    #[error("An error occurred on the backend of the server. {0}")]
    BackendError(String),
    #[error("Could not read request body: {0}")]
    InvalidRequestBody(String),
    #[error("An I/O error happened in the server. {0}")]
    IOError(#[from] std::io::Error),
    #[error("Invalid server configuration. {0}")]
    ConfigurationError(String),
    #[error("No user id was provided, or it is not valid. {0}")]
    Unauthorized(String),
    #[error("Invalid order number. {0}")]
    InvalidOrderNumber(String),
    #[error("Invalid withdrawal amount. {0}")]
    InvalidAmount(String),
    #[error("{0}")]
    OrderConflict(String),
    #[error("{0}")]
    InsufficientFunds(String),
}

impl ResponseError for ServerError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequestBody(_) => StatusCode::BAD_REQUEST,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::InvalidOrderNumber(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::InvalidAmount(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::OrderConflict(_) => StatusCode::CONFLICT,
            Self::InsufficientFunds(_) => StatusCode::PAYMENT_REQUIRED,
            Self::InitializeError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::BackendError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::IOError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ConfigurationError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::json())
            .body(serde_json::json!({ "error": self.to_string() }).to_string())
    }
}

impl From<OrderApiError> for ServerError {
    fn from(e: OrderApiError) -> Self {
        match e {
            OrderApiError::InvalidFormat(_) => Self::InvalidOrderNumber(e.to_string()),
            OrderApiError::UploadedByOther(_) => Self::OrderConflict(e.to_string()),
            OrderApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
        }
    }
}

impl From<WithdrawalApiError> for ServerError {
    fn from(e: WithdrawalApiError) -> Self {
        match e {
            WithdrawalApiError::InvalidFormat(_) => Self::InvalidOrderNumber(e.to_string()),
            WithdrawalApiError::InvalidAmount(_) => Self::InvalidAmount(e.to_string()),
            WithdrawalApiError::InsufficientFunds(_) => Self::InsufficientFunds(e.to_string()),
            WithdrawalApiError::DatabaseError(s) => Self::BackendError(format!("Database error: {s}")),
        }
    }
}

impl From<LedgerError> for ServerError {
    fn from(e: LedgerError) -> Self {
        Self::from(WithdrawalApiError::from(e))
    }
}

#[cfg(test)]
mod test {
    use loyalty_engine::db_types::{InvalidOrderNumber, OrderNumber, Points};

    use super::*;

    #[test]
    fn domain_errors_map_to_status_codes() {
        let e = ServerError::from(OrderApiError::InvalidFormat(InvalidOrderNumber("12".into())));
        assert_eq!(e.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let number = OrderNumber::parse("12345678903").unwrap();
        let e = ServerError::from(OrderApiError::UploadedByOther(number));
        assert_eq!(e.status_code(), StatusCode::CONFLICT);
        let e = ServerError::from(WithdrawalApiError::InsufficientFunds(Points::from(5)));
        assert_eq!(e.status_code(), StatusCode::PAYMENT_REQUIRED);
        let e = ServerError::from(WithdrawalApiError::InvalidAmount(Points::from(0)));
        assert_eq!(e.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        let e = ServerError::from(LedgerError::DatabaseError("disk on fire".into()));
        assert_eq!(e.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
