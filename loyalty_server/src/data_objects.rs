use std::fmt::Display;

use chrono::{DateTime, SecondsFormat, Utc};
use loyalty_engine::db_types::{BalanceOperation, Order, OrderStatusType, Points};
use serde::{Deserialize, Serialize, Serializer};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonResponse {
    pub success: bool,
    pub message: String,
}

impl JsonResponse {
    pub fn success<S: Display>(message: S) -> Self {
        Self { success: true, message: message.to_string() }
    }
}

fn rfc3339<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Secs, true))
}

/// An order as the user sees it. `accrual` is only present once the order has been processed.
#[derive(Debug, Clone, Serialize)]
pub struct OrderResponse {
    pub number: String,
    pub status: OrderStatusType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accrual: Option<Points>,
    #[serde(serialize_with = "rfc3339")]
    pub uploaded_at: DateTime<Utc>,
}

impl From<Order> for OrderResponse {
    fn from(order: Order) -> Self {
        let accrual = (order.status == OrderStatusType::Processed).then_some(order.accrual);
        Self { number: order.number.as_str().to_string(), status: order.status, accrual, uploaded_at: order.created_at }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub order: String,
    pub sum: Points,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalResponse {
    pub order: String,
    pub sum: Points,
    #[serde(serialize_with = "rfc3339")]
    pub processed_at: DateTime<Utc>,
}

impl From<BalanceOperation> for WithdrawalResponse {
    fn from(op: BalanceOperation) -> Self {
        Self { order: op.order_reference.as_str().to_string(), sum: op.amount, processed_at: op.created_at }
    }
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use loyalty_engine::db_types::{OperationKind, OrderNumber};

    use super::*;

    fn order(status: OrderStatusType, accrual: i64) -> Order {
        let ts = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 0).unwrap();
        Order {
            id: 1,
            number: OrderNumber::parse("12345678903").unwrap(),
            user_id: 1,
            status,
            accrual: Points::from(accrual),
            created_at: ts,
            updated_at: ts,
        }
    }

    #[test]
    fn accrual_only_shown_for_processed_orders() {
        let json = serde_json::to_string(&OrderResponse::from(order(OrderStatusType::Processed, 72998))).unwrap();
        assert_eq!(
            json,
            r#"{"number":"12345678903","status":"PROCESSED","accrual":729.98,"uploaded_at":"2024-03-01T12:30:00Z"}"#
        );
        let json = serde_json::to_string(&OrderResponse::from(order(OrderStatusType::New, 0))).unwrap();
        assert_eq!(json, r#"{"number":"12345678903","status":"NEW","uploaded_at":"2024-03-01T12:30:00Z"}"#);
    }

    #[test]
    fn withdrawal_request_accepts_decimals() {
        let req: WithdrawRequest = serde_json::from_str(r#"{"order": "2377225624", "sum": 751.5}"#).unwrap();
        assert_eq!(req.sum, Points::from(75150));
        let op = BalanceOperation {
            id: 3,
            user_id: 1,
            kind: OperationKind::Withdrawal,
            amount: req.sum,
            order_reference: OrderNumber::parse(&req.order).unwrap(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap(),
        };
        let json = serde_json::to_string(&WithdrawalResponse::from(op)).unwrap();
        assert_eq!(json, r#"{"order":"2377225624","sum":751.5,"processed_at":"2024-03-02T08:00:00Z"}"#);
    }
}
