//! Spending points.
use std::fmt::Debug;

use log::*;

use crate::{
    api::errors::WithdrawalApiError,
    db_types::{BalanceOperation, OrderNumber, Points},
    events::{EventProducers, WithdrawalEvent},
    traits::BalanceLedger,
};

pub struct WithdrawalApi<B> {
    db: B,
    producers: EventProducers,
}

impl<B: Debug> Debug for WithdrawalApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "WithdrawalApi ({:?})", self.db)
    }
}

impl<B> WithdrawalApi<B>
where B: BalanceLedger
{
    pub fn new(db: B, producers: EventProducers) -> Self {
        Self { db, producers }
    }

    /// Withdraws `amount` points from the user's balance against the withdrawal order `raw_number`.
    ///
    /// The order number only has to pass the checksum. It does not need to match an uploaded purchase order, since
    /// withdrawal numbers are a separate namespace. The ledger decides whether the balance covers the amount.
    pub async fn withdraw(
        &self,
        user_id: i64,
        raw_number: &str,
        amount: Points,
    ) -> Result<BalanceOperation, WithdrawalApiError> {
        let number = OrderNumber::parse(raw_number)?;
        if !amount.is_positive() {
            return Err(WithdrawalApiError::InvalidAmount(amount));
        }
        let operation = self.db.debit(user_id, amount, &number).await.map_err(|e| {
            debug!("💻️ Withdrawal of {amount} by user {user_id} rejected. {e}");
            WithdrawalApiError::from(e)
        })?;
        info!("💻️ User {user_id} withdrew {amount} against order {number}");
        self.producers.publish_withdrawal(WithdrawalEvent::new(operation.clone())).await;
        Ok(operation)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        api::balance_api::BalanceApi,
        db_types::OperationKind,
        test_utils::MemoryDatabase,
        traits::{CreditResult, LedgerError},
    };

    async fn funded(amount: i64) -> MemoryDatabase {
        let db = MemoryDatabase::new();
        let number = OrderNumber::parse("12345678903").unwrap();
        let result = db.credit(1, Points::from_points(amount), &number).await.unwrap();
        assert!(matches!(result, CreditResult::Credited(_)));
        db
    }

    #[tokio::test]
    async fn withdraw_within_balance() {
        let db = funded(500).await;
        let api = WithdrawalApi::new(db.clone(), EventProducers::default());
        let op = api.withdraw(1, "2377225624", Points::from_points(120)).await.unwrap();
        assert_eq!(op.kind, OperationKind::Withdrawal);
        assert_eq!(op.order_reference.as_str(), "2377225624");
        let balance = BalanceApi::new(db).balance(1).await.unwrap();
        assert_eq!(balance.current, Points::from_points(380));
        assert_eq!(balance.withdrawn, Points::from_points(120));
    }

    #[tokio::test]
    async fn checksum_is_checked_before_funds() {
        let api = WithdrawalApi::new(MemoryDatabase::new(), EventProducers::default());
        let err = api.withdraw(1, "1234", Points::from_points(1)).await.unwrap_err();
        assert!(matches!(err, WithdrawalApiError::InvalidFormat(_)));
    }

    #[tokio::test]
    async fn amounts_must_be_positive() {
        let api = WithdrawalApi::new(funded(10).await, EventProducers::default());
        let err = api.withdraw(1, "2377225624", Points::default()).await.unwrap_err();
        assert!(matches!(err, WithdrawalApiError::InvalidAmount(_)));
        let err = api.withdraw(1, "2377225624", Points::from(-5)).await.unwrap_err();
        assert!(matches!(err, WithdrawalApiError::InvalidAmount(_)));
    }

    #[tokio::test]
    async fn overdraft_is_rejected_without_writing() {
        let db = funded(500).await;
        let api = WithdrawalApi::new(db.clone(), EventProducers::default());
        api.withdraw(1, "2377225624", Points::from_points(500)).await.unwrap();
        let err = api.withdraw(1, "2377225624", Points::from(1)).await.unwrap_err();
        assert!(matches!(err, WithdrawalApiError::InsufficientFunds(p) if p == Points::from(1)));
        let balances = BalanceApi::new(db);
        assert_eq!(balances.balance(1).await.unwrap().current, Points::default());
        assert_eq!(balances.withdrawals(1).await.unwrap().len(), 1);
        assert_eq!(balances.history(1).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn users_without_withdrawals() {
        let balances = BalanceApi::new(funded(5).await);
        assert!(matches!(balances.withdrawals(1).await, Err(LedgerError::NoOperations(1))));
        assert!(matches!(balances.history(2).await, Err(LedgerError::NoOperations(2))));
        assert_eq!(balances.balance(2).await.unwrap(), Default::default());
    }
}
