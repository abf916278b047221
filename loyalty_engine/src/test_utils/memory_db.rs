use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
    Mutex,
    MutexGuard,
};

use chrono::Utc;

use crate::{
    db_types::{BalanceOperation, BalanceSummary, OperationKind, Order, OrderNumber, OrderStatusType, Points},
    traits::{
        AccrualSettlement,
        BalanceLedger,
        CreditResult,
        LedgerError,
        OrderManagement,
        OrderStoreError,
        Settlement,
        SettlementError,
        VerdictOutcome,
    },
};

/// An in-process backend with the same semantics as [`crate::SqliteDatabase`].
///
/// Every operation runs under one lock, so each call is atomic. Useful for exercising the accrual machinery under
/// paused tokio time, where a real database would not play along.
#[derive(Clone, Default)]
pub struct MemoryDatabase {
    state: Arc<Mutex<MemoryState>>,
    unavailable: Arc<AtomicBool>,
}

#[derive(Default)]
struct MemoryState {
    orders: Vec<Order>,
    operations: Vec<BalanceOperation>,
}

const UNAVAILABLE: &str = "The memory database has been switched off";

impl MemoryDatabase {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every call fails with a database error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Every ledger entry, in insertion order.
    pub fn operations(&self) -> Vec<BalanceOperation> {
        self.state().operations.clone()
    }

    pub fn orders(&self) -> Vec<Order> {
        self.state().orders.clone()
    }

    fn state(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_available(&self) -> Result<(), String> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(UNAVAILABLE.to_string())
        } else {
            Ok(())
        }
    }
}

impl MemoryState {
    fn update_non_terminal(&mut self, order_id: i64, status: OrderStatusType, accrual: Points) -> Option<Order> {
        let order = self.orders.iter_mut().find(|o| o.id == order_id && !o.status.is_terminal())?;
        order.status = status;
        order.accrual = accrual;
        order.updated_at = Utc::now();
        Some(order.clone())
    }

    fn order_by_id(&self, order_id: i64) -> Option<Order> {
        self.orders.iter().find(|o| o.id == order_id).cloned()
    }

    fn available(&self, user_id: i64) -> Points {
        self.operations.iter().filter(|op| op.user_id == user_id).map(BalanceOperation::signed_amount).sum()
    }

    fn append(&mut self, user_id: i64, kind: OperationKind, amount: Points, order_ref: &OrderNumber) -> BalanceOperation {
        let op = BalanceOperation {
            id: self.operations.len() as i64 + 1,
            user_id,
            kind,
            amount,
            order_reference: order_ref.clone(),
            created_at: Utc::now(),
        };
        self.operations.push(op.clone());
        op
    }

    fn insert_accrual(&mut self, user_id: i64, amount: Points, order_ref: &OrderNumber) -> Option<BalanceOperation> {
        let exists =
            self.operations.iter().any(|op| op.kind == OperationKind::Accrual && &op.order_reference == order_ref);
        if exists {
            None
        } else {
            Some(self.append(user_id, OperationKind::Accrual, amount, order_ref))
        }
    }
}

impl OrderManagement for MemoryDatabase {
    async fn fetch_pending_orders(&self, limit: u32) -> Result<Vec<Order>, OrderStoreError> {
        self.check_available().map_err(OrderStoreError::DatabaseError)?;
        let mut pending =
            self.state().orders.iter().filter(|o| !o.status.is_terminal()).cloned().collect::<Vec<Order>>();
        pending.sort_by_key(|o| (o.created_at, o.id));
        pending.truncate(limit as usize);
        Ok(pending)
    }

    async fn create_order(&self, number: &OrderNumber, user_id: i64) -> Result<Order, OrderStoreError> {
        self.check_available().map_err(OrderStoreError::DatabaseError)?;
        let mut state = self.state();
        if let Some(existing) = state.orders.iter().find(|o| &o.number == number) {
            return if existing.user_id == user_id {
                Err(OrderStoreError::AlreadyUploadedBySelf(Box::new(existing.clone())))
            } else {
                Err(OrderStoreError::UploadedByOther(number.clone()))
            };
        }
        let now = Utc::now();
        let order = Order {
            id: state.orders.len() as i64 + 1,
            number: number.clone(),
            user_id,
            status: OrderStatusType::New,
            accrual: Points::default(),
            created_at: now,
            updated_at: now,
        };
        state.orders.push(order.clone());
        Ok(order)
    }

    async fn apply_verdict(
        &self,
        order_id: i64,
        status: OrderStatusType,
        accrual: Points,
    ) -> Result<VerdictOutcome, OrderStoreError> {
        self.check_available().map_err(OrderStoreError::DatabaseError)?;
        let mut state = self.state();
        if let Some(order) = state.update_non_terminal(order_id, status, accrual) {
            return Ok(VerdictOutcome::Applied(order));
        }
        state.order_by_id(order_id).map(VerdictOutcome::AlreadyTerminal).ok_or(OrderStoreError::OrderNotFound(order_id))
    }

    async fn fetch_order_by_number(&self, number: &OrderNumber) -> Result<Option<Order>, OrderStoreError> {
        self.check_available().map_err(OrderStoreError::DatabaseError)?;
        Ok(self.state().orders.iter().find(|o| &o.number == number).cloned())
    }

    async fn fetch_orders_for_user(&self, user_id: i64) -> Result<Vec<Order>, OrderStoreError> {
        self.check_available().map_err(OrderStoreError::DatabaseError)?;
        let mut orders = self.state().orders.iter().filter(|o| o.user_id == user_id).cloned().collect::<Vec<Order>>();
        orders.sort_by_key(|o| std::cmp::Reverse((o.created_at, o.id)));
        Ok(orders)
    }
}

impl BalanceLedger for MemoryDatabase {
    async fn history(&self, user_id: i64) -> Result<Vec<BalanceOperation>, LedgerError> {
        self.check_available().map_err(LedgerError::DatabaseError)?;
        let mut ops =
            self.state().operations.iter().filter(|op| op.user_id == user_id).cloned().collect::<Vec<BalanceOperation>>();
        if ops.is_empty() {
            return Err(LedgerError::NoOperations(user_id));
        }
        ops.sort_by_key(|op| std::cmp::Reverse((op.created_at, op.id)));
        Ok(ops)
    }

    async fn credit(&self, user_id: i64, amount: Points, order_ref: &OrderNumber) -> Result<CreditResult, LedgerError> {
        self.check_available().map_err(LedgerError::DatabaseError)?;
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let result = match self.state().insert_accrual(user_id, amount, order_ref) {
            Some(op) => CreditResult::Credited(op),
            None => CreditResult::AlreadyCredited,
        };
        Ok(result)
    }

    async fn debit(&self, user_id: i64, amount: Points, order_ref: &OrderNumber) -> Result<BalanceOperation, LedgerError> {
        self.check_available().map_err(LedgerError::DatabaseError)?;
        if !amount.is_positive() {
            return Err(LedgerError::InvalidAmount(amount));
        }
        let mut state = self.state();
        if state.available(user_id) < amount {
            return Err(LedgerError::InsufficientFunds { requested: amount });
        }
        Ok(state.append(user_id, OperationKind::Withdrawal, amount, order_ref))
    }

    async fn balance_summary(&self, user_id: i64) -> Result<BalanceSummary, LedgerError> {
        self.check_available().map_err(LedgerError::DatabaseError)?;
        let state = self.state();
        Ok(BalanceSummary::from_operations(state.operations.iter().filter(|op| op.user_id == user_id)))
    }
}

impl AccrualSettlement for MemoryDatabase {
    async fn settle_processed(&self, order: &Order, accrual: Points) -> Result<Settlement, SettlementError> {
        self.check_available().map_err(SettlementError::DatabaseError)?;
        let mut state = self.state();
        let Some(updated) = state.update_non_terminal(order.id, OrderStatusType::Processed, accrual) else {
            return match state.order_by_id(order.id) {
                Some(current) => Ok(Settlement::AlreadyTerminal(current)),
                None => Err(OrderStoreError::OrderNotFound(order.id).into()),
            };
        };
        if !accrual.is_positive() {
            return Ok(Settlement::NothingToCredit(updated));
        }
        let settlement = match state.insert_accrual(updated.user_id, accrual, &updated.number) {
            Some(operation) => Settlement::Credited { order: updated, operation },
            None => Settlement::AlreadyCredited(updated),
        };
        Ok(settlement)
    }
}
