//! Request handler definitions
//!
//! Define each route and its handler here. Keep handlers short: anything with real logic belongs in the engine's API
//! objects.
//!
//! Handlers run on actix worker threads, which process their requests one at a time. Never block in a handler; every
//! database call is a future and must be awaited.
use actix_web::{get, web, HttpResponse, Responder};
use log::*;
use loyalty_engine::{
    traits::{BalanceLedger, LedgerError, OrderManagement},
    BalanceApi,
    OrderApi,
    UploadResult,
    WithdrawalApi,
};

use crate::{
    data_objects::{JsonResponse, OrderResponse, WithdrawRequest, WithdrawalResponse},
    errors::ServerError,
    identity::UserId,
};

// Web-actix cannot handle generics in handlers, so it's implemented manually using the `route!` macro
#[macro_export]
macro_rules! route {
    ($name:ident => $method:ident $path:literal impl $($bounds:ty),+) => {
        paste::paste! { pub struct [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ >( $( core::marker::PhantomData<fn() -> [< T $bounds:camel> ] >,)+ );}
        paste::paste! { impl< $( [< T $bounds:camel> ],)+ > [<$name:camel Route>]< $( [< T $bounds:camel> ],)+ > {
            #[allow(clippy::new_without_default)]
            pub fn new() -> Self {
                Self($( core::marker::PhantomData::<fn() -> [< T $bounds:camel> ] >,)+)
            }
        }}
        paste::paste! { impl<$( [< T $bounds:camel >] , )+> actix_web::dev::HttpServiceFactory for [<$name:camel Route>]<$([<T $bounds:camel>],)+>
        where
            $([<T $bounds:camel>]: $bounds + 'static,)+
        {
            fn register(self, config: &mut actix_web::dev::AppService) {
                let res = actix_web::Resource::new($path)
                    .name(stringify!($name))
                    .guard(actix_web::guard::$method())
                    .to($name::< $( [< T $bounds:camel >], )+>);
                actix_web::dev::HttpServiceFactory::register(res, config);
            }
        }}
    };
}

// ----------------------------------------------   Health  ----------------------------------------------------
#[get("/health")]
pub async fn health() -> impl Responder {
    trace!("💻️ Received health check request");
    HttpResponse::Ok().body("👍️\n")
}

//----------------------------------------------   Orders  ----------------------------------------------------
route!(upload_order => Post "/user/orders" impl OrderManagement);
/// Route handler for order uploads
///
/// The body is the bare order number as plain text. The number must pass the Luhn check.
///
/// * 202 if the order is new and has been queued for accrual,
/// * 200 if the caller had already uploaded it,
/// * 409 if another user owns it,
/// * 422 if the number is malformed,
/// * 400 if the body is empty.
pub async fn upload_order<B: OrderManagement>(
    user: UserId,
    body: String,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let raw = body.trim();
    if raw.is_empty() {
        debug!("💻️ User {user} sent an empty order upload");
        return Err(ServerError::InvalidRequestBody("The order number is missing".into()));
    }
    debug!("💻️ POST order {raw} for user {user}");
    let response = match api.upload_order(user.value(), raw).await? {
        UploadResult::Accepted(order) => {
            HttpResponse::Accepted().json(JsonResponse::success(format!("Order {} accepted", order.number)))
        },
        UploadResult::AlreadyUploaded(order) => {
            HttpResponse::Ok().json(JsonResponse::success(format!("Order {} was already uploaded", order.number)))
        },
    };
    Ok(response)
}

route!(my_orders => Get "/user/orders" impl OrderManagement);
pub async fn my_orders<B: OrderManagement>(
    user: UserId,
    api: web::Data<OrderApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET orders for user {user}");
    let orders = api.orders_for_user(user.value()).await?;
    if orders.is_empty() {
        return Ok(HttpResponse::NoContent().finish());
    }
    let orders = orders.into_iter().map(OrderResponse::from).collect::<Vec<_>>();
    Ok(HttpResponse::Ok().json(orders))
}

//----------------------------------------------   Balance  ----------------------------------------------------
route!(my_balance => Get "/user/balance" impl BalanceLedger);
pub async fn my_balance<B: BalanceLedger>(
    user: UserId,
    api: web::Data<BalanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET balance for user {user}");
    let balance = api.balance(user.value()).await.map_err(|e| {
        debug!("💻️ Could not fetch the balance for user {user}. {e}");
        ServerError::BackendError(e.to_string())
    })?;
    Ok(HttpResponse::Ok().json(balance))
}

route!(withdraw => Post "/user/balance/withdraw" impl BalanceLedger);
/// Route handler for withdrawals
///
/// Takes `{"order": "<number>", "sum": <points>}`. Responds with 402 if the balance does not cover `sum`, and 422 if
/// the order number fails the Luhn check or `sum` is not positive.
pub async fn withdraw<B: BalanceLedger>(
    user: UserId,
    body: web::Json<WithdrawRequest>,
    api: web::Data<WithdrawalApi<B>>,
) -> Result<HttpResponse, ServerError> {
    let WithdrawRequest { order, sum } = body.into_inner();
    debug!("💻️ POST withdrawal of {sum} against {order} for user {user}");
    let operation = api.withdraw(user.value(), &order, sum).await?;
    Ok(HttpResponse::Ok().json(WithdrawalResponse::from(operation)))
}

route!(my_withdrawals => Get "/user/withdrawals" impl BalanceLedger);
pub async fn my_withdrawals<B: BalanceLedger>(
    user: UserId,
    api: web::Data<BalanceApi<B>>,
) -> Result<HttpResponse, ServerError> {
    debug!("💻️ GET withdrawals for user {user}");
    match api.withdrawals(user.value()).await {
        Ok(ops) => {
            let withdrawals = ops.into_iter().map(WithdrawalResponse::from).collect::<Vec<_>>();
            Ok(HttpResponse::Ok().json(withdrawals))
        },
        Err(LedgerError::NoOperations(_)) => Ok(HttpResponse::NoContent().finish()),
        Err(e) => Err(e.into()),
    }
}
