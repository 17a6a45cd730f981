use crate::error::GatewayError;
use crate::models::OrderSide;
use rust_decimal::Decimal;
use serde::Serialize;

/// Exchange price precision
pub const PRICE_DECIMALS: u32 = 8;

/// Limit order produced by the engine for one trade
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderRequest {
    pub instrument: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
}

impl OrderRequest {
    /// Price is rounded to exchange precision; quantity is kept as computed
    pub fn new(instrument: impl Into<String>, side: OrderSide, quantity: Decimal, price: Decimal) -> Self {
        Self {
            instrument: instrument.into(),
            side,
            quantity,
            price: price.round_dp(PRICE_DECIMALS),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderConfirmation {
    pub order_id: String,
    pub instrument: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
}

/// Order sink the engine hands every trade to
///
/// Implementations must not panic; a failed submission is reported as an error and the
/// run carries on as if the order filled.
pub trait ExchangeGateway: Send + Sync {
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, GatewayError>;
}

impl<G: ExchangeGateway + ?Sized> ExchangeGateway for Box<G> {
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, GatewayError> {
        (**self).submit_order(order)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchOutcome {
    pub submitted: usize,
    pub unconfirmed: usize,
}

/// Submit orders in sequence, logging and counting failures instead of propagating them
pub fn dispatch_orders<G>(gateway: &G, orders: &[OrderRequest]) -> DispatchOutcome
where
    G: ExchangeGateway + ?Sized,
{
    let mut outcome = DispatchOutcome::default();

    for order in orders {
        outcome.submitted += 1;
        match gateway.submit_order(order) {
            Ok(confirmation) => {
                tracing::debug!(
                    "Order {} confirmed: {} {} {} @ {}",
                    confirmation.order_id,
                    order.side,
                    order.quantity,
                    order.instrument,
                    order.price
                );
            }
            Err(e) => {
                outcome.unconfirmed += 1;
                tracing::warn!(
                    "Order not confirmed ({} {} {} @ {}): {}",
                    order.side,
                    order.quantity,
                    order.instrument,
                    order.price,
                    e
                );
            }
        }
    }

    outcome
}
