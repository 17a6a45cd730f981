use super::gateway::{ExchangeGateway, OrderConfirmation, OrderRequest};
use crate::error::GatewayError;
use std::sync::Mutex;
use uuid::Uuid;

/// Fills every order instantly and keeps a copy for inspection
#[derive(Debug, Default)]
pub struct PaperGateway {
    fills: Mutex<Vec<OrderConfirmation>>,
}

impl PaperGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Orders filled so far, in submission order
    pub fn fills(&self) -> Vec<OrderConfirmation> {
        match self.fills.lock() {
            Ok(fills) => fills.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl ExchangeGateway for PaperGateway {
    fn submit_order(&self, order: &OrderRequest) -> Result<OrderConfirmation, GatewayError> {
        let confirmation = OrderConfirmation {
            order_id: Uuid::new_v4().to_string(),
            instrument: order.instrument.clone(),
            side: order.side,
            quantity: order.quantity,
            price: order.price,
        };

        tracing::debug!(
            "[PAPER] {} {} {} @ {}",
            order.side,
            order.quantity,
            order.instrument,
            order.price
        );

        self.fills
            .lock()
            .map_err(|_| GatewayError::Rejected("paper fill log poisoned".to_string()))?
            .push(confirmation.clone());

        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::OrderSide;
    use rust_decimal_macros::dec;

    #[test]
    fn test_paper_fills_recorded() {
        let gateway = PaperGateway::new();
        let order = OrderRequest::new("DOGE-USD", OrderSide::Buy, dec!(2500), dec!(0.1));

        let confirmation = gateway.submit_order(&order).unwrap();
        assert_eq!(confirmation.quantity, dec!(2500));

        let fills = gateway.fills();
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].order_id, confirmation.order_id);
    }
}
