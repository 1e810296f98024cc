use chrono::{DateTime, Utc};

use super::errors::OrderError;
use super::value_objects::{CartLine, PaymentMethod};

// ============================================================================
// Order Commands - Represent caller intent before validation
// ============================================================================

/// Delivery details as submitted; every field may be missing
#[derive(Debug, Clone, Default)]
pub struct DeliveryInfo {
    pub address: Option<String>,
    pub phone: Option<String>,
    pub payment_method: Option<String>,
    pub special_instructions: Option<String>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
}

/// Delivery details after validation
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedDelivery {
    pub address: String,
    pub phone: String,
    pub payment_method: PaymentMethod,
    pub special_instructions: Option<String>,
    pub scheduled_delivery: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct PlaceOrder {
    pub lines: Vec<CartLine>,
    pub delivery: DeliveryInfo,
}

/// A cart whose shape has been checked; prices are still unresolved
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub lines: Vec<CartLine>,
    pub delivery: ValidatedDelivery,
}

impl PlaceOrder {
    pub fn new(lines: Vec<CartLine>, delivery: DeliveryInfo) -> Self {
        Self { lines, delivery }
    }

    /// Check cart and delivery details without touching any store
    pub fn validate(self) -> Result<ValidatedOrder, OrderError> {
        if self.lines.is_empty() {
            return Err(OrderError::invalid("Order items are required"));
        }

        if let Some(line) = self.lines.iter().find(|line| line.quantity < 1) {
            return Err(OrderError::invalid(format!(
                "Invalid quantity {} for menu item {}",
                line.quantity, line.menu_item_id
            )));
        }

        let delivery = self.delivery.validate()?;

        Ok(ValidatedOrder {
            lines: self.lines,
            delivery,
        })
    }
}

impl DeliveryInfo {
    fn validate(self) -> Result<ValidatedDelivery, OrderError> {
        let address = non_blank(self.address);
        let phone = non_blank(self.phone);

        let (address, phone) = match (address, phone) {
            (Some(address), Some(phone)) => (address, phone),
            _ => return Err(OrderError::invalid("Delivery information is required")),
        };

        let payment_method = match non_blank(self.payment_method) {
            Some(raw) => raw.parse()?,
            None => PaymentMethod::default(),
        };

        Ok(ValidatedDelivery {
            address,
            phone,
            payment_method,
            special_instructions: non_blank(self.special_instructions),
            scheduled_delivery: self.scheduled_delivery,
        })
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delivery() -> DeliveryInfo {
        DeliveryInfo {
            address: Some("12 MG Road, Pune".to_string()),
            phone: Some("9876543210".to_string()),
            payment_method: Some("upi".to_string()),
            special_instructions: Some("  ".to_string()),
            scheduled_delivery: None,
        }
    }

    #[test]
    fn test_empty_cart_is_rejected() {
        let err = PlaceOrder::new(vec![], delivery()).validate().unwrap_err();
        assert!(matches!(err, OrderError::InvalidRequest(_)));
    }

    #[test]
    fn test_zero_quantity_is_rejected() {
        let lines = vec![CartLine::new(1, 1), CartLine::new(2, 0)];
        let err = PlaceOrder::new(lines, delivery()).validate().unwrap_err();
        assert!(matches!(err, OrderError::InvalidRequest(ref m) if m.contains("menu item 2")));
    }

    #[test]
    fn test_blank_address_is_rejected() {
        let mut info = delivery();
        info.address = Some("   ".to_string());
        let err = PlaceOrder::new(vec![CartLine::new(1, 1)], info).validate().unwrap_err();
        assert!(matches!(err, OrderError::InvalidRequest(_)));
    }

    #[test]
    fn test_missing_phone_is_rejected() {
        let mut info = delivery();
        info.phone = None;
        let err = PlaceOrder::new(vec![CartLine::new(1, 1)], info).validate().unwrap_err();
        assert_eq!(err.to_string(), "Delivery information is required");
    }

    #[test]
    fn test_valid_order_normalizes_fields() {
        let validated = PlaceOrder::new(vec![CartLine::new(7, 2)], delivery())
            .validate()
            .unwrap();

        assert_eq!(validated.lines, vec![CartLine::new(7, 2)]);
        assert_eq!(validated.delivery.payment_method, PaymentMethod::Upi);
        assert_eq!(validated.delivery.special_instructions, None);
    }

    #[test]
    fn test_payment_method_defaults_to_cod() {
        let mut info = delivery();
        info.payment_method = None;
        let validated = PlaceOrder::new(vec![CartLine::new(7, 1)], info)
            .validate()
            .unwrap();
        assert_eq!(validated.delivery.payment_method, PaymentMethod::Cod);
    }
}
