//! # Tender
//!
//! What the customer hands over, and how it settles against a cart total.
//!
//! ```text
//! Tender::Cash { tendered: 3000.00 }  ──settle(2680.00)──►  Payment { change: 320.00 }
//! Tender::GCash { number, reference } ──settle(total)────►  Payment { reference }
//! Tender::Card { last4 }              ──settle(total)────►  Payment { "**** 1234" }
//! ```

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{Payment, PaymentMethod};

/// Payment offered at checkout, before it is checked against the total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "method", rename_all = "lowercase")]
#[ts(export)]
pub enum Tender {
    Cash {
        #[serde(rename = "tenderedCents")]
        tendered_cents: i64,
    },
    GCash {
        number: String,
        reference: String,
    },
    Card {
        last4: String,
    },
}

impl Tender {
    pub fn cash(tendered: Money) -> Self {
        Tender::Cash {
            tendered_cents: tendered.cents(),
        }
    }

    pub fn method(&self) -> PaymentMethod {
        match self {
            Tender::Cash { .. } => PaymentMethod::Cash,
            Tender::GCash { .. } => PaymentMethod::GCash,
            Tender::Card { .. } => PaymentMethod::Card,
        }
    }

    /// Checks the tender against `total` and produces the payment record.
    ///
    /// ## Errors
    /// - `InsufficientPayment` when cash does not cover the total
    /// - `InvalidTender` when GCash or card details are missing
    pub fn settle(&self, total: Money) -> CoreResult<Payment> {
        match self {
            Tender::Cash { tendered_cents } => {
                let tendered = Money::from_cents(*tendered_cents);
                if tendered < total {
                    return Err(CoreError::InsufficientPayment {
                        total_cents: total.cents(),
                        tendered_cents: tendered.cents(),
                    });
                }
                Ok(Payment {
                    method: PaymentMethod::Cash,
                    tendered_cents: Some(tendered.cents()),
                    change_cents: Some((tendered - total).cents()),
                    reference: None,
                })
            }
            Tender::GCash { number, reference } => {
                let number = number.trim();
                let reference = reference.trim();
                if number.is_empty() || reference.is_empty() {
                    return Err(CoreError::InvalidTender {
                        reason: "GCash number and reference are required".to_string(),
                    });
                }
                Ok(Payment {
                    method: PaymentMethod::GCash,
                    tendered_cents: None,
                    change_cents: None,
                    reference: Some(format!("{}/{}", number, reference)),
                })
            }
            Tender::Card { last4 } => {
                let last4 = last4.trim();
                if last4.len() != 4 || !last4.chars().all(|c| c.is_ascii_digit()) {
                    return Err(CoreError::InvalidTender {
                        reason: "card needs the last four digits".to_string(),
                    });
                }
                Ok(Payment {
                    method: PaymentMethod::Card,
                    tendered_cents: None,
                    change_cents: None,
                    reference: Some(format!("**** {}", last4)),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cash_change() {
        let payment = Tender::cash(Money::from_major_minor(3000, 0))
            .settle(Money::from_major_minor(2680, 0))
            .unwrap();
        assert_eq!(payment.method, PaymentMethod::Cash);
        assert_eq!(payment.change_cents, Some(32000));
    }

    #[test]
    fn test_exact_cash_is_enough() {
        let total = Money::from_cents(18000);
        let payment = Tender::cash(total).settle(total).unwrap();
        assert_eq!(payment.change_cents, Some(0));
    }

    #[test]
    fn test_short_cash_is_rejected() {
        let err = Tender::cash(Money::from_cents(100))
            .settle(Money::from_cents(101))
            .unwrap_err();
        assert!(matches!(err, CoreError::InsufficientPayment { .. }));
    }

    #[test]
    fn test_gcash_needs_reference() {
        let tender = Tender::GCash {
            number: "09171234567".to_string(),
            reference: " ".to_string(),
        };
        assert!(matches!(
            tender.settle(Money::from_cents(100)),
            Err(CoreError::InvalidTender { .. })
        ));
    }

    #[test]
    fn test_card_masks_number() {
        let payment = Tender::Card {
            last4: "4242".to_string(),
        }
        .settle(Money::from_cents(100))
        .unwrap();
        assert_eq!(payment.reference.as_deref(), Some("**** 4242"));

        assert!(Tender::Card {
            last4: "42a2".to_string()
        }
        .settle(Money::from_cents(100))
        .is_err());
    }

    #[test]
    fn test_tender_json_shape() {
        let json = serde_json::to_string(&Tender::cash(Money::from_cents(500))).unwrap();
        assert_eq!(json, r#"{"method":"cash","tenderedCents":500}"#);
    }
}
