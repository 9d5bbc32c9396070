//! Order option enums.

use core::fmt;

use serde::{Deserialize, Serialize};

/// How the customer receives the order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Fulfillment {
    /// Collected at the market stand.
    Pickup,
    /// Dropped off at the customer's address.
    Delivery,
}

impl Fulfillment {
    /// Parse the wire value (`pickup` / `delivery`).
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "pickup" => Some(Self::Pickup),
            "delivery" => Some(Self::Delivery),
            _ => None,
        }
    }

    /// Whether a delivery address is required.
    #[must_use]
    pub const fn needs_address(self) -> bool {
        matches!(self, Self::Delivery)
    }
}

impl fmt::Display for Fulfillment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pickup => "Pickup",
            Self::Delivery => "Delivery",
        })
    }
}

/// How the customer will settle up. Card payment is not offered yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PaymentArrangement {
    /// We call the customer to take payment.
    Call,
    /// Customer pays when collecting.
    OnPickup,
}

impl PaymentArrangement {
    /// Parse the wire value (`call` / `on-pickup`).
    #[must_use]
    pub fn from_wire(value: &str) -> Option<Self> {
        match value {
            "call" => Some(Self::Call),
            "on-pickup" => Some(Self::OnPickup),
            _ => None,
        }
    }
}

impl fmt::Display for PaymentArrangement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Call => "Call to arrange payment",
            Self::OnPickup => "Pay on pickup",
        })
    }
}
