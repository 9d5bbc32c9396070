//! Card checkout placeholder.

use crate::error::{AppError, Result};

/// Shown until online card payment is wired up.
pub const CHECKOUT_UNAVAILABLE: &str = "Online card payment is coming soon! For now, please use \
     the \"Order via Email\" option and we'll confirm payment via Square, PayPal, or Venmo.";

/// POST /api/checkout
///
/// # Errors
///
/// Always returns 501.
pub async fn create() -> Result<()> {
    Err(AppError::NotImplemented(CHECKOUT_UNAVAILABLE.to_string()))
}
