//! Order submission.
//!
//! Orders arrive as product IDs and quantities only. Every line is priced
//! again from the catalog here; whatever the client believes a product costs
//! is never read. There is no order database: an order exists long enough to
//! be rendered into the notification emails and is then gone.

use askama::Template;
use nut_barn_core::cart::OrderLine;
use nut_barn_core::{Catalog, Email, Fulfillment, OrderRef, PaymentArrangement, Price, ProductId};
use serde::Deserialize;
use thiserror::Error;
use tracing::instrument;

use crate::BUSINESS_PHONE;
use crate::services::mail::{Delivery, MailError, Mailer, MessageContent};
use crate::services::validation::{ValidationErrors, Validator};

/// Most lines one order may carry.
pub const MAX_ITEMS: usize = 20;

/// Largest quantity allowed on one line.
pub const MAX_QUANTITY: u32 = 99;

/// Errors from placing an order.
#[derive(Debug, Error)]
pub enum OrderError {
    /// A line names a product the catalog does not sell.
    #[error("Unknown product: {0}")]
    UnknownProduct(ProductId),

    /// The business notification could not be sent.
    #[error(transparent)]
    Mail(#[from] MailError),
}

// =============================================================================
// Request
// =============================================================================

/// Order form as submitted.
///
/// Everything is optional here so a missing or mistyped field becomes a field
/// error from [`OrderRequest::validate`] instead of a parse failure.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub fulfillment: Option<String>,
    pub delivery_address: Option<String>,
    pub payment: Option<String>,
    pub items: Option<Vec<OrderItemRequest>>,
    pub notes: Option<String>,
}

/// One submitted line. There is no price field.
#[derive(Debug, Default, Deserialize)]
pub struct OrderItemRequest {
    pub id: Option<String>,
    pub quantity: Option<serde_json::Number>,
}

/// An order that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidOrder {
    pub name: String,
    pub email: Email,
    pub phone: String,
    pub fulfillment: Fulfillment,
    /// Present exactly when `fulfillment` is delivery
    pub delivery_address: Option<String>,
    pub payment: PaymentArrangement,
    pub lines: Vec<OrderLine>,
    pub notes: Option<String>,
}

impl OrderRequest {
    /// Check every field, collecting all violations.
    ///
    /// # Errors
    ///
    /// Returns the full list of field violations if any check fails.
    pub fn validate(self) -> Result<ValidOrder, ValidationErrors> {
        let mut v = Validator::new();

        let name = v.text("name", self.name.as_deref(), 2, 100);
        let email = v.email("email", self.email.as_deref());
        let phone = v.phone("phone", self.phone.as_deref());
        let fulfillment = v.choice(
            "fulfillment",
            self.fulfillment.as_deref(),
            &["pickup", "delivery"],
            Fulfillment::from_wire,
        );
        let address_given = self
            .delivery_address
            .as_deref()
            .is_some_and(|a| !a.trim().is_empty());
        let delivery_address =
            v.optional_text("deliveryAddress", self.delivery_address.as_deref(), 300);
        if fulfillment.is_some_and(Fulfillment::needs_address) && !address_given {
            v.reject("deliveryAddress", "is required for delivery");
        }
        let payment = v.choice(
            "payment",
            self.payment.as_deref(),
            &["call", "on-pickup"],
            PaymentArrangement::from_wire,
        );
        let lines = validate_items(&mut v, self.items.as_deref());
        let notes = v.optional_text("notes", self.notes.as_deref(), 1000);

        v.finish()?;

        match (name, email, phone, fulfillment, payment, lines) {
            (
                Some(name),
                Some(email),
                Some(phone),
                Some(fulfillment),
                Some(payment),
                Some(lines),
            ) => Ok(ValidOrder {
                name,
                email,
                phone,
                fulfillment,
                delivery_address: delivery_address.filter(|_| fulfillment.needs_address()),
                payment,
                lines,
                notes,
            }),
            // Every None above recorded a violation, so finish() already returned
            _ => Err(ValidationErrors::default()),
        }
    }
}

fn validate_items(v: &mut Validator, items: Option<&[OrderItemRequest]>) -> Option<Vec<OrderLine>> {
    let items = items.unwrap_or_default();
    if items.is_empty() {
        v.reject("items", "must contain at least 1 item");
        return None;
    }
    if items.len() > MAX_ITEMS {
        v.reject("items", format!("must contain at most {MAX_ITEMS} items"));
        return None;
    }

    let mut lines = Vec::with_capacity(items.len());
    let mut all_valid = true;
    for (i, item) in items.iter().enumerate() {
        let id = v.text(&format!("items[{i}].id"), item.id.as_deref(), 1, 50);
        let quantity = v.integer(
            &format!("items[{i}].quantity"),
            item.quantity.as_ref(),
            1,
            MAX_QUANTITY,
        );
        match (id, quantity) {
            (Some(id), Some(quantity)) => lines.push(OrderLine {
                id: ProductId::new(id),
                quantity,
            }),
            _ => all_valid = false,
        }
    }
    all_valid.then_some(lines)
}

// =============================================================================
// Pricing
// =============================================================================

/// One order line priced from the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine {
    pub product_id: ProductId,
    pub name: &'static str,
    pub quantity: u32,
    pub unit_price: Price,
    pub subtotal: Price,
}

/// A priced order with its reference.
#[derive(Debug, Clone)]
pub struct OrderRecord {
    pub order_ref: OrderRef,
    pub customer: ValidOrder,
    pub lines: Vec<PricedLine>,
    pub total: Price,
}

/// Price every line from the catalog.
///
/// Lines are kept in submission order; a repeated product ID stays as a
/// separate line.
///
/// # Errors
///
/// Returns [`OrderError::UnknownProduct`] for the first ID the catalog does
/// not carry. No line is ever skipped.
pub fn price_lines(
    catalog: &dyn Catalog,
    lines: &[OrderLine],
) -> Result<(Vec<PricedLine>, Price), OrderError> {
    let priced = lines
        .iter()
        .map(|line| {
            let product = catalog
                .product(line.id.as_str())
                .ok_or_else(|| OrderError::UnknownProduct(line.id.clone()))?;
            Ok(PricedLine {
                product_id: line.id.clone(),
                name: product.name,
                quantity: line.quantity,
                unit_price: product.price,
                subtotal: product.price.times(line.quantity),
            })
        })
        .collect::<Result<Vec<_>, OrderError>>()?;
    let total = priced.iter().map(|line| line.subtotal).sum();
    Ok((priced, total))
}

impl OrderRecord {
    /// Price `order` and assign it a fresh reference.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::UnknownProduct`] if any line is not in the catalog.
    pub fn build(catalog: &dyn Catalog, order: ValidOrder) -> Result<Self, OrderError> {
        let (lines, total) = price_lines(catalog, &order.lines)?;
        Ok(Self {
            order_ref: OrderRef::generate(),
            customer: order,
            lines,
            total,
        })
    }
}

// =============================================================================
// Email
// =============================================================================

#[derive(Template)]
#[template(path = "email/order_notification.html")]
struct OrderNotificationHtml<'a> {
    order: &'a OrderRecord,
}

#[derive(Template)]
#[template(path = "email/order_notification.txt")]
struct OrderNotificationText<'a> {
    order: &'a OrderRecord,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.html")]
struct OrderConfirmationHtml<'a> {
    order: &'a OrderRecord,
    phone: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_confirmation.txt")]
struct OrderConfirmationText<'a> {
    order: &'a OrderRecord,
    phone: &'a str,
}

/// The message the business receives for an order.
///
/// # Errors
///
/// Returns error if a template fails to render.
pub fn business_notification(order: &OrderRecord) -> Result<MessageContent, MailError> {
    Ok(MessageContent {
        subject: format!(
            "[New Order] {} - {} - {}",
            order.order_ref, order.customer.name, order.total
        ),
        text_body: OrderNotificationText { order }.render()?,
        html_body: OrderNotificationHtml { order }.render()?,
    })
}

/// The receipt the customer receives for an order.
///
/// # Errors
///
/// Returns error if a template fails to render.
pub fn customer_confirmation(order: &OrderRecord) -> Result<MessageContent, MailError> {
    let phone = BUSINESS_PHONE;
    Ok(MessageContent {
        subject: format!("Your Nut Barn order {} was received!", order.order_ref),
        text_body: OrderConfirmationText { order, phone }.render()?,
        html_body: OrderConfirmationHtml { order, phone }.render()?,
    })
}

// =============================================================================
// Placement
// =============================================================================

/// Result of a placed order.
#[derive(Debug, Clone)]
pub struct OrderPlaced {
    pub order_ref: OrderRef,
    pub total: Price,
    /// What happened to the business notification
    pub delivery: Delivery,
    /// Text to show the customer
    pub message: String,
}

/// Price an order, notify the business and send the customer a receipt.
///
/// The business notification must go out for the order to count. The
/// customer receipt is sent alongside it and a failure there is only logged.
///
/// # Errors
///
/// Returns [`OrderError::UnknownProduct`] before any mail is sent if a line
/// is not in the catalog, or [`OrderError::Mail`] if the business
/// notification fails.
#[instrument(skip_all, fields(lines = order.lines.len()))]
pub async fn place_order(
    catalog: &dyn Catalog,
    mailer: &Mailer,
    order: ValidOrder,
) -> Result<OrderPlaced, OrderError> {
    let record = OrderRecord::build(catalog, order)?;
    mailer.ensure_business_recipient()?;

    let notification = business_notification(&record)?;

    let (business, receipt) = tokio::join!(
        mailer.send_to_business(Some(&record.customer.email), notification),
        send_receipt(mailer, &record),
    );

    let delivery = business.inspect_err(|e| {
        tracing::error!(
            order_ref = %record.order_ref,
            error = %e,
            "Failed to send order notification"
        );
    })?;
    if let Err(e) = receipt {
        tracing::warn!(
            order_ref = %record.order_ref,
            error = %e,
            "Failed to send order confirmation to customer"
        );
    }

    tracing::info!(
        order_ref = %record.order_ref,
        total_cents = record.total.cents(),
        fulfillment = %record.customer.fulfillment,
        ?delivery,
        "Order placed"
    );

    Ok(OrderPlaced {
        message: confirmation_message(&record),
        order_ref: record.order_ref,
        total: record.total,
        delivery,
    })
}

/// Render and send the customer receipt. Any failure here is the caller's
/// to log; it never fails the order.
async fn send_receipt(mailer: &Mailer, order: &OrderRecord) -> Result<Delivery, MailError> {
    let confirmation = customer_confirmation(order)?;
    mailer
        .send_to(&order.customer.email, mailer.business_address(), confirmation)
        .await
}

fn confirmation_message(order: &OrderRecord) -> String {
    let first_name = order
        .customer
        .name
        .split_whitespace()
        .next()
        .unwrap_or(&order.customer.name);
    let details = match order.customer.fulfillment {
        Fulfillment::Pickup => "pickup",
        Fulfillment::Delivery => "delivery",
    };
    format!(
        "Thanks, {first_name}! Your order {} has been received. \
         We'll be in touch shortly to confirm payment and {details} details.",
        order.order_ref
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use std::sync::Arc;

    use nut_barn_core::StaticCatalog;
    use serde_json::json;

    use super::*;
    use crate::services::mail::RecordingTransport;

    fn request(value: serde_json::Value) -> OrderRequest {
        serde_json::from_value(value).unwrap()
    }

    fn valid_json() -> serde_json::Value {
        json!({
            "name": "Jane Smith",
            "email": "jane@example.com",
            "phone": "(555) 123-4567",
            "fulfillment": "pickup",
            "payment": "on-pickup",
            "items": [{ "id": "nuts-6oz", "quantity": 2 }]
        })
    }

    fn with(field: &str, value: serde_json::Value) -> OrderRequest {
        let mut body = valid_json();
        body[field] = value;
        request(body)
    }

    fn valid_order() -> ValidOrder {
        request(valid_json()).validate().unwrap()
    }

    fn mailer(outbox: &RecordingTransport) -> Mailer {
        Mailer::new(
            Some(Arc::new(outbox.clone())),
            "The Nut Barn <orders@thenutbarn.com>",
            Some(Email::parse("hello@thenutbarn.com").unwrap()),
        )
    }

    #[test]
    fn test_accepts_valid_order() {
        let order = valid_order();
        assert_eq!(order.name, "Jane Smith");
        assert_eq!(order.fulfillment, Fulfillment::Pickup);
        assert_eq!(order.payment, PaymentArrangement::OnPickup);
        assert_eq!(order.lines.len(), 1);
        assert_eq!(order.notes, None);
    }

    #[test]
    fn test_trims_name() {
        let order = with("name", json!("  Jane Smith  ")).validate().unwrap();
        assert_eq!(order.name, "Jane Smith");
    }

    #[test]
    fn test_rejects_single_character_name() {
        let errors = with("name", json!("J")).validate().unwrap_err();
        assert!(errors.contains("name"));
    }

    #[test]
    fn test_rejects_invalid_email() {
        let errors = with("email", json!("not-an-email")).validate().unwrap_err();
        assert!(errors.contains("email"));
    }

    #[test]
    fn test_rejects_empty_items() {
        let errors = with("items", json!([])).validate().unwrap_err();
        assert!(errors.contains("items"));
    }

    #[test]
    fn test_rejects_too_many_items() {
        let items: Vec<_> = (0..21).map(|_| json!({ "id": "nuts-6oz", "quantity": 1 })).collect();
        let errors = with("items", json!(items)).validate().unwrap_err();
        assert!(errors.contains("items"));
    }

    #[test]
    fn test_rejects_out_of_range_quantities() {
        for quantity in [json!(0), json!(100), json!(-1), json!(1.5)] {
            let errors = with("items", json!([{ "id": "nuts-6oz", "quantity": quantity }]))
                .validate()
                .unwrap_err();
            assert!(errors.contains("items[0].quantity"), "quantity {quantity}");
        }
    }

    #[test]
    fn test_accepts_whole_float_quantity() {
        let order = with("items", json!([{ "id": "nuts-6oz", "quantity": 2.0 }]))
            .validate()
            .unwrap();
        assert_eq!(order.lines[0].quantity, 2);
    }

    #[test]
    fn test_rejects_unknown_fulfillment() {
        let errors = with("fulfillment", json!("ship")).validate().unwrap_err();
        assert!(errors.contains("fulfillment"));
    }

    #[test]
    fn test_delivery_requires_address() {
        let errors = with("fulfillment", json!("delivery")).validate().unwrap_err();
        assert!(errors.contains("deliveryAddress"));

        let mut body = valid_json();
        body["fulfillment"] = json!("delivery");
        body["deliveryAddress"] = json!("123 Cedar St, Holt, MI");
        let order = request(body).validate().unwrap();
        assert_eq!(order.delivery_address.as_deref(), Some("123 Cedar St, Holt, MI"));
    }

    #[test]
    fn test_pickup_drops_address() {
        let order = with("deliveryAddress", json!("123 Cedar St"))
            .validate()
            .unwrap();
        assert_eq!(order.delivery_address, None);
    }

    #[test]
    fn test_collects_every_violation() {
        let errors = request(json!({
            "name": "J",
            "email": "nope",
            "phone": "x",
            "fulfillment": "ship",
            "payment": "card",
            "items": [],
            "notes": "n".repeat(1001)
        }))
        .validate()
        .unwrap_err();

        for field in ["name", "email", "phone", "fulfillment", "payment", "items", "notes"] {
            assert!(errors.contains(field), "missing error for {field}");
        }
    }

    #[test]
    fn test_accepts_optional_notes() {
        let order = with("notes", json!("Please gift wrap")).validate().unwrap();
        assert_eq!(order.notes.as_deref(), Some("Please gift wrap"));
    }

    #[test]
    fn test_price_lines_totals() {
        let lines = vec![
            OrderLine { id: "nuts-6oz".into(), quantity: 2 },
            OrderLine { id: "nuts-8oz".into(), quantity: 1 },
        ];
        let (priced, total) = price_lines(&StaticCatalog, &lines).unwrap();
        assert_eq!(total.cents(), 3500);
        assert_eq!(priced[0].subtotal.cents(), 2000);
        assert_eq!(priced[1].unit_price.cents(), 1500);
    }

    #[test]
    fn test_price_lines_single_items() {
        let one = |id: &str| vec![OrderLine { id: id.into(), quantity: 1 }];
        assert_eq!(price_lines(&StaticCatalog, &one("nuts-6oz")).unwrap().1.cents(), 1000);
        assert_eq!(price_lines(&StaticCatalog, &one("gift-basket")).unwrap().1.cents(), 4000);
    }

    #[test]
    fn test_price_lines_keeps_duplicates_separate() {
        let lines = vec![
            OrderLine { id: "nuts-6oz".into(), quantity: 1 },
            OrderLine { id: "nuts-6oz".into(), quantity: 3 },
        ];
        let (priced, total) = price_lines(&StaticCatalog, &lines).unwrap();
        assert_eq!(priced.len(), 2);
        assert_eq!(total.cents(), 4000);
    }

    #[test]
    fn test_price_lines_unknown_product() {
        let lines = vec![
            OrderLine { id: "nuts-6oz".into(), quantity: 1 },
            OrderLine { id: "fake-product".into(), quantity: 1 },
        ];
        let err = price_lines(&StaticCatalog, &lines).unwrap_err();
        assert!(matches!(err, OrderError::UnknownProduct(ref id) if id.as_str() == "fake-product"));
    }

    #[test]
    fn test_notification_escapes_customer_text_in_html() {
        let mut order = valid_order();
        order.notes = Some("<script>alert(1)</script>".to_string());
        let record = OrderRecord::build(&StaticCatalog, order).unwrap();

        let content = business_notification(&record).unwrap();
        assert!(!content.html_body.contains("<script>"));
        assert!(content.html_body.contains("&#60;script&#62;"));
        assert!(content.text_body.contains("<script>alert(1)</script>"));
    }

    #[test]
    fn test_notification_contents() {
        let record = OrderRecord::build(&StaticCatalog, valid_order()).unwrap();
        let content = business_notification(&record).unwrap();

        assert!(content.subject.starts_with("[New Order] NB-"));
        assert!(content.subject.ends_with("Jane Smith - $20.00"));
        for needle in [
            record.order_ref.as_str(),
            "6 oz Cinnamon Roasted Nuts",
            "(555) 123-4567",
            "Pickup",
            "Pay on pickup",
            "$20.00",
        ] {
            assert!(content.text_body.contains(needle), "text missing {needle}");
            assert!(content.html_body.contains(needle), "html missing {needle}");
        }
    }

    #[test]
    fn test_confirmation_mentions_phone() {
        let record = OrderRecord::build(&StaticCatalog, valid_order()).unwrap();
        let content = customer_confirmation(&record).unwrap();
        assert!(content.text_body.contains(BUSINESS_PHONE));
        assert!(content.text_body.contains("Hi Jane Smith"));
    }

    #[tokio::test]
    async fn test_place_order_sends_both_emails() {
        let outbox = RecordingTransport::new();
        let placed = place_order(&StaticCatalog, &mailer(&outbox), valid_order())
            .await
            .unwrap();

        assert_eq!(placed.total.cents(), 2000);
        assert_eq!(placed.delivery, Delivery::Sent);
        assert!(placed.message.starts_with("Thanks, Jane!"));

        let sent = outbox.sent();
        assert_eq!(sent.len(), 2);
        let business = sent.iter().find(|m| m.to.as_str() == "hello@thenutbarn.com").unwrap();
        assert_eq!(business.reply_to.as_ref().unwrap().as_str(), "jane@example.com");
        let receipt = sent.iter().find(|m| m.to.as_str() == "jane@example.com").unwrap();
        assert_eq!(receipt.reply_to.as_ref().unwrap().as_str(), "hello@thenutbarn.com");
    }

    #[tokio::test]
    async fn test_unknown_product_sends_nothing() {
        let outbox = RecordingTransport::new();
        let mut order = valid_order();
        order.lines = vec![OrderLine { id: "fake-product".into(), quantity: 1 }];

        let err = place_order(&StaticCatalog, &mailer(&outbox), order)
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::UnknownProduct(_)));
        assert!(outbox.sent().is_empty());
    }

    #[tokio::test]
    async fn test_business_failure_fails_order() {
        let outbox = RecordingTransport::new();
        outbox.fail_for("hello@thenutbarn.com");
        let err = place_order(&StaticCatalog, &mailer(&outbox), valid_order())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Mail(MailError::Rejected(_))));
    }

    #[tokio::test]
    async fn test_customer_failure_is_tolerated() {
        let outbox = RecordingTransport::new();
        outbox.fail_for("jane@example.com");
        let placed = place_order(&StaticCatalog, &mailer(&outbox), valid_order())
            .await
            .unwrap();
        assert_eq!(placed.delivery, Delivery::Sent);
        assert_eq!(outbox.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_receipt_errors_stay_inside_the_receipt() {
        let outbox = RecordingTransport::new();
        outbox.fail_for("jane@example.com");
        let mailer = mailer(&outbox);
        let record = OrderRecord::build(&StaticCatalog, valid_order()).unwrap();

        assert!(send_receipt(&mailer, &record).await.is_err());
        let placed = place_order(&StaticCatalog, &mailer, valid_order())
            .await
            .unwrap();
        assert_eq!(placed.delivery, Delivery::Sent);
        assert_eq!(outbox.sent()[0].to.as_str(), "hello@thenutbarn.com");
    }

    #[tokio::test]
    async fn test_unconfigured_mailer_logs_and_succeeds() {
        let mailer = Mailer::new(None, "orders@thenutbarn.com", None);
        let placed = place_order(&StaticCatalog, &mailer, valid_order())
            .await
            .unwrap();
        assert_eq!(placed.delivery, Delivery::Logged);
    }

    #[tokio::test]
    async fn test_missing_recipient_is_configuration_error() {
        let outbox = RecordingTransport::new();
        let mailer = Mailer::new(Some(Arc::new(outbox.clone())), "orders@thenutbarn.com", None);
        let err = place_order(&StaticCatalog, &mailer, valid_order())
            .await
            .unwrap_err();
        assert!(matches!(err, OrderError::Mail(MailError::MissingRecipient)));
        assert!(outbox.sent().is_empty());
    }
}
