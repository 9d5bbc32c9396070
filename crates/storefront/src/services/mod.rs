//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `orders` - Order validation, pricing and notification emails
//! - `contact` - Contact form messages
//! - `mail` - Outgoing mail transport (SMTP or log-only)
//! - `content` - Events and blog posts from WordPress
//! - `validation` - Field checks shared by the forms

pub mod contact;
pub mod content;
pub mod mail;
pub mod orders;
pub mod validation;
