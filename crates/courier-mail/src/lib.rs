//! Mail client adapter for courier.
//!
//! [`MailClient`] exposes send / list / read / search over a
//! [`MailProvider`]. [`GmailProvider`] is the Gmail REST implementation.

pub mod client;
pub mod gmail;
pub mod provider;

pub use client::MailClient;
pub use gmail::GmailProvider;
pub use provider::MailProvider;
