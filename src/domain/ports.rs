use super::ids::{ChatId, PaymentId};
use super::payment::{Invoice, PaymentLink};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// An inline button; pressing it delivers `callback_data` back as a callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Button {
    pub label: String,
    pub callback_data: String,
}

impl Button {
    pub fn new(label: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// An outbound message to one chat.
#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub chat_id: ChatId,
    pub text: String,
    pub buttons: Vec<Button>,
    pub invoice: Option<Invoice>,
}

impl Notification {
    pub fn text(chat_id: ChatId, text: impl Into<String>) -> Self {
        Self {
            chat_id,
            text: text.into(),
            buttons: Vec::new(),
            invoice: None,
        }
    }

    pub fn with_button(mut self, button: Button) -> Self {
        self.buttons.push(button);
        self
    }

    pub fn with_invoice(mut self, invoice: Invoice) -> Self {
        self.invoice = Some(invoice);
        self
    }
}

/// Outbound delivery to chat parties.
///
/// Delivery happens after state commits; a failed send never rolls back
/// the mutation that produced it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: Notification) -> Result<()>;
}

pub type SharedNotifier = Arc<dyn Notifier>;

/// Captured output of an external `git` invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GitOutput {
    pub stdout: String,
    pub stderr: String,
}

#[async_trait]
pub trait GitRunner: Send + Sync {
    async fn run(&self, args: &[String]) -> Result<GitOutput>;
}

pub type SharedGitRunner = Arc<dyn GitRunner>;

/// Storage for payment link records, keyed by payment id.
#[async_trait]
pub trait PaymentLinkStore: Send + Sync {
    async fn store(&self, link: PaymentLink) -> Result<()>;
    async fn get(&self, payment_id: &PaymentId) -> Result<Option<PaymentLink>>;
    /// Flips a pending record to completed. Returns false if the record is
    /// missing or was already completed.
    async fn mark_completed(&self, payment_id: &PaymentId) -> Result<bool>;
}

pub type PaymentLinkStoreBox = Box<dyn PaymentLinkStore>;
