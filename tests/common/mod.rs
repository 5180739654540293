#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::SecretString;
use shopbot::application::Shop;
use shopbot::application::dispatch::{DispatchOutcome, Dispatcher, Inbound};
use shopbot::application::payments::{PaymentSettings, sign_payload};
use shopbot::domain::admin::Admins;
use shopbot::domain::ids::{ChatId, PaymentId};
use shopbot::domain::money::Money;
use shopbot::domain::payment::{WebhookDelivery, WebhookHeaders};
use shopbot::domain::ports::{GitOutput, GitRunner};
use shopbot::domain::product::{NewProduct, Product};
use shopbot::error::Result;
use shopbot::infrastructure::in_memory::InMemoryNotifier;
use std::sync::{Arc, Mutex};

pub const ADMIN: ChatId = ChatId(900);
pub const OTHER_ADMIN: ChatId = ChatId(901);
pub const SECRET: &str = "whsec-integration";

pub fn settings() -> PaymentSettings {
    PaymentSettings {
        currency: "USD".to_string(),
        base_url: "https://api-m.sandbox.paypal.com".to_string(),
        provider_token: Some(SecretString::from("provider-token".to_string())),
        webhook_secret: Some(SecretString::from(SECRET.to_string())),
    }
}

/// Records git invocations and answers with canned output.
#[derive(Default)]
pub struct FakeGit {
    pub calls: Mutex<Vec<Vec<String>>>,
    pub output: GitOutput,
}

#[async_trait]
impl GitRunner for FakeGit {
    async fn run(&self, args: &[String]) -> Result<GitOutput> {
        self.calls.lock().unwrap().push(args.to_vec());
        Ok(self.output.clone())
    }
}

pub struct Harness {
    pub shop: Shop,
    pub notifier: InMemoryNotifier,
    pub dispatcher: Dispatcher,
    pub git: Arc<FakeGit>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(settings())
    }

    pub fn with_settings(settings: PaymentSettings) -> Self {
        let notifier = InMemoryNotifier::new();
        let shop = Shop::in_memory(
            Arc::new(notifier.clone()),
            Admins::new([ADMIN, OTHER_ADMIN]),
            settings,
        );
        let git = Arc::new(FakeGit {
            output: GitOutput {
                stdout: "abc123 initial commit\n".to_string(),
                stderr: String::new(),
            },
            ..Default::default()
        });
        let dispatcher = Dispatcher::new(shop.clone(), git.clone());
        Self {
            shop,
            notifier,
            dispatcher,
            git,
        }
    }

    pub async fn seed_product(&self, name: &str, price: Decimal, stock: i64) -> Product {
        self.shop
            .catalog
            .create(NewProduct {
                name: name.to_string(),
                description: format!("{name} description"),
                price: Money::new(price).unwrap(),
                stock,
                image_url: format!("https://img.example/{name}.png"),
            })
            .await
    }

    pub async fn command(&self, from: ChatId, text: &str) -> DispatchOutcome {
        self.dispatcher
            .handle(Inbound::Command {
                from,
                text: text.to_string(),
            })
            .await
            .unwrap()
    }

    pub async fn callback(&self, from: ChatId, data: &str) -> DispatchOutcome {
        self.dispatcher
            .handle(Inbound::Callback {
                from,
                data: data.to_string(),
            })
            .await
            .unwrap()
    }

    /// Texts delivered to `chat` so far, oldest first.
    pub async fn texts_to(&self, chat: ChatId) -> Vec<String> {
        self.notifier
            .sent_to(chat)
            .await
            .into_iter()
            .map(|n| n.text)
            .collect()
    }

    pub async fn last_text_to(&self, chat: ChatId) -> String {
        self.texts_to(chat).await.pop().unwrap_or_default()
    }
}

pub fn capture_body(payment_id: &PaymentId) -> String {
    format!(
        r#"{{"id":"WH-1","event_type":"PAYMENT.CAPTURE.COMPLETED","resource":{{"id":"{payment_id}","status":"COMPLETED"}}}}"#
    )
}

/// A webhook delivery signed with [`SECRET`].
pub fn signed_delivery(body: String) -> WebhookDelivery {
    let sig = sign_payload(SECRET, &body).unwrap();
    WebhookDelivery {
        body,
        headers: WebhookHeaders {
            transmission_id: Some("tx-1".to_string()),
            transmission_sig: Some(sig),
            ..Default::default()
        },
    }
}
