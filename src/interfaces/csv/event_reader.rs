use crate::application::dispatch::Inbound;
use crate::domain::ids::ChatId;
use crate::domain::payment::{InvoicePayment, WebhookDelivery, WebhookHeaders};
use crate::error::{Result, ShopError};
use serde::Deserialize;
use std::io::Read;

#[derive(Debug, Deserialize, PartialEq, Clone, Copy)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Command,
    Callback,
    Precheckout,
    InvoicePaid,
    Webhook,
}

/// One row of a replay file: `kind, chat, data, signature`.
///
/// * `command` / `callback`: `data` is the message text or button data.
/// * `invoice_paid`: `data` is `payload;total_minor_units;currency`.
/// * `webhook`: `data` is the raw body, `signature` the transmission signature.
#[derive(Debug, Deserialize, PartialEq, Clone)]
pub struct EventRecord {
    pub kind: EventKind,
    #[serde(default)]
    pub chat: Option<i64>,
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub signature: Option<String>,
}

impl TryFrom<EventRecord> for Inbound {
    type Error = ShopError;

    fn try_from(record: EventRecord) -> Result<Self> {
        let kind = record.kind;
        let from = || {
            record
                .chat
                .map(ChatId)
                .ok_or_else(|| ShopError::ValidationError(format!("{kind:?} event without chat")))
        };
        let data = record.data.clone().unwrap_or_default();
        Ok(match kind {
            EventKind::Command => Inbound::Command {
                from: from()?,
                text: data,
            },
            EventKind::Callback => Inbound::Callback {
                from: from()?,
                data,
            },
            EventKind::Precheckout => Inbound::PreCheckout { from: from()? },
            EventKind::InvoicePaid => Inbound::InvoicePaid {
                from: from()?,
                payment: parse_invoice_payment(&data)?,
            },
            EventKind::Webhook => Inbound::Webhook(WebhookDelivery {
                body: data,
                headers: WebhookHeaders {
                    transmission_sig: record.signature.clone(),
                    ..Default::default()
                },
            }),
        })
    }
}

fn parse_invoice_payment(data: &str) -> Result<InvoicePayment> {
    let parts: Vec<&str> = data.split(';').map(str::trim).collect();
    let [payload, amount, currency] = parts[..] else {
        return Err(ShopError::ValidationError(format!(
            "invoice payment '{data}' is not payload;amount;currency"
        )));
    };
    let total_amount = amount
        .parse::<i64>()
        .map_err(|e| ShopError::ValidationError(format!("invoice amount '{amount}': {e}")))?;
    Ok(InvoicePayment {
        payload: payload.to_string(),
        currency: currency.to_string(),
        total_amount,
    })
}

/// Reads replay events from a CSV source.
///
/// Handles whitespace trimming and flexible record lengths, so trailing
/// optional columns may be omitted.
pub struct EventReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> EventReader<R> {
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Lazily reads and converts events, one result per row.
    pub fn events(self) -> impl Iterator<Item = Result<Inbound>> {
        self.reader
            .into_deserialize::<EventRecord>()
            .map(|result| result.map_err(ShopError::from).and_then(Inbound::try_from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reader_valid_stream() {
        let data = "kind, chat, data, signature\n\
                    command, 5, /start\n\
                    callback, 5, add_to_cart_1,\n\
                    precheckout, 5\n\
                    invoice_paid, 5, order_1;2000;USD\n\
                    webhook,,\"{\"\"event_type\"\":\"\"X\"\"}\",abcd";
        let events: Vec<Result<Inbound>> = EventReader::new(data.as_bytes()).events().collect();

        assert_eq!(events.len(), 5);
        assert_eq!(
            events[0].as_ref().unwrap(),
            &Inbound::Command {
                from: ChatId(5),
                text: "/start".into()
            }
        );
        assert_eq!(
            events[3].as_ref().unwrap(),
            &Inbound::InvoicePaid {
                from: ChatId(5),
                payment: InvoicePayment {
                    payload: "order_1".into(),
                    currency: "USD".into(),
                    total_amount: 2000
                }
            }
        );
        match events[4].as_ref().unwrap() {
            Inbound::Webhook(delivery) => {
                assert_eq!(delivery.body, r#"{"event_type":"X"}"#);
                assert_eq!(delivery.headers.transmission_sig.as_deref(), Some("abcd"));
            }
            other => panic!("unexpected event {other:?}"),
        }
    }

    #[test]
    fn test_reader_malformed_lines() {
        let data = "kind, chat, data, signature\n\
                    teleport, 1, x\n\
                    command, , /start\n\
                    invoice_paid, 1, order_1;lots;USD";
        let events: Vec<Result<Inbound>> = EventReader::new(data.as_bytes()).events().collect();

        assert_eq!(events.len(), 3);
        assert!(events.iter().all(|e| e.is_err()));
    }
}
