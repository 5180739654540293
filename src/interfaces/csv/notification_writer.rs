use crate::domain::ports::Notification;
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct OutputRow<'a> {
    chat: i64,
    text: &'a str,
}

/// Writes outbound notifications as `chat,text` CSV rows.
pub struct NotificationWriter<W: Write> {
    writer: csv::Writer<W>,
}

impl<W: Write> NotificationWriter<W> {
    pub fn new(sink: W) -> Self {
        Self {
            writer: csv::Writer::from_writer(sink),
        }
    }

    pub fn write_notifications<'a, I>(&mut self, notifications: I) -> Result<()>
    where
        I: IntoIterator<Item = &'a Notification>,
    {
        for notification in notifications {
            self.writer.serialize(OutputRow {
                chat: notification.chat_id.0,
                text: &notification.text,
            })?;
        }
        self.writer.flush()?;
        Ok(())
    }
}
