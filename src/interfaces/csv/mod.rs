pub mod event_reader;
pub mod notification_writer;
