use clap::Parser;
use miette::{IntoDiagnostic, Result};
use shopbot::application::Shop;
use shopbot::application::dispatch::Dispatcher;
use shopbot::config::ShopConfig;
use shopbot::domain::admin::Admins;
use shopbot::domain::ids::ChatId;
use shopbot::infrastructure::in_memory::InMemoryNotifier;
use shopbot::infrastructure::process::ProcessGitRunner;
use shopbot::interfaces::csv::event_reader::EventReader;
use shopbot::interfaces::csv::notification_writer::NotificationWriter;
use std::fs::File;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Input event script CSV file (kind, chat, data, signature)
    input: PathBuf,

    /// Admin chat id; repeatable. Overrides SHOP_ADMIN_IDS when given.
    #[arg(long = "admin", allow_negative_numbers = true)]
    admins: Vec<i64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "shopbot=info".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let cli = Cli::parse();
    let config = ShopConfig::from_env().into_diagnostic()?;
    let admins = if cli.admins.is_empty() {
        config.admins()
    } else {
        Admins::new(cli.admins.iter().copied().map(ChatId))
    };
    info!(admins = admins.iter().count(), live = config.live_mode, "starting shop");

    let notifier = InMemoryNotifier::new();
    let shop = Shop::in_memory(Arc::new(notifier.clone()), admins, config.payment_settings());
    let dispatcher = Dispatcher::new(shop.clone(), Arc::new(ProcessGitRunner));

    // Replay events
    let file = File::open(&cli.input).into_diagnostic()?;
    let reader = EventReader::new(file);
    for (line, event) in reader.events().enumerate() {
        match event {
            Ok(inbound) => match dispatcher.handle(inbound).await {
                Ok(outcome) if outcome.restart_requested => {
                    warn!(line = line + 1, "restart requested; the replay continues");
                }
                Ok(_) => {}
                Err(e) => error!(line = line + 1, error = %e, "error processing event"),
            },
            Err(e) => error!(line = line + 1, error = %e, "error reading event"),
        }
    }

    let metrics = shop.metrics();
    info!(
        settled = metrics.settled,
        duplicates = metrics.duplicate_settlements,
        bad_signatures = metrics.bad_signatures,
        "replay finished"
    );

    // Output the outbox
    let outbox = notifier.drain().await;
    let stdout = io::stdout();
    let mut writer = NotificationWriter::new(stdout.lock());
    writer.write_notifications(&outbox).into_diagnostic()?;

    Ok(())
}
