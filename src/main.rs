use clap::Parser;
use miette::{IntoDiagnostic, Result};
use payportal::application::portal::PaymentPortal;
use payportal::config::Config;
use payportal::domain::webhook::AuditFilter;
use payportal::infrastructure::gateway_stub::GatewayStub;
#[cfg(feature = "storage-rocksdb")]
use payportal::infrastructure::rocksdb::RocksDBStore;
use payportal::interfaces::csv::order_writer::OrderWriter;
use payportal::interfaces::journal::audit_writer::write_audit_log;
use payportal::interfaces::journal::replay::JournalReplayer;
use payportal::interfaces::journal::request_reader::RequestReader;
use payportal::logging::init_logging;
use std::fs::File;
use std::io;
use std::sync::Arc;
use tracing::{info, warn};

fn build_portal(config: &Config) -> Result<PaymentPortal> {
    let gateway = Arc::new(GatewayStub::new(config.gateway_url.as_str()));

    match &config.db_path {
        #[cfg(feature = "storage-rocksdb")]
        Some(db_path) => {
            // Use persistent storage (RocksDB) for both orders and the audit log
            let store = RocksDBStore::open(db_path).into_diagnostic()?;
            Ok(PaymentPortal::new(
                Arc::new(store.clone()),
                Arc::new(store),
                gateway,
            ))
        }
        #[cfg(not(feature = "storage-rocksdb"))]
        Some(_) => {
            warn!(
                "WARNING: Persistent storage requested via --db-path, but 'storage-rocksdb' feature is not enabled. Falling back to In-Memory storage."
            );
            Ok(PaymentPortal::in_memory_with_gateway(gateway))
        }
        None => Ok(PaymentPortal::in_memory_with_gateway(gateway)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();
    init_logging(&config.log_level, config.log_json).into_diagnostic()?;

    let portal = build_portal(&config)?;

    // Replay the journal; a bad line never stops the run
    let file = File::open(&config.input).into_diagnostic()?;
    let reader = RequestReader::new(file);
    let mut replayer = JournalReplayer::new();
    for request in reader.requests() {
        match request {
            Ok(request) => {
                if let Err(e) = replayer.apply(&portal, request).await {
                    warn!("Error processing request: {}", e);
                }
            }
            Err(e) => {
                warn!("Error reading request: {}", e);
            }
        }
    }

    let health = portal.health().await.into_diagnostic()?;
    info!(
        transactions = health.transactions_count,
        webhooks = health.webhooks_count,
        "Journal replayed"
    );

    if let Some(path) = &config.audit_out {
        let entries = portal
            .audit_log(&AuditFilter::default())
            .await
            .into_diagnostic()?;
        let file = File::create(path).into_diagnostic()?;
        write_audit_log(file, &entries).into_diagnostic()?;
    }

    // Output the filtered order listing
    let page = portal
        .list_orders(&config.order_filter())
        .await
        .into_diagnostic()?;
    let stdout = io::stdout();
    let mut writer = OrderWriter::new(stdout.lock());
    writer.write_orders(&page.orders).into_diagnostic()?;

    Ok(())
}
