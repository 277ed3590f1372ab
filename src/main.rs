use anyhow::Result;
use clap::Parser;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info};

use ledgerdesk::api::{ApiError, Credentials, Envelope, HttpClient, Transport};
use ledgerdesk::cli::{Cli, Commands, OutputFormat};
use ledgerdesk::config::Config;
use ledgerdesk::export::{Exporter, FileDownloadTrigger};
use ledgerdesk::list_query::{ListQuery, ListQueryOptions};
use ledgerdesk::models::{QueryFilters, SEARCH_KEY};
use ledgerdesk::notifications::NotificationQueue;
use ledgerdesk::output;
use ledgerdesk::session::Session;

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "ledgerdesk=info");
    }

    // Initialize logging to both console and file
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let file_appender = tracing_appender::rolling::never(".", "ledgerdesk.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    config.validate()?;

    let session = Session::with_store(&config.token_file)?;
    let client = Arc::new(HttpClient::new(&config, session)?);
    let mut notifications = NotificationQueue::new().with_max_items(20);

    match &cli.command {
        Commands::Login { email, password } => {
            let credentials = Credentials {
                email: email.clone(),
                password: password.clone(),
            };
            match client.login(&credentials).await {
                Ok(()) => {
                    notifications.success(format!("Signed in as {}", email));
                }
                Err(e) => {
                    error!("Login failed: {}", e);
                    notifications.error(e.user_message());
                }
            }
        }

        Commands::Logout => match client.logout() {
            Ok(()) => {
                notifications.success("Signed out");
            }
            Err(e) => {
                error!("Logout failed: {}", e);
                notifications.error(e.user_message());
            }
        },

        Commands::List {
            resource,
            page,
            limit,
            search,
            filters,
            format,
        } => {
            let resource = Commands::parse_resource(resource)?;
            let format = Commands::parse_output_format(format)?;

            let mut patch = Commands::parse_filters(filters)?;
            if let Some(search) = search {
                patch = patch.set(SEARCH_KEY, search.as_str());
            }
            if let Some(limit) = limit {
                patch = patch.limit(*limit);
            }
            if let Some(page) = page {
                patch = patch.page(*page);
            }

            info!("Listing {}", resource.as_str());
            let transport: Arc<dyn Transport> = client.clone();
            let query = ListQuery::for_resource(transport, resource, ListQueryOptions::from_config(&config));

            let issued = match query.set_filters(patch) {
                Ok(true) => Ok(()),
                Ok(false) => query.refetch(),
                Err(e) => Err(e),
            };

            match issued {
                Ok(()) => {
                    let state = query.settled().await;
                    match &state.error {
                        Some(message) => {
                            notifications.error(message.clone());
                        }
                        None => {
                            match format {
                                OutputFormat::Csv => {
                                    output::write_csv(&state.items, resource.columns(), std::io::stdout())?
                                }
                                OutputFormat::Json => output::write_json(&state, std::io::stdout())?,
                            }
                            notifications.info(output::page_summary(&state));
                        }
                    }
                }
                Err(e) => {
                    notifications.error(e.to_string());
                }
            }
        }

        Commands::Export {
            resource,
            filters,
            output: output_dir,
        } => {
            let resource = Commands::parse_resource(resource)?;
            let mut query_filters = QueryFilters::new(config.list.page_size);
            query_filters.merge(Commands::parse_filters(filters)?);

            let dir = output_dir
                .as_deref()
                .map(Path::new)
                .unwrap_or(config.download_dir.as_path());
            let exporter = Exporter::new(client.clone(), Arc::new(FileDownloadTrigger::new(dir)));

            match exporter.export_resource(resource, &query_filters).await {
                Ok(download) => {
                    notifications.success(format!(
                        "Saved {} ({} bytes) to {}",
                        download.filename,
                        download.size,
                        download.path.display()
                    ));
                }
                Err(e) => {
                    error!("Export failed: {}", e);
                    notifications.error(e.user_message());
                }
            }
        }

        Commands::Upload {
            endpoint,
            file,
            field,
        } => {
            let outcome: Result<String, ApiError> = async {
                let body = client.upload(endpoint, field, Path::new(file)).await?;
                Envelope::acknowledge(body)
            }
            .await;

            match outcome {
                Ok(message) if message.is_empty() => {
                    notifications.success(format!("Uploaded {}", file));
                }
                Ok(message) => {
                    notifications.success(message);
                }
                Err(e) => {
                    error!("Upload failed: {}", e);
                    notifications.error(e.user_message());
                }
            }
        }
    }

    let failed = notifications.has_errors();
    for notification in notifications.drain() {
        eprintln!("[{}] {}", notification.kind.label(), notification.message);
    }

    if failed {
        std::process::exit(1);
    }

    Ok(())
}
