use clap::Parser;
use gezgin::content::ContentStore;
use gezgin::places::PlaceResolver;
use gezgin::server::{self, AppState};
use gezgin::storage::Storage;
use std::path::PathBuf;
use std::sync::Arc;

/// Gezgin — travel-information server for Turkish provinces and districts.
///
/// Serves city/district data from a SQLite database, merges in generated
/// district content from a JSON file, and resolves place lists with
/// on-demand geocoding.
///
/// Examples:
///   gezgin --db gezgin.db
///   gezgin --db gezgin.db --content district_details.json --port 3000
///   gezgin --db gezgin.db --offline
#[derive(Parser)]
#[command(name = "gezgin", version, about, long_about = None)]
struct Cli {
    /// Address to bind.
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on.
    #[arg(long, default_value_t = 3000)]
    port: u16,

    /// SQLite database path. Created with an empty schema if absent.
    #[arg(long)]
    db: PathBuf,

    /// Generated district content (JSON). Optional.
    #[arg(long)]
    content: Option<PathBuf>,

    /// Offline mode: no outbound geocoding; missing coordinates fall
    /// back to district centroids.
    #[arg(long)]
    offline: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let storage = Storage::open(&cli.db).unwrap_or_else(|e| {
        eprintln!("Error: Cannot open database {}: {}", cli.db.display(), e);
        std::process::exit(1);
    });

    let content = match &cli.content {
        Some(path) => ContentStore::load(path).unwrap_or_else(|e| {
            eprintln!("Error: Cannot load content {}: {}", path.display(), e);
            std::process::exit(1);
        }),
        None => ContentStore::empty(),
    };
    if !content.is_empty() {
        eprintln!("  Loaded content for {} districts.", content.len());
    }

    let mut resolver = PlaceResolver::new();
    if cli.offline {
        resolver.set_offline(true);
    }

    let state = Arc::new(AppState::new(storage, content, resolver));
    server::start(&cli.host, cli.port, state).await;
}
