//! Tote CLI - inspect and edit the cart or liked products from a terminal.
//!
//! Uses the same engines as the app: the collection is loaded from the local
//! database, reconciled with the server when `USER_ID` and `AUTH_TOKEN` are
//! set, then the command is applied and pending writes are flushed.

use clap::{Parser, Subcommand};
use std::sync::Arc;
use tote_client::{CollectionView, Config, MemoryRemote, SessionSource, SqliteKv, Storefront};
use tote_engine::{CollectionKind, Product, Quantity, Session};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Work on the local database only, without contacting the server
    #[arg(long)]
    offline: bool,

    /// Print the resulting collection as JSON
    #[arg(long)]
    json: bool,

    /// Collection to work on: cart or liked
    kind: CollectionKind,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the collection
    Show,
    /// Add a product
    Add {
        product_id: String,
        #[arg(short, long, default_value_t = 1)]
        quantity: Quantity,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        price: Option<f64>,
    },
    /// Remove a product
    Remove { product_id: String },
    /// Set the quantity of a cart product; zero or less removes it
    Set {
        product_id: String,
        #[arg(allow_hyphen_values = true)]
        quantity: i64,
    },
    /// Remove every product
    Clear,
    /// Reload the collection from the server
    Refetch,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tote_client=debug,tote=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let config = Config::from_env()?;

    let (store, session) = if cli.offline {
        tracing::info!("Running offline against {}", config.database_url);
        let kv = SqliteKv::connect(&config.database_url).await?;
        let store = Storefront::new(Arc::new(kv), Arc::new(MemoryRemote::new()));
        (store, Session::anonymous())
    } else {
        (Storefront::connect(&config).await?, config.session())
    };

    let sessions = SessionSource::new(session);
    let listener = store.attach(sessions.subscribe());

    let engine = store.engine(cli.kind);
    engine.ready().await;

    let outcome = match cli.command {
        Command::Show => Ok(()),
        Command::Add {
            product_id,
            quantity,
            name,
            price,
        } => {
            let name = name.unwrap_or_else(|| product_id.clone());
            let product = Product::new(product_id, name, price.unwrap_or(0.0));
            engine.add(product, quantity).await.map(drop)
        }
        Command::Remove { product_id } => engine.remove(product_id).await.map(drop),
        Command::Set {
            product_id,
            quantity,
        } => engine.update_quantity(product_id, quantity).await.map(drop),
        Command::Clear => engine.clear().await.map(drop),
        Command::Refetch => engine.refetch().await,
    };

    if let Err(e) = &outcome {
        eprintln!("{}", e.user_message());
    }

    store.flush().await;
    let view = engine.view();
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&view)?);
    } else {
        print_view(&view);
    }

    drop(sessions);
    listener.await?;
    outcome.map_err(Into::into)
}

fn print_view(view: &CollectionView) {
    if view.entities.is_empty() {
        println!("Your {} is empty.", view.kind.label());
    }

    for entity in &view.entities {
        match view.kind {
            CollectionKind::Cart => println!(
                "{:<24} {:<32} x{:<4} {:>10.2}",
                entity.id(),
                entity.product.name,
                entity.quantity(),
                entity.line_total()
            ),
            CollectionKind::Liked => println!(
                "{:<24} {:<32} {:>10.2}",
                entity.id(),
                entity.product.name,
                entity.product.price
            ),
        }
    }

    println!("{} item(s), total {:.2}", view.total_count, view.total_price);
    if let Some(remote_id) = &view.remote_id {
        println!("Synced as {remote_id}");
    }
    if let Some(error) = &view.error {
        println!("Warning: {error}");
    }
}
