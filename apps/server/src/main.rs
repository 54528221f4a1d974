use anyhow::Context;
use clap::{Parser, Subcommand};
use roomcast_backend_runtime::{telemetry, BackendServices};
use roomcast_chats::{day_window, ChatStore};
use roomcast_config::load as load_config;
use roomcast_database::{initialize_database, ChatRepository};
use roomcast_gateway::create_router;
use tokio::net::TcpListener;
use tracing::info;

#[derive(Parser)]
#[command(name = "roomcast-server")]
#[command(about = "Roomcast chat backend (serves by default)")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the HTTP and websocket server
    Serve,
    /// Print today's stored messages for a room
    History {
        #[arg(long)]
        room_id: i64,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Serve) {
        Commands::Serve => run_server().await,
        Commands::History { room_id } => print_history(room_id).await,
    }
}

async fn run_server() -> anyhow::Result<()> {
    telemetry::init_tracing().context("failed to initialise tracing")?;

    info!("starting Roomcast backend");

    let config = load_config().context("failed to load configuration")?;

    let services = BackendServices::initialise(&config)
        .await
        .context("failed to initialise backend services")?;

    let app = create_router(services.gateway_state());

    let address = format!("{}:{}", config.http.address, config.http.port);
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind http listener on {address}"))?;

    info!(%address, "http server listening");

    let rooms = services.rooms.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            roomcast_backend_runtime::shutdown_signal().await;
            rooms.shutdown().await;
        })
        .await
        .context("http server error")?;

    info!("backend shut down");
    Ok(())
}

async fn print_history(room_id: i64) -> anyhow::Result<()> {
    let config = load_config().context("failed to load configuration")?;
    let pool = initialize_database(&config.database)
        .await
        .context("failed to open database")?;

    let (start, end) = day_window(chrono::Utc::now());
    let messages = ChatRepository::new(pool)
        .messages_between(room_id, start, end)
        .await;

    println!("=== ROOM {room_id} ({}) ===", start.format("%Y-%m-%d"));
    if messages.is_empty() {
        println!("No messages today");
        return Ok(());
    }

    println!("Found {} messages:", messages.len());
    println!("{:<8} {:<10} {:<25} {}", "ID", "User ID", "Sent At", "Message");
    println!("{}", "-".repeat(80));
    for message in messages {
        println!(
            "{:<8} {:<10} {:<25} {}",
            message.chat_id,
            message.user_id,
            message.created_at.format("%Y-%m-%d %H:%M:%S"),
            message.message
        );
    }
    Ok(())
}
