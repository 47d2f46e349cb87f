mod store;
mod transport;

#[cfg(test)]
#[path = "main_test.rs"]
mod main_test;

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{Value, json};
use session::api::{EventUpdate, NewEvent, OrderFilter, Poster, SeatPrices};
use session::guard::evaluate;
use session::routes::{AUTH_PATH, navigation_request};
use session::{
    ApiError, AuthFailure, AuthGateway, AuthLevel, ClientConfig, ConfigError, GuardDecision, SessionInterceptor,
    SessionRecord, SessionStore, TicketingApi, TransportError,
};

use store::FileSessionStore;
use transport::ReqwestTransport;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("http client setup failed: {0}")]
    Transport(#[from] TransportError),
    #[error("{}", .0.message)]
    Auth(#[from] AuthFailure),
    #[error("request failed: {}", api_failure(.0))]
    Api(#[from] ApiError),
    #[error("prices must be three comma-separated values (vip,standard,economy), got `{0}`")]
    InvalidPrices(String),
    #[error("could not read poster {path}: {source}")]
    Poster { path: String, source: std::io::Error },
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "ticketing-cli", about = "Ticketing service client with a persisted session")]
struct Cli {
    /// Overrides `TICKETING_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    #[arg(long, env = "TICKETING_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Register(Credentials),
    Login(Credentials),
    Logout,
    Whoami,
    /// Run the navigation guard for a client route, e.g. `/orders?status=1`.
    Check { target: String },
    Events(EventsCommand),
    Orders(OrdersCommand),
}

#[derive(Args, Debug)]
struct Credentials {
    username: String,

    #[arg(long, env = "TICKETING_PASSWORD", hide_env_values = true)]
    password: String,
}

#[derive(Args, Debug)]
struct EventsCommand {
    #[command(subcommand)]
    command: EventsSubcommand,
}

#[derive(Subcommand, Debug)]
enum EventsSubcommand {
    Search {
        #[arg(default_value = "")]
        keyword: String,
    },
    All,
    Seats {
        event_id: i64,
    },
    Book {
        event_id: i64,
        #[arg(required = true, num_args = 1..)]
        seat_ids: Vec<i64>,
    },
    Add(AddEventArgs),
    Edit(EditEventArgs),
    Delete {
        event_id: i64,
    },
}

#[derive(Args, Debug)]
struct AddEventArgs {
    #[arg(long)]
    name: String,
    /// `YYYY-MM-DD`.
    #[arg(long)]
    date: String,
    /// `HH:MM`.
    #[arg(long)]
    time: String,
    /// `vip,standard,economy`.
    #[arg(long)]
    prices: String,
    #[arg(long)]
    poster: PathBuf,
}

#[derive(Args, Debug)]
struct EditEventArgs {
    event_id: i64,
    #[arg(long)]
    date: String,
    #[arg(long)]
    time: String,
    #[arg(long)]
    prices: String,
}

#[derive(Args, Debug)]
struct OrdersCommand {
    #[command(subcommand)]
    command: OrdersSubcommand,
}

#[derive(Subcommand, Debug)]
enum OrdersSubcommand {
    List {
        #[arg(long, value_enum, default_value_t = OrderStatus::Active)]
        status: OrderStatus,
    },
    Cancel {
        order_id: i64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum OrderStatus {
    Cancelled,
    Active,
    All,
}

impl From<OrderStatus> for OrderFilter {
    fn from(status: OrderStatus) -> Self {
        match status {
            OrderStatus::Cancelled => Self::Cancelled,
            OrderStatus::Active => Self::Active,
            OrderStatus::All => Self::All,
        }
    }
}

type CliTransport = SessionInterceptor<FileSessionStore, ReqwestTransport>;

struct CliContext {
    config: ClientConfig,
    store: FileSessionStore,
}

impl CliContext {
    fn transport(&self) -> Result<CliTransport, CliError> {
        Ok(SessionInterceptor::new(self.store.clone(), ReqwestTransport::new(&self.config)?))
    }

    fn gateway(&self) -> Result<AuthGateway<CliTransport>, CliError> {
        Ok(AuthGateway::new(self.transport()?))
    }

    fn api(&self) -> Result<TicketingApi<CliTransport>, CliError> {
        Ok(TicketingApi::new(self.transport()?))
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_max_level(if cli.verbose { tracing::Level::DEBUG } else { tracing::Level::WARN })
        .init();

    let mut config = ClientConfig::from_env()?;
    if let Some(base_url) = cli.base_url.as_deref() {
        config.base_url = ClientConfig::with_base_url(base_url)?.base_url;
    }
    let store = FileSessionStore::new(cli.session_file.unwrap_or_else(FileSessionStore::default_path));
    let ctx = CliContext { config, store };

    match cli.command {
        Command::Register(creds) => run_register(&ctx, creds).await,
        Command::Login(creds) => run_login(&ctx, creds).await,
        Command::Logout => {
            session::sign_out(&ctx.store);
            println!("signed out");
            Ok(())
        }
        Command::Whoami => print_json(&whoami(&ctx.store.get())),
        Command::Check { target } => {
            println!("{}", check_route(&ctx.store, &target));
            Ok(())
        }
        Command::Events(events) => run_events(&ctx, events).await,
        Command::Orders(orders) => run_orders(&ctx, orders).await,
    }
}

async fn run_register(ctx: &CliContext, creds: Credentials) -> Result<(), CliError> {
    let payload = ctx.gateway()?.register(&creds.username, &creds.password).await?;
    print_json(&payload)
}

async fn run_login(ctx: &CliContext, creds: Credentials) -> Result<(), CliError> {
    let grant = session::sign_in(&ctx.gateway()?, &ctx.store, &creds.username, &creds.password).await?;
    tracing::info!(path = %ctx.store.path().display(), "session saved");
    print_json(&json!({ "signed_in": true, "privileged": grant.is_privileged }))
}

async fn run_events(ctx: &CliContext, events: EventsCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    let json = match events.command {
        EventsSubcommand::Search { keyword } => api.search_events(&keyword).await?,
        EventsSubcommand::All => api.fetch_all_events().await?,
        EventsSubcommand::Seats { event_id } => api.get_seats(event_id).await?,
        EventsSubcommand::Book { event_id, seat_ids } => api.book_ticket(event_id, &seat_ids).await?,
        EventsSubcommand::Add(args) => {
            let event = NewEvent {
                name: args.name,
                event_date: args.date,
                start_time: args.time,
                prices: parse_prices(&args.prices)?,
                poster: read_poster(&args.poster)?,
            };
            api.add_event(event).await?
        }
        EventsSubcommand::Edit(args) => {
            let update = EventUpdate {
                event_id: args.event_id,
                event_date: args.date,
                start_time: args.time,
                prices: parse_prices(&args.prices)?,
            };
            api.edit_event(&update).await?
        }
        EventsSubcommand::Delete { event_id } => api.delete_event(event_id).await?,
    };
    print_json(&json)
}

async fn run_orders(ctx: &CliContext, orders: OrdersCommand) -> Result<(), CliError> {
    let api = ctx.api()?;
    let json = match orders.command {
        OrdersSubcommand::List { status } => api.show_orders(status.into()).await?,
        OrdersSubcommand::Cancel { order_id } => api.cancel_order(order_id).await?,
    };
    print_json(&json)
}

fn whoami(record: &SessionRecord) -> Value {
    let level = match AuthLevel::of(record) {
        AuthLevel::Unauthenticated => "unauthenticated",
        AuthLevel::Authenticated => "authenticated",
        AuthLevel::AuthenticatedPrivileged => "privileged",
    };
    json!({ "level": level, "signed_in": record.has_credential(), "privileged": record.is_privileged() })
}

/// `allow`, or `redirect <location>` for the auth screen. A `#fragment` is
/// not part of the route and is dropped.
fn check_route<S: SessionStore + ?Sized>(store: &S, target: &str) -> String {
    let target = target.split_once('#').map_or(target, |(route, _)| route);
    let (path, query) = target.split_once('?').unwrap_or((target, ""));
    match evaluate(&navigation_request(path, query), store) {
        GuardDecision::Allow => "allow".to_owned(),
        decision => {
            let location = decision.redirect_location(AUTH_PATH).unwrap_or_else(|| AUTH_PATH.to_owned());
            format!("redirect {location}")
        }
    }
}

fn parse_prices(raw: &str) -> Result<SeatPrices, CliError> {
    let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
    match parts.as_slice() {
        [vip, standard, economy] if parts.iter().all(|p| !p.is_empty()) => Ok(SeatPrices {
            vip: (*vip).to_owned(),
            standard: (*standard).to_owned(),
            economy: (*economy).to_owned(),
        }),
        _ => Err(CliError::InvalidPrices(raw.to_owned())),
    }
}

fn read_poster(path: &Path) -> Result<Poster, CliError> {
    let bytes = std::fs::read(path).map_err(|source| CliError::Poster { path: path.display().to_string(), source })?;
    let filename = path
        .file_name()
        .map_or_else(|| "poster".to_owned(), |name| name.to_string_lossy().into_owned());
    Ok(Poster { content_type: content_type_for(path).to_owned(), filename, bytes })
}

fn content_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// The service's own message when the error body has one.
fn api_failure(err: &ApiError) -> String {
    err.service_message().unwrap_or_else(|| err.to_string())
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
