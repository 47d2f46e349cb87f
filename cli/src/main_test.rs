use super::*;
use clap::CommandFactory;
use session::MemorySessionStore;

#[test]
fn command_definition_is_valid() {
    Cli::command().debug_assert();
}

#[test]
fn parses_login_with_password_flag() {
    let cli = Cli::try_parse_from(["ticketing-cli", "login", "ann", "--password", "pw"]).unwrap();
    let Command::Login(creds) = cli.command else {
        panic!("expected login");
    };
    assert_eq!(creds.username, "ann");
    assert_eq!(creds.password, "pw");
}

#[test]
fn book_requires_at_least_one_seat() {
    assert!(Cli::try_parse_from(["ticketing-cli", "events", "book", "7"]).is_err());
    let cli = Cli::try_parse_from(["ticketing-cli", "events", "book", "7", "1", "2"]).unwrap();
    let Command::Events(EventsCommand { command: EventsSubcommand::Book { event_id, seat_ids } }) = cli.command else {
        panic!("expected events book");
    };
    assert_eq!(event_id, 7);
    assert_eq!(seat_ids, vec![1, 2]);
}

#[test]
fn orders_list_defaults_to_active() {
    let cli = Cli::try_parse_from(["ticketing-cli", "orders", "list"]).unwrap();
    let Command::Orders(OrdersCommand { command: OrdersSubcommand::List { status } }) = cli.command else {
        panic!("expected orders list");
    };
    assert_eq!(status, OrderStatus::Active);
    assert_eq!(OrderFilter::from(OrderStatus::All).as_param(), "2");
    assert_eq!(OrderFilter::from(OrderStatus::Cancelled).as_param(), "0");
}

#[test]
fn parse_prices_takes_three_tiers() {
    let prices = parse_prices("300, 200,100").unwrap();
    assert_eq!(prices.vip, "300");
    assert_eq!(prices.standard, "200");
    assert_eq!(prices.economy, "100");
}

#[test]
fn parse_prices_rejects_wrong_shape() {
    assert!(matches!(parse_prices("300,200"), Err(CliError::InvalidPrices(_))));
    assert!(matches!(parse_prices("300,,100"), Err(CliError::InvalidPrices(_))));
    assert!(matches!(parse_prices("1,2,3,4"), Err(CliError::InvalidPrices(_))));
}

#[test]
fn content_type_follows_extension() {
    assert_eq!(content_type_for(Path::new("a/poster.PNG")), "image/png");
    assert_eq!(content_type_for(Path::new("poster.jpeg")), "image/jpeg");
    assert_eq!(content_type_for(Path::new("poster")), "application/octet-stream");
}

#[test]
fn read_poster_uses_file_name() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("gala.webp");
    std::fs::write(&path, b"RIFF").unwrap();
    let poster = read_poster(&path).unwrap();
    assert_eq!(poster.filename, "gala.webp");
    assert_eq!(poster.content_type, "image/webp");
    assert_eq!(poster.bytes, b"RIFF");
}

#[test]
fn read_poster_missing_file_errors() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(read_poster(&dir.path().join("nope.png")), Err(CliError::Poster { .. })));
}

#[test]
fn check_route_redirects_anonymous_with_return_path() {
    let store = MemorySessionStore::new();
    assert_eq!(check_route(&store, "/orders?status=1"), "redirect /auth?redirect=%2Forders%3Fstatus%3D1");
    assert_eq!(check_route(&store, "/auth"), "allow");
}

#[test]
fn check_route_flags_missing_privilege() {
    let store = MemorySessionStore::new();
    store.set(Some("s-1"), false).unwrap();
    assert_eq!(check_route(&store, "/orders"), "allow");
    assert_eq!(
        check_route(&store, "/admin/events"),
        "redirect /auth?redirect=%2Fadmin%2Fevents&reason=insufficient-privilege"
    );
}

#[test]
fn whoami_reports_level() {
    let anonymous = whoami(&SessionRecord::anonymous());
    assert_eq!(anonymous["level"], "unauthenticated");
    assert_eq!(anonymous["signed_in"], false);

    let admin = whoami(&SessionRecord::new(Some("s-1"), true).unwrap());
    assert_eq!(admin, json!({ "level": "privileged", "signed_in": true, "privileged": true }));
}

#[test]
fn check_route_ignores_fragment() {
    let store = MemorySessionStore::new();
    assert_eq!(check_route(&store, "/orders?a=1#x"), "redirect /auth?redirect=%2Forders%3Fa%3D1");
    assert_eq!(check_route(&store, "/orders#top"), "redirect /auth?redirect=%2Forders");
    assert_eq!(check_route(&store, "/auth#form"), "allow");
}

#[test]
fn api_errors_show_service_message() {
    let err = CliError::from(ApiError::Status { status: 409, body: r#"{"error":"Seat already taken"}"#.to_owned() });
    assert_eq!(err.to_string(), "request failed: Seat already taken");

    let err = CliError::from(ApiError::Status { status: 502, body: "<html>".to_owned() });
    assert_eq!(err.to_string(), "request failed: request failed with status 502");
}
