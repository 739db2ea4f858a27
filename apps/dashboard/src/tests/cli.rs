use crate::cli::{Cli, Command, parse_query_pair};

use clap::Parser;

#[test]
fn given_get_with_queries_when_parsed_then_pairs_keep_order() {
    let cli = Cli::try_parse_from([
        "dashboard",
        "get",
        "patients",
        "--query",
        "page=2",
        "-q",
        "search=smith",
    ])
    .unwrap();

    match cli.command {
        Command::Get { path, query } => {
            assert_eq!(path, "patients");
            assert_eq!(
                query,
                vec![
                    ("page".to_string(), "2".to_string()),
                    ("search".to_string(), "smith".to_string()),
                ]
            );
        }
        other => panic!("Expected Get, got {other:?}"),
    }
}

#[test]
fn given_login_with_password_flag_when_parsed_then_email_and_password_set() {
    let cli =
        Cli::try_parse_from(["dashboard", "login", "nurse@example.com", "--password", "pw"])
            .unwrap();

    assert!(matches!(
        cli.command,
        Command::Login { ref email, ref password }
            if email == "nurse@example.com" && password == "pw"
    ));
}

#[test]
fn given_malformed_query_pair_when_parsed_then_rejected() {
    assert!(parse_query_pair("page").is_err());
    assert!(parse_query_pair("=2").is_err());
    assert_eq!(
        parse_query_pair("filter=a=b").unwrap(),
        ("filter".to_string(), "a=b".to_string())
    );
}
