use super::*;

fn args(term: Option<&str>, page: u32, group: Option<i32>) -> ChoiceArgs {
    ChoiceArgs { term: term.map(str::to_owned), page, group }
}

#[test]
fn choice_query_carries_term_and_page() {
    let query = choice_query(&args(Some("armor"), 2, None));
    assert_eq!(query.get("term").map(String::as_str), Some("armor"));
    assert_eq!(query.get("page").map(String::as_str), Some("2"));
    assert!(!query.contains_key("group_id"));
}

#[test]
fn choice_query_adds_group_scope() {
    let query = choice_query(&args(None, 1, Some(25)));
    assert_eq!(query.get("group_id").map(String::as_str), Some("25"));
    assert!(!query.contains_key("term"));
}

#[test]
fn choice_query_clamps_page_zero() {
    let query = choice_query(&args(None, 0, None));
    assert_eq!(query.get("page").map(String::as_str), Some("1"));
}

#[test]
fn fits_list_query_uppercases_status() {
    assert_eq!(fits_list_query(Some("pending")).get("status").map(String::as_str), Some("PENDING"));
    assert!(fits_list_query(Some("  ")).is_empty());
    assert!(fits_list_query(None).is_empty());
}

#[test]
fn fits_list_query_is_url_encoded() {
    let query = fits_list_query(Some("pending&admin=1"));
    let request = reqwest::Client::new()
        .get("http://127.0.0.1:3000/api/admin/fits")
        .query(&query)
        .build()
        .expect("build");
    assert_eq!(request.url().query(), Some("status=PENDING%26ADMIN%3D1"));
}

#[test]
fn cli_parses_sde_reslot() {
    let cli = Cli::try_parse_from(["waitlist-cli", "sde", "reslot"]).expect("parse");
    assert!(matches!(cli.command, Command::Sde(SdeCommand { command: SdeSubcommand::Reslot })));
}

#[test]
fn next_page_saturates_at_u32_max() {
    assert_eq!(next_page(&args(None, 2, None)), 3);
    assert_eq!(next_page(&args(None, 0, None)), 2);
    assert_eq!(next_page(&args(None, u32::MAX, None)), u32::MAX);
}

#[test]
fn cli_parses_attribute_search() {
    let cli = Cli::try_parse_from(["waitlist-cli", "attributes", "--term", "shield", "--group", "25"]).expect("parse");
    match cli.command {
        Command::Attributes(a) => {
            assert_eq!(a.term.as_deref(), Some("shield"));
            assert_eq!(a.group, Some(25));
            assert_eq!(a.page, 1);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn cli_requires_ids_for_approve() {
    assert!(Cli::try_parse_from(["waitlist-cli", "fits", "approve"]).is_err());
    let cli = Cli::try_parse_from(["waitlist-cli", "fits", "deny", "4", "5"]).expect("parse");
    assert!(matches!(
        cli.command,
        Command::Fits(FitsCommand { command: FitsSubcommand::Deny { ref ids } }) if ids == &vec![4, 5]
    ));
}

#[tokio::test]
async fn api_request_without_token_fails_fast() {
    let ctx = CliContext { base_url: "http://127.0.0.1:9".into(), session_token: None };
    let err = api_request(&ctx, reqwest::Method::GET, "/api/waitlist", None).await.expect_err("no token");
    assert!(matches!(err, CliError::MissingSessionToken));
}
