use std::io::{self, Read};

use clap::{Args, Parser, Subcommand};
use forms::{ChoicePage, SearchParams};
use reqwest::header::{COOKIE, HeaderMap, HeaderValue};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("missing session token; pass --session-token or set WAITLIST_SESSION_TOKEN")]
    MissingSessionToken,
    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("invalid header value: {0}")]
    InvalidHeader(#[from] reqwest::header::InvalidHeaderValue),
    #[error("server returned HTTP {status}: {message}")]
    ServerError { status: u16, message: String },
    #[error("could not read fit: {0}")]
    Io(#[from] io::Error),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "waitlist-cli", about = "Fleet waitlist API CLI")]
struct Cli {
    #[arg(long, env = "WAITLIST_BASE_URL", default_value = "http://127.0.0.1:3000")]
    base_url: String,

    #[arg(long, env = "WAITLIST_SESSION_TOKEN")]
    session_token: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone)]
struct CliContext {
    base_url: String,
    session_token: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Ping,
    /// Show the open waitlist.
    Waitlist,
    /// Submit a fit (EFT text) for one of your characters.
    Submit {
        character_id: i64,
        #[arg(long, default_value = "-", help = "Fit file path, or - for stdin")]
        input: String,
    },
    Fits(FitsCommand),
    /// Search dogma attributes, optionally scoped to a ship group.
    Attributes(ChoiceArgs),
    /// Search ship groups.
    Groups(ChoiceArgs),
    Sde(SdeCommand),
    Tokens(TokensCommand),
}

#[derive(Args, Debug)]
struct FitsCommand {
    #[command(subcommand)]
    command: FitsSubcommand,
}

#[derive(Subcommand, Debug)]
enum FitsSubcommand {
    List {
        #[arg(long, help = "PENDING, APPROVED or DENIED")]
        status: Option<String>,
    },
    Approve {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
    Deny {
        #[arg(required = true)]
        ids: Vec<i64>,
    },
}

#[derive(Args, Debug)]
struct ChoiceArgs {
    #[arg(long)]
    term: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: u32,
    #[arg(long, help = "Restrict to attributes of this ship group")]
    group: Option<i32>,
}

#[derive(Args, Debug)]
struct SdeCommand {
    #[command(subcommand)]
    command: SdeSubcommand,
}

#[derive(Subcommand, Debug)]
enum SdeSubcommand {
    /// Cache every referenced type missing from the local SDE tables.
    Backfill,
    /// Re-derive slot data for cached types that have none.
    Reslot,
}

#[derive(Args, Debug)]
struct TokensCommand {
    #[command(subcommand)]
    command: TokensSubcommand,
}

#[derive(Subcommand, Debug)]
enum TokensSubcommand {
    /// Refresh stale character tokens now.
    Refresh,
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let cli = Cli::parse();
    let ctx = CliContext { base_url: cli.base_url, session_token: cli.session_token };

    match cli.command {
        Command::Ping => run_ping(&ctx).await,
        Command::Waitlist => {
            let json = api_request(&ctx, reqwest::Method::GET, "/api/waitlist", None).await?;
            print_json(&json)
        }
        Command::Submit { character_id, input } => {
            let raw_fit = read_input(&input)?;
            let body = serde_json::json!({ "character_id": character_id, "raw_fit": raw_fit });
            let json = api_request(&ctx, reqwest::Method::POST, "/api/waitlist/fits", Some(body)).await?;
            print_json(&json)
        }
        Command::Fits(fits) => run_fits(&ctx, fits).await,
        Command::Attributes(args) => run_choices(&ctx, "/api/admin/attributes", &args).await,
        Command::Groups(args) => run_choices(&ctx, "/api/admin/groups", &args).await,
        Command::Sde(sde) => match sde.command {
            SdeSubcommand::Backfill => {
                let json = api_request(&ctx, reqwest::Method::POST, "/api/admin/sde/backfill", None).await?;
                print_json(&json)
            }
            SdeSubcommand::Reslot => {
                let json = api_request(&ctx, reqwest::Method::POST, "/api/admin/sde/reslot", None).await?;
                print_json(&json)
            }
        },
        Command::Tokens(tokens) => match tokens.command {
            TokensSubcommand::Refresh => {
                let json = api_request(&ctx, reqwest::Method::POST, "/api/admin/tokens/refresh", None).await?;
                print_json(&json)
            }
        },
    }
}

async fn run_ping(cli: &CliContext) -> Result<(), CliError> {
    let client = reqwest::Client::new();
    let url = format!("{}/healthz", cli.base_url.trim_end_matches('/'));
    let response = client.get(url).send().await?;
    let status = response.status();
    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: "health check failed".to_owned() });
    }
    println!("ok");
    Ok(())
}

async fn run_fits(cli: &CliContext, fits: FitsCommand) -> Result<(), CliError> {
    let json = match fits.command {
        FitsSubcommand::List { status } => {
            let query = fits_list_query(status.as_deref());
            api_request_with_query(cli, reqwest::Method::GET, "/api/admin/fits", &query, None).await?
        }
        FitsSubcommand::Approve { ids } => {
            let body = serde_json::json!({ "ids": ids });
            api_request(cli, reqwest::Method::POST, "/api/admin/fits/approve", Some(body)).await?
        }
        FitsSubcommand::Deny { ids } => {
            let body = serde_json::json!({ "ids": ids });
            api_request(cli, reqwest::Method::POST, "/api/admin/fits/deny", Some(body)).await?
        }
    };
    print_json(&json)
}

async fn run_choices(cli: &CliContext, path: &str, args: &ChoiceArgs) -> Result<(), CliError> {
    let query = choice_query(args);
    let json = api_request_with_query(cli, reqwest::Method::GET, path, &query, None).await?;
    let page: ChoicePage = serde_json::from_value(json)?;
    for choice in &page.results {
        println!("{:>8}  {}", choice.id, choice.text);
    }
    if page.pagination.more {
        println!("-- more results on page {} --", next_page(args));
    }
    Ok(())
}

fn next_page(args: &ChoiceArgs) -> u32 {
    args.page.max(1).saturating_add(1)
}

/// Query pairs for a choice request, using the same keys the form sends.
fn choice_query(args: &ChoiceArgs) -> forms::Query {
    let params = SearchParams::new(args.term.as_deref(), args.page);
    let mut query = forms::default_query(&params);
    if let Some(group) = args.group {
        query.insert(forms::SCOPE_PARAM.to_owned(), group.to_string());
    }
    query
}

/// Status filter for the fit list; the request builder encodes it.
fn fits_list_query(status: Option<&str>) -> forms::Query {
    let mut query = forms::Query::new();
    if let Some(status) = status.map(str::trim).filter(|s| !s.is_empty()) {
        query.insert("status".to_owned(), status.to_ascii_uppercase());
    }
    query
}

fn read_input(input: &str) -> Result<String, CliError> {
    if input == "-" {
        let mut buf = String::new();
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    Ok(std::fs::read_to_string(input)?)
}

async fn api_request(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    body: Option<Value>,
) -> Result<Value, CliError> {
    api_request_with_query(cli, method, path, &forms::Query::new(), body).await
}

async fn api_request_with_query(
    cli: &CliContext,
    method: reqwest::Method,
    path: &str,
    query: &forms::Query,
    body: Option<Value>,
) -> Result<Value, CliError> {
    let session_token = cli.session_token.as_deref().ok_or(CliError::MissingSessionToken)?;

    let mut headers = HeaderMap::new();
    headers.insert(COOKIE, HeaderValue::from_str(&format!("session_token={session_token}"))?);

    let client = reqwest::Client::builder().default_headers(headers).build()?;
    let url = format!("{}{}", cli.base_url.trim_end_matches('/'), path);

    let mut request = client.request(method, &url);
    if !query.is_empty() {
        request = request.query(query);
    }
    if let Some(json) = body {
        request = request.json(&json);
    }

    let response = request.send().await?;
    let status = response.status();
    let value = response.json::<Value>().await.unwrap_or(Value::Null);

    if !status.is_success() {
        return Err(CliError::ServerError { status: status.as_u16(), message: value.to_string() });
    }

    Ok(value)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}

#[cfg(test)]
#[path = "main_test.rs"]
mod tests;
