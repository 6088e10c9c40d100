use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use labdesk_client::config::{ClientConfig, ConfigError};
use labdesk_client::net::api::{AuthApiError, HttpAuthApi};
use labdesk_client::net::transport::{ApiClient, ApiError};
use labdesk_client::net::types::{RegisterProfile, Role};
use labdesk_client::routes::{HOME_ROUTE, LANDING_ROUTE, dashboard_for};
use labdesk_client::state::auth::{AuthOutcome, SessionStore};
use labdesk_client::state::permissions::Permissions;
use labdesk_client::util::auth::{ForcedLogout, Navigation, Navigator, navigate_to};
use labdesk_client::util::persistence::FileStorage;
use labdesk_client::util::validation::PasswordStrength;
use serde_json::{Value, json};

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("auth client setup failed: {0}")]
    AuthClient(#[from] AuthApiError),
    #[error("api call failed: {0}")]
    Api(#[from] ApiError),
    #[error("{0}")]
    AuthFailed(String),
    #[error("not signed in; run `labdesk login <username>`")]
    NotSignedIn,
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "labdesk", about = "Lab management session CLI")]
struct Cli {
    #[arg(long, env = "LABDESK_API_BASE_URL")]
    base_url: Option<String>,

    #[arg(long, env = "LABDESK_SESSION_FILE")]
    session_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sign in and persist the session.
    Login {
        username: String,
        #[arg(long, env = "LABDESK_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create an account and sign in as it.
    Register(RegisterArgs),
    /// Clear the persisted session.
    Logout,
    /// Show the signed-in identity, its permissions and dashboard.
    Whoami,
    /// Show what the route guard decides for a path.
    Check { path: String },
    /// List roles with their dashboards and permissions.
    Roles {
        /// Only this role, e.g. `lab-manager` or `ADMIN`.
        role: Option<Role>,
    },
    /// Call an API endpoint with the session's token.
    Api {
        method: String,
        path: String,
        #[arg(long)]
        data: Option<String>,
    },
}

#[derive(Args, Debug)]
struct RegisterArgs {
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "LABDESK_PASSWORD", hide_env_values = true)]
    password: String,
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    lab_id: Option<i64>,
}

/// Terminal stand-in for a browser redirect.
struct TerminalNavigator;

impl Navigator for TerminalNavigator {
    fn navigate(&self, path: &str) {
        eprintln!("session expired; sign in again with `labdesk login` (redirected to {path})");
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let config = resolve_config(cli.base_url, cli.session_file)?;
    let storage = Arc::new(FileStorage::new(config.session_file.clone()));
    let store = SessionStore::new(storage.clone(), Arc::new(HttpAuthApi::new(&config)?));
    store.hydrate();

    match cli.command {
        Command::Login { username, password } => {
            let outcome = store.login(&username, &password).await;
            report_sign_in(outcome)
        }
        Command::Register(args) => run_register(&store, args).await,
        Command::Logout => {
            store.logout();
            println!("signed out; cleared {}", storage.path().display());
            println!("next: {LANDING_ROUTE}");
            Ok(())
        }
        Command::Whoami => run_whoami(&store, &storage),
        Command::Check { path } => {
            match navigate_to(&store.snapshot(), &path) {
                Navigation::Wait => println!("wait"),
                Navigation::Render(route) => println!("render {route} ({})", route.title()),
                Navigation::Redirect(route) => println!("redirect {route}"),
            }
            Ok(())
        }
        Command::Roles { role } => run_roles(role),
        Command::Api { method, path, data } => run_api(&config, &store, &method, &path, data).await,
    }
}

fn resolve_config(base_url: Option<String>, session_file: Option<PathBuf>) -> Result<ClientConfig, CliError> {
    let env = ClientConfig::from_env()?;
    let base_url = base_url.unwrap_or(env.api_base_url);
    let session_file = session_file.unwrap_or(env.session_file);
    Ok(ClientConfig::new(&base_url, session_file, env.timeouts)?)
}

fn report_sign_in(outcome: AuthOutcome) -> Result<(), CliError> {
    match outcome {
        AuthOutcome::Success(identity) => {
            println!("signed in as {} ({})", identity.display_name(), identity.role.label());
            println!("next: {HOME_ROUTE}");
            Ok(())
        }
        AuthOutcome::Failure(message) => Err(CliError::AuthFailed(message)),
    }
}

async fn run_register(store: &SessionStore, args: RegisterArgs) -> Result<(), CliError> {
    eprintln!("password strength: {}", PasswordStrength::of(&args.password));
    let profile = RegisterProfile {
        username: args.username,
        email: args.email,
        password: args.password,
        first_name: args.first_name,
        last_name: args.last_name,
        lab_id: args.lab_id,
    };
    report_sign_in(store.register(profile).await)
}

fn run_whoami(store: &SessionStore, storage: &FileStorage) -> Result<(), CliError> {
    let state = store.snapshot();
    let Some(identity) = &state.user else {
        return Err(CliError::NotSignedIn);
    };
    let dashboard = dashboard_for(state.role());
    let links: Vec<&str> = dashboard.links.iter().map(|route| route.path()).collect();
    print_json(&json!({
        "identity": identity,
        "displayName": identity.display_name(),
        "isAdmin": state.is_admin(),
        "isLabManager": state.is_lab_manager(),
        "isInstructor": state.is_instructor(),
        "isStudent": state.is_student(),
        "permissions": state.permissions(),
        "dashboard": { "title": dashboard.title, "description": dashboard.description, "links": links },
        "sessionFile": storage.path().display().to_string(),
    }))
}

fn run_roles(only: Option<Role>) -> Result<(), CliError> {
    let roles: Vec<Value> = Role::ALL
        .into_iter()
        .filter(|role| only.is_none_or(|only| only == *role))
        .map(|role| {
            let dashboard = dashboard_for(Some(role));
            let links: Vec<&str> = dashboard.links.iter().map(|route| route.path()).collect();
            json!({
                "role": role.as_str(),
                "label": role.label(),
                "dashboard": { "title": dashboard.title, "links": links },
                "permissions": Permissions::for_role(role),
            })
        })
        .collect();
    print_json(&Value::Array(roles))
}

async fn run_api(
    config: &ClientConfig,
    store: &SessionStore,
    method: &str,
    path: &str,
    data: Option<String>,
) -> Result<(), CliError> {
    let method = reqwest::Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .map_err(|_| CliError::InvalidMethod(method.to_owned()))?;
    let body = data.as_deref().map(serde_json::from_str::<Value>).transpose()?;

    let client = ApiClient::new(config, Arc::new(store.clone()))?;
    client.on_unauthorized(Arc::new(ForcedLogout::new(store.clone(), Arc::new(TerminalNavigator))));

    let value = client.request(method, path, body).await?;
    print_json(&value)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
