use std::path::PathBuf;
use std::sync::Arc;

use clap::{Args, Parser, Subcommand};
use jobboard::config::{ConfigError, SessionConfig};
use jobboard::listing::{DEFAULT_PER_PAGE, JobQuery};
use jobboard::net::api::HttpApi;
use jobboard::net::types::{ApiError, BasicProfile, Domain};
use jobboard::notify::{Notifier, NotificationLog};
use jobboard::state::{AuthDomain, DomainProfile, SessionContext};
use jobboard::storage::{CredentialStore, FileStore, StorageError};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("credential store error: {0}")]
    Storage(#[from] StorageError),
    #[error("backend request failed: {0}")]
    Api(#[from] ApiError),
    #[error("not signed in as {0}")]
    NotSignedIn(Domain),
    #[error("login as {0} failed")]
    LoginFailed(Domain),
    #[error("invalid JSON payload: {0}")]
    InvalidJson(#[from] serde_json::Error),
}

#[derive(Parser, Debug)]
#[command(name = "jobboard", about = "Job board session CLI")]
struct Cli {
    /// Overrides `JOBBOARD_API_BASE_URL`.
    #[arg(long)]
    base_url: Option<String>,

    /// Overrides `JOBBOARD_STORAGE_PATH`.
    #[arg(long)]
    storage: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Restore saved sessions and print what each domain holds.
    Status,
    Login(LoginCommand),
    Logout {
        domain: Domain,
    },
    /// Restore the domain's session and print its refreshed profile.
    Profile {
        domain: Domain,
    },
    Jobs(JobsCommand),
    Resources,
    Applications,
    /// Page-level read of an arbitrary backend path.
    Get {
        path: String,
        #[arg(long = "as")]
        as_domain: Option<Domain>,
    },
}

#[derive(Args, Debug)]
struct LoginCommand {
    domain: Domain,
    token: String,
    #[arg(long)]
    id: Option<String>,
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    email: Option<String>,
}

#[derive(Args, Debug)]
struct JobsCommand {
    #[arg(long)]
    query: Option<String>,
    #[arg(long)]
    job_type: Option<String>,
    #[arg(long)]
    location: Option<String>,
    #[arg(long, default_value_t = 1)]
    page: usize,
    #[arg(long, default_value_t = DEFAULT_PER_PAGE)]
    per_page: usize,
}

struct CliContext {
    http: Arc<HttpApi>,
    store: Arc<FileStore>,
    log: Arc<NotificationLog>,
}

impl CliContext {
    fn idle(&self) -> Arc<SessionContext> {
        SessionContext::new(self.http.clone(), self.store.clone(), self.notifier())
    }

    async fn started(&self) -> Arc<SessionContext> {
        SessionContext::start(self.http.clone(), self.store.clone(), self.notifier()).await
    }

    fn notifier(&self) -> Arc<dyn Notifier> {
        self.log.clone()
    }
}

#[tokio::main]
async fn main() -> Result<(), CliError> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().with_writer(std::io::stderr).init();

    let cli = Cli::parse();
    let mut config = SessionConfig::from_env()?;
    if let Some(base_url) = cli.base_url {
        config.api_base_url = base_url.trim_end_matches('/').to_owned();
    }
    if let Some(storage) = cli.storage {
        config.storage_path = storage;
    }

    let store = Arc::new(FileStore::new(config.storage_path.clone()));
    // Surface an unreadable store up front; the session layer only logs it.
    store.load(Domain::User.storage_key())?;

    let ctx = CliContext { http: Arc::new(HttpApi::new(&config)?), store, log: Arc::new(NotificationLog::new()) };
    let result = run(&ctx, cli.command).await;
    for notification in ctx.log.drain() {
        eprintln!("[{:?}] {}", notification.level, notification.message);
    }
    result
}

async fn run(ctx: &CliContext, command: Command) -> Result<(), CliError> {
    match command {
        Command::Status => run_status(ctx).await,
        Command::Login(login) => run_login(ctx, login).await,
        Command::Logout { domain } => {
            let acknowledged = ctx.started().await.logout(domain).await;
            println!("logged out of {domain} (server acknowledged: {acknowledged})");
            Ok(())
        }
        Command::Profile { domain } => {
            let session = ctx.started().await;
            let profile = profile_json(&session, domain).await?;
            if profile.is_null() {
                return Err(CliError::NotSignedIn(domain));
            }
            print_json(&profile)
        }
        Command::Jobs(jobs) => run_jobs(ctx, jobs).await,
        Command::Resources => {
            let session = ctx.idle();
            session.fetch_resources().await;
            print_json(&serde_json::to_value(session.resources().await)?)
        }
        Command::Applications => {
            let session = ctx.started().await;
            if session.bearer(Domain::User).await.is_none() {
                return Err(CliError::NotSignedIn(Domain::User));
            }
            print_json(&serde_json::to_value(session.applications().await)?)
        }
        Command::Get { path, as_domain } => run_get(ctx, &path, as_domain).await,
    }
}

async fn run_status(ctx: &CliContext) -> Result<(), CliError> {
    let session = ctx.started().await;
    for domain in Domain::ALL {
        let phase = session.phase(domain).await;
        let profile = profile_json(&session, domain).await?;
        println!("{domain}: {phase:?}");
        if !profile.is_null() {
            println!("{}", serde_json::to_string_pretty(&profile)?);
        }
    }
    println!("jobs: {}", session.jobs().await.len());
    println!("resources: {}", session.resources().await.len());
    Ok(())
}

async fn run_login(ctx: &CliContext, login: LoginCommand) -> Result<(), CliError> {
    let basic = (login.id.is_some() || login.name.is_some() || login.email.is_some()).then(|| BasicProfile {
        id: login.id.unwrap_or_default(),
        name: login.name.unwrap_or_default(),
        email: login.email.unwrap_or_default(),
        ..BasicProfile::default()
    });

    let session = ctx.idle();
    if !session.login(login.domain, &login.token, basic).await {
        return Err(CliError::LoginFailed(login.domain));
    }
    session.settled().await;
    println!("{}: {:?}", login.domain, session.phase(login.domain).await);
    print_json(&profile_json(&session, login.domain).await?)
}

async fn run_jobs(ctx: &CliContext, jobs: JobsCommand) -> Result<(), CliError> {
    let session = ctx.idle();
    session.fetch_jobs().await;
    let query = JobQuery {
        search: jobs.query,
        job_type: jobs.job_type,
        location: jobs.location,
        page: jobs.page,
        per_page: jobs.per_page,
    };
    let page = query.apply(&session.jobs().await);
    eprintln!("page {} of {} ({} matching)", page.page, page.total_pages, page.total);
    print_json(&serde_json::to_value(page.jobs)?)
}

async fn run_get(ctx: &CliContext, path: &str, as_domain: Option<Domain>) -> Result<(), CliError> {
    let payload = match as_domain {
        None => ctx.http.get_public(path).await?,
        Some(domain) => {
            let token = ctx.store.load(domain.storage_key())?.ok_or(CliError::NotSignedIn(domain))?;
            ctx.http.get_authorized(path, &token).await?
        }
    };
    print_json(&payload)
}

async fn profile_json(session: &SessionContext, domain: Domain) -> Result<Value, CliError> {
    match domain {
        Domain::User => domain_profile(session.user()).await,
        Domain::Company => domain_profile(session.company()).await,
        Domain::Admin => domain_profile(session.admin()).await,
    }
}

async fn domain_profile<P: DomainProfile + Serialize>(domain: &AuthDomain<P>) -> Result<Value, CliError> {
    Ok(serde_json::to_value(domain.profile().await)?)
}

fn print_json(value: &Value) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(value)?;
    println!("{rendered}");
    Ok(())
}
