use bsky_sdk::agent::config::{Config as AgentConfig, FileStore};
use bsky_sdk::BskyAgent;
use clap::Parser;
use color_eyre::{eyre, Result};
use skyline::app::App;
use skyline::backend::types::{Account, Identity};
use skyline::backend::{BskySource, Store};
use skyline::config::Config;
use skyline::utils::{get_config_dir, initialize_panic_handler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::{env, fs};

const PASSWORD_VAR: &str = "SKYLINE_PASSWORD";

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
/// Multi-column home timeline for Bluesky.
struct Args {
    /// Path to the configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Maximum number of columns to display.
    /// The number of columns will be determined by the terminal width.
    #[arg(short, long)]
    num_columns: Option<usize>,
    /// Path to the saved session.
    #[arg(short, long)]
    session: Option<PathBuf>,
    /// Sign in with this handle or email. The password is read from SKYLINE_PASSWORD.
    #[arg(short, long)]
    login: Option<String>,
}

impl Args {
    fn config_path(&self, config_dir: &Path) -> PathBuf {
        self.config
            .clone()
            .unwrap_or_else(|| config_dir.join("skyline.config.toml"))
    }
}

fn init_logger() {
    let mut builder = env_logger::Builder::from_default_env();
    if env::var("RUST_LOG").is_err() {
        builder.filter_level(log::LevelFilter::Off);
    }
    builder.init();
}

async fn login(identifier: &str, session: &Path) -> Result<BskyAgent> {
    let password = env::var(PASSWORD_VAR)
        .map_err(|_| eyre::eyre!("{PASSWORD_VAR} must be set to sign in"))?;
    let agent = BskyAgent::builder().build().await?;
    agent.login(identifier, password).await?;
    agent.to_config().await.save(&FileStore::new(session)).await?;
    log::info!("signed in as {identifier}");
    Ok(agent)
}

async fn resume(session: &Path) -> Option<BskyAgent> {
    if !session.exists() {
        log::info!("no saved session at {session:?}");
        return None;
    }
    let config = match AgentConfig::load(&FileStore::new(session)).await {
        Ok(config) => config,
        Err(e) => {
            log::warn!("failed to load session: {e}");
            return None;
        }
    };
    match BskyAgent::builder().config(config).build().await {
        Ok(agent) => Some(agent),
        Err(e) => {
            log::warn!("failed to resume session: {e}");
            None
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config_dir = get_config_dir()?;
    fs::create_dir_all(&config_dir)?;
    let config_path = args.config_path(&config_dir);
    let mut config = if config_path.exists() {
        toml::from_str(&fs::read_to_string(&config_path)?)?
    } else {
        Config::default()
    };
    config.set_default_keybindings();
    if let Some(num_columns) = args.num_columns {
        config.num_columns = Some(num_columns);
    }
    if let Some(session) = args.session {
        config.session = Some(session);
    }

    init_logger();

    initialize_panic_handler()?;

    let session = config
        .session
        .clone()
        .unwrap_or_else(|| config_dir.join("session.json"));
    let agent = match &args.login {
        Some(identifier) => Some(login(identifier, &session).await?),
        None => resume(&session).await,
    };
    let account = match &agent {
        Some(agent) => agent.get_session().await.map(|output| Account {
            did: output.did.as_str().to_string(),
            handle: output.handle.as_str().to_string(),
        }),
        None => None,
    };
    let agent = agent.map(Arc::new);

    let columns_path = config_dir.join("columns.json");
    let store = Store::new(
        Arc::new(BskySource::new(agent.clone())),
        Store::load_columns(&columns_path)?,
        config.timeline.clone(),
    );
    App::new(config, store, Identity::new(account), columns_path)
        .run()
        .await?;

    // The agent may have refreshed its tokens.
    if let Some(agent) = agent {
        agent.to_config().await.save(&FileStore::new(&session)).await?;
    }
    Ok(())
}
