//! Promptwire CLI entry point.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{bail, Context};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use promptwire_driver::{
    CdpClient, CdpTargetLocator, DriverConfig, PromptDriver, SendOptions, TargetLocator,
};

mod cli;

use cli::{Cli, Commands};

/// Fixed sample prompts for `send --random`.
const SAMPLE_PROMPTS: &[&str] = &[
    "Explain the borrow checker in two sentences.",
    "What is the difference between a process and a thread?",
    "Summarize the CAP theorem.",
    "Write a haiku about asynchronous runtimes.",
    "Why do WebSockets need a ping frame?",
    "What makes a hash function cryptographic?",
];

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => DriverConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => DriverConfig::default(),
    };
    if let Some(endpoint) = cli.endpoint {
        config.endpoint = endpoint;
    }

    match cli.command {
        Commands::Status => status(config).await,
        Commands::Targets => targets(config).await,
        Commands::Send {
            text,
            random,
            timeout_secs,
        } => send(config, text, random, timeout_secs).await,
    }
}

async fn status(config: DriverConfig) -> anyhow::Result<()> {
    let locator = CdpTargetLocator::new(config);
    match locator.resolve().await {
        Ok(Some(target)) => {
            println!("available: {} (target {})", target.url, target.target_id);
        }
        Ok(None) => {
            println!("unavailable: no open tab matches the configured chat hosts");
        }
        Err(e) => {
            println!("unavailable: {}", e);
        }
    }
    Ok(())
}

async fn targets(config: DriverConfig) -> anyhow::Result<()> {
    let client = CdpClient::connect(&config.endpoint)
        .await
        .context("connecting to the browser")?;
    let pages = client.list_pages().await.context("listing pages")?;

    if pages.is_empty() {
        println!("no open targets");
        return Ok(());
    }
    for page in pages {
        let mark = if page.page_type == "page" && config.url_allowed(&page.url) {
            '*'
        } else {
            ' '
        };
        println!("{} [{}] {}  {}", mark, page.page_type, page.id, page.url);
    }
    Ok(())
}

async fn send(
    config: DriverConfig,
    text: Option<String>,
    random: bool,
    timeout_secs: Option<u64>,
) -> anyhow::Result<()> {
    let prompt = match (text, random) {
        (Some(text), false) => text,
        (None, true) => {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .subsec_nanos() as usize;
            let picked = SAMPLE_PROMPTS[nanos % SAMPLE_PROMPTS.len()];
            info!("sample prompt: {}", picked);
            picked.to_string()
        }
        (Some(_), true) => bail!("provide either prompt text or --random, not both"),
        (None, false) => bail!("provide prompt text or pass --random"),
    };

    let timeout = Duration::from_secs(timeout_secs.unwrap_or(config.default_timeout_secs));

    let driver = PromptDriver::connect(config)
        .await
        .context("connecting to the browser")?;
    driver.initialize();

    if !driver.is_available().await {
        bail!("no open tab matches the configured chat hosts; open the chat site first");
    }

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let options = SendOptions::default()
        .with_timeout(timeout)
        .with_progress(|stage| eprintln!("· {}", stage))
        .with_cancel(cancel);

    let answer = driver.send_prompt(&prompt, options).await?;
    println!("{}", answer);
    Ok(())
}
