pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod logging;
pub mod model;
pub mod providers;
pub mod render;
pub mod repl;
pub mod session;

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Client;
use std::io;
use tracing::info;

use cli::Cli;
use config::Config;
use context::build_file_context;
use render::MarkdownRenderer;
use repl::run_repl;
use session::{ChatSession, HttpChatBackend};

pub async fn run() -> Result<()> {
    dotenvy::dotenv().ok();
    let _log_guard = logging::init();

    let cli = Cli::parse();
    let cfg = Config::from_env();
    info!(
        model = %cfg.model,
        api_base_url = %cfg.api_base_url,
        api_key_present = cfg.api_key.is_some(),
        file_count = cli.files.len(),
        "loaded runtime configuration"
    );

    let file_context = build_file_context(&cli.files)?;
    info!(context_len = file_context.len(), "built file context");

    let client = Client::builder()
        .build()
        .context("Failed to initialize HTTP client")?;
    let mut session = ChatSession::new(HttpChatBackend::new(client, cfg));
    let renderer = MarkdownRenderer::new();

    let mut input = io::stdin().lock();
    let mut out = io::stdout().lock();
    run_repl(
        &mut session,
        cli.system_prompt(),
        file_context,
        &renderer,
        &mut input,
        &mut out,
    )
    .await
}
