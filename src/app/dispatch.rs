use crate::cli::commands::{Cli, Commands};
use anyhow::{Context, Result, bail};
use lextro::api::{AnswerType, ExplanationLanguage, SESSION_COOKIE};
use lextro::config::Config;
use lextro::extension::extractor::{extract_code_and_examples, extract_problem_data};
use lextro::extension::{
    Cookie, ExtensionRuntime, MemoryCookieJar, PageSnapshot, PanelContent, PanelController,
    PanelState, SubmitOptions,
};
use std::path::Path;
use std::sync::Arc;

pub async fn dispatch(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Commands::Serve { host, port } => {
            let host = host.unwrap_or_else(|| config.server.host.clone());
            let port = port.unwrap_or(config.server.port);
            lextro::backend::run_server(&host, port, &config).await
        }
        Commands::Extract { file, url, code } => {
            let page = read_page(&file, url)?;
            let json = if code {
                serde_json::to_string_pretty(&extract_code_and_examples(&page))?
            } else {
                serde_json::to_string_pretty(&extract_problem_data(&page))?
            };
            println!("{json}");
            Ok(())
        }
        Commands::Ask {
            file,
            url,
            token,
            answer_type,
            language,
        } => {
            let page = read_page(&file, url)?;
            run_ask(&config, page, &token, answer_type, language).await
        }
        Commands::History { token } => run_history(&config, &token).await,
        Commands::Config => {
            println!("# {}", config.config_path.display());
            println!("{}", toml::to_string_pretty(&redacted(&config))?);
            Ok(())
        }
    }
}

/// Copy of `config` with the API key and session tokens masked.
fn redacted(config: &Config) -> Config {
    let mut shown = config.clone();
    if shown.generation.api_key.is_some() {
        shown.generation.api_key = Some("***".into());
    }
    for session in &mut shown.identity.sessions {
        session.token = "***".into();
    }
    shown
}

fn read_page(file: &Path, url: String) -> Result<PageSnapshot> {
    let html = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    Ok(PageSnapshot::new(url, html))
}

/// Start the extension runtime signed in with `token` on the backend host.
fn start_runtime(config: &Config, token: &str) -> Result<ExtensionRuntime> {
    let host = url::Url::parse(&config.extension.backend_url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .context("extension.backend_url has no host")?;
    let cookies = Arc::new(MemoryCookieJar::new());
    cookies.set(Cookie::new(SESSION_COOKIE, host, token));
    ExtensionRuntime::start(&config.extension, cookies)
}

/// Wait until the panel leaves its in-flight states.
async fn settle(panel: &PanelController, state: PanelState) -> PanelState {
    if state.is_terminal() {
        return state;
    }
    let mut updates = panel.subscribe();
    loop {
        let current = updates.borrow_and_update().clone();
        if current.is_terminal() {
            return current;
        }
        if updates.changed().await.is_err() {
            return panel.state();
        }
    }
}

async fn run_ask(
    config: &Config,
    page: PageSnapshot,
    token: &str,
    answer_type: AnswerType,
    explanation_language: ExplanationLanguage,
) -> Result<()> {
    let runtime = start_runtime(config, token)?;
    runtime.open_page(page).await?;

    let panel = Arc::clone(&runtime.panel);
    let state = settle(&panel, panel.request_problem_data().await).await;
    if let PanelState::Failed { error, .. } = state {
        runtime.shutdown();
        bail!("Could not read the problem page: {error}");
    }

    let state = panel
        .submit_query(SubmitOptions {
            answer_type,
            explanation_language,
        })
        .await;
    runtime.shutdown();

    match state {
        PanelState::Succeeded(PanelContent::Explanation(record)) => {
            println!("{} ({}, {})\n", record.problem_title, record.difficulty, record.language);
            println!("{}", record.explanation);
            Ok(())
        }
        PanelState::Failed { error, .. } => bail!("{error}"),
        other => bail!("Unexpected panel state: {other:?}"),
    }
}

async fn run_history(config: &Config, token: &str) -> Result<()> {
    let runtime = start_runtime(config, token)?;
    let state = runtime.panel.list_queries().await;
    runtime.shutdown();

    match state {
        PanelState::Succeeded(PanelContent::History(records)) => {
            if records.is_empty() {
                println!("No queries yet.");
            }
            for record in records {
                println!(
                    "{}  {}  [{} / {}]  {}",
                    record.created_at,
                    record.id,
                    record.answer_type,
                    record.explanation_language,
                    record.problem_title
                );
            }
            Ok(())
        }
        PanelState::Failed { error, .. } => bail!("{error}"),
        other => bail!("Unexpected panel state: {other:?}"),
    }
}
