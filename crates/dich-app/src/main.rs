use std::future::Future;
use std::sync::Arc;

use clap::Parser;
use dich_config::Config;
use dich_core::language::{LanguageTable, is_auto};
use dich_secret::{FileSecretStore, SecretStore};
use dich_types::{AppEvent, TranslationRequest};
use kanal::AsyncSender;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

mod cli;
mod console;
mod controller;
mod events;
mod pipeline;
mod profile;
mod state;
mod window;

#[cfg(test)]
mod tests;

use self::cli::{Cli, Command, KeyAction, ProfileAction, UpdateAction};
use self::controller::{AppController, ChannelSet};
use self::events::ocr_image::handle_image_file;
use self::events::trigger_capture::handle_capture_trigger;
use self::events::update::check_and_fetch;
use self::profile::ProfileStore;
use self::state::{AppState, Frontend, Services};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = match cli.profile.as_deref() {
        Some(name) => ProfileStore::in_user_config()?.load(name)?,
        None => Config::new(),
    };
    init_tracing(config.log_json);

    match cli.command.unwrap_or(Command::Interactive) {
        Command::Interactive => run_interactive(config).await,
        Command::Languages => {
            console::print_languages(&LanguageTable::builtin());
            Ok(())
        }
        Command::Translate { text, to, from } => {
            let text = text.join(" ");
            one_shot(config, move |state, tx| translate_once(state, tx, text, to, from)).await
        }
        Command::Image { path, mode, to } => {
            let mode = mode.map(Into::into).unwrap_or(config.ocr.default_mode);
            one_shot(config, move |state, tx| async move {
                if let Some(to) = to {
                    state.session.use_target(&to).await?;
                }
                handle_image_file(state, path, mode, tx).await
            })
            .await
        }
        Command::Capture { mode, to } => {
            let mode = mode.map(Into::into).unwrap_or(config.ocr.default_mode);
            one_shot(config, move |state, tx| async move {
                if let Some(to) = to {
                    state.session.use_target(&to).await?;
                }
                handle_capture_trigger(state, mode, tx).await
            })
            .await
        }
        Command::Update { action } => {
            one_shot(config, move |state, tx| async move {
                match action {
                    UpdateAction::Check => {
                        state.updates.check_for_updates().await;
                        Ok(())
                    }
                    UpdateAction::Download => check_and_fetch(&state, &tx, false).await,
                    UpdateAction::Install => check_and_fetch(&state, &tx, true).await,
                }
            })
            .await
        }
        Command::Key { action } => manage_key(action),
        Command::Profile { action } => manage_profiles(action, &config),
    }
}

/// Human-readable logs on stderr, JSON lines when `LOG_FORMAT=json`
fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.with_ansi(atty::is(atty::Stream::Stderr)).init();
    }
}

async fn run_interactive(config: Config) -> anyhow::Result<()> {
    let channels = ChannelSet::new();
    let services = Services::production(&config, Frontend::Interactive, &channels.app_to_ui.0)?;
    let state = Arc::new(AppState::new(config, services, channels.app_to_ui.0.clone()));

    if state.secrets.get().is_none() {
        tracing::warn!("No API key configured; run `dich key set <KEY>` or set GEMINI_API_KEY");
    }

    let controller = AppController::new(state, channels);
    let mut tasks = controller.spawn_tasks().await;

    let interrupted = tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown requested");
            true
        }
        Some(result) = tasks.join_next() => {
            match result {
                Ok(Ok(())) => tracing::info!("Session ended"),
                Ok(Err(e)) => tracing::error!("Task failed: {:#}", e),
                Err(e) => tracing::error!("Task panicked: {}", e),
            }
            false
        }
    };

    controller.shutdown();
    while let Some(result) = tasks.join_next().await {
        if let Ok(Err(e)) = result {
            tracing::warn!("Task ended with error during shutdown: {:#}", e);
        }
    }

    if interrupted {
        // A pending stdin read cannot be cancelled and would keep the runtime alive
        std::process::exit(0);
    }
    Ok(())
}

/// Runs one command against a fresh [`AppState`], printing the events it emits
async fn one_shot<F, Fut>(config: Config, run: F) -> anyhow::Result<()>
where
    F: FnOnce(Arc<AppState>, AsyncSender<AppEvent>) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let (tx, rx) = kanal::bounded_async(256);
    let services = Services::production(&config, Frontend::OneShot, &tx)?;
    let state = Arc::new(AppState::new(config, services, tx.clone()));

    let done = CancellationToken::new();
    let printer = tokio::spawn(console::print_events(
        rx,
        state.session.orchestrator().languages().clone(),
        done.clone(),
    ));

    let result = run(state, tx).await;
    done.cancel();
    printer.await?;
    result
}

/// `--to`/`--from` apply to this call only and are not remembered
async fn translate_once(
    state: Arc<AppState>,
    app_to_ui_tx: AsyncSender<AppEvent>,
    text: String,
    to: Option<String>,
    from: Option<String>,
) -> anyhow::Result<()> {
    let languages = state.session.orchestrator().languages();
    let unknown = to
        .iter()
        .chain(from.iter().filter(|code| !is_auto(code)))
        .find(|code| !languages.contains(code));
    if let Some(code) = unknown {
        anyhow::bail!("Unsupported language: {code}");
    }

    let session = state.session.snapshot().await;
    let request = TranslationRequest::new(text, to.unwrap_or(session.target))
        .with_source(from.unwrap_or(session.source));

    let outcome = state.session.orchestrator().translate(&request).await?;
    let result = outcome.result;
    app_to_ui_tx
        .send(AppEvent::ShowTranslation {
            original: request.text,
            translated: result.translated_text,
            detected_lang: result.detected_lang,
            target_lang: result.target_lang,
        })
        .await?;
    Ok(())
}

fn manage_key(action: KeyAction) -> anyhow::Result<()> {
    let store = FileSecretStore::in_user_config()?;

    match action {
        KeyAction::Set { key } => {
            store.set(&key)?;
            println!("API key saved to {}", store.path().display());
        }
        KeyAction::Clear => {
            store.clear()?;
            println!("API key removed");
        }
        KeyAction::Show => match store.masked() {
            Some(masked) => println!("{masked}"),
            None => println!("No API key stored"),
        },
    }

    if std::env::var_os("GEMINI_API_KEY").is_some() {
        println!("Note: GEMINI_API_KEY is set and takes precedence over the stored key");
    }
    Ok(())
}

fn manage_profiles(action: ProfileAction, config: &Config) -> anyhow::Result<()> {
    let store = ProfileStore::in_user_config()?;

    match action {
        ProfileAction::Init => {
            store.init()?;
            println!("Main profile ready");
        }
        ProfileAction::List => {
            for name in store.list()? {
                println!("{name}");
            }
        }
        ProfileAction::Save { name } => {
            let path = store.save(&name, config)?;
            println!("Saved profile to {}", path.display());
        }
    }
    Ok(())
}
