mod app;
mod ui;

use std::{
    fs::OpenOptions,
    io,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use clap::Parser;
use crossterm::{
    event::EventStream,
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use esmon_core::{
    config::PROGRAM_NAME, ConfigError, EsmonConfig, HttpSnapshotSource, RefreshLoop,
    SessionOverrides, SessionSetup, SnapshotSource,
};
use futures_util::StreamExt;
use ratatui::{backend::CrosstermBackend, Terminal};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::app::{handle_input, Action, App};
use crate::ui::{render_ui, Theme};

const SPINNER_FRAME_MS: u64 = 120;
const LOG_FILE_ENV: &str = "ESMON_LOG_FILE";
const LOG_STDOUT_ENV: &str = "ESMON_LOG_STDOUT";

#[derive(Debug, Parser)]
#[command(name = PROGRAM_NAME, version, about = "Terminal dashboard for Elasticsearch cluster health")]
struct Args {
    /// Alias of a configured cluster to open
    #[arg(short = 'c', long)]
    cluster: Option<String>,
    /// Ad-hoc endpoint URL; takes precedence over --cluster
    #[arg(short = 'e', long)]
    endpoint: Option<String>,
    #[arg(short = 'u', long)]
    username: Option<String>,
    #[arg(short = 'p', long)]
    password: Option<String>,
    /// Skip TLS certificate verification
    #[arg(short = 'k', long)]
    insecure: bool,
    /// Configuration file to use instead of the default locations
    #[arg(short = 'f', long)]
    config: Option<PathBuf>,
    /// Start in compact view
    #[arg(short = 'm', long)]
    compact: bool,
}

impl Args {
    fn overrides(&self) -> SessionOverrides {
        SessionOverrides {
            cluster: self.cluster.clone(),
            endpoint: self.endpoint.clone(),
            username: self.username.clone(),
            password: self.password.clone(),
            insecure: self.insecure.then_some(true),
        }
    }
}

fn load_session(args: &Args) -> Result<SessionSetup, ConfigError> {
    EsmonConfig::load(args.config.as_deref())?.into_session(&args.overrides())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging();

    let setup = load_session(&args);
    if let Err(err) = &setup {
        warn!("startup_error: {err}");
    }
    let mut app = App::new(args.compact);
    let mut refresh = RefreshLoop::new(Arc::new(HttpSnapshotSource));
    refresh.initialize(setup);

    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run(&mut terminal, &mut app, &mut refresh).await;

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    info!("shutdown");
    result
}

async fn run<S: SnapshotSource>(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut App,
    refresh: &mut RefreshLoop<S>,
) -> anyhow::Result<()> {
    let theme = Theme::default();
    let mut events = EventStream::new();
    let mut spinner = tokio::time::interval(Duration::from_millis(SPINNER_FRAME_MS));

    loop {
        app.sync_with(refresh.controller());
        terminal.draw(|frame| render_ui(frame, app, refresh.controller(), &theme))?;
        tokio::select! {
            _ = spinner.tick() => {
                app.advance_spinner();
            }
            Some(message) = refresh.recv() => {
                if refresh.dispatch(message) {
                    break;
                }
            }
            maybe_event = events.next() => {
                match maybe_event {
                    Some(Ok(event)) => {
                        let action = handle_input(event, app, refresh.controller());
                        if apply_action(action, refresh) {
                            break;
                        }
                    }
                    Some(Err(err)) => warn!("input_error: {err}"),
                    None => {
                        refresh.shutdown();
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

/// Returns true when the dashboard should exit.
fn apply_action<S: SnapshotSource>(action: Action, refresh: &mut RefreshLoop<S>) -> bool {
    match action {
        Action::None => false,
        Action::Quit => refresh.shutdown(),
        Action::ManualRefresh => refresh.request_manual_refresh(),
        Action::SetAutorefreshInterval(seconds) => refresh.set_autorefresh_interval(seconds),
        Action::SwitchCluster(alias) => refresh.switch_cluster(&alias),
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if let Some(path) = std::env::var_os(LOG_FILE_ENV) {
        if let Ok(file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            return;
        }
    }
    let stdout_enabled = matches!(
        std::env::var(LOG_STDOUT_ENV).ok().as_deref(),
        Some("1") | Some("true") | Some("TRUE") | Some("yes") | Some("YES")
    );
    if stdout_enabled {
        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    } else {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::sink)
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use esmon_core::Phase;

    #[test]
    fn endpoint_arguments_become_session_overrides() {
        let args = Args::try_parse_from([
            "esmon",
            "-e",
            "https://es.example:9200",
            "-u",
            "admin",
            "-p",
            "secret",
            "-k",
        ])
        .expect("args");
        let overrides = args.overrides();
        assert_eq!(overrides.endpoint.as_deref(), Some("https://es.example:9200"));
        assert_eq!(overrides.insecure, Some(true));
        assert!(!args.compact);
    }

    #[test]
    fn insecure_flag_absent_keeps_config_value() {
        let args = Args::try_parse_from(["esmon", "-c", "prod", "-m"]).expect("args");
        assert_eq!(args.overrides().insecure, None);
        assert!(args.compact);
    }

    #[test]
    fn endpoint_without_credentials_is_rejected() {
        let args = Args::try_parse_from(["esmon", "-e", "https://es.example:9200"]).expect("args");
        let err = args.overrides().validate().expect_err("missing credentials");
        assert!(matches!(err, ConfigError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn quit_action_shuts_the_loop_down() {
        let mut refresh = RefreshLoop::new(Arc::new(HttpSnapshotSource));
        refresh.initialize(Err(ConfigError::NoClusterSelected));
        assert_eq!(refresh.controller().state().phase, Phase::Error);

        assert!(!apply_action(Action::None, &mut refresh));
        assert!(apply_action(Action::Quit, &mut refresh));
        assert!(refresh.controller().is_shut_down());
    }
}
