//! Refresh state machine.
//!
//! [`Controller::update`] consumes one [`Message`] at a time and returns the
//! [`Effect`]s the runtime must carry out. Every fetch and every autorefresh
//! timer carries a [`Generation`]; results whose generation is no longer the
//! current one are dropped without touching the published state.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::config::{ClusterEndpointConfig, HttpConfig, SessionSetup};
use crate::credentials::{self, Credentials};
use crate::error::{ConfigError, DashboardError, FetchError};
use crate::model::ClusterSnapshot;

pub const AUTOREFRESH_STEPS: [u64; 8] = [0, 1, 5, 10, 30, 60, 300, 600];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl Generation {
    pub fn value(self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Uninitialized,
    Loading,
    Ready,
    Refreshing,
    Error,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshState {
    pub phase: Phase,
    pub last_refresh: Option<DateTime<Utc>>,
    pub autorefresh_interval_secs: u64,
    pub has_error: bool,
}

impl RefreshState {
    pub fn is_fetching(&self) -> bool {
        matches!(self.phase, Phase::Loading | Phase::Refreshing)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchRequest {
    pub generation: Generation,
    pub cluster: ClusterEndpointConfig,
    pub credentials: Credentials,
    pub http: HttpConfig,
}

#[derive(Debug, Clone)]
pub enum Message {
    Initialize(Result<SessionSetup, ConfigError>),
    ManualRefresh,
    SetAutorefreshInterval(u64),
    SwitchCluster(String),
    AutorefreshTick {
        generation: Generation,
    },
    FetchSucceeded {
        generation: Generation,
        snapshot: Arc<ClusterSnapshot>,
    },
    FetchFailed {
        generation: Generation,
        error: FetchError,
    },
    Shutdown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    StartFetch(FetchRequest),
    CancelFetch(Generation),
    ScheduleTick { generation: Generation, after: Duration },
    CancelTick(Generation),
    Quit,
}

#[derive(Debug, Default)]
pub struct Controller {
    state: RefreshState,
    clusters: Vec<ClusterEndpointConfig>,
    selected: Option<String>,
    default_credentials: Credentials,
    http: HttpConfig,
    snapshot: Option<Arc<ClusterSnapshot>>,
    last_error: Option<DashboardError>,
    generation: Generation,
    in_flight: Option<Generation>,
    pending_tick: Option<Generation>,
    shut_down: bool,
}

impl Controller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &RefreshState {
        &self.state
    }

    pub fn snapshot(&self) -> Option<&Arc<ClusterSnapshot>> {
        self.snapshot.as_ref()
    }

    pub fn clusters(&self) -> &[ClusterEndpointConfig] {
        &self.clusters
    }

    pub fn selected_alias(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn selected_cluster(&self) -> Option<&ClusterEndpointConfig> {
        let alias = self.selected.as_deref()?;
        self.clusters.iter().find(|cluster| cluster.alias == alias)
    }

    pub fn last_error(&self) -> Option<&DashboardError> {
        self.last_error.as_ref()
    }

    pub fn in_flight(&self) -> Option<Generation> {
        self.in_flight
    }

    pub fn pending_tick(&self) -> Option<Generation> {
        self.pending_tick
    }

    pub fn is_shut_down(&self) -> bool {
        self.shut_down
    }

    /// Nothing to show and nothing loading: the user has to pick a cluster.
    pub fn needs_cluster_selection(&self) -> bool {
        self.state.phase == Phase::Error && self.snapshot.is_none()
    }

    pub fn update(&mut self, message: Message) -> Vec<Effect> {
        if self.shut_down {
            return Vec::new();
        }
        match message {
            Message::Initialize(setup) => self.initialize(setup),
            Message::ManualRefresh => self.manual_refresh(),
            Message::SetAutorefreshInterval(seconds) => self.set_autorefresh_interval(seconds),
            Message::SwitchCluster(alias) => self.switch_cluster(alias),
            Message::AutorefreshTick { generation } => self.autorefresh_tick(generation),
            Message::FetchSucceeded {
                generation,
                snapshot,
            } => self.fetch_succeeded(generation, snapshot),
            Message::FetchFailed { generation, error } => self.fetch_failed(generation, error),
            Message::Shutdown => self.shutdown(),
        }
    }

    fn initialize(&mut self, setup: Result<SessionSetup, ConfigError>) -> Vec<Effect> {
        if self.state.phase != Phase::Uninitialized {
            return Vec::new();
        }
        let setup = match setup {
            Ok(setup) => setup,
            Err(err) => {
                warn!("startup_config_error: {err}");
                self.fail(err.into());
                return Vec::new();
            }
        };

        self.clusters = setup.clusters;
        self.selected = setup.selected;
        self.default_credentials = setup.default_credentials;
        self.http = setup.http;
        self.state.autorefresh_interval_secs = setup.refresh_interval_secs;

        if self.selected.is_none() {
            self.fail(ConfigError::NoClusterSelected.into());
            return Vec::new();
        }
        self.state.phase = Phase::Loading;
        self.start_fetch()
    }

    fn manual_refresh(&mut self) -> Vec<Effect> {
        if self.state.autorefresh_interval_secs != 0
            || self.in_flight.is_some()
            || self.selected.is_none()
            || !matches!(self.state.phase, Phase::Ready | Phase::Error)
        {
            return Vec::new();
        }
        self.state.phase = Phase::Refreshing;
        self.start_fetch()
    }

    fn set_autorefresh_interval(&mut self, seconds: u64) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(tick) = self.pending_tick.take() {
            effects.push(Effect::CancelTick(tick));
        }
        self.state.autorefresh_interval_secs = seconds;
        debug!("autorefresh_interval: {}", interval_label(seconds));
        if seconds > 0 && self.selected.is_some() && self.state.phase != Phase::Uninitialized {
            effects.push(self.schedule_tick());
        }
        effects
    }

    fn switch_cluster(&mut self, alias: String) -> Vec<Effect> {
        if !self.clusters.iter().any(|cluster| cluster.alias == alias) {
            warn!("switch_unknown_cluster: {alias}");
            self.last_error = Some(ConfigError::UnknownCluster(alias).into());
            return Vec::new();
        }
        info!("cluster_switch: {alias}");

        let mut effects = Vec::new();
        if let Some(generation) = self.in_flight.take() {
            effects.push(Effect::CancelFetch(generation));
        }
        if let Some(tick) = self.pending_tick.take() {
            effects.push(Effect::CancelTick(tick));
        }
        self.selected = Some(alias);
        self.snapshot = None;
        self.last_error = None;
        self.state.last_refresh = None;
        self.state.has_error = false;
        self.state.phase = Phase::Refreshing;
        effects.extend(self.start_fetch());
        effects
    }

    fn autorefresh_tick(&mut self, generation: Generation) -> Vec<Effect> {
        if self.pending_tick != Some(generation) {
            debug!("stale_tick: {}", generation.value());
            return Vec::new();
        }
        self.pending_tick = None;
        // The running fetch schedules the next tick when it completes.
        if self.in_flight.is_some() || self.state.autorefresh_interval_secs == 0 {
            return Vec::new();
        }
        self.state.phase = Phase::Refreshing;
        self.start_fetch()
    }

    fn fetch_succeeded(
        &mut self,
        generation: Generation,
        snapshot: Arc<ClusterSnapshot>,
    ) -> Vec<Effect> {
        if self.in_flight != Some(generation) {
            debug!("stale_fetch_result: {}", generation.value());
            return Vec::new();
        }
        self.in_flight = None;
        self.snapshot = Some(snapshot);
        self.last_error = None;
        self.state.has_error = false;
        self.state.last_refresh = Some(Utc::now());
        self.state.phase = Phase::Ready;
        self.schedule_next_tick()
    }

    fn fetch_failed(&mut self, generation: Generation, error: FetchError) -> Vec<Effect> {
        if self.in_flight != Some(generation) {
            debug!("stale_fetch_result: {}", generation.value());
            return Vec::new();
        }
        self.in_flight = None;
        if error.is_cancelled() {
            self.state.phase = self.idle_phase();
            return self.schedule_next_tick();
        }
        warn!("fetch_failed: {error}");
        self.fail(error.into());
        self.schedule_next_tick()
    }

    fn shutdown(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(generation) = self.in_flight.take() {
            effects.push(Effect::CancelFetch(generation));
        }
        if let Some(tick) = self.pending_tick.take() {
            effects.push(Effect::CancelTick(tick));
        }
        effects.push(Effect::Quit);
        self.shut_down = true;
        effects
    }

    fn start_fetch(&mut self) -> Vec<Effect> {
        let mut effects = Vec::new();
        if let Some(previous) = self.in_flight.take() {
            effects.push(Effect::CancelFetch(previous));
        }
        let Some(cluster) = self.selected_cluster().cloned() else {
            self.fail(ConfigError::NoClusterSelected.into());
            return effects;
        };
        let credentials = match credentials::resolve(&cluster, &self.default_credentials) {
            Ok(credentials) => credentials,
            Err(err) => {
                warn!("credentials_error: {err}");
                self.fail(err.into());
                return effects;
            }
        };

        let generation = self.next_generation();
        self.in_flight = Some(generation);
        debug!("fetch_issued: {} {}", generation.value(), cluster.alias);
        effects.push(Effect::StartFetch(FetchRequest {
            generation,
            cluster,
            credentials,
            http: self.http,
        }));
        effects
    }

    fn schedule_next_tick(&mut self) -> Vec<Effect> {
        if self.state.autorefresh_interval_secs == 0
            || self.pending_tick.is_some()
            || self.selected.is_none()
        {
            return Vec::new();
        }
        vec![self.schedule_tick()]
    }

    fn schedule_tick(&mut self) -> Effect {
        let generation = self.next_generation();
        self.pending_tick = Some(generation);
        Effect::ScheduleTick {
            generation,
            after: Duration::from_secs(self.state.autorefresh_interval_secs),
        }
    }

    fn fail(&mut self, error: DashboardError) {
        self.last_error = Some(error);
        self.state.has_error = true;
        self.state.phase = self.idle_phase();
    }

    fn idle_phase(&self) -> Phase {
        if self.snapshot.is_some() {
            Phase::Ready
        } else {
            Phase::Error
        }
    }

    fn next_generation(&mut self) -> Generation {
        self.generation = Generation(self.generation.0 + 1);
        self.generation
    }
}

pub fn next_autorefresh_interval(current: u64) -> u64 {
    match AUTOREFRESH_STEPS.iter().position(|step| *step == current) {
        Some(index) => AUTOREFRESH_STEPS[(index + 1) % AUTOREFRESH_STEPS.len()],
        None => 5,
    }
}

pub fn interval_label(seconds: u64) -> String {
    match seconds {
        0 => "OFF".to_string(),
        s if s < 60 => format!("{s}s"),
        s => format!("{}m", s / 60),
    }
}
