//! Executes controller effects on tokio tasks and feeds results back.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::debug;

use crate::config::SessionSetup;
use crate::error::{ConfigError, FetchError};
use crate::fetch;
use crate::model::ClusterSnapshot;
use crate::refresh::{Controller, Effect, FetchRequest, Generation, Message};

pub const MESSAGE_CAPACITY: usize = 64;

/// Produces snapshots for fetch requests issued by the controller.
pub trait SnapshotSource: Send + Sync + 'static {
    fn fetch(
        &self,
        request: FetchRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<ClusterSnapshot, FetchError>> + Send;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSnapshotSource;

impl SnapshotSource for HttpSnapshotSource {
    fn fetch(
        &self,
        request: FetchRequest,
        cancel: CancellationToken,
    ) -> impl Future<Output = Result<ClusterSnapshot, FetchError>> + Send {
        async move {
            fetch::fetch(
                &cancel,
                &request.cluster.endpoint,
                request.credentials,
                request.http,
            )
            .await
        }
    }
}

/// Background task tied to a generation; dropping it cancels the task.
struct TaskHandle {
    generation: Generation,
    _guard: DropGuard,
}

pub struct RefreshRuntime<S> {
    source: Arc<S>,
    tx: mpsc::Sender<Message>,
    fetch: Option<TaskHandle>,
    tick: Option<TaskHandle>,
}

impl<S: SnapshotSource> RefreshRuntime<S> {
    pub fn new(source: Arc<S>, tx: mpsc::Sender<Message>) -> Self {
        Self {
            source,
            tx,
            fetch: None,
            tick: None,
        }
    }

    pub fn fetch_generation(&self) -> Option<Generation> {
        self.fetch.as_ref().map(|handle| handle.generation)
    }

    pub fn tick_generation(&self) -> Option<Generation> {
        self.tick.as_ref().map(|handle| handle.generation)
    }

    /// Releases handles whose task has reported back.
    pub fn observe(&mut self, message: &Message) {
        match message {
            Message::FetchSucceeded { generation, .. } | Message::FetchFailed { generation, .. } => {
                if self.fetch_generation() == Some(*generation) {
                    self.fetch = None;
                }
            }
            Message::AutorefreshTick { generation } => {
                if self.tick_generation() == Some(*generation) {
                    self.tick = None;
                }
            }
            _ => {}
        }
    }

    /// Returns true once a [`Effect::Quit`] has been applied.
    pub fn apply(&mut self, effects: Vec<Effect>) -> bool {
        let mut quit = false;
        for effect in effects {
            match effect {
                Effect::StartFetch(request) => self.start_fetch(request),
                Effect::CancelFetch(generation) => {
                    if self.fetch_generation() == Some(generation) {
                        self.fetch = None;
                    }
                }
                Effect::ScheduleTick { generation, after } => self.schedule_tick(generation, after),
                Effect::CancelTick(generation) => {
                    if self.tick_generation() == Some(generation) {
                        self.tick = None;
                    }
                }
                Effect::Quit => {
                    self.fetch = None;
                    self.tick = None;
                    quit = true;
                }
            }
        }
        quit
    }

    fn start_fetch(&mut self, request: FetchRequest) {
        let generation = request.generation;
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let source = Arc::clone(&self.source);
        let tx = self.tx.clone();
        tokio::spawn(async move {
            let message = match source.fetch(request, task_cancel).await {
                Ok(snapshot) => Message::FetchSucceeded {
                    generation,
                    snapshot: Arc::new(snapshot),
                },
                Err(error) => Message::FetchFailed { generation, error },
            };
            if tx.send(message).await.is_err() {
                debug!("fetch_result_dropped: {}", generation.value());
            }
        });
        self.fetch = Some(TaskHandle {
            generation,
            _guard: cancel.drop_guard(),
        });
    }

    fn schedule_tick(&mut self, generation: Generation, after: Duration) {
        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let tx = self.tx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = task_cancel.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let _ = tx.send(Message::AutorefreshTick { generation }).await;
                }
            }
        });
        self.tick = Some(TaskHandle {
            generation,
            _guard: cancel.drop_guard(),
        });
    }
}

/// Controller, runtime and message channel driven by one owner.
pub struct RefreshLoop<S> {
    controller: Controller,
    runtime: RefreshRuntime<S>,
    rx: mpsc::Receiver<Message>,
}

impl<S: SnapshotSource> RefreshLoop<S> {
    pub fn new(source: Arc<S>) -> Self {
        let (tx, rx) = mpsc::channel(MESSAGE_CAPACITY);
        Self {
            controller: Controller::new(),
            runtime: RefreshRuntime::new(source, tx),
            rx,
        }
    }

    pub fn controller(&self) -> &Controller {
        &self.controller
    }

    pub fn runtime(&self) -> &RefreshRuntime<S> {
        &self.runtime
    }

    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Returns true when the loop should stop.
    pub fn dispatch(&mut self, message: Message) -> bool {
        self.runtime.observe(&message);
        let effects = self.controller.update(message);
        self.runtime.apply(effects)
    }

    pub fn initialize(&mut self, setup: Result<SessionSetup, ConfigError>) -> bool {
        self.dispatch(Message::Initialize(setup))
    }

    pub fn request_manual_refresh(&mut self) -> bool {
        self.dispatch(Message::ManualRefresh)
    }

    pub fn set_autorefresh_interval(&mut self, seconds: u64) -> bool {
        self.dispatch(Message::SetAutorefreshInterval(seconds))
    }

    pub fn switch_cluster(&mut self, alias: &str) -> bool {
        self.dispatch(Message::SwitchCluster(alias.to_string()))
    }

    pub fn shutdown(&mut self) -> bool {
        self.dispatch(Message::Shutdown)
    }
}
