use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use esmon_core::refresh::{next_autorefresh_interval, Controller, Phase};

const SPINNER_FRAMES: [&str; 10] = ["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    ShardAllocation,
    RelocatingShards,
    Nodes,
    Indices,
    Clusters,
}

impl Screen {
    pub const ALL: [Screen; 5] = [
        Screen::ShardAllocation,
        Screen::RelocatingShards,
        Screen::Nodes,
        Screen::Indices,
        Screen::Clusters,
    ];

    pub fn title(self) -> &'static str {
        match self {
            Screen::ShardAllocation => "Shard allocation",
            Screen::RelocatingShards => "Relocating shards",
            Screen::Nodes => "Node overview",
            Screen::Indices => "Index overview",
            Screen::Clusters => "Clusters",
        }
    }

    pub fn key(self) -> char {
        match self {
            Screen::ShardAllocation => 's',
            Screen::RelocatingShards => 'r',
            Screen::Nodes => 'n',
            Screen::Indices => 'i',
            Screen::Clusters => 'c',
        }
    }

    fn from_key(key: char) -> Option<Self> {
        Screen::ALL.into_iter().find(|screen| screen.key() == key)
    }
}

/// Command for the refresh loop produced by a key press.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    None,
    Quit,
    ManualRefresh,
    SetAutorefreshInterval(u64),
    SwitchCluster(String),
}

pub struct App {
    pub screen: Screen,
    pub compact: bool,
    pub scroll: u16,
    pub cluster_cursor: usize,
    spinner_frame: usize,
    forced_selection: bool,
}

impl App {
    pub fn new(compact: bool) -> Self {
        Self {
            screen: Screen::ShardAllocation,
            compact,
            scroll: 0,
            cluster_cursor: 0,
            spinner_frame: 0,
            forced_selection: false,
        }
    }

    pub fn spinner(&self) -> &'static str {
        SPINNER_FRAMES[self.spinner_frame % SPINNER_FRAMES.len()]
    }

    pub fn advance_spinner(&mut self) {
        self.spinner_frame = self.spinner_frame.wrapping_add(1);
    }

    /// Moves to the cluster list once when there is nothing else to show.
    pub fn sync_with(&mut self, controller: &Controller) {
        if controller.needs_cluster_selection() {
            if !self.forced_selection {
                self.forced_selection = true;
                self.compact = false;
                self.select_screen(Screen::Clusters);
                if let Some(alias) = controller.selected_alias() {
                    self.cluster_cursor = controller
                        .clusters()
                        .iter()
                        .position(|cluster| cluster.alias == alias)
                        .unwrap_or(0);
                }
            }
        } else if controller.snapshot().is_some() {
            self.forced_selection = false;
        }
        let last_row = row_count(self.screen, controller).saturating_sub(1);
        self.scroll = self.scroll.min(u16::try_from(last_row).unwrap_or(u16::MAX));
        let count = controller.clusters().len();
        if count == 0 {
            self.cluster_cursor = 0;
        } else if self.cluster_cursor >= count {
            self.cluster_cursor = count - 1;
        }
    }

    fn select_screen(&mut self, screen: Screen) {
        self.screen = screen;
        self.scroll = 0;
    }

    fn move_cursor(&mut self, delta: isize, controller: &Controller) {
        if self.screen == Screen::Clusters {
            let count = controller.clusters().len();
            if count == 0 {
                return;
            }
            let next = self.cluster_cursor as isize + delta;
            self.cluster_cursor = next.clamp(0, count as isize - 1) as usize;
        } else if delta > 0 {
            let last_row = row_count(self.screen, controller).saturating_sub(1);
            if usize::from(self.scroll) < last_row {
                self.scroll += 1;
            }
        } else {
            self.scroll = self.scroll.saturating_sub(1);
        }
    }
}

/// Rows the given screen renders for the current snapshot.
pub fn row_count(screen: Screen, controller: &Controller) -> usize {
    if screen == Screen::Clusters {
        return controller.clusters().len();
    }
    let Some(snapshot) = controller.snapshot() else {
        return 0;
    };
    match screen {
        Screen::ShardAllocation => snapshot.shard_stores().len(),
        Screen::RelocatingShards => snapshot.recoveries().len(),
        Screen::Nodes => snapshot.nodes().len(),
        Screen::Indices => snapshot.indices().len(),
        Screen::Clusters => controller.clusters().len(),
    }
}

pub fn is_loading(controller: &Controller) -> bool {
    match controller.state().phase {
        Phase::Uninitialized => true,
        Phase::Loading => controller.snapshot().is_none(),
        _ => false,
    }
}

pub fn handle_input(event: Event, app: &mut App, controller: &Controller) -> Action {
    match event {
        Event::Key(key) if key.kind == KeyEventKind::Press => handle_key(key, app, controller),
        _ => Action::None,
    }
}

pub fn handle_key(key: KeyEvent, app: &mut App, controller: &Controller) -> Action {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return Action::Quit;
    }
    if key.code == KeyCode::Char('q') {
        return Action::Quit;
    }
    if is_loading(controller) {
        return Action::None;
    }

    match key.code {
        KeyCode::Char(c @ ('s' | 'r' | 'n' | 'i' | 'c')) => {
            if !app.compact {
                if let Some(screen) = Screen::from_key(c) {
                    app.select_screen(screen);
                }
            }
            Action::None
        }
        KeyCode::Char('v') => {
            app.compact = !app.compact;
            Action::None
        }
        KeyCode::Char('R') => Action::ManualRefresh,
        KeyCode::Char('a') => Action::SetAutorefreshInterval(next_autorefresh_interval(
            controller.state().autorefresh_interval_secs,
        )),
        KeyCode::Down | KeyCode::Char('j') => {
            app.move_cursor(1, controller);
            Action::None
        }
        KeyCode::Up | KeyCode::Char('k') => {
            app.move_cursor(-1, controller);
            Action::None
        }
        KeyCode::Enter if app.screen == Screen::Clusters && !app.compact => controller
            .clusters()
            .get(app.cluster_cursor)
            .map(|cluster| Action::SwitchCluster(cluster.alias.clone()))
            .unwrap_or(Action::None),
        _ => Action::None,
    }
}
