use esmon_core::config::ClusterEndpointConfig;
use esmon_core::credentials::REDACTED_PASSWORD;
use esmon_core::model::{ClusterSnapshot, HealthStatus, ShardAllocation};
use esmon_core::refresh::{interval_label, Controller};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use crate::app::{is_loading, App, Screen};

pub const LOGO: &str = r" _____   ____    __  __
| ____| / ___|  |  \/  |   ___    _ __
|  _|   \___ \  | |\/| |  / _ \  | '_ \
| |___   ___) | | |  | | | (_) | | | | |
|_____| |____/  |_|  |_|  \___/  |_| |_|";

const OVERVIEW_HEIGHT: u16 = 8;
const LOGO_WIDTH: u16 = 42;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub logo: Color,
    pub spinner: Color,
    pub text: Color,
    pub text_dark: Color,
    pub muted: Color,
    pub highlight: Color,
    pub status_green: Color,
    pub status_yellow: Color,
    pub status_red: Color,
    pub status_error: Color,
    pub border: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            logo: Color::Indexed(15),
            spinner: Color::Indexed(202),
            text: Color::Indexed(15),
            text_dark: Color::Indexed(16),
            muted: Color::Indexed(245),
            highlight: Color::Indexed(202),
            status_green: Color::Indexed(29),
            status_yellow: Color::Indexed(220),
            status_red: Color::Indexed(196),
            status_error: Color::Indexed(240),
            border: Color::Indexed(240),
        }
    }
}

impl Theme {
    pub fn health_color(&self, status: HealthStatus) -> Color {
        match status {
            HealthStatus::Green => self.status_green,
            HealthStatus::Yellow => self.status_yellow,
            HealthStatus::Red => self.status_red,
            HealthStatus::Unknown => self.status_error,
        }
    }

    /// Status bar colours follow cluster health; errors and missing data
    /// override it.
    pub fn status_style(&self, controller: &Controller) -> Style {
        let health = match controller.snapshot() {
            Some(snapshot) if !controller.state().has_error => snapshot.cluster_info().status,
            _ => HealthStatus::Unknown,
        };
        let fg = if health == HealthStatus::Yellow {
            self.text_dark
        } else {
            self.text
        };
        Style::default().fg(fg).bg(self.health_color(health))
    }
}

pub fn render_ui(frame: &mut Frame, app: &App, controller: &Controller, theme: &Theme) {
    let size = frame.size();
    if is_loading(controller) {
        render_loading(frame, app, theme, size);
        return;
    }

    if app.compact {
        let layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(6),
                Constraint::Length(2),
                Constraint::Length(6),
                Constraint::Min(0),
                Constraint::Length(1),
            ])
            .split(size);
        frame.render_widget(logo_widget(theme), layout[0]);
        frame.render_widget(
            Paragraph::new("<v> Normal mode").style(Style::default().fg(theme.text)),
            layout[1],
        );
        frame.render_widget(cluster_info_widget(controller, theme), layout[2]);
        render_status_bar(frame, app, controller, theme, layout[4]);
        return;
    }

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(OVERVIEW_HEIGHT),
            Constraint::Min(0),
            Constraint::Length(1),
        ])
        .split(size);
    let overview = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(45),
            Constraint::Min(0),
            Constraint::Length(LOGO_WIDTH),
        ])
        .split(layout[0]);
    frame.render_widget(cluster_info_widget(controller, theme), overview[0]);
    frame.render_widget(command_widget(app, theme), overview[1]);
    frame.render_widget(logo_widget(theme), overview[2]);
    render_content(frame, app, controller, theme, layout[1]);
    render_status_bar(frame, app, controller, theme, layout[2]);
}

fn render_loading(frame: &mut Frame, app: &App, theme: &Theme, area: Rect) {
    let mut lines: Vec<Line> = LOGO
        .lines()
        .map(|line| Line::from(Span::styled(line.to_string(), Style::default().fg(theme.logo))))
        .collect();
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled(app.spinner(), Style::default().fg(theme.spinner)),
        Span::styled(" Loading cluster data", Style::default().fg(theme.text)),
    ]));
    let top = area.height.saturating_sub(lines.len() as u16) / 2;
    let target = Rect {
        y: area.y + top,
        height: area.height.saturating_sub(top),
        ..area
    };
    frame.render_widget(
        Paragraph::new(Text::from(lines)).alignment(Alignment::Center),
        target,
    );
}

fn logo_widget(theme: &Theme) -> Paragraph<'static> {
    Paragraph::new(LOGO)
        .style(Style::default().fg(theme.logo).add_modifier(Modifier::BOLD))
        .alignment(Alignment::Left)
}

pub fn cluster_info_lines(snapshot: Option<&ClusterSnapshot>) -> Vec<(&'static str, String)> {
    const LABELS: [&str; 6] = [
        "Cluster:",
        "Status:",
        "Nodes:",
        "Data:",
        "Relocating shards:",
        "Active shards:",
    ];
    let values = match snapshot {
        Some(snapshot) => {
            let info = snapshot.cluster_info();
            [
                info.cluster_name.clone(),
                info.status.to_string(),
                info.number_of_nodes.to_string(),
                snapshot.cluster_stats().indices.store.size.to_uppercase(),
                info.relocating_shards.to_string(),
                info.active_shards_percent.clone(),
            ]
        }
        None => Default::default(),
    };
    LABELS.into_iter().zip(values).collect()
}

fn cluster_info_widget(controller: &Controller, theme: &Theme) -> Paragraph<'static> {
    let snapshot = controller.snapshot().map(|snapshot| snapshot.as_ref());
    let health = snapshot.map(|s| s.cluster_info().status);
    let lines: Vec<Line> = cluster_info_lines(snapshot)
        .into_iter()
        .map(|(key, value)| {
            let value_style = match (key, health) {
                ("Status:", Some(status)) => Style::default().fg(theme.health_color(status)),
                _ => Style::default().fg(theme.text),
            };
            Line::from(vec![
                Span::styled(format!("{key:<20}"), Style::default().fg(theme.text)),
                Span::styled(value, value_style),
            ])
        })
        .collect();
    Paragraph::new(Text::from(lines))
}

fn command_widget(app: &App, theme: &Theme) -> Paragraph<'static> {
    let mut lines: Vec<Line> = Screen::ALL
        .into_iter()
        .map(|screen| {
            let color = if screen == app.screen {
                theme.highlight
            } else {
                theme.text
            };
            Line::from(Span::styled(
                format!("<{}> {}", screen.key(), screen.title()),
                Style::default().fg(color),
            ))
        })
        .collect();
    lines.push(Line::from(Span::styled(
        "<v> Compact view",
        Style::default().fg(theme.text),
    )));
    Paragraph::new(Text::from(lines))
}

fn render_content(
    frame: &mut Frame,
    app: &App,
    controller: &Controller,
    theme: &Theme,
    area: Rect,
) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(theme.border))
        .title(Span::styled(
            app.screen.title(),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(0), Constraint::Length(1)])
        .split(inner);

    let snapshot = controller.snapshot().map(|snapshot| snapshot.as_ref());
    let (header, rows, hint): (Vec<&str>, Vec<Vec<String>>, &str) = match app.screen {
        Screen::ShardAllocation => (
            vec!["↑Index [*]", "Shard", "Primary nodes", "Replica nodes"],
            snapshot.map(shard_allocation_rows).unwrap_or_default(),
            "[*] Sorting by index first, shard second",
        ),
        Screen::RelocatingShards => (
            vec!["Index", "Shard", "Source", "Target", "Progress [%]", "↓Time"],
            snapshot.map(relocating_shard_rows).unwrap_or_default(),
            "[P] Primary Shard • [R] Replica Shard",
        ),
        Screen::Nodes => (
            vec![
                "Name",
                "Transport",
                "Shards",
                "CPU Usage [%]",
                "Load Average",
                "MEM Usage",
                "Free Disk Space",
            ],
            snapshot.map(node_rows).unwrap_or_default(),
            "[★] Master Node",
        ),
        Screen::Indices => (
            vec!["Name", "Health", "Status", "Docs count [*]", "↓Storage size [*]"],
            snapshot.map(index_rows).unwrap_or_default(),
            "[*] Total size (including replicas)",
        ),
        Screen::Clusters => (
            vec!["Alias", "Endpoint", "Username", "Password"],
            cluster_rows(controller.clusters()),
            "<⏎> select • <j/k> move",
        ),
    };

    let widths = vec![Constraint::Ratio(1, header.len() as u32); header.len()];
    let header_row = Row::new(header.into_iter().map(Cell::from))
        .style(Style::default().fg(theme.text).add_modifier(Modifier::BOLD))
        .bottom_margin(1);
    let skip = if app.screen == Screen::Clusters {
        0
    } else {
        app.scroll as usize
    };
    let body = rows.into_iter().skip(skip).map(Row::new);
    let table = Table::new(body, widths)
        .header(header_row)
        .style(Style::default().fg(theme.text))
        .highlight_style(Style::default().fg(theme.highlight));

    if app.screen == Screen::Clusters {
        let mut state = TableState::default();
        state.select(Some(app.cluster_cursor));
        frame.render_stateful_widget(table, layout[0], &mut state);
    } else {
        frame.render_widget(table, layout[0]);
    }
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(theme.muted)),
        layout[1],
    );
}

fn render_status_bar(
    frame: &mut Frame,
    app: &App,
    controller: &Controller,
    theme: &Theme,
    area: Rect,
) {
    let info = refresh_info(controller.state().autorefresh_interval_secs);
    let info_width = info.chars().count() as u16 + 1;
    let layout = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Min(0), Constraint::Length(info_width)])
        .split(area);
    let style = theme.status_style(controller);
    frame.render_widget(
        Paragraph::new(refresh_indicator(controller, app.spinner())).style(style),
        layout[0],
    );
    frame.render_widget(Paragraph::new(info).style(style), layout[1]);
}

pub fn refresh_indicator(controller: &Controller, spinner: &str) -> String {
    let state = controller.state();
    if state.is_fetching() {
        return format!("{spinner} Refreshing");
    }
    let warning = if state.has_error { "⚠ " } else { "" };
    match state.last_refresh {
        Some(at) => format!(
            "{warning}Last refresh at {}",
            at.with_timezone(&chrono::Local).format("%H:%M:%S")
        ),
        None => warning.to_string(),
    }
}

pub fn refresh_info(interval_secs: u64) -> String {
    if interval_secs == 0 {
        format!("Autorefresh: {} | <R> refresh <a> change", interval_label(0))
    } else {
        format!("Autorefresh: {} | <a> change", interval_label(interval_secs))
    }
}

pub fn shard_allocation_rows(snapshot: &ClusterSnapshot) -> Vec<Vec<String>> {
    snapshot
        .shard_stores()
        .iter()
        .map(|shard| {
            vec![
                shard.index.clone(),
                shard.shard.to_string(),
                shard.node_names(&ShardAllocation::Primary).join(", "),
                shard.node_names(&ShardAllocation::Replica).join(", "),
            ]
        })
        .collect()
}

pub fn relocating_shard_rows(snapshot: &ClusterSnapshot) -> Vec<Vec<String>> {
    snapshot
        .recoveries()
        .iter()
        .map(|recovery| {
            let role = if recovery.primary { "[P]" } else { "[R]" };
            vec![
                recovery.index_name.clone(),
                format!("{}{role}", recovery.shard_id),
                recovery.source.display_name(),
                recovery.target.display_name(),
                format!(
                    "{} ({}/{})",
                    recovery.size.percent.trim_end_matches('%'),
                    recovery.size.recovered.to_uppercase(),
                    recovery.size.total.to_uppercase()
                ),
                recovery.total_time.clone(),
            ]
        })
        .collect()
}

pub fn node_rows(snapshot: &ClusterSnapshot) -> Vec<Vec<String>> {
    snapshot
        .nodes()
        .iter()
        .map(|node| {
            let name = if snapshot.is_master(node) {
                format!("{}[★]", node.name)
            } else {
                node.name.clone()
            };
            vec![
                name,
                node.transport_address.clone(),
                node.indices.shard_stats.total_count.to_string(),
                node.os.cpu.percent.to_string(),
                format!("{:.2}", node.os.cpu.load_average.five_minutes),
                node.os.mem.used.to_uppercase(),
                node.fs.total.free.to_uppercase(),
            ]
        })
        .collect()
}

pub fn index_rows(snapshot: &ClusterSnapshot) -> Vec<Vec<String>> {
    let mut indices: Vec<_> = snapshot.indices().iter().collect();
    indices.sort_by(|a, b| {
        b.total
            .store
            .size_in_bytes
            .cmp(&a.total.store.size_in_bytes)
            .then_with(|| a.name.cmp(&b.name))
    });
    indices
        .into_iter()
        .map(|index| {
            vec![
                index.name.clone(),
                index.health.to_string(),
                index.status.clone(),
                index.total.docs.count.to_string(),
                index.total.store.size.to_uppercase(),
            ]
        })
        .collect()
}

pub fn cluster_rows(clusters: &[ClusterEndpointConfig]) -> Vec<Vec<String>> {
    clusters
        .iter()
        .map(|cluster| {
            let password = match cluster.password.as_deref() {
                Some(password) if !password.is_empty() => REDACTED_PASSWORD.to_string(),
                _ => String::new(),
            };
            vec![
                cluster.alias.clone(),
                cluster.endpoint.clone(),
                cluster.username.clone().unwrap_or_default(),
                password,
            ]
        })
        .collect()
}
