use crate::chart::ChartModel;
use crate::format::PLACEHOLDER;
use crate::metrics::StateClass;
use crate::poller::{PollStatus, SharedDashboard};
use crate::registry::DeviceRegistry;
use crate::view::{LatestView, ViewControls, ViewParams};
use anyhow::Context;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{Axis, Block, Borders, Chart, Dataset, GraphType, LegendPosition, Paragraph},
    Frame, Terminal,
};
use std::io::{self, Stdout};
use std::sync::PoisonError;
use std::time::{Duration, Instant};
use tracing::info;

const INPUT_POLL: Duration = Duration::from_millis(100);
const HEARTBEAT: Duration = Duration::from_secs(1);
const SERIES_COLORS: [Color; 2] = [Color::Cyan, Color::Yellow];

/// Copy of everything one frame needs, taken under the dashboard lock.
#[derive(Clone)]
struct FrameData {
    latest: LatestView,
    signal: ChartModel,
    latency: ChartModel,
    registry: DeviceRegistry,
    status: PollStatus,
    params: ViewParams,
}

impl FrameData {
    fn capture(dashboard: &SharedDashboard, controls: &ViewControls) -> Self {
        let d = dashboard.lock().unwrap_or_else(PoisonError::into_inner);
        Self {
            latest: d.latest.clone(),
            signal: d.signal_chart.clone(),
            latency: d.latency_chart.clone(),
            registry: d.registry.clone(),
            status: d.status.clone(),
            params: controls.current(),
        }
    }

    /// Cheap fingerprint used to skip redundant redraws.
    fn key(&self) -> (u64, u64, u64, usize, LatestView, ViewParams) {
        (
            self.signal.revision(),
            self.latency.revision(),
            self.status.failures,
            self.registry.options().len(),
            self.latest.clone(),
            self.params.clone(),
        )
    }
}

struct TerminalGuard {
    terminal: Terminal<CrosstermBackend<Stdout>>,
}

impl TerminalGuard {
    fn enter() -> anyhow::Result<Self> {
        enable_raw_mode().context("enable raw mode")?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).context("enter alternate screen")?;
        let terminal = Terminal::new(CrosstermBackend::new(stdout)).context("create terminal")?;
        Ok(Self { terminal })
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(self.terminal.backend_mut(), LeaveAlternateScreen);
        let _ = self.terminal.show_cursor();
    }
}

enum Action {
    Quit,
    Changed,
    None,
}

fn handle_key(
    code: KeyCode,
    modifiers: KeyModifiers,
    dashboard: &SharedDashboard,
    controls: &ViewControls,
) -> Action {
    let changed = match code {
        KeyCode::Char('q') | KeyCode::Esc => return Action::Quit,
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => return Action::Quit,
        KeyCode::Char('+') | KeyCode::Char('=') | KeyCode::Right => controls.widen(),
        KeyCode::Char('-') | KeyCode::Left => controls.narrow(),
        KeyCode::Char('d') | KeyCode::Tab => {
            let registry = dashboard
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .registry
                .clone();
            controls.cycle_device(&registry)
        }
        KeyCode::Char('a') => controls.set_device(""),
        _ => false,
    };
    if changed {
        Action::Changed
    } else {
        Action::None
    }
}

/// Blocking UI loop; returns when the user quits.
pub fn run(dashboard: SharedDashboard, controls: ViewControls) -> anyhow::Result<()> {
    let mut guard = TerminalGuard::enter()?;
    info!("Terminal dashboard started");

    let mut last_key = None;
    let mut last_draw = Instant::now();
    let mut force = true;

    loop {
        let frame = FrameData::capture(&dashboard, &controls);
        let key = frame.key();
        if force || last_key.as_ref() != Some(&key) || last_draw.elapsed() >= HEARTBEAT {
            guard.terminal.draw(|f| draw(f, &frame)).context("draw frame")?;
            last_key = Some(key);
            last_draw = Instant::now();
            force = false;
        }

        if event::poll(INPUT_POLL).context("poll terminal events")? {
            match event::read().context("read terminal event")? {
                Event::Key(k) if k.kind == KeyEventKind::Press => {
                    match handle_key(k.code, k.modifiers, &dashboard, &controls) {
                        Action::Quit => break,
                        Action::Changed => force = true,
                        Action::None => {}
                    }
                }
                Event::Resize(_, _) => force = true,
                _ => {}
            }
        }
    }

    info!("Terminal dashboard closed");
    Ok(())
}

fn draw(f: &mut Frame, data: &FrameData) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(8),
            Constraint::Min(8),
            Constraint::Length(3),
        ])
        .split(f.area());

    draw_status(f, rows[0], &data.latest);
    draw_chart(f, rows[1], &data.signal);
    draw_chart(f, rows[2], &data.latency);
    draw_footer(f, rows[3], data);
}

fn state_style(class: Option<StateClass>) -> Style {
    let base = Style::default().add_modifier(Modifier::BOLD);
    match class {
        Some(StateClass::Ok) => base.fg(Color::Green),
        Some(StateClass::Degraded) => base.fg(Color::Yellow),
        Some(StateClass::Down) => base.fg(Color::Red),
        Some(StateClass::Recovering) => base.fg(Color::Magenta),
        None => base,
    }
}

fn field<'a>(label: &'a str, value: &'a str, unit: &'a str) -> Vec<Span<'a>> {
    vec![
        Span::styled(label, Style::default().fg(Color::DarkGray)),
        Span::raw(value),
        Span::raw(unit),
        Span::raw("   "),
    ]
}

fn draw_status(f: &mut Frame, area: Rect, latest: &LatestView) {
    let mut first = vec![Span::styled("State: ", Style::default().fg(Color::DarkGray))];
    first.push(Span::styled(latest.state.as_str(), state_style(latest.state_class)));
    first.push(Span::raw("   "));
    first.extend(field("Device: ", &latest.device, ""));
    first.extend(field("Updated: ", &latest.ts, ""));

    let mut second = field("RSSI: ", &latest.rssi, " dBm");
    second.extend(field("Router: ", &latest.router_ms, " ms"));
    second.extend(field("Linux: ", &latest.linux_ms, " ms"));

    let status = Paragraph::new(vec![Line::from(first), Line::from(second)])
        .block(Block::default().borders(Borders::ALL).title("Link"));
    f.render_widget(status, area);
}

fn x_axis_labels(labels: &[String]) -> Vec<Span<'_>> {
    match labels {
        [] => Vec::new(),
        [only] => vec![Span::raw(only.as_str())],
        [first, .., last] => {
            let mid = &labels[labels.len() / 2];
            vec![
                Span::raw(first.as_str()),
                Span::raw(mid.as_str()),
                Span::raw(last.as_str()),
            ]
        }
    }
}

fn draw_chart(f: &mut Frame, area: Rect, chart: &ChartModel) {
    let spec = chart.spec();
    let points: Vec<Vec<(f64, f64)>> = (0..spec.series_labels.len()).map(|i| chart.points(i)).collect();
    let datasets: Vec<Dataset> = points
        .iter()
        .zip(spec.series_labels.iter())
        .enumerate()
        .map(|(i, (data, label))| {
            Dataset::default()
                .name(*label)
                .marker(symbols::Marker::Braille)
                .graph_type(GraphType::Line)
                .style(Style::default().fg(SERIES_COLORS[i % SERIES_COLORS.len()]))
                .data(data)
        })
        .collect();

    let x_max = chart.labels().len().saturating_sub(1).max(1) as f64;
    let [lo, hi] = chart.y_bounds();
    let y_labels = vec![
        Span::raw(format!("{:.0}", lo)),
        Span::raw(format!("{:.0}", (lo + hi) / 2.0)),
        Span::raw(format!("{:.0}", hi)),
    ];

    let widget = Chart::new(datasets)
        .block(Block::default().borders(Borders::ALL).title(spec.title))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(Color::Gray))
                .bounds([0.0, x_max])
                .labels(x_axis_labels(chart.labels())),
        )
        .y_axis(
            Axis::default()
                .title(spec.y_axis_title)
                .style(Style::default().fg(Color::Gray))
                .bounds([lo, hi])
                .labels(y_labels),
        )
        .legend_position(spec.legend.then_some(LegendPosition::TopRight))
        .hidden_legend_constraints((Constraint::Ratio(1, 2), Constraint::Ratio(1, 2)));
    f.render_widget(widget, area);
}

fn draw_footer(f: &mut Frame, area: Rect, data: &FrameData) {
    let mut spans = vec![
        Span::styled("Window: ", Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{} min", data.params.window_minutes)),
        Span::raw("   "),
        Span::styled("Device:", Style::default().fg(Color::DarkGray)),
    ];
    for (value, label) in data.registry.selector_entries() {
        let style = if value == data.params.device_filter {
            Style::default().add_modifier(Modifier::REVERSED)
        } else {
            Style::default()
        };
        spans.push(Span::raw(" "));
        spans.push(Span::styled(label.to_string(), style));
    }
    spans.extend([
        Span::raw("   "),
        Span::styled("Points: ", Style::default().fg(Color::DarkGray)),
        Span::raw(data.status.history_points.to_string()),
        Span::raw("   "),
    ]);

    if let Some(error) = data
        .status
        .latest_error
        .as_deref()
        .or(data.status.history_error.as_deref())
    {
        spans.push(Span::styled(error.to_string(), Style::default().fg(Color::Red)));
    } else {
        let polled = |at: Option<chrono::DateTime<chrono::Local>>| {
            at.map(|t| t.format("%H:%M:%S").to_string())
                .unwrap_or_else(|| PLACEHOLDER.to_string())
        };
        spans.push(Span::styled(
            format!(
                "latest {}  history {}",
                polled(data.status.latest_ok_at),
                polled(data.status.history_ok_at)
            ),
            Style::default().fg(Color::DarkGray),
        ));
    }

    let help = Line::from(Span::styled(
        "q quit  +/- window  d device  a all devices",
        Style::default().fg(Color::DarkGray),
    ));
    let footer = Paragraph::new(vec![Line::from(spans), help]).block(Block::default().borders(Borders::TOP));
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::ChartSpec;
    use crate::metrics::Snapshot;
    use crate::poller::Dashboard;
    use crate::registry::ALL_DEVICES;
    use ratatui::backend::TestBackend;

    fn frame_with_history() -> FrameData {
        let mut signal = ChartModel::new(ChartSpec::signal());
        signal
            .replace(
                vec!["10:00:00".into(), "10:00:02".into(), "10:00:04".into()],
                vec![vec![Some(-60.0), None, Some(-58.0)]],
            )
            .unwrap();
        let mut latest = LatestView::default();
        latest.apply(&Snapshot {
            state: Some("down".into()),
            device: Some("esp32-a".into()),
            ..Default::default()
        });
        FrameData {
            latest,
            signal,
            latency: ChartModel::new(ChartSpec::latency()),
            registry: DeviceRegistry::new(),
            status: PollStatus::default(),
            params: ViewParams::default(),
        }
    }

    fn render(data: &FrameData) -> String {
        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| draw(f, data)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        buffer
            .content()
            .chunks(buffer.area.width as usize)
            .map(|row| row.iter().map(|c| c.symbol()).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn renders_fields_placeholders_and_labels() {
        let screen = render(&frame_with_history());
        assert!(screen.contains("DOWN"));
        assert!(screen.contains("esp32-a"));
        assert!(screen.contains("RSSI: - dBm"));
        assert!(screen.contains("10:00:00"));
        assert!(screen.contains("10:00:04"));
        assert!(screen.contains("Window: 10 min"));
        assert!(screen.contains(ALL_DEVICES));
    }

    #[test]
    fn renders_empty_dashboard() {
        let d = Dashboard::shared();
        let (controls, _rx) = ViewControls::new(ViewParams::default());
        let screen = render(&FrameData::capture(&d, &controls));
        assert!(screen.contains("State: -"));
        assert!(screen.contains("Latency"));
    }

    #[test]
    fn axis_labels_pick_first_middle_last() {
        let labels: Vec<String> = ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect();
        let spans = x_axis_labels(&labels);
        let text: Vec<&str> = spans.iter().map(|s| s.content.as_ref()).collect();
        assert_eq!(text, ["a", "c", "e"]);
        assert!(x_axis_labels(&[]).is_empty());
    }

    #[test]
    fn keys_drive_view_controls() {
        let dashboard = Dashboard::shared();
        dashboard.lock().unwrap().registry.insert("esp32-a");
        let (controls, _rx) = ViewControls::new(ViewParams::default());

        assert!(matches!(
            handle_key(KeyCode::Char('+'), KeyModifiers::NONE, &dashboard, &controls),
            Action::Changed
        ));
        assert_eq!(controls.current().window_minutes, 15);
        assert!(matches!(
            handle_key(KeyCode::Tab, KeyModifiers::NONE, &dashboard, &controls),
            Action::Changed
        ));
        assert_eq!(controls.current().device(), Some("esp32-a"));
        assert!(matches!(
            handle_key(KeyCode::Char('x'), KeyModifiers::NONE, &dashboard, &controls),
            Action::None
        ));
        assert!(matches!(
            handle_key(KeyCode::Char('c'), KeyModifiers::CONTROL, &dashboard, &controls),
            Action::Quit
        ));
    }
}
