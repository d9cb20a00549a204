//! Ratatui-based terminal UI.
//!
//! The TUI is a form with one row per feature plus a Predict control. A
//! prediction runs on the tokio runtime while the form stays responsive; the
//! control is disabled until the outstanding request settles.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, List, ListItem, ListState, Paragraph},
};
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};

use crate::app::pipeline::{PipelineState, Prediction, Predictor};
use crate::domain::{FEATURE_COUNT, FEATURE_SPEC, FeatureSlot, LABEL_SET, RawInput};
use crate::encode::example_input;
use crate::engine::Engine;
use crate::error::{AppError, PredictError};

/// Row index of the Predict control (after the feature rows).
const PREDICT_ROW: usize = FEATURE_COUNT;

/// Start the TUI. Blocks until the user quits.
pub fn run(predictor: Arc<Predictor<Engine>>, runtime: Handle) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(predictor, runtime);
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// What a key press asks the app to do after the form has handled it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FormAction {
    None,
    Predict,
    Quit,
}

/// Form values and cursor. No I/O, so it can be driven directly in tests.
#[derive(Debug, Clone)]
struct Form {
    values: Vec<String>,
    selected: usize,
    edit_buffer: Option<String>,
}

impl Form {
    fn new(initial: &RawInput) -> Self {
        let values = FEATURE_SPEC
            .slots()
            .iter()
            .map(|slot| {
                initial
                    .get(slot.name)
                    .map(str::to_string)
                    .or_else(|| slot.fallback_category().map(|c| c.label.to_string()))
                    .unwrap_or_default()
            })
            .collect();
        Self {
            values,
            selected: 0,
            edit_buffer: None,
        }
    }

    fn slot(&self) -> Option<&'static FeatureSlot> {
        FEATURE_SPEC.slots().get(self.selected)
    }

    fn is_editing(&self) -> bool {
        self.edit_buffer.is_some()
    }

    fn handle_key(&mut self, code: KeyCode) -> FormAction {
        if self.edit_buffer.is_some() {
            self.handle_edit(code);
            return FormAction::None;
        }

        match code {
            KeyCode::Char('q') | KeyCode::Esc => return FormAction::Quit,
            KeyCode::Char('p') => return FormAction::Predict,
            KeyCode::Up => self.selected = self.selected.saturating_sub(1),
            KeyCode::Down => self.selected = (self.selected + 1).min(PREDICT_ROW),
            KeyCode::Left => self.cycle(-1),
            KeyCode::Right => self.cycle(1),
            KeyCode::Enter => {
                if self.selected == PREDICT_ROW {
                    return FormAction::Predict;
                }
                if let Some(slot) = self.slot() {
                    if slot.is_categorical() {
                        self.cycle(1);
                    } else {
                        self.edit_buffer = Some(self.values[self.selected].clone());
                    }
                }
            }
            _ => {}
        }
        FormAction::None
    }

    fn handle_edit(&mut self, code: KeyCode) {
        let Some(buffer) = self.edit_buffer.as_mut() else {
            return;
        };
        match code {
            KeyCode::Esc => self.edit_buffer = None,
            KeyCode::Enter => {
                if let Some(text) = self.edit_buffer.take() {
                    self.values[self.selected] = text;
                }
            }
            KeyCode::Backspace => {
                buffer.pop();
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' || c == '-' => buffer.push(c),
            _ => {}
        }
    }

    /// Step a categorical field through its declared categories (wrapping).
    fn cycle(&mut self, delta: isize) {
        let Some(slot) = self.slot() else {
            return;
        };
        let categories = slot.categories();
        if categories.is_empty() {
            return;
        }
        let current = categories
            .iter()
            .position(|c| c.label == self.values[self.selected])
            .unwrap_or(0) as isize;
        let next = (current + delta).rem_euclid(categories.len() as isize) as usize;
        self.values[self.selected] = categories[next].label.to_string();
    }

    fn raw_input(&self) -> RawInput {
        FEATURE_SPEC
            .names()
            .zip(&self.values)
            .map(|(name, value)| (name, value.clone()))
            .collect()
    }
}

struct App {
    form: Form,
    predictor: Arc<Predictor<Engine>>,
    runtime: Handle,
    state: watch::Receiver<PipelineState>,
    pending: Option<oneshot::Receiver<Result<Prediction, PredictError>>>,
    last: Option<Prediction>,
    status: String,
}

impl App {
    fn new(predictor: Arc<Predictor<Engine>>, runtime: Handle) -> Self {
        let state = predictor.subscribe();
        let status = format!("Ready. backend: {}", predictor.engine().backend());
        Self {
            form: Form::new(&example_input()),
            predictor,
            runtime,
            state,
            pending: None,
            last: None,
            status,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if self.poll_pending() {
                needs_redraw = true;
            }
            if self.state.has_changed().unwrap_or(false) {
                self.state.mark_unchanged();
                needs_redraw = true;
            }

            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))? {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    match self.form.handle_key(key.code) {
                        FormAction::Quit => break,
                        FormAction::Predict => self.start_prediction(),
                        FormAction::None => {}
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn start_prediction(&mut self) {
        if self.pending.is_some() {
            self.status = "A prediction is already in progress.".to_string();
            return;
        }

        let raw = self.form.raw_input();
        let predictor = Arc::clone(&self.predictor);
        let (tx, rx) = oneshot::channel();
        self.runtime.spawn(async move {
            let _ = tx.send(predictor.run_request(&raw).await);
        });
        self.pending = Some(rx);
        self.status = "Computing...".to_string();
    }

    /// Collect a finished prediction, if any. Returns true when something changed.
    fn poll_pending(&mut self) -> bool {
        let Some(rx) = self.pending.as_mut() else {
            return false;
        };
        let outcome = match rx.try_recv() {
            Ok(outcome) => outcome,
            Err(oneshot::error::TryRecvError::Empty) => return false,
            Err(oneshot::error::TryRecvError::Closed) => {
                Err(PredictError::Engine("prediction task ended without a result".to_string()))
            }
        };
        self.pending = None;

        match outcome {
            Ok(prediction) => {
                self.status = format!(
                    "Result: {} ({:.2}%)",
                    prediction.result.label(),
                    prediction.result.confidence
                );
                if let Some(w) = prediction.warnings.first() {
                    self.status.push_str(&format!(" | warning: {w}"));
                }
                self.last = Some(prediction);
            }
            Err(err) => {
                self.status = err.status_message();
            }
        }
        true
    }

    fn busy(&self) -> bool {
        self.pending.is_some() || self.predictor.state().is_in_flight()
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let line = Line::from(vec![
            Span::styled("obp", Style::default().fg(Color::Cyan)),
            Span::raw(" obesity level predictor"),
            Span::styled(
                format!(
                    " | encoding: {} | backend: {} | {}",
                    FEATURE_SPEC.version(),
                    self.predictor.engine().backend(),
                    self.predictor.state().label(),
                ),
                Style::default().fg(Color::Gray),
            ),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(48), Constraint::Min(0)])
            .split(area);

        self.draw_form(frame, chunks[0]);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0)])
            .split(chunks[1]);
        self.draw_result(frame, right[0]);
        self.draw_chart(frame, right[1]);
    }

    fn draw_form(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut items: Vec<ListItem> = FEATURE_SPEC
            .slots()
            .iter()
            .enumerate()
            .map(|(i, slot)| {
                let value = match (&self.form.edit_buffer, i == self.form.selected) {
                    (Some(buffer), true) => format!("{buffer}_"),
                    _ => self.form.values[i].clone(),
                };
                let value = if slot.is_categorical() {
                    format!("< {value} >")
                } else {
                    value
                };
                ListItem::new(format!("{:<16} {value}", slot.name))
            })
            .collect();

        let predict_style = if self.busy() {
            Style::default().fg(Color::DarkGray)
        } else {
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
        };
        items.push(ListItem::new(Line::from(Span::styled("[ Predict ]", predict_style))));

        let list = List::new(items)
            .block(Block::default().title("Answers").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");

        let mut state = ListState::default();
        state.select(Some(self.form.selected));
        frame.render_stateful_widget(list, area, &mut state);
    }

    fn draw_result(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines: Vec<Line> = Vec::new();
        match &self.last {
            Some(p) => {
                lines.push(Line::from(Span::styled(
                    format!("{} ({:.2}%)", p.result.class.bilingual_name(), p.result.confidence),
                    Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
                )));
                if !p.warnings.is_empty() {
                    lines.push(Line::from(Span::styled(
                        format!("{} fallback value(s) used", p.warnings.len()),
                        Style::default().fg(Color::Yellow),
                    )));
                }
            }
            None => lines.push(Line::from(Span::styled(
                "No prediction yet. Press p to predict.",
                Style::default().fg(Color::Gray),
            ))),
        }
        if let Some(slot) = self.form.slot() {
            lines.push(Line::from(Span::styled(
                slot.description,
                Style::default().fg(Color::Gray),
            )));
        }

        let p = Paragraph::new(Text::from(lines))
            .block(Block::default().title("Result").borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().title("Class probabilities (%)").borders(Borders::ALL);
        let Some(prediction) = &self.last else {
            frame.render_widget(block, area);
            return;
        };

        let bars: Vec<Bar> = probability_bars(&prediction.result.probabilities)
            .into_iter()
            .enumerate()
            .map(|(i, (label, pct))| {
                let style = if i == prediction.result.index {
                    Style::default().fg(Color::Cyan)
                } else {
                    Style::default().fg(Color::Gray)
                };
                Bar::default()
                    .label(Line::from(label))
                    .value(pct)
                    .text_value(format!("{pct}%"))
                    .style(style)
            })
            .collect();

        let chart = BarChart::default()
            .block(block)
            .direction(Direction::Horizontal)
            .bar_width(1)
            .bar_gap(0)
            .max(100)
            .data(BarGroup::default().bars(&bars));
        frame.render_widget(chart, area);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = if self.form.is_editing() {
            "type a number  Enter apply  Esc cancel"
        } else {
            "↑/↓ select  ←/→ change  Enter edit  p predict  q quit"
        };
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Class labels paired with whole-percent values for the bar chart.
fn probability_bars(probabilities: &[f32]) -> Vec<(&'static str, u64)> {
    LABEL_SET
        .iter()
        .zip(probabilities)
        .map(|(class, &p)| {
            let pct = (f64::from(p.clamp(0.0, 1.0)) * 100.0).round() as u64;
            (class.display_name(), pct)
        })
        .collect()
}
