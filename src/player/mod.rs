//! Player: the terminal front end.
//!
//! Owns the screen: a narrative column on the left, the chart on the right,
//! the menu bar above and a status line below. One cooperative loop feeds
//! keys, mouse and resizes into the scroller and the scene, and sleeps in
//! `event::poll` until the scene's next deadline.

use std::io::{self, Write};
use std::time::{Duration, Instant};

use anyhow::{Context, Result, bail};
use crossterm::event::{
    self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEvent,
    MouseEventKind,
};
use crossterm::{cursor, execute, queue, style, terminal};
use log::{debug, info};

use crate::config::{KeyBindings, matches_binding};
use crate::engine::earliest;
use crate::menubar::{menu_items, print_menu_bar};
use crate::renderer::Renderer;
use crate::story::scroller::wrap;
use crate::story::{ResizeHandler, SceneContext, Scroller, StepController, Step};
use crate::types::{Cell, Color, DOTS_X, DOTS_Y, NamedColor, Point, Style, TerminalContract, Viewport};

/// Rows reserved above the content for the menu bar.
const CONTENT_OFFSET: u16 = 1;
/// Sleep when nothing is scheduled.
const IDLE_POLL: Duration = Duration::from_millis(250);
const WHEEL_LINES: i32 = 3;
const MIN_CHART_COLS: u16 = 20;
const MIN_ROWS: u16 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Where the two panes sit on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Panes {
    narrative_cols: u16,
    chart_left: u16,
    chart: Viewport,
    rows: u16,
    width: u16,
}

impl Panes {
    fn compute(width: u16, height: u16, narrative_cols: u16) -> Panes {
        let rows = height.saturating_sub(CONTENT_OFFSET + 1);
        let narrative_cols = narrative_cols.min(width / 2);
        let chart_left = narrative_cols + 1;
        Panes {
            narrative_cols,
            chart_left,
            chart: Viewport {
                cols: width.saturating_sub(chart_left),
                rows,
            },
            rows,
            width,
        }
    }

    fn contract(&self) -> TerminalContract {
        TerminalContract {
            width: self.chart.cols,
            height: self.chart.rows,
        }
    }

    /// Dot-space point at the center of the chart cell under `(col, row)`.
    fn chart_point(&self, col: u16, row: u16) -> Option<Point> {
        if col < self.chart_left || row < CONTENT_OFFSET || row >= CONTENT_OFFSET + self.rows {
            return None;
        }
        let x = f64::from(col - self.chart_left) * f64::from(DOTS_X) + f64::from(DOTS_X) / 2.0;
        let y = f64::from(row - CONTENT_OFFSET) * f64::from(DOTS_Y) + f64::from(DOTS_Y) / 2.0;
        Some(Point::new(x, y))
    }
}

pub struct Player {
    scene: SceneContext,
    controller: StepController,
    scroller: Scroller,
    resize: ResizeHandler,
    keys: KeyBindings,
    panes: Panes,
    started: Instant,
    grid: Vec<Vec<Cell>>,
    tooltip: Option<(u16, u16, Vec<String>)>,
    fullscreen: bool,
}

impl Player {
    /// Build a player for a scene sized to `width` by `height` cells. The
    /// scene must have been created with `Player::chart_viewport` of the same
    /// size and `Duration::ZERO` as its start time.
    pub fn new(scene: SceneContext, scroller: Scroller, width: u16, height: u16) -> Self {
        let keys = scene.config().key_bindings.clone();
        let narrative_cols = scene.config().layout.narrative_cols;
        let resize = ResizeHandler::new(Duration::from_millis(scene.config().timing.resize_debounce_ms));
        let panes = Panes::compute(width, height, narrative_cols);
        let mut scroller = scroller;
        scroller.resize(panes.narrative_cols.saturating_sub(1), panes.rows);
        Player {
            scene,
            controller: StepController::new(),
            scroller,
            resize,
            keys,
            panes,
            started: Instant::now(),
            grid: Vec::new(),
            tooltip: None,
            fullscreen: false,
        }
    }

    /// The chart area for a terminal of `width` by `height` cells.
    pub fn chart_viewport(width: u16, height: u16, narrative_cols: u16) -> Viewport {
        Panes::compute(width, height, narrative_cols).chart
    }

    /// Play the story in the terminal.
    ///
    /// Sets up the terminal, enters the event loop, and restores the terminal
    /// on exit (even on error).
    pub fn play(&mut self) -> Result<()> {
        let (term_w, term_h) = terminal::size().context("Failed to read terminal size")?;
        if term_w < self.panes.narrative_cols + MIN_CHART_COLS || term_h < MIN_ROWS {
            bail!(
                "Terminal too small: need at least {}x{}, have {}x{}",
                self.panes.narrative_cols + MIN_CHART_COLS,
                MIN_ROWS,
                term_w,
                term_h,
            );
        }

        let mut stdout = io::stdout();
        terminal::enable_raw_mode()?;
        execute!(
            stdout,
            terminal::EnterAlternateScreen,
            event::EnableMouseCapture,
            cursor::Hide,
            terminal::Clear(terminal::ClearType::All),
        )?;

        let result = self.run_loop(&mut stdout);

        // Always restore terminal state.
        let _ = execute!(
            stdout,
            event::DisableMouseCapture,
            cursor::Show,
            terminal::LeaveAlternateScreen
        );
        let _ = terminal::disable_raw_mode();

        result
    }

    fn now(&self) -> Duration {
        self.started.elapsed()
    }

    // -----------------------------------------------------------------------
    // Event loop
    // -----------------------------------------------------------------------

    fn run_loop(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        self.sync_step()?;
        self.render_all(stdout)?;

        loop {
            let now = self.now();
            let mut changed = self.scene.advance(now);
            if self.resize.poll(&mut self.scene, now) {
                self.grid.clear();
                changed = true;
            }
            if changed {
                self.render_chart(stdout)?;
                self.render_status(stdout)?;
            }

            let deadline = earliest([self.scene.next_deadline(), self.resize.next_deadline()]);
            let timeout = deadline
                .map(|d| d.saturating_sub(self.now()))
                .unwrap_or(IDLE_POLL);
            if !event::poll(timeout)? {
                continue;
            }

            let flow = match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => self.handle_key(key, stdout)?,
                Event::Mouse(mouse) => self.handle_mouse(mouse, stdout)?,
                Event::Resize(width, height) => {
                    self.handle_resize(width, height, stdout)?;
                    Flow::Continue
                }
                _ => Flow::Continue,
            };
            if flow == Flow::Quit {
                break;
            }
        }

        info!("player closed at step {:?}", self.controller.last_index());
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent, stdout: &mut io::Stdout) -> Result<Flow> {
        let keys = &self.keys;
        let ctrl_c = key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL);
        if ctrl_c || matches_binding(&keys.quit, &key) {
            return Ok(Flow::Quit);
        }

        if matches_binding(&keys.close_popup, &key) {
            if self.scene.close_popup() {
                self.grid.clear();
                self.render_chart(stdout)?;
            }
        } else if matches_binding(&keys.fullscreen, &key) {
            self.fullscreen = !self.fullscreen;
            if self.fullscreen {
                stdout.write_all(b"\x1b[10;1t")?;
            } else {
                stdout.write_all(b"\x1b[10;0t")?;
            }
            stdout.flush()?;
        } else {
            let page = self.scroller.page();
            if matches_binding(&keys.scroll_down, &key) {
                self.scroller.scroll_by(1);
            } else if matches_binding(&keys.scroll_up, &key) {
                self.scroller.scroll_by(-1);
            } else if matches_binding(&keys.page_down, &key) {
                self.scroller.scroll_by(page);
            } else if matches_binding(&keys.page_up, &key) {
                self.scroller.scroll_by(-page);
            } else if matches_binding(&keys.next_section, &key) {
                self.scroller.next_section();
            } else if matches_binding(&keys.first_section, &key) {
                self.scroller.first();
            } else if matches_binding(&keys.last_section, &key) {
                self.scroller.last();
            } else {
                return Ok(Flow::Continue);
            }
            self.after_scroll(stdout)?;
        }
        Ok(Flow::Continue)
    }

    fn handle_mouse(&mut self, mouse: MouseEvent, stdout: &mut io::Stdout) -> Result<Flow> {
        match mouse.kind {
            MouseEventKind::ScrollDown => {
                self.scroller.scroll_by(WHEEL_LINES);
                self.after_scroll(stdout)?;
            }
            MouseEventKind::ScrollUp => {
                self.scroller.scroll_by(-WHEEL_LINES);
                self.after_scroll(stdout)?;
            }
            MouseEventKind::Moved => {
                let tip = self
                    .panes
                    .chart_point(mouse.column, mouse.row)
                    .and_then(|p| self.scene.tooltip_at(p))
                    .map(|lines| (mouse.column, mouse.row, lines));
                if tip != self.tooltip {
                    self.tooltip = tip;
                    self.grid.clear();
                    self.render_chart(stdout)?;
                }
            }
            MouseEventKind::Down(MouseButton::Left) => {
                let Some(p) = self.panes.chart_point(mouse.column, mouse.row) else {
                    return Ok(Flow::Continue);
                };
                let opened = self.scene.click_at(p);
                let closed = !opened && self.scene.close_popup();
                if opened || closed {
                    self.grid.clear();
                    self.render_chart(stdout)?;
                }
            }
            _ => {}
        }
        Ok(Flow::Continue)
    }

    fn handle_resize(&mut self, width: u16, height: u16, stdout: &mut io::Stdout) -> Result<()> {
        let narrative_cols = self.scene.config().layout.narrative_cols;
        self.panes = Panes::compute(width, height, narrative_cols);
        self.scroller
            .resize(self.panes.narrative_cols.saturating_sub(1), self.panes.rows);
        self.resize.on_resize(self.panes.chart, self.now());
        self.tooltip = None;
        debug!("terminal resized to {width}x{height}");
        execute!(stdout, terminal::Clear(terminal::ClearType::All))?;
        self.sync_step()?;
        self.render_all(stdout)
    }

    fn after_scroll(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        self.tooltip = None;
        self.sync_step()?;
        self.render_narrative(stdout)?;
        self.render_chart(stdout)?;
        self.render_status(stdout)
    }

    /// Bring the scene to the section the scroller shows.
    fn sync_step(&mut self) -> Result<()> {
        let index = self.scroller.active_index();
        if self.controller.last_index() != Some(index) {
            let now = self.now();
            self.controller.go_to(&mut self.scene, index, now)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Terminal output
    // -----------------------------------------------------------------------

    fn render_all(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        self.grid.clear();
        print_menu_bar(stdout, &menu_items(&self.keys), self.panes.width)?;
        self.render_narrative(stdout)?;
        self.render_chart(stdout)?;
        self.render_status(stdout)
    }

    fn render_narrative(&self, stdout: &mut io::Stdout) -> Result<()> {
        let width = usize::from(self.panes.narrative_cols.saturating_sub(1));
        let active = self.scroller.active_index();
        let visible = self.scroller.visible();
        for row in 0..self.panes.rows {
            let line = visible.get(usize::from(row));
            let text = line.map(|l| l.text.as_str()).unwrap_or("");
            let mut cs = style::ContentStyle::default();
            if let Some(l) = line {
                if l.title {
                    cs.attributes.set(style::Attribute::Bold);
                }
                if l.section != active {
                    cs.attributes.set(style::Attribute::Dim);
                }
            }
            let padded = format!("{text:<width$}");
            queue!(
                stdout,
                cursor::MoveTo(0, row + CONTENT_OFFSET),
                style::PrintStyledContent(style::StyledContent::new(cs, padded)),
                cursor::MoveTo(self.panes.narrative_cols, row + CONTENT_OFFSET),
                style::Print('\u{2502}'),
            )?;
        }
        stdout.flush()?;
        Ok(())
    }

    /// Rasterize the surface and paint what changed since the last paint,
    /// then the overlays.
    fn render_chart(&mut self, stdout: &mut io::Stdout) -> Result<()> {
        let cells = Renderer::rasterize(self.scene.surface(), &self.panes.contract());
        let left = self.panes.chart_left;
        if self.grid.len() == cells.len() && !self.grid.is_empty() {
            for change in Renderer::diff(&self.grid, &cells) {
                let cs = to_content_style(&change.cell.style);
                queue!(
                    stdout,
                    cursor::MoveTo(change.x + left, change.y + CONTENT_OFFSET),
                    style::PrintStyledContent(style::StyledContent::new(cs, change.cell.ch)),
                )?;
            }
        } else {
            for (y, row) in cells.iter().enumerate() {
                queue!(stdout, cursor::MoveTo(left, y as u16 + CONTENT_OFFSET))?;
                for cell in row {
                    let cs = to_content_style(&cell.style);
                    queue!(stdout, style::PrintStyledContent(style::StyledContent::new(cs, cell.ch)))?;
                }
            }
        }
        self.grid = cells;

        let overlay = self.render_popup(stdout)? || self.render_tooltip(stdout)?;
        if overlay {
            // Overlays sit on top of the grid; repaint fully next time.
            self.grid.clear();
        }
        stdout.flush()?;
        Ok(())
    }

    fn render_tooltip(&self, stdout: &mut io::Stdout) -> Result<bool> {
        let Some((col, row, lines)) = &self.tooltip else {
            return Ok(false);
        };
        let width = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16 + 2;
        let right_edge = self.panes.chart_left + self.panes.chart.cols;
        let x = if col + 2 + width <= right_edge { col + 2 } else { col.saturating_sub(width + 1) };
        let bottom = CONTENT_OFFSET + self.panes.rows;
        let y0 = (*row + 1).min(bottom.saturating_sub(lines.len() as u16));
        print_box(stdout, x, y0, width, lines, overlay_style())?;
        Ok(true)
    }

    fn render_popup(&self, stdout: &mut io::Stdout) -> Result<bool> {
        let Some(popup) = self.scene.popup() else {
            return Ok(false);
        };
        let width = (self.panes.chart.cols * 2 / 3).max(20).min(self.panes.chart.cols);
        let inner = usize::from(width.saturating_sub(2));
        let mut lines = vec![popup.locality.clone()];
        if !popup.entry.date.is_empty() {
            lines.push(popup.entry.date.clone());
        }
        lines.push(format!("[image: {}]", popup.entry.image));
        if !popup.entry.credit.is_empty() {
            lines.push(format!("Photo: {}", popup.entry.credit));
        }
        let body = popup.entry.plain_body();
        if !body.is_empty() {
            lines.push(String::new());
            lines.extend(wrap(&body, inner));
        }
        lines.push(String::new());
        lines.push(format!("{} to close", self.keys.close_popup));
        lines.truncate(usize::from(self.panes.rows.saturating_sub(2)));

        let x = self.panes.chart_left + (self.panes.chart.cols - width) / 2;
        let y = CONTENT_OFFSET + (self.panes.rows.saturating_sub(lines.len() as u16)) / 2;
        print_box(stdout, x, y, width, &lines, overlay_style())?;
        Ok(true)
    }

    fn render_status(&self, stdout: &mut io::Stdout) -> Result<()> {
        let status_y = CONTENT_OFFSET + self.panes.rows;
        let step = self
            .scene
            .current_step()
            .map(|s| format!("Step {}/{} {}", s.index() + 1, Step::ALL.len(), s.name()))
            .unwrap_or_else(|| "No step".to_string());
        let status = format!(
            " {step} | positions: {} | {} to quit ",
            self.scene.position_owner(),
            self.keys.quit,
        );
        let status: String = status.chars().take(usize::from(self.panes.width)).collect();

        let mut cs = style::ContentStyle::default();
        cs.attributes.set(style::Attribute::Dim);

        queue!(
            stdout,
            cursor::MoveTo(0, status_y),
            terminal::Clear(terminal::ClearType::CurrentLine),
            style::PrintStyledContent(style::StyledContent::new(cs, status)),
        )?;
        stdout.flush()?;
        Ok(())
    }
}

fn overlay_style() -> Style {
    Style {
        fg: Some(Color::Named(NamedColor::Black)),
        bg: Some(Color::Named(NamedColor::White)),
        ..Default::default()
    }
}

fn print_box(
    stdout: &mut io::Stdout,
    x: u16,
    y: u16,
    width: u16,
    lines: &[String],
    style: Style,
) -> Result<()> {
    let cs = to_content_style(&style);
    let inner = usize::from(width.saturating_sub(2));
    for (i, line) in lines.iter().enumerate() {
        let text: String = line.chars().take(inner).collect();
        queue!(
            stdout,
            cursor::MoveTo(x, y + i as u16),
            style::PrintStyledContent(style::StyledContent::new(cs, format!(" {text:<inner$} "))),
        )?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Style conversion
// ---------------------------------------------------------------------------

pub fn to_content_style(s: &Style) -> style::ContentStyle {
    let mut cs = style::ContentStyle::default();
    if let Some(fg) = &s.fg {
        cs.foreground_color = Some(to_ct_color(fg));
    }
    if let Some(bg) = &s.bg {
        cs.background_color = Some(to_ct_color(bg));
    }
    if s.bold {
        cs.attributes.set(style::Attribute::Bold);
    }
    if s.dim {
        cs.attributes.set(style::Attribute::Dim);
    }
    cs
}

pub fn to_ct_color(c: &Color) -> style::Color {
    match c {
        Color::Named(n) => match n {
            NamedColor::Black => style::Color::Black,
            NamedColor::Red => style::Color::Red,
            NamedColor::Green => style::Color::Green,
            NamedColor::Yellow => style::Color::Yellow,
            NamedColor::Blue => style::Color::Blue,
            NamedColor::Magenta => style::Color::Magenta,
            NamedColor::Cyan => style::Color::Cyan,
            NamedColor::White => style::Color::White,
        },
        Color::Rgb { r, g, b } => style::Color::Rgb {
            r: *r,
            g: *g,
            b: *b,
        },
    }
}
