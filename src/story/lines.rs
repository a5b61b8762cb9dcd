//! Permit lines: one zigzag ribbon per year, revealed in turn, that can be
//! consolidated into a single decade ribbon and pulled apart again, plus the
//! comparison ribbon drawn once consolidation finishes.
//!
//! Line data lives in domain units. `sync` maps it through the current scales
//! into the surface, so a resize only needs another `sync`.

use std::time::Duration;

use log::debug;

use crate::config::{LineConfig, TimingConfig};
use crate::data::PermitRecord;
use crate::engine::Animated;
use crate::engine::path::{Oscillation, PathPoint, oscillating_path};
use crate::engine::queue::{PausableQueue, QueueTiming, Weighted};
use crate::engine::reveal::IncrementalReveal;
use crate::engine::tween::{Track, Tween};
use crate::layout::LinearScale;
use crate::renderer::palette;
use crate::surface::{Align, Element, ElementKey, Layer, Shape, Surface};
use crate::types::Point;

pub const DECADE_LABEL: &str = "Permits granted to Palestinians in a decade";
pub const COMPARISON_LABEL: &str = "Permits granted to Israelis in a single year";

/// A year waiting to be drawn, with the size of its ribbon.
#[derive(Debug, Clone)]
struct QueuedYear {
    permit: PermitRecord,
    points: usize,
}

impl Weighted for QueuedYear {
    /// A year keeps the queue busy for as long as its ribbon takes to draw.
    fn weight(&self) -> f64 {
        self.points as f64
    }
}

#[derive(Debug, Clone)]
pub struct PermitLine {
    pub year: i32,
    /// Points in the ribbon: the permit count plus the buffer.
    pub count: usize,
    /// Value of the first point of the year's own ribbon.
    pub label_value: f64,
    reveal: IncrementalReveal<PathPoint>,
}

impl PermitLine {
    pub fn label(&self) -> String {
        format!("{} - {}", self.year, self.count)
    }

    pub fn revealed(&self) -> &[PathPoint] {
        self.reveal.revealed()
    }

    pub fn is_complete(&self) -> bool {
        self.reveal.is_complete()
    }
}

#[derive(Debug)]
struct Comparison {
    reveal: IncrementalReveal<PathPoint>,
    label_value: f64,
}

#[derive(Debug)]
pub struct PermitLines {
    config: LineConfig,
    reveal_interval: Duration,
    queue: PausableQueue<QueuedYear>,
    lines: Vec<PermitLine>,
    /// Where the next ribbon starts; moves down as ribbons are laid out.
    y_start: f64,
    consolidated: bool,
    fast_consolidate: bool,
    comparison: Option<Comparison>,
    comparison_redraw: bool,
    comparison_visible: bool,
    lines_visible: bool,
    year_labels_visible: bool,
    decade_label: Option<f64>,
}

impl PermitLines {
    pub fn new(permits: Vec<PermitRecord>, config: &LineConfig, timing: &TimingConfig) -> Self {
        let reveal_interval = Duration::from_millis(timing.reveal_interval_ms);
        let years = permits
            .into_iter()
            .map(|permit| QueuedYear {
                points: (permit.permit_count + config.permit_buffer) as usize,
                permit,
            })
            .collect();
        let queue = PausableQueue::new(
            years,
            QueueTiming {
                per_unit: reveal_interval,
                floor: Duration::from_millis(timing.queue_floor_ms),
            },
        );
        PermitLines {
            config: config.clone(),
            reveal_interval,
            queue,
            lines: Vec::new(),
            y_start: config.y_start,
            consolidated: false,
            fast_consolidate: false,
            comparison: None,
            comparison_redraw: true,
            comparison_visible: false,
            lines_visible: true,
            year_labels_visible: true,
            decade_label: None,
        }
    }

    /// Begin handing out years.
    pub fn start(&mut self, now: Duration) {
        self.queue.resume(now);
    }

    pub fn lines(&self) -> &[PermitLine] {
        &self.lines
    }

    pub fn y_start(&self) -> f64 {
        self.y_start
    }

    pub fn is_consolidated(&self) -> bool {
        self.consolidated
    }

    pub fn is_fast(&self) -> bool {
        self.fast_consolidate
    }

    pub fn queue_cursor(&self) -> usize {
        self.queue.cursor()
    }

    pub fn comparison_points(&self) -> Option<&[PathPoint]> {
        self.comparison.as_ref().map(|c| c.reveal.revealed())
    }

    pub fn is_comparison_visible(&self) -> bool {
        self.comparison_visible && self.comparison.is_some()
    }

    pub fn is_visible(&self) -> bool {
        self.lines_visible
    }

    fn turn(&self) -> usize {
        self.config.steps_until_turn()
    }

    fn ribbon(&self, total_steps: usize, initial_value: f64) -> Vec<PathPoint> {
        oscillating_path(&Oscillation {
            total_steps,
            step_length: self.config.length,
            initial_value,
            value_change: self.config.y_change,
            increasing: false,
            cycle_length: self.turn(),
        })
    }

    /// Lower the running start below a ribbon of `count` points.
    fn step_down(&mut self, count: usize) {
        let turn = self.turn();
        if count > turn {
            self.y_start -= (count / turn) as f64 * self.config.y_change;
        } else {
            self.y_start -= self.config.y_change;
        }
    }

    fn add_line(&mut self, year: QueuedYear, now: Duration) {
        let QueuedYear { permit, points: count } = year;
        let points = self.ribbon(count, self.y_start);
        let label_value = points.first().map_or(self.y_start, |p| p.value);
        let mut reveal = IncrementalReveal::new(points, self.reveal_interval);
        reveal.start(now);
        debug!("drawing permit line {} ({count} points)", permit.year);
        self.lines.push(PermitLine {
            year: permit.year,
            count,
            label_value,
            reveal,
        });
        self.step_down(count);
    }

    /// Deliver due years and advance every reveal. Returns whether anything
    /// visible changed.
    pub fn poll(&mut self, now: Duration) -> bool {
        let mut changed = false;
        for year in self.queue.poll(now) {
            self.add_line(year, now);
            changed = true;
        }
        for line in &mut self.lines {
            changed |= line.reveal.poll(now);
        }
        if let Some(c) = &mut self.comparison {
            changed |= c.reveal.poll(now);
        }
        changed
    }

    /// Deliver every queued year now.
    pub fn flush_queue(&mut self, now: Duration) -> bool {
        let pending = self.queue.flush();
        let changed = !pending.is_empty();
        for year in pending {
            self.add_line(year, now);
        }
        changed
    }

    /// Finish the queue, every year's reveal and the comparison reveal.
    pub fn flush(&mut self, now: Duration) -> bool {
        let mut changed = self.flush_queue(now);
        for line in &mut self.lines {
            changed |= line.reveal.flush();
        }
        changed |= self.flush_comparison();
        changed
    }

    pub fn flush_comparison(&mut self) -> bool {
        match &mut self.comparison {
            Some(c) => c.reveal.flush(),
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        crate::engine::earliest(
            std::iter::once(self.queue.next_deadline())
                .chain(self.lines.iter().map(|l| l.reveal.next_deadline()))
                .chain(self.comparison.iter().map(|c| c.reveal.next_deadline())),
        )
    }

    fn line_tween(&self, targets: Vec<(i32, Vec<PathPoint>)>, duration: Duration, frame: Duration) -> Tween<i32> {
        let tracks = targets
            .into_iter()
            .filter_map(|(year, to)| {
                let line = self.lines.iter().find(|l| l.year == year)?;
                Some(Track::new(year, flatten(line.revealed()), flatten(&to)))
            })
            .collect();
        Tween::new(tracks, duration).with_frame(frame)
    }

    /// Pull every drawn ribbon onto consecutive slices of one decade ribbon.
    /// Returns the transition, or `None` when there is nothing to move.
    pub fn consolidate(&mut self, duration: Duration, frame: Duration) -> Option<Tween<i32>> {
        self.lines_visible = true;
        self.y_start = self.config.y_start;
        if self.lines.is_empty() {
            return None;
        }

        let total: usize = self.lines.iter().map(|l| l.count).sum();
        let aggregate = self.ribbon(total, self.y_start);
        self.year_labels_visible = false;
        self.decade_label = aggregate.first().map(|p| p.value + 3.0);

        let mut index = 0usize;
        let mut targets = Vec::with_capacity(self.lines.len());
        for line in &self.lines {
            let end = (index + line.count).min(aggregate.len());
            let start = index.min(end);
            targets.push((line.year, aggregate[start..end].to_vec()));
            // Each slice starts on the previous slice's last point.
            index += line.count.saturating_sub(1);
        }

        self.consolidated = true;
        let duration = if self.fast_consolidate { Duration::ZERO } else { duration };
        debug!("consolidating {} permit lines into {total} points", self.lines.len());
        Some(self.line_tween(targets, duration, frame))
    }

    /// Bookkeeping once every ribbon has reached its slice.
    pub fn finish_consolidation(&mut self) {
        if self.lines.is_empty() {
            return;
        }
        self.fast_consolidate = true;
        let total: usize = self.lines.iter().map(|l| l.count).sum();
        let turn = self.turn();
        if total > turn {
            self.y_start -= (total / turn) as f64 * self.config.y_change + self.config.y_change;
        } else {
            self.y_start -= self.config.y_change;
        }
    }

    /// Send every delivered ribbon back to its own place. Years still queued
    /// continue below the last one.
    pub fn unconsolidate(&mut self, duration: Duration, frame: Duration) -> Option<Tween<i32>> {
        self.fast_consolidate = false;
        self.comparison_redraw = true;
        self.lines_visible = true;
        self.year_labels_visible = true;
        self.decade_label = None;
        self.y_start = self.config.y_start;

        let counts: Vec<(i32, usize)> = self.lines.iter().map(|l| (l.year, l.count)).collect();
        let mut targets = Vec::with_capacity(counts.len());
        for (year, count) in counts {
            targets.push((year, self.ribbon(count, self.y_start)));
            self.step_down(count);
        }
        if !std::mem::replace(&mut self.consolidated, false) || targets.is_empty() {
            return None;
        }
        Some(self.line_tween(targets, duration, frame))
    }

    pub fn apply(&mut self, year: i32, values: &[f64]) {
        if let Some(line) = self.lines.iter_mut().find(|l| l.year == year) {
            line.reveal.set_points(unflatten(values));
        }
    }

    /// Show the comparison ribbon, drawing it afresh unless the previous
    /// one is being kept.
    pub fn draw_comparison(&mut self, now: Duration) {
        self.comparison_visible = true;
        if !self.comparison_redraw && self.comparison.is_some() {
            return;
        }
        let speedup = self.config.comparison_speedup.max(1) as usize;
        let points = oscillating_path(&Oscillation {
            total_steps: self.config.comparison_total as usize / speedup,
            step_length: self.config.length * speedup as f64,
            initial_value: self.y_start - 1.0,
            value_change: self.config.y_change,
            increasing: false,
            cycle_length: (self.turn() / speedup).max(1),
        });
        let mut reveal = IncrementalReveal::new(points, self.reveal_interval);
        reveal.start(now);
        debug!("drawing comparison line from {}", self.y_start - 1.0);
        self.comparison = Some(Comparison {
            reveal,
            label_value: self.y_start + 1.75,
        });
    }

    /// Keep the current comparison ribbon for the next time it is shown.
    pub fn keep_comparison(&mut self) {
        self.comparison_redraw = false;
    }

    pub fn hide_comparison(&mut self) {
        self.comparison_visible = false;
    }

    /// Hide the ribbons and all their labels.
    pub fn hide(&mut self) {
        self.lines_visible = false;
        self.year_labels_visible = false;
        self.decade_label = None;
    }

    /// Write every ribbon and label into `surface`.
    pub fn sync(&self, surface: &mut Surface, x: &LinearScale, y: &LinearScale) {
        let to_dots = |p: &PathPoint| Point::new(x.apply(p.step), y.apply(p.value));
        for line in &self.lines {
            let points = line.revealed().iter().map(to_dots).collect();
            let mut path = Element::new(Layer::Chart, Shape::Path { points }, palette::permit_line());
            path.visible = self.lines_visible;
            surface.insert(ElementKey::PermitLine(line.year), path);

            let anchor = Point::new(x.apply(-2.0), y.apply(line.label_value));
            let mut label = Element::new(
                Layer::Labels,
                Shape::aligned(anchor, line.label(), Align::Right),
                palette::label(),
            );
            label.visible = self.lines_visible && self.year_labels_visible;
            surface.insert(ElementKey::PermitLabel(line.year), label);
        }

        match self.decade_label {
            Some(value) if self.lines_visible => surface.insert(
                ElementKey::DecadeLabel,
                Element::new(
                    Layer::Labels,
                    Shape::text(Point::new(x.apply(15.0), y.apply(value)), DECADE_LABEL),
                    palette::label(),
                ),
            ),
            _ => {
                surface.remove(ElementKey::DecadeLabel);
            }
        }

        match &self.comparison {
            Some(c) => {
                let points = c.reveal.revealed().iter().map(to_dots).collect();
                let mut path = Element::new(Layer::Chart, Shape::Path { points }, palette::comparison_line());
                path.visible = self.comparison_visible;
                surface.insert(ElementKey::ComparisonLine, path);
                let mut label = Element::new(
                    Layer::Labels,
                    Shape::text(Point::new(x.apply(14.2), y.apply(c.label_value)), COMPARISON_LABEL),
                    palette::label(),
                );
                label.visible = self.comparison_visible;
                surface.insert(ElementKey::ComparisonLabel, label);
            }
            None => {
                surface.remove(ElementKey::ComparisonLine);
                surface.remove(ElementKey::ComparisonLabel);
            }
        }
    }
}

fn flatten(points: &[PathPoint]) -> Vec<f64> {
    points.iter().flat_map(|p| [p.step, p.value]).collect()
}

fn unflatten(values: &[f64]) -> Vec<PathPoint> {
    values
        .chunks_exact(2)
        .map(|pair| PathPoint {
            step: pair[0],
            value: pair[1],
        })
        .collect()
}
