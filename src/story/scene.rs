//! The scene every step works on: dimensions and scales, the shared records,
//! the surface they are drawn into, and every animation in flight.
//!
//! All timed work is polled through `advance`. `settle` finishes whatever the
//! previous step left running, so the next step starts from its final state.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use log::{debug, info};
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::StoryConfig;
use crate::data::narrative::{NarrativeEntry, NarrativeStore};
use crate::data::{Dataset, DemolitionRecord};
use crate::engine::queue::{PausableQueue, QueueTiming, Weighted};
use crate::engine::tween::{Track, Tween, TweenSample};
use crate::engine::{Animated, earliest};
use crate::error::StoryError;
use crate::layout::{BarStack, ForceLayout, ForceSpace, GridLayout, MapView, OwnershipLedger, PositionOwner};
use crate::renderer::palette;
use crate::surface::{Align, Category, Element, ElementKey, Layer, Shape, Surface};
use crate::types::{DOTS_Y, Point, Style, Viewport};

use super::lines::PermitLines;
use super::resize::{Dimensions, relayout};
use super::steps::Step;

/// Class carried by nodes laid out in the tile gallery.
pub const TILED: &str = "tiled";
pub const BAR_AXIS_LABEL: &str = "People left homeless";

const NODE_SLACK: f64 = 1.0;
const SETTLE_ROUNDS: usize = 8;
const GRATICULE_STEP: f64 = 0.25;
const REST_TICKS: u32 = 1000;

impl Weighted for NaiveDate {
    fn weight(&self) -> f64 {
        1.0
    }
}

/// Narrative shown for a clicked tile.
#[derive(Debug, Clone, PartialEq)]
pub struct Popup {
    pub id: u32,
    pub locality: String,
    pub entry: NarrativeEntry,
}

/// What runs once a transition has reached its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUp {
    DrawComparisonLine,
    FitMapAndFade,
}

/// Node tracks carry `[cx, cy, width, height, opacity]`; line tracks carry
/// flattened domain points.
#[derive(Debug)]
pub enum Motion {
    Nodes(Tween<u32>),
    Lines(Tween<i32>),
}

enum Sample {
    Nodes(TweenSample<u32>),
    Lines(TweenSample<i32>),
}

#[derive(Debug)]
pub struct Transition {
    motion: Motion,
    follow_up: Option<FollowUp>,
}

impl Transition {
    fn poll(&mut self, now: Duration) -> Option<Sample> {
        match &mut self.motion {
            Motion::Nodes(t) => t.poll(now).map(Sample::Nodes),
            Motion::Lines(t) => t.poll(now).map(Sample::Lines),
        }
    }

    fn flush(&mut self) -> Option<Sample> {
        match &mut self.motion {
            Motion::Nodes(t) => t.flush().map(Sample::Nodes),
            Motion::Lines(t) => t.flush().map(Sample::Lines),
        }
    }

    fn cancel(&mut self) {
        match &mut self.motion {
            Motion::Nodes(t) => t.cancel(),
            Motion::Lines(t) => t.cancel(),
        }
    }

    fn next_deadline(&self) -> Option<Duration> {
        match &self.motion {
            Motion::Nodes(t) => t.next_deadline(),
            Motion::Lines(t) => t.next_deadline(),
        }
    }

    fn is_done(&self) -> bool {
        match &self.motion {
            Motion::Nodes(t) => t.is_done(),
            Motion::Lines(t) => t.is_done(),
        }
    }

    fn moves_nodes(&self) -> bool {
        matches!(self.motion, Motion::Nodes(_))
    }
}

/// Target state of one node: center, size and opacity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NodeTarget {
    pub id: u32,
    pub center: Point,
    pub width: f64,
    pub height: f64,
    pub opacity: f64,
}

#[derive(Debug)]
pub struct SceneContext {
    pub(crate) config: StoryConfig,
    pub(crate) dims: Dimensions,
    pub(crate) records: Vec<DemolitionRecord>,
    /// Record id to its index in `records`; ids are unique and records never
    /// move.
    by_id: HashMap<u32, usize>,
    pub(crate) dates: Vec<NaiveDate>,
    pub(crate) narrative: NarrativeStore,
    pub(crate) surface: Surface,
    pub(crate) lines: PermitLines,
    pub(crate) simulation: ForceLayout,
    pub(crate) ownership: OwnershipLedger,
    pub(crate) map: MapView,
    pub(crate) date_fade: PausableQueue<NaiveDate>,
    pub(crate) date_text: Option<String>,
    pub(crate) transitions: Vec<Transition>,
    pub(crate) stack: Option<BarStack>,
    pub(crate) tiles: Vec<u32>,
    pub(crate) current: Option<Step>,
    pub(crate) tooltip_extra: bool,
    pub(crate) category_labels: bool,
    pub(crate) popup: Option<Popup>,
    pub(crate) scattered: bool,
    pub(crate) rng: SmallRng,
}

impl SceneContext {
    /// Build the scene and start drawing the permit lines.
    pub fn new(
        dataset: Dataset,
        narrative: NarrativeStore,
        config: StoryConfig,
        viewport: Viewport,
        now: Duration,
    ) -> Self {
        let dims = Dimensions::compute(viewport, &config.layout);
        let mut lines = PermitLines::new(dataset.permits, &config.lines, &config.timing);
        lines.start(now);
        let simulation = ForceLayout::new(
            &config.forces,
            Duration::from_millis(config.timing.tick_ms),
            config.seed,
        );
        let map = MapView::new(&config.map, Point::default(), dims.adj_width, dims.adj_height);
        let date_fade = paused_fade(&dataset.demolition_dates);
        let mut surface = Surface::new();
        surface.set_layer_visible(Layer::Basemap, false);
        info!(
            "scene ready: {} records at {:.0}x{:.0} dots",
            dataset.demolitions.len(),
            dims.adj_width,
            dims.adj_height
        );
        let rng = SmallRng::seed_from_u64(config.seed.wrapping_add(1));
        let by_id = dataset
            .demolitions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.id, i))
            .collect();
        let mut scene = SceneContext {
            config,
            dims,
            records: dataset.demolitions,
            by_id,
            dates: dataset.demolition_dates,
            narrative,
            surface,
            lines,
            simulation,
            ownership: OwnershipLedger::default(),
            map,
            date_fade,
            date_text: None,
            transitions: Vec::new(),
            stack: None,
            tiles: Vec::new(),
            current: None,
            tooltip_extra: false,
            category_labels: false,
            popup: None,
            scattered: false,
            rng,
        };
        scene.sync_lines();
        scene
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn surface(&self) -> &Surface {
        &self.surface
    }

    pub fn records(&self) -> &[DemolitionRecord] {
        &self.records
    }

    pub fn record(&self, id: u32) -> Option<&DemolitionRecord> {
        self.by_id.get(&id).and_then(|&i| self.records.get(i))
    }

    fn record_mut(&mut self, id: u32) -> Option<&mut DemolitionRecord> {
        self.by_id.get(&id).and_then(|&i| self.records.get_mut(i))
    }

    pub fn lines(&self) -> &PermitLines {
        &self.lines
    }

    pub fn dimensions(&self) -> &Dimensions {
        &self.dims
    }

    pub fn current_step(&self) -> Option<Step> {
        self.current
    }

    pub fn position_owner(&self) -> PositionOwner {
        self.ownership.holder()
    }

    pub fn simulation(&self) -> &ForceLayout {
        &self.simulation
    }

    pub fn map(&self) -> &MapView {
        &self.map
    }

    pub fn popup(&self) -> Option<&Popup> {
        self.popup.as_ref()
    }

    pub fn date_text(&self) -> Option<&str> {
        self.date_text.as_deref()
    }

    pub fn bar_stack(&self) -> Option<&BarStack> {
        self.stack.as_ref()
    }

    pub fn tiles(&self) -> &[u32] {
        &self.tiles
    }

    pub fn has_pending_transitions(&self) -> bool {
        !self.transitions.is_empty()
    }

    pub fn config(&self) -> &StoryConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Step lifecycle
    // -----------------------------------------------------------------------

    /// Run `step` against the scene. A step that rewrites the scene first
    /// settles whatever earlier steps left in flight.
    pub fn activate(&mut self, step: Step, now: Duration) -> Result<(), StoryError> {
        if step.mutates_scene() && self.current.is_some() {
            self.settle(now);
        }
        debug!("activating {}", step.name());
        self.current = Some(step);
        step.run(self, now)
    }

    /// Finish the permit lines and every transition, including the work
    /// their completion starts. The date fade and the simulation keep going
    /// until a step stops them.
    pub fn settle(&mut self, now: Duration) {
        for _ in 0..SETTLE_ROUNDS {
            self.lines.flush(now);
            self.drive_transitions(now, true);
            if self.transitions.is_empty() && self.lines.next_deadline().is_none() {
                break;
            }
        }
        self.sync_lines();
    }

    /// Do all work due by `now`. Returns whether anything visible changed.
    pub fn advance(&mut self, now: Duration) -> bool {
        let mut changed = false;
        if self.lines.poll(now) {
            self.sync_lines();
            changed = true;
        }
        changed |= self.drive_transitions(now, false);
        if self.ownership.is_held_by(PositionOwner::Simulation) {
            let space = self.force_space();
            if self.simulation.poll(now, &mut self.records, &space) > 0 {
                self.sync_node_positions();
                changed = true;
            }
        }
        for date in self.date_fade.poll(now) {
            self.apply_fade(date);
            changed = true;
        }
        changed
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        earliest(
            [
                self.lines.next_deadline(),
                self.simulation.next_deadline(),
                self.date_fade.next_deadline(),
            ]
            .into_iter()
            .chain(self.transitions.iter().map(Transition::next_deadline)),
        )
    }

    /// New container size: recompute the geometry and re-place the current
    /// step's elements.
    pub fn resize(&mut self, viewport: Viewport, now: Duration) {
        self.dims = Dimensions::compute(viewport, &self.config.layout);
        relayout(self, now);
    }

    /// Tick a running simulation until it cools, for headless rendering.
    pub fn run_simulation_to_rest(&mut self) {
        if !self.ownership.is_held_by(PositionOwner::Simulation) {
            return;
        }
        let space = self.force_space();
        let ticks = self.simulation.run_to_rest(&mut self.records, &space, REST_TICKS);
        if ticks > 0 {
            debug!("simulation ran {ticks} ticks to rest");
            self.sync_node_positions();
        }
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    pub(crate) fn start_transition(&mut self, motion: Motion, follow_up: Option<FollowUp>, now: Duration) {
        let mut transition = Transition { motion, follow_up };
        match &mut transition.motion {
            Motion::Nodes(t) => t.start(now),
            Motion::Lines(t) => t.start(now),
        }
        self.transitions.push(transition);
    }

    /// Interrupt node transitions where they stand. Their follow-ups are
    /// dropped.
    pub(crate) fn cancel_node_transitions(&mut self) {
        for t in self.transitions.iter_mut().filter(|t| t.moves_nodes()) {
            t.cancel();
            t.follow_up = None;
        }
        self.transitions.retain(|t| !t.is_done());
    }

    /// Finish node transitions at once, follow-ups included.
    pub(crate) fn flush_node_transitions(&mut self, now: Duration) {
        self.drive_where(now, true, Transition::moves_nodes);
    }

    fn drive_transitions(&mut self, now: Duration, flush: bool) -> bool {
        self.drive_where(now, flush, |_| true)
    }

    /// Poll (or flush) the transitions `pick` selects; the rest wait.
    fn drive_where(&mut self, now: Duration, flush: bool, pick: impl Fn(&Transition) -> bool) -> bool {
        if self.transitions.is_empty() {
            return false;
        }
        let mut active = std::mem::take(&mut self.transitions);
        let mut changed = false;
        let mut lines_moved = false;
        let mut follow_ups = Vec::new();
        for t in active.iter_mut().filter(|t| pick(t)) {
            let sample = if flush { t.flush() } else { t.poll(now) };
            match sample {
                Some(Sample::Nodes(values)) => {
                    self.apply_node_sample(&values);
                    changed = true;
                }
                Some(Sample::Lines(values)) => {
                    for (year, points) in values {
                        self.lines.apply(year, &points);
                    }
                    lines_moved = true;
                    changed = true;
                }
                None => {}
            }
            if t.is_done() {
                follow_ups.extend(t.follow_up.take());
            }
        }
        active.retain(|t| !t.is_done());
        active.append(&mut self.transitions);
        self.transitions = active;
        if lines_moved {
            self.sync_lines();
        }
        for follow_up in follow_ups {
            self.run_follow_up(follow_up, now);
        }
        changed
    }

    pub(crate) fn run_follow_up(&mut self, follow_up: FollowUp, now: Duration) {
        debug!("transition finished, running {follow_up:?}");
        match follow_up {
            FollowUp::DrawComparisonLine => {
                self.lines.finish_consolidation();
                self.lines.draw_comparison(now);
                self.sync_lines();
            }
            FollowUp::FitMapAndFade => {
                self.fit_map();
                self.reproject_nodes();
                self.start_date_fade(now);
            }
        }
    }

    fn apply_node_sample(&mut self, values: &TweenSample<u32>) {
        for (id, v) in values {
            let [cx, cy, w, h, opacity] = v[..] else {
                continue;
            };
            if let Some(r) = self.record_mut(*id) {
                r.x = cx;
                r.y = cy;
            }
            if let Some(e) = self.surface.get_mut(ElementKey::Node(*id)) {
                e.set_rect(Point::new(cx - w / 2.0, cy - h / 2.0), w, h);
                e.opacity = opacity;
            }
        }
    }

    /// A tween from each node's current state to its target.
    pub(crate) fn node_tween(&self, targets: &[NodeTarget], duration: Duration) -> Tween<u32> {
        let tracks = targets
            .iter()
            .filter_map(|t| {
                let e = self.surface.get(ElementKey::Node(t.id))?;
                let (origin, w, h) = e.rect()?;
                let from = vec![origin.x + w / 2.0, origin.y + h / 2.0, w, h, e.opacity];
                let to = vec![t.center.x, t.center.y, t.width, t.height, t.opacity];
                Some(Track::new(t.id, from, to))
            })
            .collect();
        Tween::new(tracks, duration).with_frame(self.frame())
    }

    /// Move nodes to their targets now, or by a transition when `animate`.
    pub(crate) fn move_nodes(&mut self, targets: &[NodeTarget], animate: bool, now: Duration) {
        if animate {
            let tween = self.node_tween(targets, self.transition_duration());
            self.start_transition(Motion::Nodes(tween), None, now);
            return;
        }
        let sample: TweenSample<u32> = targets
            .iter()
            .map(|t| (t.id, vec![t.center.x, t.center.y, t.width, t.height, t.opacity]))
            .collect();
        self.apply_node_sample(&sample);
    }

    pub(crate) fn transition_duration(&self) -> Duration {
        Duration::from_millis(self.config.timing.transition_ms)
    }

    pub(crate) fn frame(&self) -> Duration {
        Duration::from_millis(self.config.timing.frame_ms)
    }

    // -----------------------------------------------------------------------
    // Position ownership
    // -----------------------------------------------------------------------

    /// Hand the record positions to `owner`. A running simulation is stopped
    /// first so its ticks never fight the new layout.
    pub fn transfer_positions(&mut self, owner: PositionOwner) -> Result<(), StoryError> {
        if owner != PositionOwner::Simulation && self.ownership.is_held_by(PositionOwner::Simulation) {
            self.simulation.stop();
        }
        self.ownership.transfer(owner)
    }

    pub(crate) fn force_space(&self) -> ForceSpace {
        ForceSpace {
            x: self.dims.x,
            y: self.dims.y,
            factor: self.dims.factor,
        }
    }

    // -----------------------------------------------------------------------
    // Nodes
    // -----------------------------------------------------------------------

    pub(crate) fn node_size(&self, record: &DemolitionRecord) -> (f64, f64) {
        record.node_size(self.config.rect.width, self.config.rect.height, self.dims.factor)
    }

    /// One interactive rect per record, centered on its position.
    pub(crate) fn create_nodes(&mut self) {
        self.surface.remove_where(|k| matches!(k, ElementKey::Node(_)));
        let opacity = self.config.rect.opacity;
        let nodes: Vec<(u32, Element)> = self
            .records
            .iter()
            .map(|r| {
                let (w, h) = self.node_size(r);
                let shape = Shape::rect(Point::new(r.x - w / 2.0, r.y - h / 2.0), w, h);
                let element = Element::new(Layer::Chart, shape, palette::node())
                    .with_opacity(opacity)
                    .interactive();
                (r.id, element)
            })
            .collect();
        for (id, element) in nodes {
            self.surface.insert(ElementKey::Node(id), element);
        }
        debug!("created {} nodes", self.records.len());
    }

    /// Write record positions into the node rects, keeping their sizes.
    pub(crate) fn sync_node_positions(&mut self) {
        for r in &self.records {
            if let Some(e) = self.surface.get_mut(ElementKey::Node(r.id)) {
                if let Some((_, w, h)) = e.rect() {
                    e.set_rect(Point::new(r.x - w / 2.0, r.y - h / 2.0), w, h);
                }
            }
        }
    }

    /// Resize node rects for the current factor, keeping their centers.
    pub(crate) fn resize_nodes(&mut self) {
        let sizes: Vec<(u32, f64, f64, Point)> = self
            .records
            .iter()
            .map(|r| {
                let (w, h) = self.node_size(r);
                (r.id, w, h, Point::new(r.x, r.y))
            })
            .collect();
        for (id, w, h, center) in sizes {
            if let Some(e) = self.surface.get_mut(ElementKey::Node(id)) {
                e.set_rect(Point::new(center.x - w / 2.0, center.y - h / 2.0), w, h);
            }
        }
    }

    pub(crate) fn reparent_nodes(&mut self, layer: Layer) {
        for r in &self.records {
            self.surface.reparent(ElementKey::Node(r.id), layer);
        }
    }

    pub(crate) fn style_nodes(&mut self, style: Style) {
        for r in &self.records {
            if let Some(e) = self.surface.get_mut(ElementKey::Node(r.id)) {
                e.style = style.clone();
            }
        }
    }

    // -----------------------------------------------------------------------
    // Labels
    // -----------------------------------------------------------------------

    pub(crate) fn show_category_labels(&mut self) {
        let y = 90.0 + 7.5 / self.dims.factor;
        for (category, x, text) in [
            (Category::Granted, 8.0, "Granted (1%)"),
            (Category::Denied, 70.0, "Denied (99%)"),
        ] {
            let anchor = self.dims.walk(x, y);
            self.surface.insert(
                ElementKey::CategoryLabel(category),
                Element::new(Layer::Labels, Shape::caption(anchor, text), palette::caption()),
            );
        }
        self.category_labels = true;
    }

    pub(crate) fn remove_category_labels(&mut self) {
        self.surface.remove_where(|k| matches!(k, ElementKey::CategoryLabel(_)));
        self.category_labels = false;
    }

    pub(crate) fn set_date_display(&mut self, text: Option<String>) {
        match &text {
            Some(t) => {
                let anchor = Point::new(self.dims.adj_width, 0.0);
                self.surface.insert(
                    ElementKey::DateDisplay,
                    Element::new(Layer::Labels, Shape::aligned(anchor, t.clone(), Align::Right), palette::caption()),
                );
            }
            None => {
                self.surface.remove(ElementKey::DateDisplay);
            }
        }
        self.date_text = text;
    }

    pub(crate) fn remove_bar_axes(&mut self) {
        self.surface
            .remove_where(|k| matches!(k, ElementKey::BarYearLabel(_) | ElementKey::BarAxisLabel));
    }

    pub fn sync_lines(&mut self) {
        self.lines.sync(&mut self.surface, &self.dims.x, &self.dims.y);
    }

    // -----------------------------------------------------------------------
    // Map
    // -----------------------------------------------------------------------

    /// Where a record sits on the map: its projected location plus jitter.
    pub(crate) fn map_target(&self, record: &DemolitionRecord) -> Point {
        let p = self.map.project(record.longitude, record.latitude);
        Point::new(
            p.x + record.offset_x * self.dims.factor,
            p.y + record.offset_y * self.dims.factor,
        )
    }

    pub(crate) fn fit_map(&mut self) {
        let coords: Vec<(f64, f64)> = self
            .records
            .iter()
            .filter(|r| r.show_on_map)
            .map(|r| (r.longitude, r.latitude))
            .collect();
        self.map
            .fit_bounds(&coords, self.config.map.fit_padding * self.dims.factor);
        self.draw_graticule();
    }

    pub(crate) fn draw_graticule(&mut self) {
        self.surface.remove_where(|k| matches!(k, ElementKey::Graticule(_)));
        for (i, points) in self.map.graticule(GRATICULE_STEP).into_iter().enumerate() {
            self.surface.insert(
                ElementKey::Graticule(i),
                Element::new(Layer::Basemap, Shape::Path { points }, palette::basemap()),
            );
        }
    }

    /// Re-project map nodes after the view moved.
    pub(crate) fn reproject_nodes(&mut self) {
        let targets: Vec<(u32, Point)> = self
            .records
            .iter()
            .filter(|r| r.show_on_map)
            .map(|r| (r.id, self.map_target(r)))
            .collect();
        for (id, center) in targets {
            if let Some(r) = self.record_mut(id) {
                r.x = center.x;
                r.y = center.y;
            }
            if let Some(e) = self.surface.get_mut(ElementKey::Node(id)) {
                if let Some((_, w, h)) = e.rect() {
                    e.set_rect(Point::new(center.x - w / 2.0, center.y - h / 2.0), w, h);
                }
            }
        }
    }

    /// Follow the container after a resize: new map area, refit, re-project.
    pub(crate) fn refit_map(&mut self) {
        self.map
            .resize(Point::default(), self.dims.adj_width, self.dims.adj_height);
        self.resize_nodes();
        self.fit_map();
        self.reproject_nodes();
    }

    fn start_date_fade(&mut self, now: Duration) {
        if self.dates.is_empty() {
            return;
        }
        let total = Duration::from_millis(self.config.timing.date_fade_total_ms);
        let per_date = total / u32::try_from(self.dates.len()).unwrap_or(u32::MAX);
        self.date_fade = PausableQueue::new(self.dates.clone(), QueueTiming::fixed(per_date));
        self.date_fade.resume(now);
        debug!("date fade over {} dates, {per_date:?} each", self.dates.len());
    }

    pub(crate) fn reset_date_fade(&mut self) {
        self.date_fade = paused_fade(&self.dates);
    }

    pub(crate) fn pause_date_fade(&mut self) {
        self.date_fade.pause();
    }

    /// Fade every map record demolished on or before `date`.
    fn apply_fade(&mut self, date: NaiveDate) {
        let rect = &self.config.rect;
        for r in self.records.iter().filter(|r| !r.simulate_grant) {
            let opacity = if r.show_on_map && r.demolition_date <= date {
                rect.demolished_opacity
            } else {
                rect.opacity
            };
            self.surface.set_opacity(ElementKey::Node(r.id), opacity);
        }
        self.set_date_display(Some(format!("Year: {}", date.year())));
    }

    // -----------------------------------------------------------------------
    // Static layouts
    // -----------------------------------------------------------------------

    /// Stack the nodes into homeless-by-year bars and label the axes.
    pub(crate) fn place_bar_stack(&mut self, now: Duration, animate: bool) {
        let f = self.dims.factor;
        let m = self.config.layout.bar_margin.scaled(f);
        let origin = Point::new(m.left, m.top);
        let width = (self.dims.adj_width - m.left - m.right).max(1.0);
        let height = (self.dims.adj_height - m.top - m.bottom).max(1.0);
        let stack = BarStack::layout(&self.records, origin, width, height);
        let opacity = self.config.rect.bar_opacity;
        let targets: Vec<NodeTarget> = stack
            .slots
            .iter()
            .map(|s| NodeTarget {
                id: s.id,
                center: s.center(),
                width: s.width,
                height: s.height,
                opacity,
            })
            .collect();
        self.move_nodes(&targets, animate, now);

        self.remove_bar_axes();
        for (year, anchor) in stack.year_anchors() {
            let below = Point::new(anchor.x, anchor.y + f64::from(DOTS_Y));
            self.surface.insert(
                ElementKey::BarYearLabel(year),
                Element::new(
                    Layer::Labels,
                    Shape::aligned(below, year.to_string(), Align::Center),
                    palette::label(),
                ),
            );
        }
        let axis = Point::new(origin.x, (origin.y - 2.0 * f64::from(DOTS_Y)).max(0.0));
        self.surface.insert(
            ElementKey::BarAxisLabel,
            Element::new(Layer::Labels, Shape::text(axis, BAR_AXIS_LABEL), palette::label()),
        );
        self.stack = Some(stack);
    }

    /// Lay the tile records out on a square grid centered in the chart.
    pub(crate) fn place_tiles(&mut self, now: Duration, animate: bool) {
        let side = self.dims.adj_height;
        let grid = GridLayout::calculate(self.tiles.len(), side, side);
        let (w, h) = grid.extent();
        let origin = Point::new((self.dims.adj_width - w) / 2.0, (self.dims.adj_height - h) / 2.0);
        let size = (grid.tile_size - 1.0).max(1.0);
        let opacity = self.config.rect.opacity;
        let targets: Vec<NodeTarget> = self
            .tiles
            .iter()
            .enumerate()
            .map(|(i, &id)| {
                let corner = grid.cell(i, origin);
                NodeTarget {
                    id,
                    center: Point::new(corner.x + grid.tile_size / 2.0, corner.y + grid.tile_size / 2.0),
                    width: size,
                    height: size,
                    opacity,
                }
            })
            .collect();
        self.move_nodes(&targets, animate, now);

        self.surface.remove_where(|k| matches!(k, ElementKey::TileCaption(_)));
        for t in &targets {
            let Some(caption) = self.record(t.id).map(|r| r.locality_cleaned.clone()) else {
                continue;
            };
            self.surface.insert(
                ElementKey::TileCaption(t.id),
                Element::new(Layer::Labels, Shape::caption(t.center, caption), palette::caption()),
            );
        }
    }

    // -----------------------------------------------------------------------
    // Pointer
    // -----------------------------------------------------------------------

    /// Tooltip lines for the node under `p`.
    pub fn tooltip_at(&self, p: Point) -> Option<Vec<String>> {
        let id = self.surface.hit_test(p, NODE_SLACK)?.node_id()?;
        let r = self.record(id)?;
        let mut lines = vec![
            format!("Housing units: {}", r.housing_units),
            format!("Locality: {}", r.locality_cleaned),
            format!("District: {}", r.district),
        ];
        if self.tooltip_extra {
            lines.push(format!("People left homeless: {}", r.people_homeless));
        }
        Some(lines)
    }

    /// Open the narrative popup when `p` hits a gallery tile. Returns
    /// whether one opened.
    pub fn click_at(&mut self, p: Point) -> bool {
        let Some(key) = self.surface.hit_test(p, NODE_SLACK) else {
            return false;
        };
        let Some(id) = key.node_id() else {
            return false;
        };
        if !self.surface.has_class(key, TILED) {
            return false;
        }
        let Some(r) = self.record(id) else {
            return false;
        };
        debug!("opening popup for {}", r.locality);
        self.popup = Some(Popup {
            id,
            locality: r.locality_cleaned.clone(),
            entry: self.narrative.lookup(&r.locality).clone(),
        });
        true
    }

    pub fn close_popup(&mut self) -> bool {
        self.popup.take().is_some()
    }
}

fn paused_fade(dates: &[NaiveDate]) -> PausableQueue<NaiveDate> {
    PausableQueue::new(dates.to_vec(), QueueTiming::fixed(Duration::ZERO))
}
