//! Force-directed node layout over the demolition records.
//!
//! A velocity-Verlet relaxation in the style of d3-force: per-record x/y
//! attraction toward a target, pairwise collision, exponential alpha cooling.
//! Targets live in domain units and are mapped through the current scales on
//! every tick, so a resize only has to swap the scales and reheat.

use std::collections::HashMap;
use std::time::Duration;

use log::debug;
use rand::Rng;
use rand::SeedableRng;
use rand::rngs::SmallRng;

use crate::config::ForceConfig;
use crate::data::DemolitionRecord;
use crate::types::Point;

use super::scale::LinearScale;

const INITIAL_RADIUS: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collide {
    /// Reference units; scaled by the space's factor when applied.
    pub radius: f64,
    pub strength: f64,
}

/// Attraction targets (domain units, keyed by record id) and their strength.
#[derive(Debug, Clone, Default)]
pub struct Forces {
    pub strength: f64,
    pub targets: HashMap<u32, Point>,
    /// `None` on retarget keeps the collision force already in place.
    pub collide: Option<Collide>,
}

impl Forces {
    pub fn new(strength: f64) -> Self {
        Forces {
            strength,
            ..Default::default()
        }
    }

    pub fn with_target(mut self, id: u32, target: Point) -> Self {
        self.targets.insert(id, target);
        self
    }

    pub fn with_collide(mut self, collide: Collide) -> Self {
        self.collide = Some(collide);
        self
    }
}

/// Scales and size factor the layout currently renders into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ForceSpace {
    pub x: LinearScale,
    pub y: LinearScale,
    pub factor: f64,
}

#[derive(Debug, Clone)]
struct Body {
    index: usize,
    id: u32,
    vx: f64,
    vy: f64,
    target: Option<Point>,
}

#[derive(Debug)]
pub struct ForceLayout {
    config: ForceConfig,
    tick_interval: Duration,
    bodies: Vec<Body>,
    strength: f64,
    collide: Option<Collide>,
    alpha: f64,
    alpha_decay: f64,
    deadline: Option<Duration>,
    ticks: u64,
    rng: SmallRng,
}

impl ForceLayout {
    pub fn new(config: &ForceConfig, tick_interval: Duration, seed: u64) -> Self {
        let alpha_min = config.alpha_min.clamp(1e-9, 1.0);
        ForceLayout {
            config: config.clone(),
            tick_interval: tick_interval.max(Duration::from_millis(1)),
            bodies: Vec::new(),
            strength: 0.0,
            collide: None,
            alpha: 1.0,
            alpha_decay: 1.0 - alpha_min.powf(1.0 / 300.0),
            deadline: None,
            ticks: 0,
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    /// Replace the bodies with `records` and run with fresh forces. Any
    /// previous run is stopped first; no records means no ticks.
    pub fn start(&mut self, now: Duration, records: &[DemolitionRecord], forces: Forces, alpha: f64) {
        self.stop();
        self.bodies = records
            .iter()
            .enumerate()
            .map(|(index, r)| Body {
                index,
                id: r.id,
                vx: 0.0,
                vy: 0.0,
                target: None,
            })
            .collect();
        self.collide = None;
        self.ticks = 0;
        debug!("simulation started with {} bodies", self.bodies.len());
        self.retarget(now, forces, alpha);
    }

    /// Swap the attraction forces on the running bodies and reheat.
    pub fn retarget(&mut self, now: Duration, forces: Forces, alpha: f64) {
        if forces.collide.is_some() {
            self.collide = forces.collide;
        }
        self.strength = forces.strength;
        for body in &mut self.bodies {
            body.target = forces.targets.get(&body.id).copied();
        }
        self.reheat(now, alpha);
    }

    pub fn reheat(&mut self, now: Duration, alpha: f64) {
        self.alpha = alpha;
        if self.bodies.is_empty() {
            return;
        }
        self.deadline = Some(now);
    }

    /// Freeze positions. Safe to call at any time, any number of times.
    pub fn stop(&mut self) -> bool {
        let was_running = self.deadline.take().is_some();
        if was_running {
            debug!("simulation stopped after {} ticks", self.ticks);
        }
        was_running
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Domain-space target of the body for record `id`.
    pub fn target_of(&self, id: u32) -> Option<Point> {
        self.bodies.iter().find(|b| b.id == id).and_then(|b| b.target)
    }

    /// Run every tick that fell due by `now`, at most `max_ticks_per_poll`.
    pub fn poll(&mut self, now: Duration, records: &mut [DemolitionRecord], space: &ForceSpace) -> u32 {
        let Some(mut due) = self.deadline else {
            return 0;
        };
        let mut ran = 0;
        while due <= now && ran < self.config.max_ticks_per_poll.max(1) {
            self.tick(records, space);
            ran += 1;
            if self.alpha < self.config.alpha_min {
                self.deadline = None;
                debug!("simulation cooled after {} ticks", self.ticks);
                return ran;
            }
            due += self.tick_interval;
        }
        if due <= now {
            // Fell behind; drop the backlog rather than spinning.
            due = now + self.tick_interval;
        }
        self.deadline = Some(due);
        ran
    }

    /// Tick until cool, for headless rendering. Returns the ticks run.
    pub fn run_to_rest(&mut self, records: &mut [DemolitionRecord], space: &ForceSpace, max_ticks: u32) -> u32 {
        if self.deadline.is_none() {
            return 0;
        }
        let mut ran = 0;
        while ran < max_ticks && self.alpha >= self.config.alpha_min {
            self.tick(records, space);
            ran += 1;
        }
        self.deadline = None;
        ran
    }

    /// One relaxation step.
    pub fn tick(&mut self, records: &mut [DemolitionRecord], space: &ForceSpace) {
        if self.bodies.is_empty() {
            return;
        }
        self.alpha += (0.0 - self.alpha) * self.alpha_decay;
        self.ticks += 1;

        let k = self.strength * self.alpha;
        for body in &mut self.bodies {
            let (Some(target), Some(record)) = (body.target, records.get(body.index)) else {
                continue;
            };
            body.vx += (space.x.apply(target.x) - record.x) * k;
            body.vy += (space.y.apply(target.y) - record.y) * k;
        }

        if let Some(collide) = self.collide {
            self.apply_collide(records, collide.radius * space.factor, collide.strength);
        }

        let keep = 1.0 - self.config.velocity_decay;
        for body in &mut self.bodies {
            let Some(record) = records.get_mut(body.index) else {
                continue;
            };
            body.vx *= keep;
            body.vy *= keep;
            record.x += body.vx;
            record.y += body.vy;
        }
    }

    fn apply_collide(&mut self, records: &[DemolitionRecord], radius: f64, strength: f64) {
        if radius <= 0.0 {
            return;
        }
        let reach = radius * 2.0;
        let cell = reach.max(1e-6);
        let predicted: Vec<(f64, f64)> = self
            .bodies
            .iter()
            .map(|b| match records.get(b.index) {
                Some(r) => (r.x + b.vx, r.y + b.vy),
                None => (f64::NAN, f64::NAN),
            })
            .collect();

        let mut grid: HashMap<(i64, i64), Vec<usize>> = HashMap::new();
        for (i, &(x, y)) in predicted.iter().enumerate() {
            if x.is_finite() && y.is_finite() {
                grid.entry(grid_key(x, y, cell)).or_default().push(i);
            }
        }

        for i in 0..self.bodies.len() {
            let (xi, yi) = predicted[i];
            if !xi.is_finite() || !yi.is_finite() {
                continue;
            }
            let (gx, gy) = grid_key(xi, yi, cell);
            for dx in -1..=1 {
                for dy in -1..=1 {
                    let Some(cell_members) = grid.get(&(gx + dx, gy + dy)) else {
                        continue;
                    };
                    for &j in cell_members {
                        if j <= i {
                            continue;
                        }
                        let Some(other) = records.get(self.bodies[j].index) else {
                            continue;
                        };
                        let mut x = xi - other.x - self.bodies[j].vx;
                        let mut y = yi - other.y - self.bodies[j].vy;
                        let mut l = x * x + y * y;
                        if l >= reach * reach {
                            continue;
                        }
                        if x == 0.0 {
                            x = self.jiggle();
                            l += x * x;
                        }
                        if y == 0.0 {
                            y = self.jiggle();
                            l += y * y;
                        }
                        let d = l.sqrt();
                        let push = (reach - d) / d * strength;
                        x *= push;
                        y *= push;
                        // Equal radii: each side takes half.
                        self.bodies[i].vx += x * 0.5;
                        self.bodies[i].vy += y * 0.5;
                        self.bodies[j].vx -= x * 0.5;
                        self.bodies[j].vy -= y * 0.5;
                    }
                }
            }
        }
    }

    fn jiggle(&mut self) -> f64 {
        (self.rng.r#gen::<f64>() - 0.5) * 1e-6
    }
}

fn grid_key(x: f64, y: f64, cell: f64) -> (i64, i64) {
    ((x / cell).floor() as i64, (y / cell).floor() as i64)
}

/// Place records on a phyllotaxis spiral around `center` so a fresh layout
/// starts from distinct positions.
pub fn scatter(records: &mut [DemolitionRecord], center: Point) {
    let angle = std::f64::consts::PI * (3.0 - 5f64.sqrt());
    for (i, record) in records.iter_mut().enumerate() {
        let radius = INITIAL_RADIUS * (0.5 + i as f64).sqrt();
        let theta = i as f64 * angle;
        record.x = center.x + radius * theta.cos();
        record.y = center.y + radius * theta.sin();
    }
}

/// Uniform targets inside `[lo, hi]` on both axes, keyed by record id.
pub fn band_targets<R: Rng>(records: &[DemolitionRecord], lo: f64, hi: f64, rng: &mut R) -> HashMap<u32, Point> {
    records
        .iter()
        .map(|r| (r.id, Point::new(uniform(rng, lo, hi), uniform(rng, lo, hi))))
        .collect()
}

pub(crate) fn uniform<R: Rng>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi <= lo {
        return lo;
    }
    rng.gen_range(lo..hi)
}
