//! Re-layout on resize: derive the chart geometry from the container, and
//! re-place whatever the current step shows.

use std::time::Duration;

use log::debug;

use crate::config::{LayoutConfig, Margin};
use crate::engine::Animated;
use crate::engine::debounce::Debouncer;
use crate::layout::LinearScale;
use crate::types::{Point, Viewport};

use super::scene::SceneContext;
use super::steps::Step;

/// Chart geometry for one container size, in dots.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Dimensions {
    pub viewport: Viewport,
    pub adj_width: f64,
    pub adj_height: f64,
    /// `adj_width` over the reference width; every reference size scales by it.
    pub factor: f64,
    pub margin: Margin,
    /// Domain units to dots, horizontally (`walkX`).
    pub x: LinearScale,
    /// Domain units to dots, vertically and flipped (`walkY`).
    pub y: LinearScale,
}

impl Dimensions {
    /// Width is the reference width or the container width, whichever is
    /// smaller, further limited so the height still fits at the reference
    /// aspect ratio.
    pub fn compute(viewport: Viewport, layout: &LayoutConfig) -> Self {
        let reference = layout.width.max(1.0);
        let ratio = layout.height / reference;
        let mut adj_width = reference.min(viewport.dot_width());
        if ratio > 0.0 && adj_width * ratio > viewport.dot_height() {
            adj_width = viewport.dot_height() / ratio;
        }
        let adj_width = adj_width.max(1.0);
        let adj_height = adj_width * ratio;
        let factor = adj_width / reference;
        let margin = layout.margin.scaled(factor);
        let domain = (layout.domain_start, layout.domain_end);
        Dimensions {
            viewport,
            adj_width,
            adj_height,
            factor,
            margin,
            x: LinearScale::new(domain, (margin.left, adj_width - margin.right)),
            y: LinearScale::new(domain, (adj_height - margin.bottom, margin.top)),
        }
    }

    pub fn center(&self) -> Point {
        Point::new(self.adj_width / 2.0, self.adj_height / 2.0)
    }

    /// `(walkX(x), walkY(y))`
    pub fn walk(&self, x: f64, y: f64) -> Point {
        Point::new(self.x.apply(x), self.y.apply(y))
    }
}

/// Coalesces a burst of terminal resizes into one re-layout.
#[derive(Debug)]
pub struct ResizeHandler {
    debouncer: Debouncer,
    pending: Option<Viewport>,
}

impl ResizeHandler {
    pub fn new(wait: Duration) -> Self {
        ResizeHandler {
            debouncer: Debouncer::new(wait),
            pending: None,
        }
    }

    pub fn on_resize(&mut self, viewport: Viewport, now: Duration) {
        self.pending = Some(viewport);
        self.debouncer.trigger(now);
    }

    /// Apply the last requested size once the burst has gone quiet.
    /// Returns whether a re-layout ran.
    pub fn poll(&mut self, scene: &mut SceneContext, now: Duration) -> bool {
        if !self.debouncer.poll(now) {
            return false;
        }
        match self.pending.take() {
            Some(viewport) => {
                scene.resize(viewport, now);
                true
            }
            None => false,
        }
    }

    pub fn next_deadline(&self) -> Option<Duration> {
        self.debouncer.next_deadline()
    }
}

/// Re-place the elements of the current step under the current dimensions.
/// Only the current step's resources are touched; with no step active this
/// does nothing. Running it twice gives the same surface. Node moves still
/// in flight are ended first, since their targets belong to the old size.
pub fn relayout(scene: &mut SceneContext, now: Duration) {
    let Some(step) = scene.current_step() else {
        return;
    };
    debug!(
        "relayout for {} at {:.0}x{:.0} dots",
        step.name(),
        scene.dims.adj_width,
        scene.dims.adj_height
    );
    match step {
        Step::PermitLines | Step::PermitContext | Step::DecadeTotal => scene.sync_lines(),
        Step::DemolitionSwarm | Step::GrantSplit => {
            scene.resize_nodes();
            scene.simulation.reheat(now, scene.config.forces.resize_alpha);
            if scene.category_labels {
                scene.show_category_labels();
            }
        }
        Step::DemolitionMap => {
            // The move onto the map targets the old projection; land it and
            // let its fit run before fitting again at the new size.
            scene.flush_node_transitions(now);
            scene.refit_map();
            let text = scene.date_text.clone();
            scene.set_date_display(text);
        }
        Step::HomelessByYear => {
            scene.cancel_node_transitions();
            scene.place_bar_stack(now, false);
        }
        Step::TileGallery => {
            scene.cancel_node_transitions();
            scene.place_tiles(now, false);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wide_container_keeps_reference_width() {
        let d = Dimensions::compute(Viewport { cols: 500, rows: 200 }, &LayoutConfig::default());
        assert_eq!(d.adj_width, 800.0);
        assert_eq!(d.adj_height, 500.0);
        assert_eq!(d.factor, 1.0);
        assert_eq!(d.x.apply(0.0), 150.0);
        assert_eq!(d.x.apply(100.0), 700.0);
        assert_eq!(d.y.apply(0.0), 480.0);
        assert_eq!(d.y.apply(100.0), 50.0);
    }

    #[test]
    fn narrow_container_scales_margins() {
        let d = Dimensions::compute(Viewport { cols: 200, rows: 200 }, &LayoutConfig::default());
        assert_eq!(d.adj_width, 400.0);
        assert_eq!(d.adj_height, 250.0);
        assert_eq!(d.factor, 0.5);
        assert_eq!(d.margin.left, 75.0);
        assert_eq!(d.walk(0.0, 100.0), Point::new(75.0, 25.0));
    }

    #[test]
    fn short_container_limits_width_by_height() {
        let d = Dimensions::compute(Viewport { cols: 400, rows: 50 }, &LayoutConfig::default());
        assert_eq!(d.adj_height, 200.0);
        assert_eq!(d.adj_width, 320.0);
        assert_eq!(d.factor, 0.4);
    }

    #[test]
    fn handler_coalesces_bursts() {
        let mut handler = ResizeHandler::new(Duration::from_millis(10));
        handler.on_resize(Viewport { cols: 100, rows: 40 }, Duration::from_millis(0));
        handler.on_resize(Viewport { cols: 120, rows: 40 }, Duration::from_millis(5));
        assert_eq!(handler.next_deadline(), Some(Duration::from_millis(15)));
        assert_eq!(handler.pending, Some(Viewport { cols: 120, rows: 40 }));
    }
}
