//! The narrative stages, in scroll order, and what each one does to the
//! scene. A handler assumes the scene is as its predecessor left it (or, when
//! scrolling up, as its successor left it).

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::Datelike;

use crate::error::StoryError;
use crate::layout::force::{band_targets, scatter, uniform};
use crate::layout::{Collide, Forces, PositionOwner};
use crate::renderer::palette;
use crate::surface::{ElementKey, Layer};
use crate::types::Point;

use super::scene::{FollowUp, Motion, NodeTarget, SceneContext, TILED};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// One zigzag ribbon per year of permits.
    PermitLines,
    /// Narrative only; the scene is left as it is.
    PermitContext,
    /// The years pulled into one decade ribbon, beside the comparison ribbon.
    DecadeTotal,
    DemolitionSwarm,
    /// Swarm split into granted and denied.
    GrantSplit,
    DemolitionMap,
    HomelessByYear,
    TileGallery,
}

impl Step {
    pub const ALL: [Step; 8] = [
        Step::PermitLines,
        Step::PermitContext,
        Step::DecadeTotal,
        Step::DemolitionSwarm,
        Step::GrantSplit,
        Step::DemolitionMap,
        Step::HomelessByYear,
        Step::TileGallery,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Step> {
        Self::ALL.get(index).copied()
    }

    pub fn name(self) -> &'static str {
        match self {
            Step::PermitLines => "permit-lines",
            Step::PermitContext => "permit-context",
            Step::DecadeTotal => "decade-total",
            Step::DemolitionSwarm => "demolition-swarm",
            Step::GrantSplit => "grant-split",
            Step::DemolitionMap => "demolition-map",
            Step::HomelessByYear => "homeless-by-year",
            Step::TileGallery => "tile-gallery",
        }
    }

    /// Whether the step rewrites the scene, so that earlier animations must
    /// be settled first.
    pub fn mutates_scene(self) -> bool {
        self != Step::PermitContext
    }

    pub(crate) fn run(self, scene: &mut SceneContext, now: Duration) -> Result<(), StoryError> {
        match self {
            Step::PermitLines => permit_lines(scene, now),
            Step::PermitContext => Ok(()),
            Step::DecadeTotal => decade_total(scene, now),
            Step::DemolitionSwarm => demolition_swarm(scene, now),
            Step::GrantSplit => grant_split(scene, now),
            Step::DemolitionMap => demolition_map(scene, now),
            Step::HomelessByYear => homeless_by_year(scene, now),
            Step::TileGallery => tile_gallery(scene, now),
        }
    }
}

fn permit_lines(scene: &mut SceneContext, now: Duration) -> Result<(), StoryError> {
    let (duration, frame) = (scene.transition_duration(), scene.frame());
    if let Some(tween) = scene.lines.unconsolidate(duration, frame) {
        scene.start_transition(Motion::Lines(tween), None, now);
    }
    scene.lines.hide_comparison();
    scene.sync_lines();
    Ok(())
}

fn decade_total(scene: &mut SceneContext, now: Duration) -> Result<(), StoryError> {
    scene.lines.flush_queue(now);
    let (duration, frame) = (scene.transition_duration(), scene.frame());
    match scene.lines.consolidate(duration, frame) {
        Some(tween) => {
            scene.start_transition(Motion::Lines(tween), Some(FollowUp::DrawComparisonLine), now)
        }
        None => scene.run_follow_up(FollowUp::DrawComparisonLine, now),
    }
    scene.sync_lines();

    scene
        .surface
        .set_visible_where(|k| matches!(k, ElementKey::Node(_)), false);
    scene.simulation.stop();
    scene.ownership.release(PositionOwner::Simulation);
    Ok(())
}

fn demolition_swarm(scene: &mut SceneContext, now: Duration) -> Result<(), StoryError> {
    scene.lines.flush_comparison();
    scene.lines.hide_comparison();
    scene.lines.keep_comparison();
    scene.lines.hide();
    scene.sync_lines();

    if !scene.scattered {
        let center = scene.dims.center();
        scatter(&mut scene.records, center);
        scene.scattered = true;
    }
    scene.create_nodes();
    scene.transfer_positions(PositionOwner::Simulation)?;

    let forces = scene.config.forces.clone();
    let domain = scene.config.layout.domain_end - scene.config.layout.domain_start;
    let lo = scene.config.layout.domain_start + domain / 8.0;
    let hi = scene.config.layout.domain_start + domain * 7.0 / 8.0;
    let targets = band_targets(&scene.records, lo, hi, &mut scene.rng);
    let swarm = Forces {
        strength: forces.swarm_strength,
        targets,
        collide: Some(Collide {
            radius: forces.collide_radius,
            strength: forces.collide_strength,
        }),
    };
    scene
        .simulation
        .start(now, &scene.records, swarm, forces.start_alpha);

    scene.remove_category_labels();
    scene.tooltip_extra = false;
    Ok(())
}

fn grant_split(scene: &mut SceneContext, now: Duration) -> Result<(), StoryError> {
    let mut targets = HashMap::with_capacity(scene.records.len());
    for r in scene.records.iter_mut() {
        let x = if r.simulate_grant {
            uniform(&mut scene.rng, 6.0, 10.0)
        } else {
            uniform(&mut scene.rng, 40.0, 100.0)
        };
        let y = uniform(&mut scene.rng, 0.0, 90.0);
        r.target_x = x;
        targets.insert(r.id, Point::new(x, y));
    }

    scene.transfer_positions(PositionOwner::Simulation)?;
    scene.reparent_nodes(Layer::Chart);
    scene.style_nodes(palette::node());
    scene.resize_nodes();
    let opacity = scene.config.rect.opacity;
    for r in &scene.records {
        let key = ElementKey::Node(r.id);
        scene.surface.set_visible(key, true);
        scene.surface.set_opacity(key, opacity);
    }

    let forces = Forces {
        strength: scene.config.forces.split_strength,
        targets,
        collide: None,
    };
    let alpha = scene.config.forces.start_alpha;
    scene.simulation.retarget(now, forces, alpha);

    scene.show_category_labels();
    scene.surface.set_layer_visible(Layer::Basemap, false);
    scene.set_date_display(None);
    scene.reset_date_fade();
    scene.tooltip_extra = false;
    Ok(())
}

fn demolition_map(scene: &mut SceneContext, now: Duration) -> Result<(), StoryError> {
    scene.remove_category_labels();
    scene.remove_bar_axes();
    scene.transfer_positions(PositionOwner::MapOverlay)?;
    scene.reparent_nodes(Layer::MapOverlay);
    scene.style_nodes(palette::node());

    let center = (scene.config.map.center[0], scene.config.map.center[1]);
    let zoom = scene.config.map.zoom;
    scene
        .map
        .resize(Point::default(), scene.dims.adj_width, scene.dims.adj_height);
    scene.map.jump_to(center, zoom);
    scene.draw_graticule();
    scene.surface.set_layer_visible(Layer::Basemap, true);
    let first_year = scene.dates.first().map(|d| format!("Year: {}", d.year()));
    scene.set_date_display(first_year);

    let rect = scene.config.rect.clone();
    let mut targets = Vec::new();
    for r in &scene.records {
        let key = ElementKey::Node(r.id);
        let opacity = if r.simulate_grant { 0.0 } else { rect.opacity };
        scene.surface.set_opacity(key, opacity);
        scene.surface.set_visible(key, r.show_on_map);
        if r.show_on_map {
            let (width, height) = scene.node_size(r);
            targets.push(NodeTarget {
                id: r.id,
                center: scene.map_target(r),
                width,
                height,
                opacity,
            });
        }
    }
    let tween = scene.node_tween(&targets, scene.transition_duration());
    scene.start_transition(Motion::Nodes(tween), Some(FollowUp::FitMapAndFade), now);

    scene.tooltip_extra = true;
    Ok(())
}

fn homeless_by_year(scene: &mut SceneContext, now: Duration) -> Result<(), StoryError> {
    scene.pause_date_fade();
    scene.cancel_node_transitions();
    scene.surface.set_layer_visible(Layer::Basemap, false);
    scene.set_date_display(None);

    scene.transfer_positions(PositionOwner::BarStack)?;
    scene.reparent_nodes(Layer::Chart);
    scene.style_nodes(palette::bar());
    scene.surface.remove_where(|k| matches!(k, ElementKey::TileCaption(_)));
    for r in &scene.records {
        let key = ElementKey::Node(r.id);
        scene.surface.set_class(key, TILED, false);
        scene.surface.set_visible(key, r.people_homeless > 0);
    }
    scene.close_popup();
    scene.tiles.clear();

    scene.place_bar_stack(now, true);
    Ok(())
}

fn tile_gallery(scene: &mut SceneContext, now: Duration) -> Result<(), StoryError> {
    scene.remove_bar_axes();
    scene.transfer_positions(PositionOwner::TileGrid)?;

    let count = scene.config.tiles.count;
    scene.tiles = scene
        .records
        .iter()
        .filter(|r| r.tile_node)
        .take(count)
        .map(|r| r.id)
        .collect();
    let tiled: HashSet<u32> = scene.tiles.iter().copied().collect();
    for r in &scene.records {
        let key = ElementKey::Node(r.id);
        if tiled.contains(&r.id) {
            scene.surface.set_visible(key, true);
            scene.surface.set_class(key, TILED, true);
            if let Some(e) = scene.surface.get_mut(key) {
                e.style = palette::tile();
            }
        } else {
            scene.surface.set_opacity(key, 0.0);
        }
    }

    scene.place_tiles(now, true);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indices_round_trip() {
        for (i, step) in Step::ALL.iter().enumerate() {
            assert_eq!(step.index(), i);
            assert_eq!(Step::from_index(i), Some(*step));
        }
        assert_eq!(Step::from_index(Step::ALL.len()), None);
    }

    #[test]
    fn only_the_context_step_is_passive() {
        let passive: Vec<Step> = Step::ALL.into_iter().filter(|s| !s.mutates_scene()).collect();
        assert_eq!(passive, vec![Step::PermitContext]);
    }
}
