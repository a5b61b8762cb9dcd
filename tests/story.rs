mod common;

use std::time::Duration;

use common::{demolitions, ms, permit, scene, scene_with};
use permit_story::config::StoryConfig;
use permit_story::engine::path::{Oscillation, oscillating_path};
use permit_story::layout::PositionOwner;
use permit_story::renderer::Renderer;
use permit_story::story::{SceneContext, Step, StepController};
use permit_story::surface::ElementKey;
use permit_story::types::{Point, TerminalContract, Viewport};

fn node_center(scene: &SceneContext, id: u32) -> Point {
    let (origin, w, h) = scene
        .surface()
        .get(ElementKey::Node(id))
        .and_then(|e| e.rect())
        .unwrap();
    Point::new(origin.x + w / 2.0, origin.y + h / 2.0)
}

/// Walk forward to `index`, settling every step so the next starts clean.
fn walk_to(scene: &mut SceneContext, controller: &mut StepController, index: usize, mut now: Duration) -> Duration {
    let from = controller.last_index().map_or(0, |i| i + 1);
    for i in from..=index {
        controller.go_to(scene, i, now).unwrap();
        scene.settle(now);
        scene.run_simulation_to_rest();
        now += ms(10);
    }
    now
}

#[test]
fn two_permit_years_then_skip_to_the_decade() {
    let mut config = StoryConfig::default();
    config.lines.permit_buffer = 0;
    let mut scene = scene_with(vec![permit(2011, 5), permit(2012, 3)], Vec::new(), config);

    let osc = |total_steps| Oscillation {
        total_steps,
        step_length: 1.0,
        initial_value: 100.0,
        value_change: 5.0,
        increasing: false,
        cycle_length: 100,
    };
    assert_eq!(oscillating_path(&osc(5)).len(), 5);
    assert_eq!(oscillating_path(&osc(3)).len(), 3);

    let mut controller = StepController::new();
    assert_eq!(controller.go_to(&mut scene, 0, ms(0)).unwrap(), vec![0]);
    scene.advance(ms(2000));
    scene.advance(ms(3000));
    let lines = scene.lines().lines();
    assert_eq!(lines.len(), 2);
    assert_eq!((lines[0].year, lines[0].revealed().len()), (2011, 5));
    assert_eq!((lines[1].year, lines[1].revealed().len()), (2012, 3));
    assert_eq!(lines[0].label(), "2011 - 5");

    assert_eq!(controller.go_to(&mut scene, 2, ms(3100)).unwrap(), vec![1, 2]);
    assert_eq!(scene.current_step(), Some(Step::DecadeTotal));
    assert!(scene.lines().is_consolidated());
}

#[test]
fn passive_step_leaves_the_drawing_running() {
    let mut scene = scene();
    let mut controller = StepController::new();
    controller.go_to(&mut scene, 0, ms(0)).unwrap();
    scene.advance(ms(1));
    controller.go_to(&mut scene, 1, ms(2)).unwrap();

    assert_eq!(scene.lines().queue_cursor(), 1);
    assert!(scene.next_deadline().is_some());
    assert!(!scene.lines().lines()[0].is_complete());
}

#[test]
fn later_step_wins_over_pending_animation() {
    let mut scene = scene();
    let mut controller = StepController::new();
    controller.go_to(&mut scene, 0, ms(0)).unwrap();
    scene.advance(ms(1));

    // Scrolling on while lines are still drawing finishes them first.
    controller.go_to(&mut scene, 2, ms(2)).unwrap();
    assert_eq!(scene.lines().lines().len(), 3);
    assert!(scene.lines().lines().iter().all(|l| l.is_complete()));
    assert!(scene.has_pending_transitions());
    assert!(scene.lines().comparison_points().is_none());

    // And the consolidation in flight is finished, follow-up included.
    controller.go_to(&mut scene, 3, ms(3)).unwrap();
    assert!(!scene.has_pending_transitions());
    assert_eq!(scene.lines().comparison_points().map(<[_]>::len), Some(1000));
    assert!(!scene.lines().is_visible());
    assert_eq!(scene.position_owner(), PositionOwner::Simulation);
}

#[test]
fn positions_pass_through_every_owner() {
    let mut scene = scene();
    let mut controller = StepController::new();
    let expected = [
        PositionOwner::None,
        PositionOwner::None,
        PositionOwner::None,
        PositionOwner::Simulation,
        PositionOwner::Simulation,
        PositionOwner::MapOverlay,
        PositionOwner::BarStack,
        PositionOwner::TileGrid,
    ];
    let mut now = ms(0);
    for (index, owner) in expected.into_iter().enumerate() {
        now = walk_to(&mut scene, &mut controller, index, now);
        assert_eq!(scene.position_owner(), owner, "at {}", Step::ALL[index].name());
    }
    assert_eq!(controller.failures(), 0);
    assert_eq!(scene.tiles().len(), 2);

    // Scrolling back up replays the steps in between, in reverse.
    let replayed = controller.go_to(&mut scene, 3, now).unwrap();
    assert_eq!(replayed, vec![6, 5, 4, 3]);
    assert_eq!(controller.failures(), 0);
    assert_eq!(scene.position_owner(), PositionOwner::Simulation);
    assert!(scene.simulation().is_running());
}

#[test]
fn map_fades_through_the_years() {
    let mut scene = scene();
    let mut controller = StepController::new();
    let now = walk_to(&mut scene, &mut controller, 5, ms(0));

    // Map dates come from records 0, 3, 6, 9: years 2013 to 2016.
    assert_eq!(scene.date_text(), Some("Year: 2013"));
    assert!(!scene.simulation().is_running());
    let hidden = scene.surface().get(ElementKey::Node(1)).unwrap();
    assert!(!hidden.visible);

    scene.advance(now + ms(6000));
    assert_eq!(scene.date_text(), Some("Year: 2016"));
    let faded = scene.surface().get(ElementKey::Node(0)).unwrap();
    assert_eq!(faded.opacity, scene.config().rect.demolished_opacity);

    // Leaving the map stops the fade and removes the year.
    controller.go_to(&mut scene, 6, now + ms(6010)).unwrap();
    assert_eq!(scene.date_text(), None);
    assert!(scene.bar_stack().is_some());
}

#[test]
fn tooltips_and_tile_popups() {
    let mut scene = scene();
    let mut controller = StepController::new();
    let now = walk_to(&mut scene, &mut controller, 3, ms(0));

    let tip = scene.tooltip_at(node_center(&scene, 2)).unwrap();
    assert_eq!(tip.len(), 3);
    assert!(tip[0].starts_with("Housing units:"));
    // Swarm nodes are not gallery tiles.
    assert!(!scene.click_at(node_center(&scene, 4)));

    let now = walk_to(&mut scene, &mut controller, 5, now);
    let tip = scene.tooltip_at(node_center(&scene, 0)).unwrap();
    assert!(tip[3].starts_with("People left homeless:"));

    walk_to(&mut scene, &mut controller, 7, now);
    assert!(scene.click_at(node_center(&scene, 4)));
    let popup = scene.popup().unwrap();
    assert_eq!(popup.locality, "Khirbet Humsah");
    assert_eq!(popup.entry.credit, "Sarit Michaeli, B'Tselem");
    assert!(scene.close_popup());
    assert!(!scene.close_popup());
    assert!(scene.tooltip_at(Point::new(-50.0, -50.0)).is_none());
}

#[test]
fn relayout_is_idempotent() {
    let contract = TerminalContract { width: 60, height: 30 };
    let small = Viewport { cols: 60, rows: 30 };
    for index in [2, 6, 7] {
        let mut scene = scene();
        let mut controller = StepController::new();
        let now = walk_to(&mut scene, &mut controller, index, ms(0));

        scene.resize(small, now);
        let once = Renderer::rasterize(scene.surface(), &contract);
        scene.resize(small, now);
        let twice = Renderer::rasterize(scene.surface(), &contract);
        assert_eq!(once, twice, "at {}", Step::ALL[index].name());
        assert_eq!(scene.dimensions().adj_width, 120.0);
    }
}

#[test]
fn resize_before_any_step_only_updates_dimensions() {
    let mut scene = scene_with(Vec::new(), demolitions(), StoryConfig::default());
    scene.resize(Viewport { cols: 60, rows: 30 }, ms(0));
    assert_eq!(scene.current_step(), None);
    assert_eq!(scene.dimensions().adj_width, 120.0);
    assert!(scene.surface().is_empty());
}

fn centers(scene: &SceneContext) -> Vec<Point> {
    scene.records().iter().map(|r| node_center(scene, r.id)).collect()
}

#[test]
fn resize_mid_move_lands_on_the_new_layout() {
    let small = Viewport { cols: 60, rows: 30 };
    for index in [6, 7] {
        // Resized while the nodes are still moving into place.
        let mut moving = scene();
        let mut controller = StepController::new();
        let now = walk_to(&mut moving, &mut controller, index - 1, ms(0));
        controller.go_to(&mut moving, index, now).unwrap();
        assert!(moving.has_pending_transitions());
        moving.resize(small, now + ms(100));
        assert!(!moving.has_pending_transitions());
        moving.advance(now + ms(3000));

        // Resized only once the move has finished.
        let mut settled = scene();
        let mut controller = StepController::new();
        let now = walk_to(&mut settled, &mut controller, index, ms(0));
        settled.resize(small, now + ms(100));
        settled.advance(now + ms(3000));

        let name = Step::ALL[index].name();
        assert_eq!(centers(&moving), centers(&settled), "at {name}");
        // In the gallery only the tiles are shown; the rest stay as the bars left them.
        let shown: Vec<u32> = match index {
            7 => moving.tiles().to_vec(),
            _ => moving.records().iter().map(|r| r.id).collect(),
        };
        let dims = moving.dimensions();
        for id in shown {
            let p = node_center(&moving, id);
            assert!(p.x <= dims.adj_width && p.y <= dims.adj_height, "{p:?} off the chart at {name}");
        }
    }
}

#[test]
fn resize_mid_map_move_refits_the_map() {
    let small = Viewport { cols: 60, rows: 30 };
    let mut moving = scene();
    let mut controller = StepController::new();
    let now = walk_to(&mut moving, &mut controller, 4, ms(0));
    controller.go_to(&mut moving, 5, now).unwrap();
    moving.resize(small, now + ms(100));
    assert!(!moving.has_pending_transitions());
    assert_eq!(moving.date_text(), Some("Year: 2013"));

    let mut settled = scene();
    let mut controller = StepController::new();
    let now = walk_to(&mut settled, &mut controller, 5, ms(0));
    settled.resize(small, now + ms(100));

    let on_map = |s: &SceneContext| -> Vec<Point> {
        s.records()
            .iter()
            .filter(|r| r.show_on_map)
            .map(|r| node_center(s, r.id))
            .collect()
    };
    assert_eq!(on_map(&moving), on_map(&settled));
}

#[test]
fn resize_during_the_swarm_retargets_the_simulation() {
    let small = Viewport { cols: 60, rows: 30 };
    for index in [3, 4] {
        let mut scene = scene();
        let mut controller = StepController::new();
        let now = walk_to(&mut scene, &mut controller, index - 1, ms(0));
        controller.go_to(&mut scene, index, now).unwrap();
        scene.advance(now + ms(50));
        assert!(scene.simulation().is_running());

        scene.resize(small, now + ms(100));
        assert!(scene.simulation().is_running());
        scene.run_simulation_to_rest();

        let name = Step::ALL[index].name();
        let dims = scene.dimensions();
        assert_eq!(dims.adj_width, 120.0);
        for p in centers(&scene) {
            assert!(
                (0.0..=dims.adj_width).contains(&p.x) && (0.0..=dims.adj_height).contains(&p.y),
                "{p:?} outside {}x{} at {name}",
                dims.adj_width,
                dims.adj_height
            );
        }
    }
}
