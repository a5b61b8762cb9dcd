#![allow(dead_code)]

use std::time::Duration;

use chrono::NaiveDate;
use permit_story::config::StoryConfig;
use permit_story::data::narrative::NarrativeStore;
use permit_story::data::{Dataset, DemolitionRecord, PermitRecord};
use permit_story::story::SceneContext;
use permit_story::types::Viewport;

pub const VIEW: Viewport = Viewport { cols: 100, rows: 40 };

pub fn ms(v: u64) -> Duration {
    Duration::from_millis(v)
}

pub fn permit(year: i32, permit_count: u32) -> PermitRecord {
    PermitRecord { year, permit_count }
}

pub fn demolition(id: u32, locality: &str, cleaned: &str, people: u32, year: i32) -> DemolitionRecord {
    DemolitionRecord {
        id,
        locality: locality.to_string(),
        locality_cleaned: cleaned.to_string(),
        district: "Hebron".to_string(),
        housing_units: 1 + id % 4,
        people_homeless: people,
        minors_homeless: people / 2,
        demolition_date: NaiveDate::from_ymd_opt(year, 3, 1).unwrap(),
        latitude: 31.4 + f64::from(id) * 0.02,
        longitude: 35.0 + f64::from(id) * 0.01,
        offset_x: 0.0,
        offset_y: 0.0,
        simulate_grant: false,
        show_on_map: false,
        tile_node: false,
        is_crossed: false,
        x: 0.0,
        y: 0.0,
        target_x: 0.0,
    }
}

/// Twelve demolitions over four years: a few on the map, one granted, two
/// pictured in the gallery.
pub fn demolitions() -> Vec<DemolitionRecord> {
    (0..12)
        .map(|id| {
            let mut r = demolition(id, "Yatta", "Yatta", 3 + id, 2013 + (id % 4) as i32);
            r.show_on_map = id % 3 == 0;
            r.simulate_grant = id == 5;
            if id == 4 {
                r.locality = "Kh. Humsah".to_string();
                r.locality_cleaned = "Khirbet Humsah".to_string();
                r.tile_node = true;
            }
            if id == 7 {
                r.tile_node = true;
            }
            r
        })
        .collect()
}

pub fn scene_with(permits: Vec<PermitRecord>, demolitions: Vec<DemolitionRecord>, config: StoryConfig) -> SceneContext {
    let dataset = Dataset::from_records(permits, demolitions);
    SceneContext::new(dataset, NarrativeStore::builtin(), config, VIEW, Duration::ZERO)
}

pub fn scene() -> SceneContext {
    scene_with(
        vec![permit(2011, 5), permit(2012, 3), permit(2013, 120)],
        demolitions(),
        StoryConfig::default(),
    )
}
