//! Load-time classification of demolition records: the fixed tile-gallery
//! rules, seeded sampling of the map and grant flags, and jitter offsets.

use chrono::NaiveDate;
use rand::Rng;

use crate::config::DataConfig;

use super::loader::DemolitionFields;
use super::records::DemolitionRecord;

/// One incident pictured in the tile gallery.
#[derive(Debug, Clone, Copy)]
pub struct TileRule {
    pub locality: &'static str,
    pub people_homeless: u32,
    pub minors_homeless: Option<u32>,
    /// `(year, month, day)`
    pub date: Option<(i32, u32, u32)>,
}

impl TileRule {
    const fn new(locality: &'static str, people_homeless: u32) -> Self {
        TileRule {
            locality,
            people_homeless,
            minors_homeless: None,
            date: None,
        }
    }

    pub fn matches(&self, row: &DemolitionFields) -> bool {
        if row.locality != self.locality || row.people_homeless != self.people_homeless {
            return false;
        }
        if let Some(minors) = self.minors_homeless {
            if row.minors_homeless != minors {
                return false;
            }
        }
        match self.date {
            Some((y, m, d)) => NaiveDate::from_ymd_opt(y, m, d) == Some(row.demolition_date),
            None => true,
        }
    }
}

pub const TILE_RULES: &[TileRule] = &[
    TileRule::new("Kh. al-Markez", 12),
    TileRule::new("a-Rakeez", 12),
    TileRule::new("al-Walajah", 14),
    TileRule::new("Um al-Kheir", 15),
    TileRule::new("Khan al-Ahmar (Bedouin Community)", 16),
    TileRule::new("Kh. Jenbah", 13),
    TileRule::new("Kh. Ma'in", 7),
    TileRule {
        locality: "Kh. Humsah",
        people_homeless: 11,
        minors_homeless: Some(6),
        date: Some((2021, 2, 1)),
    },
    TileRule::new("Yatta", 38),
    TileRule {
        locality: "'Ein Samia",
        people_homeless: 8,
        minors_homeless: Some(6),
        date: None,
    },
];

pub fn is_tile_locality(row: &DemolitionFields) -> bool {
    TILE_RULES.iter().any(|rule| rule.matches(row))
}

/// Expand the abbreviations used in the source data.
pub fn clean_locality(name: &str) -> String {
    name.replace("Kh.", "Khirbet").replace("a-", "al-")
}

/// Uniform offset in `[-range, range)`.
pub fn random_offset<R: Rng>(rng: &mut R, range: f64) -> f64 {
    if range <= 0.0 {
        return 0.0;
    }
    rng.gen_range(-range..range)
}

/// Turn a validated row into a record, drawing its random flags from `rng`.
/// Draw order is fixed so a seed always yields the same dataset.
pub fn classify<R: Rng>(row: DemolitionFields, config: &DataConfig, rng: &mut R) -> DemolitionRecord {
    let simulate_grant = rng.gen_bool(config.grant_probability.clamp(0.0, 1.0));
    let offset_x = random_offset(rng, config.offset_range);
    let offset_y = random_offset(rng, config.offset_range);
    let show_on_map = rng.gen_bool(config.show_on_map_probability.clamp(0.0, 1.0));
    let tile_node = is_tile_locality(&row);
    let locality_cleaned = row
        .locality_cleaned
        .clone()
        .unwrap_or_else(|| clean_locality(&row.locality));

    DemolitionRecord {
        id: row.id,
        locality: row.locality,
        locality_cleaned,
        district: row.district,
        housing_units: row.housing_units,
        people_homeless: row.people_homeless,
        minors_homeless: row.minors_homeless,
        demolition_date: row.demolition_date,
        latitude: row.latitude,
        longitude: row.longitude,
        offset_x,
        offset_y,
        simulate_grant,
        show_on_map,
        tile_node,
        is_crossed: false,
        x: 0.0,
        y: 0.0,
        target_x: 0.0,
    }
}
