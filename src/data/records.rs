use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Building permits granted in one year.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PermitRecord {
    pub year: i32,
    pub permit_count: u32,
}

/// One recorded demolition. Everything but the positional fields is fixed
/// at load time; `x`, `y` and `target_x` belong to whichever visual mode
/// currently owns record positions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DemolitionRecord {
    /// Row index in the source file. Unique and stable.
    pub id: u32,
    pub locality: String,
    pub locality_cleaned: String,
    pub district: String,
    pub housing_units: u32,
    pub people_homeless: u32,
    pub minors_homeless: u32,
    pub demolition_date: NaiveDate,
    pub latitude: f64,
    pub longitude: f64,
    pub offset_x: f64,
    pub offset_y: f64,
    pub simulate_grant: bool,
    pub show_on_map: bool,
    pub tile_node: bool,
    pub is_crossed: bool,
    pub x: f64,
    pub y: f64,
    pub target_x: f64,
}

impl DemolitionRecord {
    /// Side lengths of the record's node rect: area grows with housing units.
    pub fn node_size(&self, rect_width: f64, rect_height: f64, factor: f64) -> (f64, f64) {
        let root = f64::from(self.housing_units).sqrt();
        (root * rect_width * factor, root * rect_height * factor)
    }

    /// Height of the record inside a homeless-by-year bar.
    pub fn stack_height(&self, rect_height: f64) -> f64 {
        f64::from(self.people_homeless).sqrt() * rect_height
    }
}

#[cfg(test)]
pub(crate) fn sample_record(id: u32, locality: &str, people: u32, date: (i32, u32, u32)) -> DemolitionRecord {
    DemolitionRecord {
        id,
        locality: locality.to_string(),
        locality_cleaned: locality.to_string(),
        district: "Hebron".to_string(),
        housing_units: 4,
        people_homeless: people,
        minors_homeless: 0,
        demolition_date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        latitude: 31.5,
        longitude: 35.1,
        offset_x: 0.0,
        offset_y: 0.0,
        simulate_grant: false,
        show_on_map: true,
        tile_node: false,
        is_crossed: false,
        x: 0.0,
        y: 0.0,
        target_x: 0.0,
    }
}
