//! Homeless-by-year bar stack: each demolition becomes a slice of its
//! year's bar, stacked in record order.

use std::collections::BTreeMap;

use chrono::Datelike;

use crate::data::DemolitionRecord;
use crate::types::Point;

use super::scale::{BandScale, LinearScale};

const BAR_PADDING: f64 = 0.2;

/// Where one record sits inside its bar, in dot space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StackSlot {
    pub id: u32,
    /// Top-left corner.
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

impl StackSlot {
    pub fn center(&self) -> Point {
        Point::new(self.origin.x + self.width / 2.0, self.origin.y + self.height / 2.0)
    }
}

#[derive(Debug, Clone)]
pub struct BarStack {
    /// `(year, people left homeless)`, years ascending.
    pub totals: Vec<(i32, u64)>,
    pub x: BandScale<i32>,
    pub y: LinearScale,
    pub slots: Vec<StackSlot>,
    /// Top-left of the chart area.
    pub origin: Point,
    pub width: f64,
    pub height: f64,
}

/// People left homeless per demolition year, ascending by year.
pub fn totals_by_year(records: &[DemolitionRecord]) -> Vec<(i32, u64)> {
    let mut totals: BTreeMap<i32, u64> = BTreeMap::new();
    for r in records {
        *totals.entry(r.demolition_date.year()).or_default() += u64::from(r.people_homeless);
    }
    totals.into_iter().collect()
}

impl BarStack {
    /// Lay out `records` in a chart occupying `width` by `height` at `origin`.
    /// Records that left nobody homeless get no slot.
    pub fn layout(records: &[DemolitionRecord], origin: Point, width: f64, height: f64) -> Self {
        let totals = totals_by_year(records);
        let max = totals.iter().map(|&(_, n)| n).max().unwrap_or(0) as f64;
        let x = BandScale::new(totals.iter().map(|&(year, _)| year).collect(), (0.0, width), BAR_PADDING);
        let y = LinearScale::new((0.0, max.max(1.0)), (height, 0.0));

        let mut running: BTreeMap<i32, u64> = BTreeMap::new();
        let mut slots = Vec::new();
        for r in records {
            if r.people_homeless == 0 {
                continue;
            }
            let year = r.demolition_date.year();
            let Some(band) = x.position(&year) else {
                continue;
            };
            let below = running.entry(year).or_default();
            let bottom = y.apply(*below as f64);
            *below += u64::from(r.people_homeless);
            let top = y.apply(*below as f64);
            let bw = x.bandwidth();
            slots.push(StackSlot {
                id: r.id,
                origin: Point::new(origin.x + band + bw / 4.0, origin.y + top),
                width: bw / 2.0,
                height: bottom - top,
            });
        }

        BarStack {
            totals,
            x,
            y,
            slots,
            origin,
            width,
            height,
        }
    }

    pub fn slot(&self, id: u32) -> Option<&StackSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    /// Bottom-center of each year's bar, for axis labels.
    pub fn year_anchors(&self) -> Vec<(i32, Point)> {
        let bw = self.x.bandwidth();
        self.totals
            .iter()
            .filter_map(|&(year, _)| {
                let band = self.x.position(&year)?;
                Some((year, Point::new(self.origin.x + band + bw / 2.0, self.origin.y + self.height)))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::records::sample_record;

    #[test]
    fn totals_are_grouped_by_year_ascending() {
        let recs = vec![
            sample_record(0, "Yatta", 5, (2016, 3, 1)),
            sample_record(1, "Yatta", 2, (2012, 3, 1)),
            sample_record(2, "Yatta", 4, (2016, 9, 1)),
        ];
        assert_eq!(totals_by_year(&recs), vec![(2012, 2), (2016, 9)]);
    }

    #[test]
    fn slots_stack_without_gaps() {
        let recs = vec![
            sample_record(0, "Yatta", 6, (2016, 3, 1)),
            sample_record(1, "Yatta", 3, (2016, 9, 1)),
            sample_record(2, "Yatta", 0, (2016, 9, 1)),
        ];
        let stack = BarStack::layout(&recs, Point::new(10.0, 5.0), 100.0, 90.0);
        assert_eq!(stack.slots.len(), 2);
        let a = stack.slot(0).unwrap();
        let b = stack.slot(1).unwrap();
        // The whole bar spans the chart height: 60 for 6 people, 30 for 3.
        assert!((a.height - 60.0).abs() < 1e-9);
        assert!((b.height - 30.0).abs() < 1e-9);
        assert!((a.origin.y + a.height - 95.0).abs() < 1e-9);
        assert!((b.origin.y + b.height - a.origin.y).abs() < 1e-9);
        assert!(stack.slot(2).is_none());
    }
}
