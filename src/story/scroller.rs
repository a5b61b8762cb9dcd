//! The narrative column: sections laid out top to bottom, a scroll offset,
//! and the section that offset makes active.

use log::debug;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub body: String,
    /// Spacer with no text; skipped by `next_section`.
    pub ghost: bool,
}

impl Section {
    pub fn new(title: &str, body: &str) -> Self {
        Section {
            title: title.to_string(),
            body: body.to_string(),
            ghost: false,
        }
    }

    pub fn ghost() -> Self {
        Section {
            title: String::new(),
            body: String::new(),
            ghost: true,
        }
    }
}

/// One row of the laid-out column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLine {
    pub text: String,
    pub title: bool,
    pub section: usize,
}

#[derive(Debug, Clone)]
pub struct Scroller {
    sections: Vec<Section>,
    width: u16,
    rows: u16,
    tops: Vec<u32>,
    lines: Vec<ColumnLine>,
    offset: u32,
}

impl Scroller {
    pub fn new(sections: Vec<Section>, width: u16, rows: u16) -> Self {
        let mut scroller = Scroller {
            sections,
            width,
            rows,
            tops: Vec::new(),
            lines: Vec::new(),
            offset: 0,
        };
        scroller.layout();
        scroller
    }

    fn layout(&mut self) {
        let min_height = (u32::from(self.rows) * 3).div_ceil(4).max(1);
        let ghost_height = (u32::from(self.rows) / 2).max(1);
        self.tops.clear();
        self.lines.clear();
        for (index, section) in self.sections.iter().enumerate() {
            self.tops.push(self.lines.len() as u32);
            let height = if section.ghost {
                ghost_height
            } else {
                self.lines.push(ColumnLine {
                    text: section.title.clone(),
                    title: true,
                    section: index,
                });
                self.lines.push(blank(index));
                for text in wrap(&section.body, usize::from(self.width.max(1))) {
                    self.lines.push(ColumnLine {
                        text,
                        title: false,
                        section: index,
                    });
                }
                min_height
            };
            let top = self.tops[index] as usize;
            while self.lines.len() < top + height as usize {
                self.lines.push(blank(index));
            }
            // A trailing gap so sections never touch.
            self.lines.push(blank(index));
        }
        self.offset = self.offset.min(self.max_offset());
    }

    /// New column size. The offset is kept where possible.
    pub fn resize(&mut self, width: u16, rows: u16) {
        self.width = width;
        self.rows = rows;
        self.layout();
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }

    pub fn tops(&self) -> &[u32] {
        &self.tops
    }

    pub fn total_height(&self) -> u32 {
        self.lines.len() as u32
    }

    /// Far enough that the last section reaches the top.
    pub fn max_offset(&self) -> u32 {
        self.tops.last().copied().unwrap_or(0)
    }

    /// Row of the column, counted from the top of the viewport, at which a
    /// section becomes active.
    fn trigger(&self) -> u32 {
        u32::from(self.rows) / 3
    }

    /// The last section whose top has passed the trigger line.
    pub fn active_index(&self) -> usize {
        let line = self.offset + self.trigger();
        let passed = self.tops.partition_point(|&top| top <= line);
        passed.saturating_sub(1).min(self.sections.len().saturating_sub(1))
    }

    pub fn scroll_to(&mut self, offset: u32) {
        self.offset = offset.min(self.max_offset());
    }

    pub fn scroll_by(&mut self, delta: i32) {
        let target = i64::from(self.offset) + i64::from(delta);
        self.scroll_to(target.clamp(0, i64::from(u32::MAX)) as u32);
    }

    pub fn page(&self) -> i32 {
        i32::from(self.rows.max(2)) - 1
    }

    /// Jump to the next section that is not a ghost. Returns whether the
    /// offset moved.
    pub fn next_section(&mut self) -> bool {
        let from = self.active_index();
        let Some(top) = self
            .sections
            .iter()
            .enumerate()
            .skip(from + 1)
            .find(|(_, s)| !s.ghost)
            .map(|(i, _)| self.tops[i])
        else {
            return false;
        };
        debug!("jumping from section {from} to offset {top}");
        let before = self.offset;
        self.scroll_to(top);
        self.offset != before
    }

    pub fn first(&mut self) {
        self.offset = 0;
    }

    pub fn last(&mut self) {
        self.offset = self.max_offset();
    }

    /// The rows currently in view, top to bottom.
    pub fn visible(&self) -> &[ColumnLine] {
        let start = (self.offset as usize).min(self.lines.len());
        let end = (start + usize::from(self.rows)).min(self.lines.len());
        &self.lines[start..end]
    }
}

fn blank(section: usize) -> ColumnLine {
    ColumnLine {
        text: String::new(),
        title: false,
        section,
    }
}

/// Greedy word wrap. Words longer than `width` are split.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut out = Vec::new();
    for paragraph in text.split('\n') {
        let mut line = String::new();
        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();
            while word.len() > width {
                if !line.is_empty() {
                    out.push(std::mem::take(&mut line));
                }
                out.push(word.drain(..width).collect());
            }
            let word: String = word.into_iter().collect();
            let needed = if line.is_empty() { word.chars().count() } else { line.chars().count() + 1 + word.chars().count() };
            if needed > width && !line.is_empty() {
                out.push(std::mem::take(&mut line));
            }
            if !line.is_empty() {
                line.push(' ');
            }
            line.push_str(&word);
        }
        out.push(line);
    }
    while out.last().is_some_and(String::is_empty) {
        out.pop();
    }
    out
}

/// The story's narrative, one section per step.
pub fn story_sections() -> Vec<Section> {
    vec![
        Section::new(
            "Permits",
            "Between 2011 and 2020 Israeli authorities granted only a handful of building \
             permits to Palestinians in Area C of the occupied West Bank. Each line traces \
             one year; every turn of the line is a permit.",
        ),
        Section::ghost(),
        Section::new(
            "A decade of permits",
            "Put together, a whole decade of permits still makes a short line. Below it, \
             the permits granted to Israeli settlers in a single year.",
        ),
        Section::new(
            "Demolitions",
            "Without permits, families build anyway. Each square is a structure the \
             authorities demolished, sized by the housing units it held.",
        ),
        Section::new(
            "Granted or denied",
            "Almost every application is refused. The few granted sit apart on the left; \
             the rest end up on the demolition lists.",
        ),
        Section::new(
            "Where it happened",
            "A sample of the demolitions, placed where they happened. They fade as the \
             years pass and the count keeps growing.",
        ),
        Section::new(
            "People left homeless",
            "Each demolition left people without a home. Stacked by year, the slices \
             show how many.",
        ),
        Section::new(
            "Behind the numbers",
            "Some of the communities behind these figures. Click a tile to read about \
             the demolition it shows.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scroller() -> Scroller {
        Scroller::new(story_sections(), 30, 24)
    }

    #[test]
    fn wrap_fills_lines_greedily() {
        assert_eq!(wrap("aa bb cc dd", 5), vec!["aa bb", "cc dd"]);
        assert_eq!(wrap("abcdefg", 3), vec!["abc", "def", "g"]);
        assert!(wrap("", 10).is_empty());
    }

    #[test]
    fn sections_are_at_least_three_quarters_of_the_view() {
        let s = scroller();
        for pair in s.tops().windows(2) {
            assert!(pair[1] - pair[0] >= 12);
        }
        assert_eq!(s.tops().len(), 8);
        assert_eq!(s.tops()[2] - s.tops()[1], 13);
    }

    #[test]
    fn active_section_follows_the_trigger_line() {
        let mut s = scroller();
        assert_eq!(s.active_index(), 0);
        let second = s.tops()[1];
        s.scroll_to(second - 8);
        assert_eq!(s.active_index(), 1);
        s.scroll_to(second - 9);
        assert_eq!(s.active_index(), 0);
    }

    #[test]
    fn next_section_skips_ghosts() {
        let mut s = scroller();
        assert!(s.next_section());
        assert_eq!(s.offset(), s.tops()[2]);
        assert_eq!(s.active_index(), 2);
        s.last();
        assert_eq!(s.active_index(), 7);
        assert!(!s.next_section());
    }

    #[test]
    fn scrolling_is_clamped() {
        let mut s = scroller();
        s.scroll_by(-5);
        assert_eq!(s.offset(), 0);
        s.scroll_by(100_000);
        assert_eq!(s.offset(), s.max_offset());
        assert_eq!(s.visible().len().min(24), s.visible().len());
    }
}
