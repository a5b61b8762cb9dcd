//! Renderer: the deterministic rasterizer.
//!
//! Turns a `Surface` into a fixed-size grid of terminal cells, and a
//! sequence of grids into a `PlayablePresentation` (first frame full, the
//! rest diffs). Shapes are drawn in braille dots, `DOTS_X` by `DOTS_Y` per
//! cell; text overwrites whole cells.
//!
//! The renderer is pure and stateless. Given the same surface it always
//! produces the same cells. It knows nothing about time or steps.

use crate::surface::{Align, Element, Shape, Surface};
use crate::types::{
    Cell, CellChange, DOTS_X, DOTS_Y, Frame, Marker, PlayablePresentation, Point, Style,
    TerminalContract,
};

const BRAILLE_BASE: u32 = 0x2800;

/// Braille bit for dot `(dx, dy)` inside one cell.
const BRAILLE_BITS: [[u8; 4]; 2] = [[0x01, 0x02, 0x04, 0x40], [0x08, 0x10, 0x20, 0x80]];

/// Below this an element draws dim.
const DIM_OPACITY: f64 = 0.5;
/// Below this an element draws only its outline.
const GHOST_OPACITY: f64 = 0.2;

/// A labelled grid, one per rendered story step.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub label: String,
    pub cells: Vec<Vec<Cell>>,
}

pub struct Renderer;

impl Renderer {
    /// Collect snapshots into a presentation with one marker per snapshot.
    pub fn render(snapshots: &[Snapshot], contract: TerminalContract) -> PlayablePresentation {
        let mut frames = Vec::with_capacity(snapshots.len());
        let mut markers = Vec::with_capacity(snapshots.len());
        let mut prev_grid: Option<&Vec<Vec<Cell>>> = None;

        for (index, snapshot) in snapshots.iter().enumerate() {
            let frame = match prev_grid {
                None => Frame::Full {
                    cells: snapshot.cells.clone(),
                },
                Some(prev) => Frame::Diff {
                    changes: Self::diff(prev, &snapshot.cells),
                },
            };
            frames.push(frame);
            markers.push(Marker {
                frame_index: index,
                label: snapshot.label.clone(),
            });
            prev_grid = Some(&snapshot.cells);
        }

        PlayablePresentation {
            contract,
            frames,
            markers,
        }
    }

    /// Rasterize every painted element, back to front.
    pub fn rasterize(surface: &Surface, contract: &TerminalContract) -> Vec<Vec<Cell>> {
        let mut canvas = Canvas::new(contract.width as usize, contract.height as usize);
        for (_, element) in surface.painted() {
            canvas.draw(element);
        }
        canvas.into_cells()
    }

    /// Compute a cell-level diff between two grids.
    pub fn diff(prev: &[Vec<Cell>], next: &[Vec<Cell>]) -> Vec<CellChange> {
        let mut changes = Vec::new();
        for (y, (prev_row, next_row)) in prev.iter().zip(next.iter()).enumerate() {
            for (x, (prev_cell, next_cell)) in prev_row.iter().zip(next_row.iter()).enumerate() {
                if prev_cell != next_cell {
                    changes.push(CellChange {
                        x: x as u16,
                        y: y as u16,
                        cell: next_cell.clone(),
                    });
                }
            }
        }
        changes
    }
}

#[derive(Debug, Clone, Default)]
struct Slot {
    dots: u8,
    text: Option<char>,
    style: Style,
}

struct Canvas {
    width: usize,
    height: usize,
    slots: Vec<Slot>,
}

impl Canvas {
    fn new(width: usize, height: usize) -> Self {
        Canvas {
            width,
            height,
            slots: vec![Slot::default(); width * height],
        }
    }

    fn draw(&mut self, element: &Element) {
        let style = styled(&element.style, element.opacity);
        let ghost = element.opacity < GHOST_OPACITY;
        match &element.shape {
            Shape::Rect { origin, width, height } => self.rect(*origin, *width, *height, ghost, &style),
            Shape::Path { points } => {
                for pair in points.windows(2) {
                    self.line(pair[0], pair[1], &style);
                }
                if let [only] = points.as_slice() {
                    self.dot(only.x, only.y, &style);
                }
            }
            Shape::Text { anchor, text, align, boxed } => {
                let label = if *boxed { format!("[ {text} ]") } else { text.clone() };
                self.text(*anchor, &label, *align, &style);
            }
        }
    }

    fn rect(&mut self, origin: Point, width: f64, height: f64, outline_only: bool, style: &Style) {
        let x0 = origin.x.round() as i64;
        let y0 = origin.y.round() as i64;
        // Every rect covers at least one dot.
        let x1 = (origin.x + width).round().max(x0 as f64 + 1.0) as i64;
        let y1 = (origin.y + height).round().max(y0 as f64 + 1.0) as i64;
        for y in y0..y1 {
            for x in x0..x1 {
                let edge = x == x0 || y == y0 || x == x1 - 1 || y == y1 - 1;
                if !outline_only || edge {
                    self.set_dot(x, y, style);
                }
            }
        }
    }

    fn line(&mut self, a: Point, b: Point, style: &Style) {
        let (mut x0, mut y0) = (a.x.round() as i64, a.y.round() as i64);
        let (x1, y1) = (b.x.round() as i64, b.y.round() as i64);
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.set_dot(x0, y0, style);
            if x0 == x1 && y0 == y1 {
                break;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }

    fn dot(&mut self, x: f64, y: f64, style: &Style) {
        self.set_dot(x.round() as i64, y.round() as i64, style);
    }

    fn set_dot(&mut self, x: i64, y: i64, style: &Style) {
        if x < 0 || y < 0 {
            return;
        }
        let (cx, cy) = (x as usize / DOTS_X as usize, y as usize / DOTS_Y as usize);
        if cx >= self.width || cy >= self.height {
            return;
        }
        let bit = BRAILLE_BITS[x as usize % DOTS_X as usize][y as usize % DOTS_Y as usize];
        let slot = &mut self.slots[cy * self.width + cx];
        slot.dots |= bit;
        slot.text = None;
        slot.style = style.clone();
    }

    fn text(&mut self, anchor: Point, text: &str, align: Align, style: &Style) {
        let len = text.chars().count() as i64;
        let col = (anchor.x / f64::from(DOTS_X)).round() as i64;
        let row = (anchor.y / f64::from(DOTS_Y)).floor() as i64;
        let start = match align {
            Align::Left => col,
            Align::Center => col - len / 2,
            Align::Right => col - len,
        };
        if row < 0 || row as usize >= self.height {
            return;
        }
        for (i, ch) in text.chars().enumerate() {
            let x = start + i as i64;
            if x < 0 || x as usize >= self.width {
                continue;
            }
            let slot = &mut self.slots[row as usize * self.width + x as usize];
            slot.text = Some(ch);
            slot.dots = 0;
            slot.style = style.clone();
        }
    }

    fn into_cells(self) -> Vec<Vec<Cell>> {
        let width = self.width.max(1);
        self.slots
            .chunks(width)
            .take(self.height)
            .map(|row| row.iter().map(to_cell).collect())
            .collect()
    }
}

fn to_cell(slot: &Slot) -> Cell {
    let ch = match slot.text {
        Some(ch) => ch,
        None if slot.dots != 0 => char::from_u32(BRAILLE_BASE + u32::from(slot.dots)).unwrap_or(' '),
        None => ' ',
    };
    if ch == ' ' {
        return Cell::default();
    }
    Cell {
        ch,
        style: slot.style.clone(),
    }
}

fn styled(base: &Style, opacity: f64) -> Style {
    let mut style = base.clone();
    if opacity < DIM_OPACITY {
        style.dim = true;
    }
    style
}

/// The palette the story draws with.
pub mod palette {
    use crate::types::{Color, NamedColor, Style};

    pub fn node() -> Style {
        Style::fg(Color::Rgb { r: 214, g: 84, b: 64 })
    }

    pub fn bar() -> Style {
        Style::fg(Color::Rgb { r: 64, g: 64, b: 128 })
    }

    pub fn tile() -> Style {
        Style {
            fg: Some(Color::Named(NamedColor::White)),
            bold: true,
            ..Default::default()
        }
    }

    pub fn permit_line() -> Style {
        Style::fg(Color::Named(NamedColor::White))
    }

    pub fn comparison_line() -> Style {
        Style::fg(Color::Named(NamedColor::Cyan))
    }

    pub fn basemap() -> Style {
        Style {
            fg: Some(Color::Named(NamedColor::Blue)),
            dim: true,
            ..Default::default()
        }
    }

    pub fn label() -> Style {
        Style::default()
    }

    pub fn caption() -> Style {
        Style {
            bold: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::{Element, ElementKey, Layer};

    fn contract() -> TerminalContract {
        TerminalContract { width: 4, height: 2 }
    }

    #[test]
    fn single_dot_rect_sets_one_braille_bit() {
        let mut s = Surface::new();
        s.insert(
            ElementKey::Node(0),
            Element::new(Layer::Chart, Shape::rect(Point::new(1.0, 1.0), 0.4, 0.4), Style::default()),
        );
        let cells = Renderer::rasterize(&s, &contract());
        assert_eq!(cells[0][0].ch, '\u{2810}');
        assert_eq!(cells[0][1], Cell::default());
    }

    #[test]
    fn horizontal_path_fills_top_row_of_dots() {
        let mut s = Surface::new();
        s.insert(
            ElementKey::PermitLine(2011),
            Element::new(
                Layer::Chart,
                Shape::Path {
                    points: vec![Point::new(0.0, 0.0), Point::new(7.0, 0.0)],
                },
                Style::default(),
            ),
        );
        let cells = Renderer::rasterize(&s, &contract());
        assert!(cells[0].iter().all(|c| c.ch == '\u{2809}'));
        assert!(cells[1].iter().all(|c| c.ch == ' '));
    }

    #[test]
    fn text_overwrites_dots_and_faded_draws_dim() {
        let mut s = Surface::new();
        s.insert(
            ElementKey::Node(0),
            Element::new(Layer::Chart, Shape::rect(Point::new(0.0, 0.0), 8.0, 4.0), Style::default())
                .with_opacity(0.3),
        );
        s.insert(
            ElementKey::DateDisplay,
            Element::new(Layer::Labels, Shape::text(Point::new(2.0, 0.0), "Hi"), Style::default()),
        );
        let cells = Renderer::rasterize(&s, &contract());
        assert_eq!(cells[0][0].ch, '\u{28ff}');
        assert!(cells[0][0].style.dim);
        assert_eq!(cells[0][1].ch, 'H');
        assert_eq!(cells[0][2].ch, 'i');
    }

    #[test]
    fn render_emits_full_then_diff_with_markers() {
        let blank = vec![vec![Cell::default(); 2]; 1];
        let mut marked = blank.clone();
        marked[0][1].ch = 'x';
        let p = Renderer::render(
            &[
                Snapshot { label: "a".into(), cells: blank },
                Snapshot { label: "b".into(), cells: marked },
            ],
            TerminalContract { width: 2, height: 1 },
        );
        assert!(matches!(p.frames[0], Frame::Full { .. }));
        match &p.frames[1] {
            Frame::Diff { changes } => assert_eq!(changes.len(), 1),
            other => panic!("expected diff, got {other:?}"),
        }
        assert_eq!(p.markers[1].label, "b");
    }
}
