//! Surface: the retained scene graph the story draws into.
//!
//! Elements are addressed by what they represent (`ElementKey`) rather than
//! by handle, live on one of a few layers, and carry display, opacity and
//! class state. The renderer turns a surface into cells; the player hit-tests
//! it for pointer events.

use std::collections::{BTreeMap, BTreeSet};

use crate::types::{Point, Style};

/// Paint order, back to front.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Layer {
    Basemap,
    Chart,
    MapOverlay,
    Labels,
}

impl Layer {
    pub const ALL: [Layer; 4] = [Layer::Basemap, Layer::Chart, Layer::MapOverlay, Layer::Labels];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ElementKey {
    /// Demolition node, by record id.
    Node(u32),
    PermitLine(i32),
    PermitLabel(i32),
    DecadeLabel,
    ComparisonLine,
    ComparisonLabel,
    CategoryLabel(Category),
    TileCaption(u32),
    DateDisplay,
    Graticule(usize),
    BarYearLabel(i32),
    BarAxisLabel,
}

impl ElementKey {
    pub fn node_id(&self) -> Option<u32> {
        match self {
            ElementKey::Node(id) => Some(*id),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Align {
    #[default]
    Left,
    Center,
    /// Text ends at the anchor.
    Right,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Top-left corner and size, in dots.
    Rect { origin: Point, width: f64, height: f64 },
    Path { points: Vec<Point> },
    Text { anchor: Point, text: String, align: Align, boxed: bool },
}

impl Shape {
    pub fn rect(origin: Point, width: f64, height: f64) -> Self {
        Shape::Rect { origin, width, height }
    }

    pub fn text(anchor: Point, text: impl Into<String>) -> Self {
        Shape::Text {
            anchor,
            text: text.into(),
            align: Align::Left,
            boxed: false,
        }
    }

    pub fn aligned(anchor: Point, text: impl Into<String>, align: Align) -> Self {
        Shape::Text {
            anchor,
            text: text.into(),
            align,
            boxed: false,
        }
    }

    pub fn caption(anchor: Point, text: impl Into<String>) -> Self {
        Shape::Text {
            anchor,
            text: text.into(),
            align: Align::Center,
            boxed: true,
        }
    }

    fn contains(&self, p: Point, slack: f64) -> bool {
        match self {
            Shape::Rect { origin, width, height } => {
                p.x >= origin.x - slack
                    && p.x <= origin.x + width + slack
                    && p.y >= origin.y - slack
                    && p.y <= origin.y + height + slack
            }
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub layer: Layer,
    pub shape: Shape,
    pub style: Style,
    pub opacity: f64,
    pub visible: bool,
    /// Receives pointer events.
    pub interactive: bool,
    pub classes: BTreeSet<&'static str>,
}

impl Element {
    pub fn new(layer: Layer, shape: Shape, style: Style) -> Self {
        Element {
            layer,
            shape,
            style,
            opacity: 1.0,
            visible: true,
            interactive: false,
            classes: BTreeSet::new(),
        }
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn interactive(mut self) -> Self {
        self.interactive = true;
        self
    }

    pub fn is_drawn(&self) -> bool {
        self.visible && self.opacity > 0.0
    }

    /// Rect geometry, if this is a rect.
    pub fn rect(&self) -> Option<(Point, f64, f64)> {
        match &self.shape {
            Shape::Rect { origin, width, height } => Some((*origin, *width, *height)),
            _ => None,
        }
    }

    pub fn set_rect(&mut self, origin: Point, width: f64, height: f64) {
        self.shape = Shape::Rect { origin, width, height };
    }
}

#[derive(Debug, Clone, Default)]
pub struct Surface {
    elements: BTreeMap<ElementKey, Element>,
    hidden_layers: BTreeSet<Layer>,
}

impl Surface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace.
    pub fn insert(&mut self, key: ElementKey, element: Element) {
        self.elements.insert(key, element);
    }

    pub fn remove(&mut self, key: ElementKey) -> bool {
        self.elements.remove(&key).is_some()
    }

    pub fn remove_where<F: Fn(&ElementKey) -> bool>(&mut self, pred: F) -> usize {
        let before = self.elements.len();
        self.elements.retain(|k, _| !pred(k));
        before - self.elements.len()
    }

    pub fn get(&self, key: ElementKey) -> Option<&Element> {
        self.elements.get(&key)
    }

    pub fn get_mut(&mut self, key: ElementKey) -> Option<&mut Element> {
        self.elements.get_mut(&key)
    }

    pub fn contains(&self, key: ElementKey) -> bool {
        self.elements.contains_key(&key)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = ElementKey> + '_ {
        self.elements.keys().copied()
    }

    pub fn set_visible(&mut self, key: ElementKey, visible: bool) {
        if let Some(e) = self.elements.get_mut(&key) {
            e.visible = visible;
        }
    }

    pub fn set_visible_where<F: Fn(&ElementKey) -> bool>(&mut self, pred: F, visible: bool) {
        for (k, e) in &mut self.elements {
            if pred(k) {
                e.visible = visible;
            }
        }
    }

    pub fn set_opacity(&mut self, key: ElementKey, opacity: f64) {
        if let Some(e) = self.elements.get_mut(&key) {
            e.opacity = opacity;
        }
    }

    pub fn set_layer_visible(&mut self, layer: Layer, visible: bool) {
        if visible {
            self.hidden_layers.remove(&layer);
        } else {
            self.hidden_layers.insert(layer);
        }
    }

    pub fn is_layer_visible(&self, layer: Layer) -> bool {
        !self.hidden_layers.contains(&layer)
    }

    /// Move an element to another layer, keeping its state.
    pub fn reparent(&mut self, key: ElementKey, layer: Layer) {
        if let Some(e) = self.elements.get_mut(&key) {
            e.layer = layer;
        }
    }

    pub fn set_class(&mut self, key: ElementKey, class: &'static str, on: bool) {
        if let Some(e) = self.elements.get_mut(&key) {
            if on {
                e.classes.insert(class);
            } else {
                e.classes.remove(class);
            }
        }
    }

    pub fn has_class(&self, key: ElementKey, class: &'static str) -> bool {
        self.elements.get(&key).is_some_and(|e| e.classes.contains(class))
    }

    /// Elements that would be painted, back to front.
    pub fn painted(&self) -> Vec<(ElementKey, &Element)> {
        let mut out: Vec<_> = self
            .elements
            .iter()
            .filter(|(_, e)| e.is_drawn() && self.is_layer_visible(e.layer))
            .map(|(k, e)| (*k, e))
            .collect();
        out.sort_by_key(|(k, e)| (e.layer, *k));
        out
    }

    /// Topmost painted interactive element under `p`.
    pub fn hit_test(&self, p: Point, slack: f64) -> Option<ElementKey> {
        self.painted()
            .into_iter()
            .rev()
            .find(|(_, e)| e.interactive && e.shape.contains(p, slack))
            .map(|(k, _)| k)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(x: f64, layer: Layer) -> Element {
        Element::new(layer, Shape::rect(Point::new(x, 0.0), 4.0, 4.0), Style::default()).interactive()
    }

    #[test]
    fn hit_test_prefers_top_layer_and_skips_faded() {
        let mut s = Surface::new();
        s.insert(ElementKey::Node(1), node(0.0, Layer::Chart));
        s.insert(ElementKey::Node(2), node(1.0, Layer::MapOverlay));
        assert_eq!(s.hit_test(Point::new(2.0, 2.0), 0.0), Some(ElementKey::Node(2)));
        s.set_opacity(ElementKey::Node(2), 0.0);
        assert_eq!(s.hit_test(Point::new(2.0, 2.0), 0.0), Some(ElementKey::Node(1)));
        s.set_visible(ElementKey::Node(1), false);
        assert_eq!(s.hit_test(Point::new(2.0, 2.0), 0.0), None);
    }

    #[test]
    fn hidden_layer_is_not_painted() {
        let mut s = Surface::new();
        s.insert(ElementKey::Node(1), node(0.0, Layer::MapOverlay));
        s.insert(
            ElementKey::DateDisplay,
            Element::new(Layer::Labels, Shape::text(Point::new(0.0, 0.0), "Year: 2015"), Style::default()),
        );
        s.set_layer_visible(Layer::MapOverlay, false);
        let painted: Vec<_> = s.painted().into_iter().map(|(k, _)| k).collect();
        assert_eq!(painted, vec![ElementKey::DateDisplay]);
    }

    #[test]
    fn reparent_changes_paint_order() {
        let mut s = Surface::new();
        s.insert(ElementKey::Node(1), node(0.0, Layer::MapOverlay));
        s.insert(ElementKey::Node(2), node(0.0, Layer::Chart));
        s.reparent(ElementKey::Node(1), Layer::Chart);
        s.reparent(ElementKey::Node(2), Layer::MapOverlay);
        let order: Vec<_> = s.painted().into_iter().map(|(k, _)| k).collect();
        assert_eq!(order, vec![ElementKey::Node(1), ElementKey::Node(2)]);
    }

    #[test]
    fn remove_where_counts_removed() {
        let mut s = Surface::new();
        s.insert(ElementKey::Node(1), node(0.0, Layer::Chart));
        s.insert(ElementKey::Node(2), node(0.0, Layer::Chart));
        s.insert(ElementKey::DecadeLabel, node(0.0, Layer::Labels));
        assert_eq!(s.remove_where(|k| k.node_id().is_some()), 2);
        assert!(s.contains(ElementKey::DecadeLabel));
        s.set_class(ElementKey::DecadeLabel, "tiled", true);
        assert!(s.has_class(ElementKey::DecadeLabel, "tiled"));
    }
}
