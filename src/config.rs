use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use log::warn;
use serde::{Deserialize, Serialize};

/// Everything tunable about the story. Every section has defaults, so a
/// config file only needs the fields it changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StoryConfig {
    /// Seed for every random draw (band targets, sampling, jitter).
    pub seed: u64,
    pub layout: LayoutConfig,
    pub rect: RectConfig,
    pub lines: LineConfig,
    pub timing: TimingConfig,
    pub forces: ForceConfig,
    pub map: MapConfig,
    pub data: DataConfig,
    pub tiles: TileConfig,
    pub key_bindings: KeyBindings,
}

/// Reference geometry. All sizes are in reference units at `width`; the scene
/// scales them by `adjusted_width / width` after every resize.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub width: f64,
    pub height: f64,
    pub margin: Margin,
    pub bar_margin: Margin,
    pub domain_start: f64,
    pub domain_end: f64,
    /// Width of the narrative column in the terminal player.
    pub narrative_cols: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Margin {
    pub left: f64,
    pub right: f64,
    pub top: f64,
    pub bottom: f64,
}

impl Margin {
    pub fn scaled(&self, factor: f64) -> Margin {
        Margin {
            left: self.left * factor,
            right: self.right * factor,
            top: self.top * factor,
            bottom: self.bottom * factor,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        LayoutConfig {
            width: 800.0,
            height: 500.0,
            margin: Margin {
                left: 150.0,
                right: 100.0,
                top: 50.0,
                bottom: 20.0,
            },
            bar_margin: Margin {
                left: 70.0,
                right: 30.0,
                top: 50.0,
                bottom: 50.0,
            },
            domain_start: 0.0,
            domain_end: 100.0,
            narrative_cols: 36,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RectConfig {
    pub width: f64,
    pub height: f64,
    pub opacity: f64,
    pub demolished_opacity: f64,
    pub bar_opacity: f64,
}

impl Default for RectConfig {
    fn default() -> Self {
        RectConfig {
            width: 5.0,
            height: 5.0,
            opacity: 0.9,
            demolished_opacity: 0.1,
            bar_opacity: 0.6,
        }
    }
}

/// Width of one zigzag cycle, in domain units.
const LINE_SPAN: f64 = 100.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    /// Horizontal distance between two path points, in domain units.
    pub length: f64,
    /// Vertical drop per completed cycle, in domain units.
    pub y_change: f64,
    pub y_start: f64,
    /// Added to every year's permit count so single-permit years still draw.
    pub permit_buffer: u32,
    pub comparison_total: u32,
    /// The comparison line draws `1 / speedup` of its points with
    /// `speedup` times the step length.
    pub comparison_speedup: u32,
}

impl LineConfig {
    /// Points per cycle before the zigzag turns around.
    pub fn steps_until_turn(&self) -> usize {
        ((LINE_SPAN / self.length).round() as usize).max(1)
    }
}

impl Default for LineConfig {
    fn default() -> Self {
        LineConfig {
            length: 1.0,
            y_change: 5.0,
            y_start: 100.0,
            permit_buffer: 1,
            comparison_total: 2000,
            comparison_speedup: 2,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    pub reveal_interval_ms: u64,
    pub transition_ms: u64,
    pub resize_debounce_ms: u64,
    pub tick_ms: u64,
    pub date_fade_total_ms: u64,
    /// Lower bound on the delay between two permit-line queue items.
    pub queue_floor_ms: u64,
    pub frame_ms: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        TimingConfig {
            reveal_interval_ms: 5,
            transition_ms: 1000,
            resize_debounce_ms: 10,
            tick_ms: 16,
            date_fade_total_ms: 5000,
            queue_floor_ms: 40,
            frame_ms: 33,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForceConfig {
    pub swarm_strength: f64,
    pub split_strength: f64,
    pub collide_radius: f64,
    pub collide_strength: f64,
    pub start_alpha: f64,
    pub resize_alpha: f64,
    pub alpha_min: f64,
    pub velocity_decay: f64,
    /// Upper bound on ticks run in one poll when the loop falls behind.
    pub max_ticks_per_poll: u32,
}

impl Default for ForceConfig {
    fn default() -> Self {
        ForceConfig {
            swarm_strength: 0.075,
            split_strength: 0.2,
            collide_radius: 2.0,
            collide_strength: 0.7,
            start_alpha: 0.75,
            resize_alpha: 1.0,
            alpha_min: 0.001,
            velocity_decay: 0.4,
            max_ticks_per_poll: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MapConfig {
    /// `[longitude, latitude]`
    pub center: [f64; 2],
    pub zoom: f64,
    pub fit_padding: f64,
    pub tile_size: f64,
}

impl Default for MapConfig {
    fn default() -> Self {
        MapConfig {
            center: [35.1, 31.925],
            zoom: 7.0,
            fit_padding: 50.0,
            tile_size: 512.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DataConfig {
    /// Permit years must be strictly greater than this.
    pub min_year_exclusive: i32,
    pub max_year: i32,
    pub min_demolition_date: NaiveDate,
    pub show_on_map_probability: f64,
    pub grant_probability: f64,
    pub offset_range: f64,
}

impl Default for DataConfig {
    fn default() -> Self {
        DataConfig {
            min_year_exclusive: 2010,
            max_year: 2020,
            min_demolition_date: NaiveDate::from_ymd_opt(2011, 1, 1).unwrap_or_default(),
            show_on_map_probability: 0.1,
            grant_probability: 0.01,
            offset_range: 10.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TileConfig {
    pub count: usize,
}

impl Default for TileConfig {
    fn default() -> Self {
        TileConfig { count: 9 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyBindings {
    pub scroll_down: String,
    pub scroll_up: String,
    pub page_down: String,
    pub page_up: String,
    pub next_section: String,
    pub first_section: String,
    pub last_section: String,
    pub close_popup: String,
    pub quit: String,
    pub fullscreen: String,
}

impl Default for KeyBindings {
    fn default() -> Self {
        KeyBindings {
            scroll_down: "Down".into(),
            scroll_up: "Up".into(),
            page_down: "PageDown".into(),
            page_up: "PageUp".into(),
            next_section: "Space".into(),
            first_section: "Home".into(),
            last_section: "End".into(),
            close_popup: "Esc".into(),
            quit: "q".into(),
            fullscreen: "F11".into(),
        }
    }
}

impl StoryConfig {
    /// Load from `path`, or from the user config location when `path` is
    /// `None`. A missing file silently yields defaults; an invalid one warns.
    pub fn load(path: Option<&Path>) -> Self {
        let config_path = path.map(Path::to_path_buf).unwrap_or_else(Self::config_path);
        match std::fs::read_to_string(&config_path) {
            Ok(json) => match serde_json::from_str(&json) {
                Ok(config) => config,
                Err(e) => {
                    warn!(
                        "invalid story config {} ({e}), using defaults",
                        config_path.display()
                    );
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    fn config_path() -> PathBuf {
        let home = std::env::var("HOME").unwrap_or_else(|_| ".".into());
        let mut path = PathBuf::from(home);
        path.push(".config");
        path.push("permit-story");
        path.push("config.json");
        path
    }
}

/// Check whether a crossterm `KeyEvent` matches a binding string from config.
pub fn matches_binding(binding: &str, event: &KeyEvent) -> bool {
    if let Some(ch) = binding.strip_prefix("Ctrl-") {
        if !event.modifiers.contains(KeyModifiers::CONTROL) {
            return false;
        }
        return match ch.chars().next() {
            Some(c) => event.code == KeyCode::Char(c),
            None => false,
        };
    }

    // Plain bindings never fire while Ctrl or Alt is held.
    if event.modifiers.contains(KeyModifiers::CONTROL)
        || event.modifiers.contains(KeyModifiers::ALT)
    {
        return false;
    }

    match binding {
        "Right" => event.code == KeyCode::Right,
        "Left" => event.code == KeyCode::Left,
        "Up" => event.code == KeyCode::Up,
        "Down" => event.code == KeyCode::Down,
        "PageUp" => event.code == KeyCode::PageUp,
        "PageDown" => event.code == KeyCode::PageDown,
        "Enter" => event.code == KeyCode::Enter,
        "Esc" => event.code == KeyCode::Esc,
        "Space" => event.code == KeyCode::Char(' '),
        "Tab" => event.code == KeyCode::Tab,
        "Home" => event.code == KeyCode::Home,
        "End" => event.code == KeyCode::End,
        s => {
            if let Some(rest) = s.strip_prefix('F') {
                if let Ok(n) = rest.parse::<u8>() {
                    return event.code == KeyCode::F(n);
                }
            }
            match s.chars().next() {
                Some(c) => event.code == KeyCode::Char(c),
                None => false,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: StoryConfig =
            serde_json::from_str(r#"{ "seed": 7, "lines": { "y_change": 2.5 } }"#).unwrap();
        assert_eq!(config.seed, 7);
        assert_eq!(config.lines.y_change, 2.5);
        assert_eq!(config.lines.y_start, 100.0);
        assert_eq!(config.tiles.count, 9);
        assert_eq!(
            config.data.min_demolition_date,
            NaiveDate::from_ymd_opt(2011, 1, 1).unwrap()
        );
    }

    #[test]
    fn steps_until_turn_follows_length() {
        let mut lines = LineConfig::default();
        assert_eq!(lines.steps_until_turn(), 100);
        lines.length = 2.0;
        assert_eq!(lines.steps_until_turn(), 50);
    }

    #[test]
    fn bindings_match_keys() {
        let down = KeyEvent::new(KeyCode::Down, KeyModifiers::NONE);
        let space = KeyEvent::new(KeyCode::Char(' '), KeyModifiers::NONE);
        let ctrl_c = KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL);
        let f11 = KeyEvent::new(KeyCode::F(11), KeyModifiers::NONE);
        assert!(matches_binding("Down", &down));
        assert!(!matches_binding("Up", &down));
        assert!(matches_binding("Space", &space));
        assert!(matches_binding("Ctrl-c", &ctrl_c));
        assert!(!matches_binding("c", &ctrl_c));
        assert!(matches_binding("F11", &f11));
    }
}
