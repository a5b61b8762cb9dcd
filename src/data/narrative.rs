//! Narrative content shown in tile popups, keyed by locality.

use std::collections::HashMap;
use std::path::Path;

use log::debug;
use serde::Deserialize;

use crate::error::DataError;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "(String, String, String, String)")]
pub struct NarrativeEntry {
    pub image: String,
    pub credit: String,
    pub date: String,
    /// May contain inline HTML from the source copy.
    pub body: String,
}

impl From<(String, String, String, String)> for NarrativeEntry {
    fn from((image, credit, date, body): (String, String, String, String)) -> Self {
        NarrativeEntry {
            image,
            credit,
            date,
            body,
        }
    }
}

impl NarrativeEntry {
    fn new(image: &str, credit: &str, date: &str) -> Self {
        NarrativeEntry {
            image: image.to_string(),
            credit: credit.to_string(),
            date: date.to_string(),
            body: String::new(),
        }
    }

    /// Body text with tags removed and whitespace collapsed, for the terminal.
    pub fn plain_body(&self) -> String {
        let mut out = String::with_capacity(self.body.len());
        let mut in_tag = false;
        for ch in self.body.chars() {
            match ch {
                '<' => in_tag = true,
                '>' => {
                    in_tag = false;
                    out.push(' ');
                }
                c if !in_tag => out.push(c),
                _ => {}
            }
        }
        out.split_whitespace().collect::<Vec<_>>().join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct NarrativeStore {
    entries: HashMap<String, NarrativeEntry>,
    placeholder: NarrativeEntry,
}

impl Default for NarrativeStore {
    fn default() -> Self {
        Self::builtin()
    }
}

impl NarrativeStore {
    /// Photo credits for the localities pictured in the tile gallery.
    pub fn builtin() -> Self {
        let entries = [
            ("Kh. Ma'in", NarrativeEntry::new("khirbet_main_demolition.jpeg", "Nasser Nawaj'ah, B'Tselem", "November 23rd, 2021")),
            ("Um al-Kheir", NarrativeEntry::new("umm_al_khair_demolition.jpeg", "Emily Glick, 972 Magazine", "July 7th, 2024")),
            ("al-Walajah", NarrativeEntry::new("al_walajah_demolition.jpeg", "Alberto Pizzoli, Agence-France Press", "January 16th, 2024")),
            ("Khan al-Ahmar (Bedouin Community)", NarrativeEntry::new("khan_al_ahmar_demolition.jpeg", "Aziza Nofal, Al Jazeera", "January 31st, 2023")),
            ("Kh. Jenbah", NarrativeEntry::new("jinbeh_demolition.jpeg", "Keren Manor, Activestills", "February 3rd, 2020")),
            ("a-Rakeez", NarrativeEntry::new("a_rakeez_demolition.jpeg", "Keren Manor, Activestills", "January 8th, 2021")),
            ("Kh. al-Markez", NarrativeEntry::new("masafer_yatta_demolition.jpeg", "Keren Manor, Activestills", "January 8th, 2021")),
            ("Kh. Humsah", NarrativeEntry::new("khirbet_humsah_demolition.jpeg", "Sarit Michaeli, B'Tselem", "December 2020")),
            ("'Ein Samia", NarrativeEntry::new("ein_samia_demolition.jpeg", "Basel Adra, 972 Magazine", "May 23, 2023")),
        ];
        NarrativeStore {
            entries: entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
            placeholder: Self::default_placeholder(),
        }
    }

    fn default_placeholder() -> NarrativeEntry {
        NarrativeEntry::new("khirbet_main_demolition.jpg", "", "")
    }

    /// Load a JSON object of `locality: [image, credit, date, body]`.
    pub fn from_json_file(path: &Path) -> Result<Self, DataError> {
        let json = std::fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<String, NarrativeEntry> =
            serde_json::from_str(&json).map_err(|e| DataError::Io {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
            })?;
        debug!("loaded {} narrative entries from {}", entries.len(), path.display());
        Ok(NarrativeStore {
            entries,
            placeholder: Self::default_placeholder(),
        })
    }

    /// Entry for `locality`, or the placeholder when none is recorded.
    pub fn lookup(&self, locality: &str) -> &NarrativeEntry {
        self.entries.get(locality).unwrap_or(&self.placeholder)
    }

    pub fn contains(&self, locality: &str) -> bool {
        self.entries.contains_key(locality)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_locality_falls_back_to_placeholder() {
        let store = NarrativeStore::builtin();
        let entry = store.lookup("Nowhere");
        assert_eq!(entry.image, "khirbet_main_demolition.jpg");
        assert!(!store.contains("Nowhere"));
        assert_eq!(store.lookup("Kh. Jenbah").credit, "Keren Manor, Activestills");
    }

    #[test]
    fn entries_deserialize_from_tuples() {
        let json = r#"{ "Yatta": ["yatta.jpg", "Credit", "2020", "<p>Homes <em>gone</em>.</p>"] }"#;
        let entries: HashMap<String, NarrativeEntry> = serde_json::from_str(json).unwrap();
        let yatta = &entries["Yatta"];
        assert_eq!(yatta.image, "yatta.jpg");
        assert_eq!(yatta.plain_body(), "Homes gone .");
    }
}
