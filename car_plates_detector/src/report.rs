//! JSON report of the plates found in one video.
//!
//! ```json
//! {"message": "ok", "plates": {"ABC1234": {"frequency": 9, "frame": 3, "image": "iVBO..."}}}
//! ```
//!
//! Plates appear in the order the clustering pass produced them and images
//! are standard base64 PNG. A video without plates reports
//! `{"message": "No plates detected."}` only.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use plate_canon::PlateMap;
use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

pub const OK: &str = "ok";
pub const NO_PLATES: &str = "No plates detected.";

#[derive(Serialize)]
struct Report<'a> {
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    plates: Option<Plates<'a>>,
}

struct Plates<'a>(&'a PlateMap);

#[derive(Serialize)]
struct PlateEntry {
    frequency: u32,
    frame: u64,
    image: String,
}

impl Serialize for Plates<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (plate, record) in self.0.iter() {
            map.serialize_entry(
                plate,
                &PlateEntry {
                    frequency: record.frequency,
                    frame: record.frame,
                    image: STANDARD.encode(&record.image),
                },
            )?;
        }
        map.end()
    }
}

/// Renders the report. `pretty` indents it for humans.
pub fn render(plates: &PlateMap, pretty: bool) -> Result<String, serde_json::Error> {
    let report = if plates.is_empty() {
        Report {
            message: NO_PLATES,
            plates: None,
        }
    } else {
        Report {
            message: OK,
            plates: Some(Plates(plates)),
        }
    };
    if pretty {
        serde_json::to_string_pretty(&report)
    } else {
        serde_json::to_string(&report)
    }
}
