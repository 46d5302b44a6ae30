use tracing::debug;

use crate::format::{correct_plate, CanonicalPlate, PlateEra};
use crate::normalize::normalize_fragment;

/// Header word printed on current-format plates. It is never plate content,
/// but its presence identifies the crop as current format.
pub const ERA_MARKER: &str = "BRASIL";

/// One text span reported by the OCR engine for a cropped region.
#[derive(Debug, Clone, PartialEq)]
pub struct RawFragment {
    pub text: String,
    /// Advisory only; never used to decide between candidates.
    pub confidence: f32,
}

impl RawFragment {
    pub fn new(text: impl Into<String>, confidence: f32) -> Self {
        Self {
            text: text.into(),
            confidence,
        }
    }
}

/// Reads at most one canonical plate out of the fragments of one crop.
///
/// Every fragment is tried on its own first, in detection order. When none
/// corrects, every ordered pair `i < j` is concatenated and tried. A
/// fragment reading `BRASIL` switches the whole crop to the current era and
/// takes no part in any candidate.
pub fn read_plate(fragments: &[RawFragment], era: PlateEra) -> Option<CanonicalPlate> {
    let mut era = era;
    let mut tokens = Vec::with_capacity(fragments.len());
    for fragment in fragments {
        let token = normalize_fragment(&fragment.text);
        debug!(
            raw = %fragment.text,
            token = %token,
            confidence = fragment.confidence,
            "normalized fragment"
        );
        if token == ERA_MARKER {
            era = PlateEra::Current;
        } else if !token.is_empty() {
            tokens.push(token);
        }
    }

    for token in &tokens {
        if let Some(plate) = correct_plate(token, era) {
            return Some(plate);
        }
    }

    for (i, head) in tokens.iter().enumerate() {
        for tail in &tokens[i + 1..] {
            let combined = format!("{head}{tail}");
            debug!(combined = %combined, "trying fragment combination");
            if let Some(plate) = correct_plate(&combined, era) {
                return Some(plate);
            }
        }
    }

    None
}
