//! Plate grammars and the positional confusion-aware corrector.

use std::fmt;

use serde::{Serialize, Serializer};
use tracing::trace;

use crate::confusion::{digit_for_letter, letter_for_digit};

/// Number of characters in a plate under either grammar.
pub const PLATE_LEN: usize = 7;

/// Tokens shorter than this are never corrected.
const MIN_CANDIDATE_LEN: usize = 7;
/// Tokens of exactly this length lose their first (noise) character.
const NOISY_CANDIDATE_LEN: usize = 8;

const LETTER_POSITIONS: [usize; 3] = [0, 1, 2];
const DIGIT_POSITIONS: [usize; 3] = [3, 5, 6];
/// Letter slot in the current grammar, digit slot in the legacy one.
const ERA_POSITION: usize = 4;

/// Era hint for one cropped region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PlateEra {
    #[default]
    Legacy,
    Current,
}

impl PlateEra {
    pub fn is_current(self) -> bool {
        self == PlateEra::Current
    }
}

impl From<bool> for PlateEra {
    fn from(is_current: bool) -> Self {
        if is_current {
            PlateEra::Current
        } else {
            PlateEra::Legacy
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Letter,
    Digit,
}

impl Slot {
    fn accepts(self, c: char) -> bool {
        match self {
            Slot::Letter => c.is_ascii_uppercase(),
            Slot::Digit => c.is_ascii_digit(),
        }
    }
}

/// The grammar a canonical plate satisfies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PlateFormat {
    /// `LLL NNNN`
    Legacy,
    /// `LLL N L NN`
    Current,
}

impl PlateFormat {
    /// Grammars in matching order.
    pub const ALL: [PlateFormat; 2] = [PlateFormat::Legacy, PlateFormat::Current];

    fn slots(self) -> [Slot; PLATE_LEN] {
        use Slot::{Digit, Letter};
        match self {
            PlateFormat::Legacy => [Letter, Letter, Letter, Digit, Digit, Digit, Digit],
            PlateFormat::Current => [Letter, Letter, Letter, Digit, Letter, Digit, Digit],
        }
    }

    fn matches(self, chars: &[char]) -> bool {
        chars.len() == PLATE_LEN
            && self
                .slots()
                .iter()
                .zip(chars)
                .all(|(slot, c)| slot.accepts(*c))
    }

    /// First grammar the characters satisfy.
    fn detect(chars: &[char]) -> Option<PlateFormat> {
        Self::ALL.into_iter().find(|format| format.matches(chars))
    }
}

/// A plate string that satisfies exactly one of the two grammars.
///
/// The only ways to obtain one are [`CanonicalPlate::parse`] and
/// [`correct_plate`], so every value is grammar-valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalPlate {
    text: String,
    format: PlateFormat,
}

impl CanonicalPlate {
    /// Accepts `text` only if it already is a grammar-valid plate.
    pub fn parse(text: &str) -> Option<Self> {
        let chars: Vec<char> = text.chars().collect();
        PlateFormat::detect(&chars).map(|format| CanonicalPlate {
            text: text.to_string(),
            format,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn format(&self) -> PlateFormat {
        self.format
    }

    pub fn into_string(self) -> String {
        self.text
    }
}

impl fmt::Display for CanonicalPlate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

impl AsRef<str> for CanonicalPlate {
    fn as_ref(&self) -> &str {
        &self.text
    }
}

impl Serialize for CanonicalPlate {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.text)
    }
}

/// Turns one normalized token into a canonical plate, or `None`.
///
/// Tokens shorter than seven characters are rejected. An eight character
/// token has its first character dropped, even when that leaves an invalid
/// candidate. Letter slots (0, 1, 2) get digits mapped to letters, digit
/// slots (3, 5, 6) get letters mapped to digits, and slot 4 gets a digit
/// mapped to a letter only when the era hint says current format.
pub fn correct_plate(token: &str, era: PlateEra) -> Option<CanonicalPlate> {
    let mut chars: Vec<char> = token.chars().collect();
    if chars.len() < MIN_CANDIDATE_LEN {
        return None;
    }
    if chars.len() == NOISY_CANDIDATE_LEN {
        chars.remove(0);
    }

    for pos in LETTER_POSITIONS {
        if chars[pos].is_ascii_digit() {
            if let Some(letter) = letter_for_digit(chars[pos]) {
                chars[pos] = letter;
            }
        }
    }
    for pos in DIGIT_POSITIONS {
        if chars[pos].is_ascii_alphabetic() {
            if let Some(digit) = digit_for_letter(chars[pos]) {
                chars[pos] = digit;
            }
        }
    }
    if era.is_current() && chars[ERA_POSITION].is_ascii_digit() {
        if let Some(letter) = letter_for_digit(chars[ERA_POSITION]) {
            chars[ERA_POSITION] = letter;
        }
    }

    let format = PlateFormat::detect(&chars);
    let corrected: String = chars.into_iter().collect();
    trace!(token, corrected = %corrected, ?era, ?format, "correction attempt");
    format.map(|format| CanonicalPlate {
        text: corrected,
        format,
    })
}
