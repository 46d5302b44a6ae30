//! Fixed substitution tables for letters and digits that OCR engines
//! routinely confuse on licence plates.

/// Digit read where a letter belongs.
const DIGIT_TO_LETTER: [(char, char); 6] = [
    ('8', 'B'),
    ('1', 'I'),
    ('0', 'O'),
    ('5', 'S'),
    ('6', 'G'),
    ('3', 'J'),
];

/// Letter for a misread digit, if the digit is in the table.
pub fn letter_for_digit(digit: char) -> Option<char> {
    DIGIT_TO_LETTER
        .iter()
        .find(|(from, _)| *from == digit)
        .map(|(_, to)| *to)
}

/// Digit for a misread letter; the inverse of [`letter_for_digit`].
pub fn digit_for_letter(letter: char) -> Option<char> {
    DIGIT_TO_LETTER
        .iter()
        .find(|(_, to)| *to == letter)
        .map(|(from, _)| *from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_are_inverse() {
        for digit in '0'..='9' {
            if let Some(letter) = letter_for_digit(digit) {
                assert_eq!(digit_for_letter(letter), Some(digit));
            }
        }
    }

    #[test]
    fn unmapped_characters() {
        assert_eq!(letter_for_digit('2'), None);
        assert_eq!(letter_for_digit('7'), None);
        assert_eq!(digit_for_letter('A'), None);
        assert_eq!(digit_for_letter('Z'), None);
    }

    #[test]
    fn known_pairs() {
        assert_eq!(letter_for_digit('8'), Some('B'));
        assert_eq!(letter_for_digit('3'), Some('J'));
        assert_eq!(digit_for_letter('O'), Some('0'));
        assert_eq!(digit_for_letter('G'), Some('6'));
    }
}
