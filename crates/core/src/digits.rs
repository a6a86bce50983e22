//! Seven-segment digit encoding
//!
//! Segment order within a glyph is
//! `[top-left, top, top-right, middle, bottom-left, bottom, bottom-right]`,
//! which is the order the cooler displays wire their digit LEDs.

use crate::error::{RenderError, Result};

/// On/off state of the seven segments of one digit
pub type Segments = [bool; 7];

const fn seg(bits: [u8; 7]) -> Segments {
    [
        bits[0] == 1,
        bits[1] == 1,
        bits[2] == 1,
        bits[3] == 1,
        bits[4] == 1,
        bits[5] == 1,
        bits[6] == 1,
    ]
}

const DIGIT_SEGMENTS: [Segments; 10] = [
    seg([1, 1, 1, 0, 1, 1, 1]), // 0
    seg([0, 0, 1, 0, 0, 0, 1]), // 1
    seg([0, 1, 1, 1, 1, 1, 0]), // 2
    seg([0, 1, 1, 1, 0, 1, 1]), // 3
    seg([1, 0, 1, 1, 0, 0, 1]), // 4
    seg([1, 1, 0, 1, 0, 1, 1]), // 5
    seg([1, 1, 0, 1, 1, 1, 1]), // 6
    seg([0, 1, 1, 0, 0, 0, 1]), // 7
    seg([1, 1, 1, 1, 1, 1, 1]), // 8
    seg([1, 1, 1, 1, 0, 1, 1]), // 9
];

const BLANK_SEGMENTS: Segments = [false; 7];

const LETTER_SEGMENTS: [(char, Segments); 7] = [
    ('H', seg([1, 0, 1, 1, 1, 0, 1])),
    ('C', seg([1, 1, 0, 0, 1, 1, 0])),
    ('E', seg([1, 1, 0, 1, 1, 1, 0])),
    ('F', seg([1, 1, 0, 1, 1, 0, 0])),
    ('L', seg([1, 0, 0, 0, 1, 1, 0])),
    ('P', seg([1, 1, 1, 1, 1, 0, 0])),
    ('-', seg([0, 0, 0, 1, 0, 0, 0])),
];

/// A single displayable character
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Glyph {
    Digit(u8),
    Letter(char),
    Blank,
}

impl Glyph {
    /// Letter glyph, if the display can draw it
    pub fn letter(c: char) -> Option<Glyph> {
        let c = c.to_ascii_uppercase();
        LETTER_SEGMENTS
            .iter()
            .any(|(l, _)| *l == c)
            .then_some(Glyph::Letter(c))
    }

    pub fn segments(self) -> Segments {
        match self {
            Glyph::Digit(d) => DIGIT_SEGMENTS
                .get(d as usize)
                .copied()
                .unwrap_or(BLANK_SEGMENTS),
            Glyph::Letter(c) => LETTER_SEGMENTS
                .iter()
                .find(|(l, _)| *l == c)
                .map(|(_, s)| *s)
                .unwrap_or(BLANK_SEGMENTS),
            Glyph::Blank => BLANK_SEGMENTS,
        }
    }

    /// Reverse lookup; digits win over letters sharing a pattern
    pub fn from_segments(segments: Segments) -> Option<Glyph> {
        if segments == BLANK_SEGMENTS {
            return Some(Glyph::Blank);
        }
        if let Some(d) = DIGIT_SEGMENTS.iter().position(|s| *s == segments) {
            return Some(Glyph::Digit(d as u8));
        }
        LETTER_SEGMENTS
            .iter()
            .find(|(_, s)| *s == segments)
            .map(|(c, _)| Glyph::Letter(*c))
    }
}

/// Glyph used to left-pad numbers shorter than their field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Fill {
    #[default]
    Blank,
    Zero,
    /// Dash, marks a padded field visibly
    OverflowMark,
}

impl Fill {
    pub fn glyph(self) -> Glyph {
        match self {
            Fill::Blank => Glyph::Blank,
            Fill::Zero => Glyph::Digit(0),
            Fill::OverflowMark => Glyph::Letter('-'),
        }
    }
}

fn decimal_digits(mut value: u64) -> Vec<u8> {
    let mut digits = Vec::new();
    loop {
        digits.push((value % 10) as u8);
        value /= 10;
        if value == 0 {
            break;
        }
    }
    digits.reverse();
    digits
}

/// Encode `value` into exactly `digit_count` glyphs, most significant first.
///
/// Short numbers are left-padded with `fill`; long numbers lose their most
/// significant digits. A negative value means "no value" and yields blanks.
pub fn encode_digits(value: i64, digit_count: usize, fill: Fill) -> Vec<Glyph> {
    if value < 0 {
        return vec![Glyph::Blank; digit_count];
    }

    let digits = decimal_digits(value as u64);
    if digits.len() >= digit_count {
        digits[digits.len() - digit_count..]
            .iter()
            .map(|d| Glyph::Digit(*d))
            .collect()
    } else {
        let mut glyphs = vec![fill.glyph(); digit_count - digits.len()];
        glyphs.extend(digits.into_iter().map(Glyph::Digit));
        glyphs
    }
}

/// Like [`encode_digits`], but rejects values at or above `ceiling`
pub fn checked_encode(value: i64, digit_count: usize, fill: Fill, ceiling: i64) -> Result<Vec<Glyph>> {
    if value >= ceiling {
        return Err(RenderError::Domain { value, ceiling });
    }
    Ok(encode_digits(value, digit_count, fill))
}

/// Read a number back from glyphs; leading blanks are padding
pub fn decode(glyphs: &[Glyph]) -> Option<i64> {
    let digits: Vec<u8> = glyphs
        .iter()
        .skip_while(|g| **g == Glyph::Blank)
        .map(|g| match g {
            Glyph::Digit(d) => Some(*d),
            _ => None,
        })
        .collect::<Option<_>>()?;

    if digits.is_empty() {
        return None;
    }
    digits
        .iter()
        .try_fold(0i64, |acc, d| acc.checked_mul(10)?.checked_add(*d as i64))
}

/// Flatten glyphs into per-LED states, seven per glyph
pub fn flatten(glyphs: &[Glyph]) -> Vec<bool> {
    glyphs.iter().flat_map(|g| g.segments()).collect()
}

/// Geometry of a numeric field, derived from the width of its LED group
///
/// Every 7 LEDs hold one digit; the remaining `width % 7` leading LEDs are
/// overflow flags (the "1" of "100%"), lit when the value needs one more
/// digit than the field has.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldLayout {
    pub flag_leds: usize,
    pub digit_count: usize,
}

impl FieldLayout {
    pub fn for_width(width: usize) -> Self {
        Self {
            flag_leds: width % 7,
            digit_count: width / 7,
        }
    }

    pub fn width(&self) -> usize {
        self.flag_leds + self.digit_count * 7
    }

    fn digit_capacity(&self) -> i64 {
        10i64
            .checked_pow(self.digit_count as u32)
            .unwrap_or(i64::MAX)
    }

    /// First value the field cannot show
    pub fn ceiling(&self) -> i64 {
        let capacity = self.digit_capacity();
        if self.flag_leds > 0 {
            capacity.saturating_mul(2)
        } else {
            capacity
        }
    }

    fn assemble(&self, flag: bool, glyphs: &[Glyph]) -> Vec<bool> {
        let mut leds = vec![flag; self.flag_leds];
        leds.extend(flatten(glyphs));
        leds
    }

    /// Encode a metric value; `DomainError` when it does not fit
    pub fn encode_number(&self, value: i64, fill: Fill) -> Result<Vec<bool>> {
        if value < 0 {
            return Ok(self.assemble(false, &encode_digits(value, self.digit_count, fill)));
        }
        let glyphs = checked_encode(value, self.digit_count, fill, self.ceiling())?;
        let overflow = value >= self.digit_capacity();
        Ok(self.assemble(overflow, &glyphs))
    }

    /// Encode a clock value as two zero-filled digits, right aligned.
    ///
    /// With at least three digits available, `suffix` (e.g. `H` for hours)
    /// takes the last one.
    pub fn encode_time(&self, value: u32, suffix: Option<Glyph>) -> Vec<bool> {
        let (body, suffix) = match suffix {
            Some(glyph) if self.digit_count >= 3 => (self.digit_count - 1, Some(glyph)),
            _ => (self.digit_count, None),
        };
        let shown = body.min(2);
        let mut glyphs = vec![Glyph::Blank; body - shown];
        glyphs.extend(encode_digits(value as i64, shown, Fill::Zero));
        glyphs.extend(suffix);
        self.assemble(false, &glyphs)
    }

    /// Encode one glyph in the last digit position
    pub fn encode_glyph(&self, glyph: Glyph) -> Result<Vec<bool>> {
        if self.digit_count == 0 {
            return Err(RenderError::config(format!(
                "a {}-LED group cannot show a glyph",
                self.width()
            )));
        }
        let mut glyphs = vec![Glyph::Blank; self.digit_count - 1];
        glyphs.push(glyph);
        Ok(self.assemble(false, &glyphs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_all_values() {
        for digit_count in 1..=4usize {
            let limit = 10i64.pow(digit_count as u32);
            for value in 0..limit {
                let glyphs = encode_digits(value, digit_count, Fill::Blank);
                assert_eq!(glyphs.len(), digit_count);
                let back: Vec<Glyph> = glyphs
                    .iter()
                    .map(|g| Glyph::from_segments(g.segments()).unwrap())
                    .collect();
                assert_eq!(decode(&back), Some(value), "value {}", value);
            }
        }
    }

    #[test]
    fn test_negative_is_blank() {
        for n in 0..6 {
            assert_eq!(encode_digits(-1, n, Fill::Blank), vec![Glyph::Blank; n]);
            assert_eq!(encode_digits(-42, n, Fill::Zero), vec![Glyph::Blank; n]);
        }
    }

    #[test]
    fn test_fill_and_truncation() {
        assert_eq!(
            encode_digits(7, 3, Fill::Blank),
            vec![Glyph::Blank, Glyph::Blank, Glyph::Digit(7)]
        );
        assert_eq!(
            encode_digits(7, 2, Fill::Zero),
            vec![Glyph::Digit(0), Glyph::Digit(7)]
        );
        assert_eq!(
            encode_digits(7, 2, Fill::OverflowMark),
            vec![Glyph::Letter('-'), Glyph::Digit(7)]
        );
        // most significant digits are dropped
        assert_eq!(
            encode_digits(12345, 3, Fill::Blank),
            vec![Glyph::Digit(3), Glyph::Digit(4), Glyph::Digit(5)]
        );
        assert_eq!(encode_digits(0, 1, Fill::Blank), vec![Glyph::Digit(0)]);
    }

    #[test]
    fn test_checked_encode_ceiling() {
        assert!(checked_encode(999, 3, Fill::Blank, 1000).is_ok());
        match checked_encode(1000, 3, Fill::Blank, 1000) {
            Err(RenderError::Domain { value, ceiling }) => {
                assert_eq!(value, 1000);
                assert_eq!(ceiling, 1000);
            }
            other => panic!("expected domain error, got {:?}", other),
        }
    }

    #[test]
    fn test_letter_glyphs() {
        assert_eq!(Glyph::letter('h'), Some(Glyph::Letter('H')));
        assert_eq!(Glyph::letter('Z'), None);
        assert_eq!(
            Glyph::Letter('H').segments(),
            [true, false, true, true, true, false, true]
        );
        // 'H' never decodes as a number
        assert_eq!(decode(&[Glyph::Digit(1), Glyph::Letter('H')]), None);
        assert_eq!(decode(&[Glyph::Blank, Glyph::Blank]), None);
    }

    #[test]
    fn test_field_layout_geometry() {
        let usage = FieldLayout::for_width(16);
        assert_eq!(usage.flag_leds, 2);
        assert_eq!(usage.digit_count, 2);
        assert_eq!(usage.ceiling(), 200);

        let temp = FieldLayout::for_width(21);
        assert_eq!(temp.flag_leds, 0);
        assert_eq!(temp.ceiling(), 1000);

        let indicator = FieldLayout::for_width(1);
        assert_eq!(indicator.encode_number(1, Fill::Blank).unwrap(), vec![true]);
        assert_eq!(indicator.encode_number(0, Fill::Blank).unwrap(), vec![false]);
        assert!(indicator.encode_number(2, Fill::Blank).is_err());
    }

    #[test]
    fn test_usage_field_overflow_flags() {
        let usage = FieldLayout::for_width(16);

        let leds = usage.encode_number(42, Fill::Blank).unwrap();
        assert_eq!(leds.len(), 16);
        assert_eq!(&leds[..2], &[false, false]);
        assert_eq!(&leds[2..9], &Glyph::Digit(4).segments());
        assert_eq!(&leds[9..], &Glyph::Digit(2).segments());

        let leds = usage.encode_number(100, Fill::Blank).unwrap();
        assert_eq!(&leds[..2], &[true, true]);
        assert_eq!(&leds[2..9], &Glyph::Digit(0).segments());
        assert_eq!(&leds[9..], &Glyph::Digit(0).segments());

        assert!(matches!(
            usage.encode_number(200, Fill::Blank),
            Err(RenderError::Domain { value: 200, ceiling: 200 })
        ));

        let blank = usage.encode_number(-1, Fill::Blank).unwrap();
        assert!(blank.iter().all(|lit| !lit));
    }

    #[test]
    fn test_time_encoding() {
        let temp = FieldLayout::for_width(21);
        let leds = temp.encode_time(7, Some(Glyph::Letter('H')));
        assert_eq!(&leds[..7], &Glyph::Digit(0).segments());
        assert_eq!(&leds[7..14], &Glyph::Digit(7).segments());
        assert_eq!(&leds[14..], &Glyph::Letter('H').segments());

        let usage = FieldLayout::for_width(16);
        let leds = usage.encode_time(5, None);
        assert_eq!(&leds[..2], &[false, false]);
        assert_eq!(&leds[2..9], &Glyph::Digit(0).segments());
        assert_eq!(&leds[9..], &Glyph::Digit(5).segments());

        // no room for the suffix on two digits
        let leds = usage.encode_time(23, Some(Glyph::Letter('H')));
        assert_eq!(&leds[9..], &Glyph::Digit(3).segments());

        let wide = FieldLayout::for_width(28);
        let leds = wide.encode_time(9, None);
        assert!(leds[..14].iter().all(|lit| !lit));
        assert_eq!(&leds[21..], &Glyph::Digit(9).segments());
    }

    #[test]
    fn test_encode_glyph() {
        let field = FieldLayout::for_width(14);
        let leds = field.encode_glyph(Glyph::Letter('C')).unwrap();
        assert!(leds[..7].iter().all(|lit| !lit));
        assert_eq!(&leds[7..], &Glyph::Letter('C').segments());
        assert!(FieldLayout::for_width(3).encode_glyph(Glyph::Letter('C')).is_err());
    }
}
