//! Emoji counting and stripping.
//!
//! An emoji is counted as one `Extended_Pictographic` scalar value. Zero-width
//! joiners and variation selectors are neither counted nor break counting, so
//! a ZWJ sequence counts its visible pictographs.

use once_cell::sync::Lazy;
use regex::Regex;

static EMOJI_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Extended_Pictographic}").expect("Invalid emoji pattern"));

/// Matches emoji scalars plus the invisible glue around them (ZWJ and
/// variation selectors), used when removing emoji from text.
static EMOJI_STRIP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"[\p{Extended_Pictographic}\u{200D}\u{FE00}-\u{FE0F}]")
        .expect("Invalid emoji strip pattern")
});

/// Count emoji scalar values in a string.
pub fn count_emoji(text: &str) -> usize {
    EMOJI_PATTERN.find_iter(text).count()
}

/// Remove emoji characters (and their ZWJ/variation-selector glue) from a string.
pub fn clean_emoji(text: &str) -> String {
    EMOJI_STRIP_PATTERN.replace_all(text, "").into_owned()
}
