// Turns human-entered classification text into canonical filename tokens.
//
// Detection is plain substring containment on a few marker words, checked in
// a fixed priority order. Unknown text never errors; it just yields fewer
// tokens, which makes downstream matching more permissive.

use super::book_models::{ClassificationInput, Dimension, TokenSet, ARABIC_TOKEN, ENGLISH_TOKEN};
use thiserror::Error;

// Stage markers. Both hamza spellings are common in typed input.
const SECONDARY_MARKERS: &[&str] = &["ثانوي"];
const PREPARATORY_MARKERS: &[&str] = &["إعدادي", "اعدادي"];

// Grade markers, ordinal words as they appear in "الصف الأول" and friends.
const FIRST_MARKERS: &[&str] = &["أول", "اول"];
const SECOND_MARKERS: &[&str] = &["ثاني"];
const THIRD_MARKERS: &[&str] = &["ثالث"];
const FOURTH_MARKERS: &[&str] = &["رابع"];
const FIFTH_MARKERS: &[&str] = &["خامس"];
const SIXTH_MARKERS: &[&str] = &["سادس"];

const ARABIC_MARKERS: &[&str] = &["عربي", "arabic"];

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ClassificationError {
    #[error("Could not classify {missing:?} from the given text (tokens: {tokens})")]
    Incomplete {
        tokens: TokenSet,
        missing: Vec<Dimension>,
    },
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    let lowered = text.to_lowercase();
    markers.iter().any(|marker| lowered.contains(marker))
}

/// Picks the token for the first grade marker found, in the given order.
fn pick_by_grade(grade: &str, table: [(&[&str], &'static str); 3]) -> Option<&'static str> {
    table
        .into_iter()
        .find(|(markers, _)| contains_any(grade, markers))
        .map(|(_, token)| token)
}

/// Level token from the stage and grade text.
///
/// Secondary wins over preparatory; anything else is treated as primary.
fn level_token(stage: &str, grade: &str) -> Option<&'static str> {
    if contains_any(stage, SECONDARY_MARKERS) {
        pick_by_grade(
            grade,
            [
                (FIRST_MARKERS, "Sec1"),
                (SECOND_MARKERS, "Sec2"),
                (THIRD_MARKERS, "Sec3"),
            ],
        )
    } else if contains_any(stage, PREPARATORY_MARKERS) {
        pick_by_grade(
            grade,
            [
                (FIRST_MARKERS, "Prep1"),
                (SECOND_MARKERS, "Prep2"),
                (THIRD_MARKERS, "Prep3"),
            ],
        )
    } else {
        pick_by_grade(
            grade,
            [
                (FOURTH_MARKERS, "Grade4"),
                (FIFTH_MARKERS, "Grade5"),
                (SIXTH_MARKERS, "Grade6"),
            ],
        )
    }
}

/// Language token. Anything not recognised as Arabic is English.
fn language_token(language: &str) -> &'static str {
    if contains_any(language, ARABIC_MARKERS) {
        ARABIC_TOKEN
    } else {
        ENGLISH_TOKEN
    }
}

/// Maps classification text to tokens. Never fails.
pub fn tokenize(stage: &str, grade: &str, language: &str) -> TokenSet {
    let level = level_token(stage, grade);
    // The language token is always computed, independently of the level.
    let language = language_token(language);
    TokenSet::new(level, language)
}

pub fn tokenize_input(input: &ClassificationInput) -> TokenSet {
    tokenize(&input.stage, &input.grade, &input.language)
}

/// Opt-in strict variant: fails when stage/grade produced no token.
///
/// The pipeline itself never calls this; callers that would rather reject
/// vague input than risk a loose match use it before fetching.
pub fn validate_classification(
    input: &ClassificationInput,
) -> Result<TokenSet, ClassificationError> {
    let tokens = tokenize_input(input);
    let missing = tokens.missing_dimensions();
    if missing.is_empty() {
        Ok(tokens)
    } else {
        Err(ClassificationError::Incomplete { tokens, missing })
    }
}
