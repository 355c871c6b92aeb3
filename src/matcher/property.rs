//! Attribute predicates used by detector matching.
//!
//! A detector value is either the wildcard `*`, a comma-separated list of
//! accepted values, or a single value. Comparison trims both sides.

/// Detector value accepting any candidate value, including an absent one.
pub const WILDCARD: &str = "*";

/// Separator of alternative values inside one detector value.
const LIST_SEPARATOR: char = ',';

/// Whether `candidate` satisfies the detector's expectation for one attribute.
///
/// A detector must always state an expectation, so an undefined detector
/// value never matches. An undefined candidate matches only optional attributes.
pub fn matches_property(
    detector: Option<&str>,
    candidate: Option<&str>,
    required: bool,
) -> bool {
    let Some(detector) = detector else {
        return false;
    };
    if detector == WILDCARD {
        return true;
    }
    let Some(candidate) = candidate else {
        return !required;
    };

    let candidate = candidate.trim();
    if detector.contains(LIST_SEPARATOR) {
        return detector.split(LIST_SEPARATOR).any(|entry| entry.trim() == candidate);
    }
    detector.trim() == candidate
}

/// Matches a group of mutually exclusive attributes.
///
/// Both slices are paired by position. Exactly one candidate slot must be
/// defined; the detector value in the same slot is then checked as a required
/// attribute. Leaving every slot undefined is accepted only when the group is
/// optional.
pub fn match_alternative_properties(
    detector: &[Option<&str>],
    candidate: &[Option<&str>],
    required: bool,
) -> bool {
    if detector.len() != candidate.len() {
        return false;
    }

    let mut defined = candidate.iter().enumerate().filter(|(_, value)| value.is_some());
    match (defined.next(), defined.next()) {
        (Some((position, chosen)), None) => matches_property(detector[position], *chosen, true),
        (None, _) => !required,
        _ => false,
    }
}
