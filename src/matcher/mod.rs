//! Template matching: attribute predicates, per-kind rules and the detector matcher.

mod detector;
mod property;
mod rules;

pub use detector::{DetectorMatcher, evaluate};
pub use property::{WILDCARD, match_alternative_properties, matches_property};
pub use rules::{KindRule, PropertyCheck, RuleTable};
