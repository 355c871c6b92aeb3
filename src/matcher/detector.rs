use tracing::{debug, warn};

use crate::{
    ActformError, Result,
    graph::Classifier,
    matcher::{PropertyCheck, RuleTable, match_alternative_properties, matches_property},
    model::{GraphModel, NodeModel},
};

/// Decides whether a template detector applies to a task.
///
/// Structural compatibility (same type tag) is checked first; attribute
/// checks are then taken from the [`RuleTable`] entry of the task's kind.
#[derive(Debug, Clone, Default)]
pub struct DetectorMatcher {
    rules: RuleTable,
    classifier: Classifier,
}

impl DetectorMatcher {
    pub fn new(
        rules: RuleTable,
        classifier: Classifier,
    ) -> Self {
        Self {
            rules,
            classifier,
        }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn classifier(&self) -> &Classifier {
        &self.classifier
    }

    /// Matches a parsed detector fragment against a task.
    ///
    /// A malformed detector only means the template does not apply; it is
    /// logged and reported as `false`.
    pub fn matches_template(
        &self,
        template_id: &str,
        detector: &GraphModel,
        task: &NodeModel,
    ) -> bool {
        match self.detector_node(template_id, detector) {
            Ok(node) => self.matches_node(node, task),
            Err(e) => {
                warn!(template = template_id, error = %e, "skipping template");
                false
            }
        }
    }

    /// The single domain-specific node of a detector fragment.
    pub fn detector_node<'g>(
        &self,
        template_id: &str,
        detector: &'g GraphModel,
    ) -> Result<&'g NodeModel> {
        let node = detector.single_flow_node().ok_or_else(|| ActformError::MalformedDetector {
            template_id: template_id.to_string(),
            reason: format!("expected exactly one top-level flow node, found {}", detector.flow_nodes().count()),
        })?;

        if !self.classifier.is_domain(&node.r#type) {
            return Err(ActformError::MalformedDetector {
                template_id: template_id.to_string(),
                reason: format!("detector node type {} is not a domain-specific kind", node.r#type),
            });
        }
        Ok(node)
    }

    /// Compares a detector node with a task node.
    pub fn matches_node(
        &self,
        detector: &NodeModel,
        task: &NodeModel,
    ) -> bool {
        if detector.r#type != task.r#type {
            return false;
        }

        let Some(checks) = self.rules.get(&task.r#type) else {
            warn!(task = %task.id, kind = %task.r#type, "unsupported task kind");
            return false;
        };

        let matched = checks.iter().all(|check| evaluate(check, detector, task));
        debug!(task = %task.id, detector = %detector.id, matched, "detector evaluated");
        matched
    }
}

/// Evaluates one declarative check.
pub fn evaluate(
    check: &PropertyCheck,
    detector: &NodeModel,
    task: &NodeModel,
) -> bool {
    match check {
        PropertyCheck::Single {
            attr,
            required,
        } => matches_property(detector.attr(attr), task.attr(attr), *required),
        PropertyCheck::Alternative {
            attrs,
            required,
        } => {
            let detector_values: Vec<Option<&str>> = attrs.iter().map(|a| detector.attr(a)).collect();
            let task_values: Vec<Option<&str>> = attrs.iter().map(|a| task.attr(a)).collect();
            match_alternative_properties(&detector_values, &task_values, *required)
        }
    }
}
