//! Template resolution: the first template whose detector matches wins.

use tracing::{debug, warn};

use crate::{matcher::DetectorMatcher, model::NodeModel, model::Template, parser::FragmentParser};

/// Finds the template that applies to a task.
pub struct TemplateResolver<'a> {
    matcher: &'a DetectorMatcher,
    parser: &'a dyn FragmentParser,
}

impl<'a> TemplateResolver<'a> {
    pub fn new(
        matcher: &'a DetectorMatcher,
        parser: &'a dyn FragmentParser,
    ) -> Self {
        Self {
            matcher,
            parser,
        }
    }

    /// Iterates `templates` in order and returns the first whose detector
    /// matches `task`. Templates whose detector or replacement cannot be
    /// parsed or is malformed are skipped.
    pub async fn resolve<'t>(
        &self,
        templates: &'t [Template],
        task: &NodeModel,
    ) -> Option<&'t Template> {
        for template in templates {
            let detector = match self.parser.parse(&template.detector).await {
                Ok(detector) => detector,
                Err(e) => {
                    warn!(template = %template.id, error = %e, "unable to parse detector");
                    continue;
                }
            };

            if !self.matcher.matches_template(&template.id, &detector, task) {
                continue;
            }

            match self.parser.parse(&template.replacement).await {
                Ok(replacement) if replacement.single_flow_node().is_some() => {
                    debug!(task = %task.id, template = %template.id, "template resolved");
                    return Some(template);
                }
                Ok(replacement) => {
                    warn!(template = %template.id, flow_nodes = replacement.flow_nodes().count(), "replacement must hold exactly one flow node");
                }
                Err(e) => {
                    warn!(template = %template.id, error = %e, "unable to parse replacement");
                }
            }
        }

        debug!(task = %task.id, candidates = templates.len(), "no template resolved");
        None
    }
}
