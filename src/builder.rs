use std::sync::Arc;

use tokio::runtime::Runtime;

use crate::{
    ActformError, Config, Engine, Result,
    graph::Classifier,
    library::{DirTemplateSource, MemTemplateSource, TemplateLibrary, TemplateSource},
    matcher::{DetectorMatcher, RuleTable},
    model::Template,
    parser::{CachingParser, FragmentParser, JsonFragmentParser},
};

/// Assembles an [`Engine`].
///
/// Unset parts fall back to the configuration: the rule table comes from
/// `[matcher]`, the template source from `[templates]` (or the in-memory
/// templates given here), and fragments are parsed as JSON through a cache.
#[derive(Default)]
pub struct EngineBuilder {
    config: Config,
    parser: Option<Arc<dyn FragmentParser>>,
    source: Option<Arc<dyn TemplateSource>>,
    rules: Option<RuleTable>,
    templates: Vec<Template>,
    rt: Option<Arc<Runtime>>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(
        mut self,
        config: Config,
    ) -> Self {
        self.config = config;
        self
    }

    pub fn parser(
        mut self,
        parser: Arc<dyn FragmentParser>,
    ) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn source(
        mut self,
        source: Arc<dyn TemplateSource>,
    ) -> Self {
        self.source = Some(source);
        self
    }

    /// Replaces the rule table derived from the configuration.
    pub fn rules(
        mut self,
        rules: RuleTable,
    ) -> Self {
        self.rules = Some(rules);
        self
    }

    /// Initial template snapshot.
    pub fn templates(
        mut self,
        templates: Vec<Template>,
    ) -> Self {
        self.templates = templates;
        self
    }

    pub fn runtime(
        mut self,
        runtime: Arc<Runtime>,
    ) -> Self {
        self.rt = Some(runtime);
        self
    }

    pub fn build(&self) -> Result<Engine> {
        let matcher_config = &self.config.matcher;
        if matcher_config.domain_prefix.is_empty() {
            return Err(ActformError::Config("matcher.domain_prefix must not be empty".to_string()));
        }

        let rules = self.rules.clone().unwrap_or_else(|| matcher_config.rule_table());
        let matcher = DetectorMatcher::new(rules, Classifier::new(matcher_config.domain_prefix.clone()));

        let parser: Arc<dyn FragmentParser> = match &self.parser {
            Some(parser) => parser.clone(),
            None => Arc::new(CachingParser::new(JsonFragmentParser, self.config.fragment_cache_size.max(1))),
        };

        let source: Arc<dyn TemplateSource> = match (&self.source, &self.config.templates.dir) {
            (Some(source), _) => source.clone(),
            (None, Some(dir)) => Arc::new(DirTemplateSource::new(dir)),
            (None, None) => Arc::new(MemTemplateSource::new(self.templates.clone())),
        };
        let library = TemplateLibrary::new(source);
        library.replace(self.templates.clone());

        Ok(Engine::new(matcher, parser, library, self.rt.clone()))
    }
}
