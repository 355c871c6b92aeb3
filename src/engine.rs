//! Transformation engine - the main entry point for Actform.
//!
//! The engine runs transformation passes over a graph host:
//! - Discovering the domain-specific tasks of the diagram
//! - Resolving a template for every task against one library snapshot
//! - Splicing each resolved replacement in place of its task
//! - Reporting progress and the outcome on the event channel

mod discovery;

use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tracing::{debug, info, warn};

use crate::{
    ActformError, Result,
    events::TransformEvent,
    graph::GraphHost,
    library::TemplateLibrary,
    matcher::DetectorMatcher,
    model::Template,
    parser::FragmentParser,
    resolver::TemplateResolver,
    runtime::{Channel, PassReport, PassState, TaskOutcome, TaskStatus},
    splicer::FragmentSplicer,
    utils,
};

pub use discovery::{DiscoveredTask, discover};

/// The transformation engine.
///
/// Engine is the central coordinator for Actform, responsible for:
/// - Holding the matcher and the fragment parser
/// - Owning the template library and its refresh
/// - Driving the pass state machine over a [`GraphHost`]
/// - Broadcasting pass events on the channel
///
/// # Example
///
/// ```rust,ignore
/// let engine = EngineBuilder::new().templates(templates).build()?;
/// let mut diagram = Diagram::from_json(process_json)?;
///
/// let report = engine.transform(&mut diagram).await;
/// report.into_result()?;
/// ```
pub struct Engine {
    /// Detector matcher with the configured rule table.
    matcher: DetectorMatcher,
    /// Parser for detector and replacement fragments.
    parser: Arc<dyn FragmentParser>,
    /// Current template snapshot and its source.
    library: TemplateLibrary,
    /// Event channel for pass notifications.
    channel: Arc<Channel>,
    /// Runtime used by [`Engine::transform_blocking`].
    runtime: Option<Arc<Runtime>>,
}

impl Engine {
    pub(crate) fn new(
        matcher: DetectorMatcher,
        parser: Arc<dyn FragmentParser>,
        library: TemplateLibrary,
        runtime: Option<Arc<Runtime>>,
    ) -> Self {
        let channel = match &runtime {
            Some(runtime) => Channel::with_runtime(runtime.handle()),
            None => Channel::new(),
        };
        Self {
            matcher,
            parser,
            library,
            channel: Arc::new(channel),
            runtime,
        }
    }

    /// Returns a reference to the event channel.
    pub fn channel(&self) -> Arc<Channel> {
        self.channel.clone()
    }

    pub fn matcher(&self) -> &DetectorMatcher {
        &self.matcher
    }

    /// The template snapshot the next pass will use.
    pub fn templates(&self) -> Arc<Vec<Template>> {
        self.library.snapshot()
    }

    /// Replaces the template snapshot without consulting the source.
    pub fn set_templates(
        &self,
        templates: Vec<Template>,
    ) {
        let count = templates.len();
        self.library.replace(templates);
        self.parser.invalidate();
        self.channel.emit(
            "",
            TransformEvent::Refreshed {
                count,
            },
        );
    }

    /// Reloads the templates from the source and drops cached fragments.
    pub async fn refresh(&self) -> Result<usize> {
        let count = self.library.refresh().await?;
        self.parser.invalidate();
        self.channel.emit(
            "",
            TransformEvent::Refreshed {
                count,
            },
        );
        Ok(count)
    }

    /// Runs one transformation pass over `host`.
    ///
    /// Every task must resolve before anything is spliced. Splicing stops at
    /// the first failed task; tasks spliced before it stay in place.
    pub async fn transform<H>(
        &self,
        host: &mut H,
    ) -> PassReport
    where
        H: GraphHost + ?Sized,
    {
        let mut report = PassReport::new(utils::longid());
        self.advance(&mut report, PassState::Discovering);
        self.channel.emit(&report.id, TransformEvent::Started);

        let tasks = discover(&host.root(), self.matcher.classifier());
        report.tasks = tasks.iter().map(|t| TaskOutcome::pending(t.task.id.clone(), t.parent.clone())).collect();

        self.advance(&mut report, PassState::Resolving);
        let templates = self.library.snapshot();
        let resolver = TemplateResolver::new(&self.matcher, self.parser.as_ref());

        let mut resolved = Vec::with_capacity(tasks.len());
        for (i, discovered) in tasks.iter().enumerate() {
            let task_id = discovered.task.id.clone();
            let Some(template) = resolver.resolve(&templates, &discovered.task).await else {
                report.tasks[i].status = TaskStatus::Unresolved;
                self.channel.emit(
                    &report.id,
                    TransformEvent::Unresolved {
                        task_id: task_id.clone(),
                    },
                );
                return self.abort(
                    report,
                    ActformError::UnresolvableTask {
                        task_id,
                    },
                );
            };

            report.tasks[i].template_id = Some(template.id.clone());
            report.tasks[i].status = TaskStatus::Resolved;
            self.channel.emit(
                &report.id,
                TransformEvent::Resolved {
                    task_id,
                    template_id: template.id.clone(),
                },
            );
            resolved.push(template);
        }

        self.advance(&mut report, PassState::Splicing);
        let splicer = FragmentSplicer::new(self.parser.as_ref());

        for (i, (discovered, template)) in tasks.iter().zip(resolved).enumerate() {
            let task_id = discovered.task.id.clone();
            let reason = match splicer.splice(&mut *host, Some(&discovered.task), &template.replacement, &discovered.parent).await {
                Ok(outcome) => {
                    report.tasks[i].root = outcome.root.clone();
                    match (outcome.success, outcome.root) {
                        (true, Some(root)) => {
                            report.tasks[i].status = TaskStatus::Spliced;
                            self.channel.emit(
                                &report.id,
                                TransformEvent::Spliced {
                                    task_id,
                                    root,
                                },
                            );
                            continue;
                        }
                        _ => "one or more replacement elements could not be inserted".to_string(),
                    }
                }
                Err(e) => e.to_string(),
            };

            warn!(pass = %report.id, task = %task_id, template = %template.id, reason = %reason, "splice failed");
            report.tasks[i].status = TaskStatus::Failed;
            self.channel.emit(
                &report.id,
                TransformEvent::SpliceFailed {
                    task_id: task_id.clone(),
                    reason: reason.clone(),
                },
            );
            return self.abort(
                report,
                ActformError::SpliceFailed {
                    task_id,
                    reason,
                },
            );
        }

        self.advance(&mut report, PassState::Done);
        let spliced = report.spliced();
        info!(pass = %report.id, spliced, "transformation pass done");
        self.channel.emit(&report.id, TransformEvent::Notify(format!("Successfully transformed workflow: {} task(s) replaced", spliced)));
        self.channel.emit(
            &report.id,
            TransformEvent::Relayout {
                root: host.root().id,
            },
        );
        self.channel.emit(&report.id, TransformEvent::Done);
        report
    }

    /// Whether every domain-specific task of `host` resolves to a template.
    ///
    /// Nothing is mutated and no events are emitted.
    pub async fn is_replaceable<H>(
        &self,
        host: &H,
    ) -> bool
    where
        H: GraphHost + ?Sized,
    {
        let tasks = discover(&host.root(), self.matcher.classifier());
        let templates = self.library.snapshot();
        let resolver = TemplateResolver::new(&self.matcher, self.parser.as_ref());

        for discovered in tasks.iter() {
            if resolver.resolve(&templates, &discovered.task).await.is_none() {
                debug!(task = %discovered.task.id, "task is not replaceable");
                return false;
            }
        }
        true
    }

    /// Runs [`Engine::transform`] to completion from synchronous code.
    ///
    /// Uses the runtime given to the builder, or a temporary current-thread
    /// runtime. Fails when called from inside an async context.
    pub fn transform_blocking<H>(
        &self,
        host: &mut H,
    ) -> Result<PassReport>
    where
        H: GraphHost + ?Sized,
    {
        if Handle::try_current().is_ok() {
            return Err(ActformError::Runtime(
                "transform_blocking called from within an async runtime, use transform instead".to_string(),
            ));
        }
        match &self.runtime {
            Some(runtime) => Ok(runtime.block_on(self.transform(host))),
            None => {
                let runtime = Builder::new_current_thread().enable_all().build()?;
                Ok(runtime.block_on(self.transform(host)))
            }
        }
    }

    fn advance(
        &self,
        report: &mut PassReport,
        next: PassState,
    ) {
        let from = report.state;
        if report.advance(next) {
            debug!(pass = %report.id, from = from.as_ref(), to = next.as_ref(), "pass state changed");
        } else {
            warn!(pass = %report.id, from = from.as_ref(), to = next.as_ref(), "illegal pass transition");
        }
    }

    fn abort(
        &self,
        mut report: PassReport,
        error: ActformError,
    ) -> PassReport {
        self.advance(&mut report, PassState::Aborted);
        warn!(pass = %report.id, error = %error, "transformation pass aborted");

        self.channel.emit(
            &report.id,
            TransformEvent::Aborted {
                reason: error.to_string(),
            },
        );
        self.channel.emit(&report.id, TransformEvent::Notify(format!("Transformation aborted: {}", error)));
        report.error = Some(error);
        report
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::Mutex,
        time::{Duration, Instant},
    };

    use serde_json::json;
    use tokio::sync::broadcast;

    use super::*;
    use crate::{
        EngineBuilder,
        events::{Event, Message},
        graph::Diagram,
        library::MemTemplateSource,
        matcher::{PropertyCheck, RuleTable},
        model::{GraphModel, NodeModel},
    };

    fn rules() -> RuleTable {
        RuleTable::builtin().with_kind("quantme:K1", vec![PropertyCheck::required("a")])
    }

    fn k1_template(
        id: &str,
        value: &str,
        replacement: &str,
    ) -> Template {
        let detector = GraphModel::single(NodeModel::new("D", "quantme:K1").with_attr("a", value));
        let replacement = GraphModel::single(NodeModel::new("R", replacement).with_attr("template", id));
        Template::new(id, &detector, &replacement).unwrap()
    }

    fn engine(templates: Vec<Template>) -> Engine {
        EngineBuilder::new().rules(rules()).templates(templates).build().unwrap()
    }

    fn record(engine: &Engine) -> broadcast::Receiver<Event<Message>> {
        engine.channel().subscribe()
    }

    fn drain(rx: &mut broadcast::Receiver<Event<Message>>) -> Vec<TransformEvent> {
        let mut events = Vec::new();
        while let Ok(e) = rx.try_recv() {
            events.push(e.event.clone());
        }
        events
    }

    fn flat_process() -> Diagram {
        let model: NodeModel = serde_json::from_value(json!({
            "id": "Process_1",
            "type": "bpmn:Process",
            "children": [
                { "id": "Start_1", "type": "bpmn:StartEvent" },
                { "id": "T1", "type": "quantme:K1", "attrs": { "a": "x" } },
                { "id": "T2", "type": "quantme:K1", "attrs": { "a": "q" } },
                { "id": "End_1", "type": "bpmn:EndEvent" },
                { "id": "Flow_1", "type": "bpmn:SequenceFlow", "sourceRef": "Start_1", "targetRef": "T1" },
                { "id": "Flow_2", "type": "bpmn:SequenceFlow", "sourceRef": "T1", "targetRef": "T2" },
                { "id": "Flow_3", "type": "bpmn:SequenceFlow", "sourceRef": "T2", "targetRef": "End_1" }
            ]
        }))
        .unwrap();
        Diagram::from_model(&model).unwrap()
    }

    #[tokio::test]
    async fn test_first_template_in_order_is_applied() {
        let engine = engine(vec![k1_template("Tpl1", "x,y", "bpmn:ServiceTask"), k1_template("Tpl2", "z", "bpmn:ScriptTask")]);
        let model = NodeModel::new("Process_1", "bpmn:Process").with_child(NodeModel::new("T", "quantme:K1").with_attr("a", "x"));
        let mut diagram = Diagram::from_model(&model).unwrap();

        let report = engine.transform(&mut diagram).await;
        assert!(report.is_done());
        let outcome = report.task("T").unwrap();
        assert_eq!(outcome.template_id.as_deref(), Some("Tpl1"));
        assert_eq!(outcome.status, TaskStatus::Spliced);

        let root = outcome.root.clone().unwrap();
        let element = diagram.element(&root).unwrap();
        assert_eq!(element.r#type, "bpmn:ServiceTask");
        assert_eq!(element.attrs.get("template"), Some(&Some("Tpl1".to_string())));
        assert_eq!(element.inputs.get("a").map(String::as_str), Some("x"));
        assert!(!diagram.contains("T"));
    }

    #[tokio::test]
    async fn test_nested_task_spliced_into_inner_container() {
        let engine = engine(vec![k1_template("Tpl1", "*", "bpmn:ServiceTask")]);
        let model = NodeModel::new("Process_1", "bpmn:Process").with_child(
            NodeModel::new("Outer", "bpmn:SubProcess").with_child(NodeModel::new("Inner", "bpmn:SubProcess").with_child(NodeModel::new("T", "quantme:K1").with_attr("a", "x"))),
        );
        let mut diagram = Diagram::from_model(&model).unwrap();

        let report = engine.transform(&mut diagram).await;
        assert!(report.is_done());
        assert_eq!(report.tasks.len(), 1);
        assert_eq!(report.tasks[0].parent, "Inner");

        let root = report.tasks[0].root.clone().unwrap();
        assert_eq!(diagram.parent(&root), Some("Inner"));
    }

    #[tokio::test]
    async fn test_unresolved_task_aborts_before_splicing() {
        let engine = engine(vec![k1_template("Tpl1", "x", "bpmn:ServiceTask")]);
        let mut events = record(&engine);
        let mut diagram = flat_process();
        let before = diagram.to_model();

        let report = engine.transform(&mut diagram).await;
        assert!(report.is_aborted());
        assert_eq!(report.spliced(), 0);
        assert_eq!(report.task("T1").map(|t| t.status), Some(TaskStatus::Resolved));
        assert_eq!(report.task("T2").map(|t| t.status), Some(TaskStatus::Unresolved));
        assert_eq!(
            report.error,
            Some(ActformError::UnresolvableTask {
                task_id: "T2".to_string()
            })
        );
        assert_eq!(diagram.to_model(), before);

        let events = drain(&mut events);
        assert!(events.iter().any(|e| matches!(e, TransformEvent::Notify(m) if m.contains("T2"))));
        assert!(!events.iter().any(|e| matches!(e, TransformEvent::Relayout { .. } | TransformEvent::Spliced { .. })));
        assert!(matches!(events.last(), Some(TransformEvent::Notify(_))));
    }

    #[tokio::test]
    async fn test_splice_failure_keeps_earlier_splices() {
        let dangling = NodeModel::new("S", "bpmn:SubProcess")
            .with_child(NodeModel::new("A", "bpmn:Task"))
            .with_child(NodeModel::edge("E", "bpmn:SequenceFlow", "A", "Missing"));
        let broken = Template::new(
            "broken",
            &GraphModel::single(NodeModel::new("D", "quantme:K1").with_attr("a", "q")),
            &GraphModel::single(dangling),
        )
        .unwrap();
        let engine = engine(vec![k1_template("Tpl1", "x", "bpmn:ServiceTask"), broken]);
        let mut diagram = flat_process();

        let report = engine.transform(&mut diagram).await;
        assert!(report.is_aborted());
        assert_eq!(report.task("T1").map(|t| t.status), Some(TaskStatus::Spliced));
        assert_eq!(report.task("T2").map(|t| t.status), Some(TaskStatus::Failed));
        assert!(matches!(report.error, Some(ActformError::SpliceFailed { ref task_id, .. }) if task_id == "T2"));

        let spliced = report.task("T1").and_then(|t| t.root.clone()).unwrap();
        assert_eq!(diagram.endpoints("Flow_1"), Some(("Start_1", spliced.as_str())));
        assert!(report.into_result().is_err());
    }

    #[tokio::test]
    async fn test_success_notifies_and_relayouts_once() {
        let engine = engine(vec![k1_template("Tpl1", "x, q", "bpmn:ServiceTask")]);
        let mut events = record(&engine);
        let mut diagram = flat_process();

        let report = engine.transform(&mut diagram).await.into_result().unwrap();
        assert_eq!(report.spliced(), 2);

        let events = drain(&mut events);
        let layouts: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                TransformEvent::Relayout {
                    root,
                } => Some(root.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(layouts, vec!["Process_1"]);
        assert_eq!(events.first(), Some(&TransformEvent::Started));
        assert_eq!(events.last(), Some(&TransformEvent::Done));
        assert_eq!(events.iter().filter(|e| matches!(e, TransformEvent::Spliced { .. })).count(), 2);
        assert!(events.iter().any(|e| matches!(e, TransformEvent::Notify(_))));
    }

    #[tokio::test]
    async fn test_is_replaceable() {
        let diagram = flat_process();

        let partial = engine(vec![k1_template("Tpl1", "x", "bpmn:ServiceTask")]);
        assert!(!partial.is_replaceable(&diagram).await);

        let full = engine(vec![k1_template("Tpl1", "*", "bpmn:ServiceTask")]);
        assert!(full.is_replaceable(&diagram).await);

        let empty = engine(vec![]);
        assert!(!empty.is_replaceable(&diagram).await);
        let plain = Diagram::from_model(&NodeModel::new("Process_1", "bpmn:Process")).unwrap();
        assert!(empty.is_replaceable(&plain).await);
    }

    #[tokio::test]
    async fn test_refresh_applies_to_next_pass() {
        let source = MemTemplateSource::new(vec![]);
        let engine = EngineBuilder::new().rules(rules()).source(Arc::new(source.clone())).build().unwrap();
        let mut events = record(&engine);

        let mut diagram = flat_process();
        assert!(engine.transform(&mut diagram).await.is_aborted());

        source.set(vec![k1_template("Tpl1", "*", "bpmn:ServiceTask")]);
        assert_eq!(engine.refresh().await.unwrap(), 1);
        assert_eq!(engine.templates().len(), 1);
        assert!(engine.transform(&mut diagram).await.is_done());
        assert!(drain(&mut events).contains(&TransformEvent::Refreshed {
            count: 1
        }));
    }

    #[test]
    fn test_transform_blocking() {
        let engine = engine(vec![k1_template("Tpl1", "*", "bpmn:ServiceTask")]);
        let mut diagram = flat_process();

        let report = engine.transform_blocking(&mut diagram).unwrap();
        assert!(report.is_done());
        assert_eq!(report.spliced(), 2);
    }

    #[test]
    fn test_handlers_run_on_builder_runtime() {
        let runtime = Arc::new(Builder::new_multi_thread().worker_threads(1).enable_all().build().unwrap());
        let engine = EngineBuilder::new()
            .rules(rules())
            .templates(vec![k1_template("Tpl1", "*", "bpmn:ServiceTask")])
            .runtime(runtime)
            .build()
            .unwrap();
        let layouts = Arc::new(Mutex::new(Vec::new()));
        let l = layouts.clone();
        engine.channel().on_relayout(move |_, root| l.lock().unwrap().push(root.clone()));
        let mut diagram = flat_process();

        assert!(engine.transform_blocking(&mut diagram).unwrap().is_done());

        let deadline = Instant::now() + Duration::from_secs(5);
        while layouts.lock().unwrap().is_empty() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(10));
        }
        assert_eq!(*layouts.lock().unwrap(), vec!["Process_1"]);
    }

    #[tokio::test]
    async fn test_transform_blocking_inside_runtime_fails() {
        let engine = engine(vec![k1_template("Tpl1", "*", "bpmn:ServiceTask")]);
        let mut diagram = flat_process();
        let before = diagram.to_model();

        let result = engine.transform_blocking(&mut diagram);
        assert!(matches!(result, Err(ActformError::Runtime(_))));
        assert_eq!(diagram.to_model(), before);
    }
}
