//! # Actform
//!
//! Actform is a lightweight workflow-fragment transformation engine written in Rust.
//! It replaces domain-specific tasks of a process diagram with standard
//! fragments taken from a library of reusable templates.
//!
//! ## Core Features
//!
//! - **Declarative Matching**: Per-kind attribute rules decide which template detector applies to a task
//! - **In-Place Splicing**: Replacement fragments are inserted with fresh ids while every reference to the task is kept
//! - **All-or-Nothing Resolution**: A pass splices nothing unless every task resolves
//! - **Event Channel**: Pass progress, notifications and relayout requests are broadcast to subscribers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use actform::{Diagram, EngineBuilder, Template};
//!
//! let templates = Template::list_from_json(templates_json)?;
//! let engine = EngineBuilder::new().templates(templates).build()?;
//!
//! let mut diagram = Diagram::from_json(process_json)?;
//! let report = engine.transform_blocking(&mut diagram)?.into_result()?;
//! println!("{} task(s) replaced", report.spliced());
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
mod events;
mod graph;
mod library;
mod matcher;
mod model;
mod parser;
mod resolver;
mod runtime;
mod splicer;
mod utils;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{Config, MatcherConfig, TemplatesConfig};
pub use engine::{DiscoveredTask, Engine, discover};
pub use error::ActformError;
pub use events::{Event, Message, TransformEvent};
pub use graph::*;
pub use library::{DirTemplateSource, MemTemplateSource, TemplateLibrary, TemplateSource};
pub use matcher::*;
pub use model::*;
pub use parser::{CachingParser, FragmentParser, JsonFragmentParser};
pub use resolver::TemplateResolver;
pub use runtime::{Channel, EventHandle, PassId, PassReport, PassState, TaskOutcome, TaskStatus};
pub use splicer::{FragmentSplicer, IdentifierMap, SpliceOutcome, splice_graph};

/// Result type alias for Actform operations.
pub type Result<T> = std::result::Result<T, ActformError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
