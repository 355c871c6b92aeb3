//! Error types for Actform.
//!
//! All errors in Actform are represented by the `ActformError` enum.
//! Template-level mismatches are not errors: matching reports a plain `bool`
//! and only pass-level failures surface through this type.

use std::{io::ErrorKind, string::FromUtf8Error};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Unified error type for all Actform operations.
#[derive(Deserialize, Serialize, Error, Debug, Clone, PartialEq)]
pub enum ActformError {
    /// Configuration parsing or validation errors.
    #[error("{0}")]
    Config(String),

    /// Data conversion errors (JSON, TOML).
    #[error("{0}")]
    Convert(String),

    /// Malformed diagram input (duplicate ids, dangling references).
    #[error("{0}")]
    Graph(String),

    /// Template definition errors.
    #[error("{0}")]
    Template(String),

    /// A template's detector is not a single domain-specific node.
    #[error("malformed detector in template '{template_id}': {reason}")]
    MalformedDetector {
        template_id: String,
        reason: String,
    },

    /// A replacement fragment does not hold exactly one top-level flow node.
    #[error("malformed fragment: {0}")]
    MalformedFragment(String),

    /// No template in the library matches the task.
    #[error("no template matches task '{task_id}'")]
    UnresolvableTask {
        task_id: String,
    },

    /// A node references an id that is not known at the time it is needed.
    #[error("node '{node_id}' references unknown id '{reference}'")]
    ReferenceIntegrity {
        node_id: String,
        reference: String,
    },

    /// The graph host refused an operation.
    #[error("{0}")]
    HostOperation(String),

    /// Splicing the replacement of a task failed.
    #[error("failed to splice replacement for task '{task_id}': {reason}")]
    SpliceFailed {
        task_id: String,
        reason: String,
    },

    /// A pass finished in a non-terminal state without recording why.
    #[error("pass '{pass_id}' ended in state {state}")]
    IncompletePass {
        pass_id: String,
        state: String,
    },

    /// Async runtime misuse, e.g. blocking from inside a runtime.
    #[error("{0}")]
    Runtime(String),

    /// Template source errors.
    #[error("{0}")]
    Source(String),

    /// I/O operation errors.
    #[error("{0}")]
    IoError(String),
}

impl From<ActformError> for String {
    fn from(val: ActformError) -> Self {
        val.to_string()
    }
}

impl From<std::io::Error> for ActformError {
    fn from(error: std::io::Error) -> Self {
        ActformError::IoError(error.to_string())
    }
}

impl From<ActformError> for std::io::Error {
    fn from(val: ActformError) -> Self {
        #[allow(clippy::io_other_error)]
        std::io::Error::new(ErrorKind::Other, val.to_string())
    }
}

impl From<FromUtf8Error> for ActformError {
    fn from(_: FromUtf8Error) -> Self {
        ActformError::Convert("Error with utf-8 string convert".to_string())
    }
}

impl From<serde_json::Error> for ActformError {
    fn from(error: serde_json::Error) -> Self {
        ActformError::Convert(error.to_string())
    }
}

impl From<toml::de::Error> for ActformError {
    fn from(error: toml::de::Error) -> Self {
        ActformError::Config(error.to_string())
    }
}
