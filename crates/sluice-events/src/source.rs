#![forbid(unsafe_code)]

use std::fmt;

/// Subsystem a posted error belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Element or pipeline internals: activation, negotiation, state changes.
    Core,
    /// Resource access, e.g. a source failing to open.
    Resource,
    /// Data-flow failures while streaming.
    Stream,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Core => "core",
            Self::Resource => "resource",
            Self::Stream => "stream",
        })
    }
}

/// Messages posted by source elements.
#[derive(Clone, Debug, PartialEq)]
pub enum SourceEvent {
    /// Fatal failure. Streaming for this element has stopped.
    Error {
        element: String,
        domain: ErrorDomain,
        message: String,
        debug: Option<String>,
    },
    /// Non-fatal problem.
    Warning { element: String, message: String },
    /// A segment seek finished playing its range.
    SegmentDone { element: String, position: u64 },
    /// End-of-stream was pushed downstream.
    EndOfStream { element: String },
}

impl SourceEvent {
    #[must_use]
    pub fn element(&self) -> &str {
        match self {
            Self::Error { element, .. }
            | Self::Warning { element, .. }
            | Self::SegmentDone { element, .. }
            | Self::EndOfStream { element } => element,
        }
    }

    #[must_use]
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }
}
