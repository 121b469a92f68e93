//! Validation and resolution of the labels that partition response metrics.
//!
//! Response counters and duration observers may be partitioned by the
//! `code` and `method` labels, in either order. Sinks are checked when
//! middleware is built; any other label is a configuration error.

use crate::sink::Describe;
use std::{borrow::Cow, ops::Deref};

pub const CODE: &str = "code";
pub const METHOD: &str = "method";
pub const EVENT: &str = "event";

/// A label supported by response metrics.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Label {
    Code,
    Method,
}

/// The supported labels declared by a sink, in the sink's declared order.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelOrder {
    labels: [Option<Label>; 2],
}

/// Label values ordered to match a sink's label names.
#[derive(Copy, Clone, Debug)]
pub struct LabelValues<'a> {
    values: [&'a str; 2],
    len: usize,
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum LabelError {
    #[error("metric partitioned with non-supported label {0:?}")]
    Unsupported(String),

    #[error("metric partitioned by label {0:?} more than once")]
    Duplicate(String),

    #[error("metric must be partitioned by a single \"event\" label; found {0:?}")]
    EventLabel(Vec<String>),
}

/// Ensures that `sink` is partitioned by exactly one label, named `event`.
pub fn check_event_label(sink: &impl Describe) -> Result<(), LabelError> {
    match sink.label_names() {
        [EVENT] => Ok(()),
        names => Err(LabelError::EventLabel(
            names.iter().map(|n| n.to_string()).collect(),
        )),
    }
}

/// Returns the value of the `method` label for a request method.
///
/// Methods are lowercased. Standard methods map to static strings; extension
/// methods are lowercased into an owned string.
pub fn method_label(method: &http::Method) -> Cow<'static, str> {
    let label = match method.as_str() {
        "GET" => "get",
        "POST" => "post",
        "PUT" => "put",
        "DELETE" => "delete",
        "HEAD" => "head",
        "OPTIONS" => "options",
        "CONNECT" => "connect",
        "PATCH" => "patch",
        "TRACE" => "trace",
        other => return Cow::Owned(other.to_ascii_lowercase()),
    };
    Cow::Borrowed(label)
}

// === impl Label ===

impl Label {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Code => CODE,
            Self::Method => METHOD,
        }
    }
}

impl std::str::FromStr for Label {
    type Err = LabelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            CODE => Ok(Self::Code),
            METHOD => Ok(Self::Method),
            other => Err(LabelError::Unsupported(other.to_string())),
        }
    }
}

// === impl LabelOrder ===

impl LabelOrder {
    /// Returns the given labels without validating them against a sink.
    pub(crate) const fn new(first: Option<Label>, second: Option<Label>) -> Self {
        Self {
            labels: [first, second],
        }
    }

    /// Determines which supported labels `sink` is partitioned by.
    ///
    /// Fails if the sink declares a label other than `code` or `method`, or
    /// declares a label more than once.
    pub fn check(sink: &impl Describe) -> Result<Self, LabelError> {
        let mut labels = [None; 2];
        for (i, name) in sink.label_names().iter().enumerate() {
            let label = name.parse::<Label>()?;
            if labels.contains(&Some(label)) {
                return Err(LabelError::Duplicate(name.to_string()));
            }
            // A third name is always unsupported or a duplicate.
            labels[i] = Some(label);
        }
        let order = Self { labels };
        tracing::debug!(
            labels = ?order.labels().collect::<Vec<_>>(),
            "Validated metric labels"
        );
        Ok(order)
    }

    pub fn has_code(&self) -> bool {
        self.labels.contains(&Some(Label::Code))
    }

    pub fn has_method(&self) -> bool {
        self.labels.contains(&Some(Label::Method))
    }

    /// Returns the declared labels, in order.
    pub fn labels(&self) -> impl Iterator<Item = Label> + '_ {
        self.labels.iter().flatten().copied()
    }

    /// Orders the given label values to match the sink's declared labels.
    pub fn values<'a>(&self, code: &'a str, method: &'a str) -> LabelValues<'a> {
        let mut values = LabelValues {
            values: [""; 2],
            len: 0,
        };
        for label in self.labels() {
            values.values[values.len] = match label {
                Label::Code => code,
                Label::Method => method,
            };
            values.len += 1;
        }
        values
    }
}

// === impl LabelValues ===

impl<'a> Deref for LabelValues<'a> {
    type Target = [&'a str];

    fn deref(&self) -> &Self::Target {
        &self.values[..self.len]
    }
}
