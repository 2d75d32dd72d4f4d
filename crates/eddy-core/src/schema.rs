//! Attribute and stream layout descriptors.
//!
//! A [`StreamSchema`] describes the shape of the rows a query reads: which
//! attributes sit before the window, which are added after it, and which are
//! emitted as output. Schemas are produced by the query compiler and are
//! read-only once a runtime is built around them.

use std::fmt;
use std::sync::Arc;

/// Type of a single attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttributeType {
    /// Boolean.
    Bool,
    /// 32-bit signed integer.
    Int,
    /// 64-bit signed integer.
    Long,
    /// 32-bit float.
    Float,
    /// 64-bit float.
    Double,
    /// UTF-8 string.
    String,
    /// Opaque user object.
    Object,
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Bool => "BOOL",
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::String => "STRING",
            Self::Object => "OBJECT",
        };
        f.write_str(name)
    }
}

/// A named, typed field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    name: String,
    attr_type: AttributeType,
}

impl Attribute {
    /// Creates a new attribute.
    #[must_use]
    pub fn new(name: impl Into<String>, attr_type: AttributeType) -> Self {
        Self {
            name: name.into(),
            attr_type,
        }
    }

    /// Attribute name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Attribute type.
    #[must_use]
    pub fn attr_type(&self) -> AttributeType {
        self.attr_type
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.attr_type)
    }
}

/// Kind of target a query's rows come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EventType {
    /// A materialized table.
    Table,
    /// An incremental aggregation.
    Aggregate,
    /// A named window.
    Window,
    /// A plain stream.
    #[default]
    Default,
}

/// Row dimensions of a schema: `(before_window, on_after_window, output)`.
pub type Dimensions = (usize, usize, usize);

/// Three-part row layout of a query target.
///
/// # Example
///
/// ```
/// use eddy_core::schema::{Attribute, AttributeType, EventType, StreamSchema};
///
/// let attrs = vec![
///     Attribute::new("id", AttributeType::Int),
///     Attribute::new("name", AttributeType::String),
/// ];
/// let schema = StreamSchema::builder(EventType::Table, attrs.clone())
///     .before_window(attrs.clone())
///     .on_after_window(attrs.clone())
///     .output(attrs)
///     .build();
///
/// assert_eq!(schema.dimensions(), (2, 2, 2));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSchema {
    event_type: EventType,
    before_window_data: Vec<Attribute>,
    on_after_window_data: Vec<Attribute>,
    output_data: Vec<Attribute>,
    last_input_definition: Arc<[Attribute]>,
}

impl StreamSchema {
    /// Creates a schema with empty window and output lists.
    #[must_use]
    pub fn new(event_type: EventType, input_definition: Vec<Attribute>) -> Self {
        Self::builder(event_type, input_definition).build()
    }

    /// Starts building a schema for the given target type and input definition.
    #[must_use]
    pub fn builder(event_type: EventType, input_definition: Vec<Attribute>) -> StreamSchemaBuilder {
        StreamSchemaBuilder {
            event_type,
            input_definition,
            before_window_data: Vec::new(),
            on_after_window_data: Vec::new(),
            output_data: Vec::new(),
        }
    }

    /// Target type.
    #[must_use]
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Attributes available before the window.
    #[must_use]
    pub fn before_window_data(&self) -> &[Attribute] {
        &self.before_window_data
    }

    /// Attributes added after the window.
    #[must_use]
    pub fn on_after_window_data(&self) -> &[Attribute] {
        &self.on_after_window_data
    }

    /// Attributes emitted as output.
    #[must_use]
    pub fn output_data(&self) -> &[Attribute] {
        &self.output_data
    }

    /// Attribute list of the last input definition, used as the output when
    /// the query has no projection.
    #[must_use]
    pub fn last_input_definition(&self) -> &[Attribute] {
        &self.last_input_definition
    }

    /// Lengths of the three attribute lists.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        (
            self.before_window_data.len(),
            self.on_after_window_data.len(),
            self.output_data.len(),
        )
    }
}

/// Builder for [`StreamSchema`].
#[derive(Debug)]
pub struct StreamSchemaBuilder {
    event_type: EventType,
    input_definition: Vec<Attribute>,
    before_window_data: Vec<Attribute>,
    on_after_window_data: Vec<Attribute>,
    output_data: Vec<Attribute>,
}

impl StreamSchemaBuilder {
    /// Sets the before-window attributes.
    #[must_use]
    pub fn before_window(mut self, attributes: Vec<Attribute>) -> Self {
        self.before_window_data = attributes;
        self
    }

    /// Sets the on-after-window attributes.
    #[must_use]
    pub fn on_after_window(mut self, attributes: Vec<Attribute>) -> Self {
        self.on_after_window_data = attributes;
        self
    }

    /// Sets the output attributes.
    #[must_use]
    pub fn output(mut self, attributes: Vec<Attribute>) -> Self {
        self.output_data = attributes;
        self
    }

    /// Builds the schema.
    #[must_use]
    pub fn build(self) -> StreamSchema {
        StreamSchema {
            event_type: self.event_type,
            before_window_data: self.before_window_data,
            on_after_window_data: self.on_after_window_data,
            output_data: self.output_data,
            last_input_definition: self.input_definition.into(),
        }
    }
}
