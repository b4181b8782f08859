//! Declarative input shapes and the validator that enforces them.
//!
//! A [`Schema`] describes the shape a procedure expects its raw JSON input to
//! have. Validation is a pure function of the schema and the value: it never
//! touches resolvers or any other state. On success it returns the validated
//! value, with undeclared object fields stripped. On failure it returns a
//! [`ValidationFailure`] naming the first offending field in declaration order.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Declarative description of an acceptable input value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Schema {
    /// Any value, including `null`, passed through untouched.
    Any,
    /// A JSON string.
    String,
    /// A JSON number without a fractional part.
    Integer,
    /// Any JSON number.
    Number,
    /// A JSON boolean.
    Boolean,
    /// A JSON array whose items all match the item schema.
    Array(Box<Schema>),
    /// A JSON object with named fields.
    Object(ObjectSchema),
    /// The inner schema, or a missing value, or `null`.
    Optional(Box<Schema>),
}

impl Schema {
    /// Starts an object schema.
    #[must_use]
    pub fn object() -> ObjectSchema {
        ObjectSchema::default()
    }

    /// Builds an array schema from an item schema.
    #[must_use]
    pub fn array(item: impl Into<Self>) -> Self {
        Self::Array(Box::new(item.into()))
    }

    /// Wraps the schema so that missing values and `null` are accepted.
    #[must_use]
    pub fn optional(self) -> Self {
        match self {
            Self::Optional(_) => self,
            other => Self::Optional(Box::new(other)),
        }
    }

    /// Returns a short name for the kind of value the schema expects.
    #[must_use]
    pub const fn describe(&self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::String => "string",
            Self::Integer => "integer",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Optional(inner) => inner.describe(),
        }
    }

    /// Validates a raw value against the schema.
    ///
    /// # Errors
    ///
    /// Returns a [`ValidationFailure`] carrying the path of the first
    /// offending field and a reason such as
    /// `expected string, received undefined`.
    pub fn validate(&self, raw: &Value) -> Result<Value, ValidationFailure> {
        let validated = self.check(Some(raw), &FieldPath::root())?;
        Ok(validated.unwrap_or(Value::Null))
    }

    /// Checks a possibly-absent value. `Ok(None)` means the value was absent
    /// and allowed to stay absent.
    fn check(
        &self,
        raw: Option<&Value>,
        path: &FieldPath,
    ) -> Result<Option<Value>, ValidationFailure> {
        if let Self::Optional(inner) = self {
            return match raw {
                None => Ok(None),
                Some(Value::Null) => Ok(Some(Value::Null)),
                Some(value) => inner.check(Some(value), path),
            };
        }

        let Some(value) = raw else {
            return Err(self.mismatch(path, "undefined"));
        };

        let accepted = match (self, value) {
            (Self::Any, _)
            | (Self::String, Value::String(_))
            | (Self::Boolean, Value::Bool(_))
            | (Self::Number, Value::Number(_)) => value.clone(),
            (Self::Integer, Value::Number(number)) if number.is_i64() || number.is_u64() => {
                value.clone()
            }
            (Self::Array(item), Value::Array(items)) => {
                let mut validated = Vec::with_capacity(items.len());
                for (index, entry) in items.iter().enumerate() {
                    let checked = item.check(Some(entry), &path.index(index))?;
                    validated.push(checked.unwrap_or(Value::Null));
                }
                Value::Array(validated)
            }
            (Self::Object(object), Value::Object(fields)) => object.check_fields(fields, path)?,
            _ => return Err(self.mismatch(path, received_kind(value))),
        };
        Ok(Some(accepted))
    }

    fn mismatch(&self, path: &FieldPath, received: &str) -> ValidationFailure {
        ValidationFailure::new(
            path.clone(),
            format!("expected {}, received {received}", self.describe()),
        )
    }
}

impl From<ObjectSchema> for Schema {
    fn from(object: ObjectSchema) -> Self {
        Self::Object(object)
    }
}

/// Ordered set of named fields for an object schema.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ObjectSchema {
    fields: Vec<(String, Schema)>,
}

impl ObjectSchema {
    /// Declares a field. Redeclaring a field replaces its schema in place.
    #[must_use]
    pub fn field(mut self, name: impl Into<String>, schema: impl Into<Schema>) -> Self {
        let name = name.into();
        let schema = schema.into();
        match self.fields.iter_mut().find(|(existing, _)| *existing == name) {
            Some((_, slot)) => *slot = schema,
            None => self.fields.push((name, schema)),
        }
        self
    }

    /// Iterates the declared fields in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&str, &Schema)> {
        self.fields
            .iter()
            .map(|(name, schema)| (name.as_str(), schema))
    }

    /// Returns the number of declared fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns `true` when no fields are declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    fn check_fields(
        &self,
        raw: &Map<String, Value>,
        path: &FieldPath,
    ) -> Result<Value, ValidationFailure> {
        let mut validated = Map::with_capacity(self.fields.len());
        for (name, schema) in &self.fields {
            if let Some(value) = schema.check(raw.get(name), &path.key(name))? {
                validated.insert(name.clone(), value);
            }
        }
        Ok(Value::Object(validated))
    }
}

fn received_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// One step into a nested value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSegment {
    /// Object field name.
    Key(String),
    /// Array index.
    Index(usize),
}

/// Location of a value inside the raw input.
///
/// Serialised as an array of segments, for example `["tags", 2]`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath(Vec<PathSegment>);

impl FieldPath {
    /// The path of the input value itself.
    #[must_use]
    pub const fn root() -> Self {
        Self(Vec::new())
    }

    /// Returns a child path stepping into an object field.
    #[must_use]
    pub fn key(&self, name: impl Into<String>) -> Self {
        self.child(PathSegment::Key(name.into()))
    }

    /// Returns a child path stepping into an array item.
    #[must_use]
    pub fn index(&self, index: usize) -> Self {
        self.child(PathSegment::Index(index))
    }

    /// Returns the path segments.
    #[must_use]
    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    fn child(&self, segment: PathSegment) -> Self {
        let mut segments = self.0.clone();
        segments.push(segment);
        Self(segments)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_root() {
            return formatter.write_str("<root>");
        }
        for (position, segment) in self.0.iter().enumerate() {
            match segment {
                PathSegment::Key(name) if position == 0 => formatter.write_str(name)?,
                PathSegment::Key(name) => write!(formatter, ".{name}")?,
                PathSegment::Index(index) => write!(formatter, "[{index}]")?,
            }
        }
        Ok(())
    }
}

/// Raw input violated a declared schema.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{path}: {reason}")]
pub struct ValidationFailure {
    /// Location of the offending value.
    pub path: FieldPath,
    /// Human-readable reason.
    pub reason: String,
}

impl ValidationFailure {
    /// Creates a failure at the given path.
    #[must_use]
    pub fn new(path: FieldPath, reason: impl Into<String>) -> Self {
        Self {
            path,
            reason: reason.into(),
        }
    }
}
