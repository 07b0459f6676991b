//! Structural sanitizer for remote records
//!
//! Records returned by the remote API are heavily cross-linked: a deployment
//! embeds its creator, a repository embeds its owner, an owner links to its
//! organizations, and so on. Persisting them verbatim would copy large parts
//! of that graph into every status object.
//!
//! The sanitizer walks a record as a schema-less JSON tree. Known "hub"
//! shapes are cut down to identity-bearing stubs; everything else is walked
//! generically, dropping absent values along the way:
//!
//! | Shape          | Result                                               |
//! |----------------|------------------------------------------------------|
//! | `Subject`      | `_links` removed, remainder walked generically       |
//! | `Actor`        | `{id, login}`                                        |
//! | `Organization` | `{id, login}`                                        |
//! | `Repository`   | `{id, owner, name, full_name}`, `owner` as an actor  |
//! | `Generic`      | every non-empty field, children by their field shape |
//!
//! The shape of a nested value is chosen from the name of the field holding
//! it. Sanitizing never fails, and sanitizing a sanitized record is a no-op.

use serde_json::{Map, Value};
use std::collections::HashMap;

/// Hypermedia links carried by subject records
const LINKS_FIELD: &str = "_links";

const IDENTITY_FIELDS: &[&str] = &["id", "login"];
const REPOSITORY_FIELDS: &[&str] = &["id", "owner", "name", "full_name"];

const ACTOR_FIELDS: &[&str] = &[
    "actor",
    "assignee",
    "assignees",
    "author",
    "committer",
    "creator",
    "merged_by",
    "owner",
    "requested_reviewers",
    "sender",
    "user",
];
const ORGANIZATION_FIELDS: &[&str] = &["org", "organization"];
const REPOSITORY_SHAPED_FIELDS: &[&str] = &[
    "head_repository",
    "repo",
    "repository",
    "template_repository",
];
const SUBJECT_FIELDS: &[&str] = &["pull_request", "pull_requests"];

/// Known record shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Primary subject record, e.g. a pull request
    Subject,
    /// A user or bot
    Actor,
    Organization,
    Repository,
    /// Anything else
    Generic,
}

/// Reduces records to a bounded, persistable subset of their fields
#[derive(Debug, Clone)]
pub struct Sanitizer {
    field_shapes: HashMap<String, Shape>,
}

impl Default for Sanitizer {
    fn default() -> Self {
        let mut sanitizer = Self::empty();
        for (fields, shape) in [
            (ACTOR_FIELDS, Shape::Actor),
            (ORGANIZATION_FIELDS, Shape::Organization),
            (REPOSITORY_SHAPED_FIELDS, Shape::Repository),
            (SUBJECT_FIELDS, Shape::Subject),
        ] {
            for field in fields {
                sanitizer.field_shapes.insert((*field).to_string(), shape);
            }
        }
        sanitizer
    }
}

impl Sanitizer {
    /// Sanitizer with the default field table
    pub fn new() -> Self {
        Self::default()
    }

    /// Sanitizer that treats every field generically
    pub fn empty() -> Self {
        Self {
            field_shapes: HashMap::new(),
        }
    }

    /// Map values held by `field` to `shape`
    pub fn with_field_shape(mut self, field: impl Into<String>, shape: Shape) -> Self {
        self.field_shapes.insert(field.into(), shape);
        self
    }

    /// Shape of values held by `field`
    pub fn shape_of(&self, field: &str) -> Shape {
        self.field_shapes
            .get(field)
            .copied()
            .unwrap_or(Shape::Generic)
    }

    /// Sanitize a top-level record
    pub fn sanitize(&self, record: &Value) -> Value {
        self.sanitize_as(Shape::Generic, record)
    }

    /// Sanitize a value known to be of `shape`
    ///
    /// Absent or empty input yields `Value::Null`.
    pub fn sanitize_as(&self, shape: Shape, value: &Value) -> Value {
        self.visit(shape, value).unwrap_or(Value::Null)
    }

    /// Returns `None` when the value is absent or sanitizes to nothing.
    fn visit(&self, shape: Shape, value: &Value) -> Option<Value> {
        match value {
            Value::Null => None,
            Value::Array(items) if items.is_empty() => None,
            Value::Array(items) => Some(Value::Array(
                items
                    .iter()
                    .map(|item| self.visit(shape, item).unwrap_or(Value::Null))
                    .collect(),
            )),
            Value::Object(fields) => match shape {
                Shape::Actor | Shape::Organization => {
                    self.visit_fields(fields, |name| IDENTITY_FIELDS.contains(&name))
                }
                Shape::Repository => {
                    self.visit_fields(fields, |name| REPOSITORY_FIELDS.contains(&name))
                }
                Shape::Subject => self.visit_fields(fields, |name| name != LINKS_FIELD),
                Shape::Generic => self.visit_fields(fields, |_| true),
            },
            scalar => Some(scalar.clone()),
        }
    }

    fn visit_fields(&self, fields: &Map<String, Value>, keep: impl Fn(&str) -> bool) -> Option<Value> {
        let sanitized: Map<String, Value> = fields
            .iter()
            .filter(|(name, _)| keep(name))
            .filter_map(|(name, value)| {
                self.visit(self.shape_of(name), value)
                    .map(|v| (name.clone(), v))
            })
            .collect();

        if sanitized.is_empty() {
            None
        } else {
            Some(Value::Object(sanitized))
        }
    }
}
