use std::fmt;

use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

/// A node in a resolved schema tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Property {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub kind: PropertyKind,
}

/// The typed shape of a [`Property`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PropertyKind {
    Integer {
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<i64>,
    },
    Number {
        #[serde(skip_serializing_if = "Option::is_none")]
        minimum: Option<f64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        maximum: Option<f64>,
    },
    String {
        #[serde(rename = "minLength", skip_serializing_if = "Option::is_none")]
        min_length: Option<u64>,
        #[serde(rename = "maxLength", skip_serializing_if = "Option::is_none")]
        max_length: Option<u64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        pattern: Option<String>,
        #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
        enum_values: Option<IndexSet<String>>,
    },
    Boolean,
    Date,
    Array {
        items: Box<Property>,
    },
    Object {
        properties: IndexMap<String, Property>,
        #[serde(skip_serializing_if = "IndexSet::is_empty")]
        required: IndexSet<String>,
    },
    /// A named pointer to a definition together with its expansion. Only
    /// produced while resolving; dereferenced before a tree is handed out.
    Reference {
        target: String,
        resolved: Box<Property>,
    },
}

impl Property {
    pub fn new(kind: PropertyKind) -> Self {
        Self {
            title: None,
            description: None,
            kind,
        }
    }

    pub fn string() -> Self {
        Self::new(PropertyKind::String {
            min_length: None,
            max_length: None,
            pattern: None,
            enum_values: None,
        })
    }

    /// An object without properties, the default for undeclared parameter sets.
    pub fn empty_object() -> Self {
        Self::new(PropertyKind::Object {
            properties: IndexMap::new(),
            required: IndexSet::new(),
        })
    }

    pub fn with_description(mut self, description: Option<String>) -> Self {
        if description.is_some() {
            self.description = description;
        }
        self
    }

    pub fn type_name(&self) -> &'static str {
        match &self.kind {
            PropertyKind::Integer { .. } => "integer",
            PropertyKind::Number { .. } => "number",
            PropertyKind::String { .. } => "string",
            PropertyKind::Boolean => "boolean",
            PropertyKind::Date => "date",
            PropertyKind::Array { .. } => "array",
            PropertyKind::Object { .. } => "object",
            PropertyKind::Reference { .. } => "reference",
        }
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// Child property of an object.
    pub fn property(&self, name: &str) -> Option<&Property> {
        match &self.kind {
            PropertyKind::Object { properties, .. } => properties.get(name),
            _ => None,
        }
    }

    pub fn properties(&self) -> Option<&IndexMap<String, Property>> {
        match &self.kind {
            PropertyKind::Object { properties, .. } => Some(properties),
            _ => None,
        }
    }

    pub fn required(&self) -> Option<&IndexSet<String>> {
        match &self.kind {
            PropertyKind::Object { required, .. } => Some(required),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&Property> {
        match &self.kind {
            PropertyKind::Array { items } => Some(items),
            _ => None,
        }
    }

    pub fn minimum(&self) -> Option<f64> {
        match &self.kind {
            PropertyKind::Integer { minimum, .. } => minimum.map(|v| v as f64),
            PropertyKind::Number { minimum, .. } => *minimum,
            _ => None,
        }
    }

    pub fn maximum(&self) -> Option<f64> {
        match &self.kind {
            PropertyKind::Integer { maximum, .. } => maximum.map(|v| v as f64),
            PropertyKind::Number { maximum, .. } => *maximum,
            _ => None,
        }
    }

    pub fn min_length(&self) -> Option<u64> {
        match &self.kind {
            PropertyKind::String { min_length, .. } => *min_length,
            _ => None,
        }
    }

    pub fn max_length(&self) -> Option<u64> {
        match &self.kind {
            PropertyKind::String { max_length, .. } => *max_length,
            _ => None,
        }
    }

    pub fn pattern(&self) -> Option<&str> {
        match &self.kind {
            PropertyKind::String { pattern, .. } => pattern.as_deref(),
            _ => None,
        }
    }

    pub fn enum_values(&self) -> Option<&IndexSet<String>> {
        match &self.kind {
            PropertyKind::String { enum_values, .. } => enum_values.as_ref(),
            _ => None,
        }
    }

    /// True when no [`PropertyKind::Reference`] is reachable from this node.
    pub fn is_resolved(&self) -> bool {
        match &self.kind {
            PropertyKind::Reference { .. } => false,
            PropertyKind::Array { items } => items.is_resolved(),
            PropertyKind::Object { properties, .. } => {
                properties.values().all(Property::is_resolved)
            }
            _ => true,
        }
    }

    /// Replace every reference by its expansion. A description on the
    /// referring node wins over the one of the target.
    pub fn dereference(self) -> Property {
        let Property {
            title,
            description,
            kind,
        } = self;
        match kind {
            PropertyKind::Reference { resolved, .. } => {
                let mut target = resolved.dereference();
                if description.is_some() {
                    target.description = description;
                }
                if title.is_some() {
                    target.title = title;
                }
                target
            }
            PropertyKind::Array { items } => Property {
                title,
                description,
                kind: PropertyKind::Array {
                    items: Box::new(items.dereference()),
                },
            },
            PropertyKind::Object {
                properties,
                required,
            } => Property {
                title,
                description,
                kind: PropertyKind::Object {
                    properties: properties
                        .into_iter()
                        .map(|(name, prop)| (name, prop.dereference()))
                        .collect(),
                    required,
                },
            },
            kind => Property {
                title,
                description,
                kind,
            },
        }
    }
}

/// Compact one-line rendering, e.g. `object{id: integer, tags: array<string>}`.
impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            PropertyKind::Array { items } => write!(f, "array<{items}>"),
            PropertyKind::Object {
                properties,
                required,
            } => {
                write!(f, "object{{")?;
                for (i, (name, prop)) in properties.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    let marker = if required.contains(name) { "" } else { "?" };
                    write!(f, "{name}{marker}: {prop}")?;
                }
                write!(f, "}}")
            }
            PropertyKind::Reference { target, .. } => write!(f, "ref<{target}>"),
            _ => f.write_str(self.type_name()),
        }
    }
}

/// A named or anonymous unit wrapping a resolved property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub definition: Property,
}

impl Schema {
    pub fn new(name: Option<String>, definition: Property) -> Self {
        Self { name, definition }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn definition(&self) -> &Property {
        &self.definition
    }
}
