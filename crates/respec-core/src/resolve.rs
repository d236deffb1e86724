//! Resolution of raw schema nodes into [`Property`] trees.
//!
//! Each format parser supplies a [`TypeDialect`] that maps its type keywords
//! onto [`Primitive`]s and recognizes reference nodes. References are looked
//! up in a per-call [`Definitions`] table and expanded in place; a visiting
//! stack guards against cycles and a cache avoids re-resolving shared
//! definitions.

use std::collections::HashMap;

use indexmap::{IndexMap, IndexSet};

use crate::config::Strictness;
use crate::document::Node;
use crate::error::{NodeError, SpecError};
use crate::schema::{Property, PropertyKind, Schema};

/// Canonical type a format keyword translates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Integer,
    Number,
    String,
    Boolean,
    Date,
    Array,
    Object,
}

/// Constraint keywords copied onto resolved properties.
const CONSTRAINTS: [&str; 6] = [
    "minimum",
    "maximum",
    "minLength",
    "maxLength",
    "pattern",
    "enum",
];

/// Composition keywords the property model cannot express.
const UNSUPPORTED_COMPOSITION: [&str; 3] = ["oneOf", "anyOf", "not"];

impl Primitive {
    fn accepts(self, constraint: &str) -> bool {
        match self {
            Primitive::Integer | Primitive::Number => {
                matches!(constraint, "minimum" | "maximum")
            }
            Primitive::String => {
                matches!(constraint, "minLength" | "maxLength" | "pattern" | "enum")
            }
            _ => false,
        }
    }

    /// The primitive a resolved kind was built from.
    fn of(kind: &PropertyKind) -> Primitive {
        match kind {
            PropertyKind::Integer { .. } => Primitive::Integer,
            PropertyKind::Number { .. } => Primitive::Number,
            PropertyKind::String { .. } => Primitive::String,
            PropertyKind::Boolean => Primitive::Boolean,
            PropertyKind::Date => Primitive::Date,
            PropertyKind::Array { .. } => Primitive::Array,
            PropertyKind::Object { .. } => Primitive::Object,
            PropertyKind::Reference { resolved, .. } => Primitive::of(&resolved.kind),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Primitive::Integer => "integer",
            Primitive::Number => "number",
            Primitive::String => "string",
            Primitive::Boolean => "boolean",
            Primitive::Date => "date",
            Primitive::Array => "array",
            Primitive::Object => "object",
        }
    }
}

/// Format-specific vocabulary used by the resolver.
pub trait TypeDialect {
    /// Translate a `type` keyword. `node` is the declaring node, so that
    /// keywords refined by siblings (e.g. `format: date`) can be told apart.
    fn primitive(&self, keyword: &str, node: &Node) -> Option<Primitive>;

    /// Definition name a node refers to through an explicit reference key.
    fn reference<'n>(&self, node: &'n Node) -> Result<Option<&'n str>, SpecError>;

    /// Whether a `type` keyword that is not a primitive may name a definition.
    fn type_names_definitions(&self) -> bool {
        false
    }

    /// Rules for object properties of nodes that do not come from a
    /// definition registered with its own rules.
    fn property_rules(&self) -> PropertyRules {
        PropertyRules::JsonSchema
    }
}

/// How object properties say whether they are required.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PropertyRules {
    /// Optional unless listed in `required` or marked `required: true`.
    #[default]
    JsonSchema,
    /// Required unless marked `required: false` or declared as `name?`.
    RamlTypes,
}

#[derive(Debug, Clone, Copy)]
struct Definition<'a> {
    node: &'a Node,
    rules: Option<PropertyRules>,
}

/// Named schema nodes a document makes available to references.
#[derive(Debug, Clone, Default)]
pub struct Definitions<'a> {
    entries: IndexMap<String, Definition<'a>>,
}

impl<'a> Definitions<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition resolved with the resolver's own rules.
    pub fn insert(&mut self, name: impl Into<String>, node: &'a Node) {
        self.entries.insert(name.into(), Definition { node, rules: None });
    }

    /// Register a definition whose properties follow `rules` wherever it is
    /// referenced from.
    pub fn insert_with_rules(
        &mut self,
        name: impl Into<String>,
        node: &'a Node,
        rules: PropertyRules,
    ) {
        self.entries.insert(
            name.into(),
            Definition {
                node,
                rules: Some(rules),
            },
        );
    }

    /// Add every entry of a map node, e.g. `components.schemas`.
    pub fn extend_from_map(&mut self, map: &'a Node) -> Result<(), SpecError> {
        for (name, node) in map.as_map()? {
            self.insert(name.clone(), node);
        }
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }
}

/// Resolves schema nodes of one document. Create one per parse call.
pub struct SchemaResolver<'a, D: TypeDialect + ?Sized> {
    dialect: &'a D,
    definitions: Definitions<'a>,
    strictness: Strictness,
    root_rules: PropertyRules,
    rules: Vec<PropertyRules>,
    visiting: Vec<String>,
    cache: HashMap<String, Property>,
}

impl<'a, D: TypeDialect + ?Sized> SchemaResolver<'a, D> {
    pub fn new(dialect: &'a D, definitions: Definitions<'a>, strictness: Strictness) -> Self {
        Self {
            dialect,
            definitions,
            strictness,
            root_rules: dialect.property_rules(),
            rules: Vec::new(),
            visiting: Vec::new(),
            cache: HashMap::new(),
        }
    }

    /// Resolve nodes outside of any definition with `rules` instead of the
    /// dialect's.
    pub fn with_rules(mut self, rules: PropertyRules) -> Self {
        self.root_rules = rules;
        self
    }

    /// Resolve a schema node into a property with every reference expanded.
    pub fn resolve(&mut self, node: &Node) -> Result<Property, SpecError> {
        self.resolve_with_default(node, None)
    }

    /// Like [`resolve`](Self::resolve), but a node without any type
    /// information becomes `default` instead of failing.
    pub fn resolve_with_default(
        &mut self,
        node: &Node,
        default: Option<Primitive>,
    ) -> Result<Property, SpecError> {
        let property = self.resolve_node(node, default)?.dereference();
        debug_assert!(property.is_resolved());
        Ok(property)
    }

    /// Resolve a node into a [`Schema`], named after the definition it
    /// points at when it is a plain reference.
    pub fn resolve_schema(&mut self, node: &Node) -> Result<Schema, SpecError> {
        let name = self.reference_target(node)?.map(str::to_string);
        let definition = self.resolve(node)?;
        Ok(Schema::new(name, definition))
    }

    /// Resolve a definition by name.
    pub fn resolve_named(&mut self, name: &str) -> Result<Property, SpecError> {
        if let Some(hit) = self.cache.get(name) {
            return Ok(hit.clone());
        }

        if let Some(start) = self.visiting.iter().position(|n| n == name) {
            let mut chain: Vec<&str> = self.visiting[start..].iter().map(String::as_str).collect();
            chain.push(name);
            return Err(SpecError::invalid_schema(format!(
                "cyclic reference: {}",
                chain.join(" -> ")
            )));
        }

        let definition = self.definitions.entries.get(name).copied().ok_or_else(|| {
            SpecError::UnresolvedReference {
                name: name.to_string(),
            }
        })?;

        self.visiting.push(name.to_string());
        self.rules.push(definition.rules.unwrap_or(self.root_rules));
        let result = self.resolve_node(definition.node, None);
        self.rules.pop();
        self.visiting.pop();

        let property = result?.dereference();
        self.cache.insert(name.to_string(), property.clone());
        Ok(property)
    }

    fn current_rules(&self) -> PropertyRules {
        self.rules.last().copied().unwrap_or(self.root_rules)
    }

    /// Name a node refers to, either through the dialect's reference key or,
    /// where the dialect allows it, a `type` keyword naming a definition.
    /// A node that adds properties or facets to the named type is a
    /// refinement, not a reference.
    fn reference_target<'n>(&self, node: &'n Node) -> Result<Option<&'n str>, SpecError> {
        if let Some(name) = self.dialect.reference(node)? {
            return Ok(Some(name));
        }
        Ok(self.named_type(node).filter(|_| !refines(node)))
    }

    fn named_type<'n>(&self, node: &'n Node) -> Option<&'n str> {
        if !self.dialect.type_names_definitions() {
            return None;
        }
        let keyword = match node {
            Node::String(s) => Some(s.as_str()),
            Node::Map(_) => match node.get_opt("type") {
                Some(Node::String(s)) => Some(s.as_str()),
                _ => None,
            },
            _ => None,
        };
        keyword.filter(|k| {
            self.dialect.primitive(k, node).is_none() && self.definitions.contains(k)
        })
    }

    fn resolve_node(
        &mut self,
        node: &Node,
        default: Option<Primitive>,
    ) -> Result<Property, SpecError> {
        if let Some(target) = self.reference_target(node)? {
            let resolved = self.resolve_named(target)?;
            return Ok(Property {
                title: text_field(node, "title")?,
                description: text_field(node, "description")?,
                kind: PropertyKind::Reference {
                    target: target.to_string(),
                    resolved: Box::new(resolved),
                },
            });
        }

        if let Some(parent) = self.named_type(node) {
            return self.resolve_refinement(node, parent);
        }

        if let Node::Map(_) = node {
            for keyword in UNSUPPORTED_COMPOSITION {
                if node.get_opt(keyword).is_some() {
                    return Err(SpecError::invalid_schema(format!(
                        "`{keyword}` is not supported"
                    )));
                }
            }
            if let Some(members) = node.get_opt("allOf") {
                return self.resolve_all_of(node, members);
            }
        }

        let primitive = self.primitive_of(node, default)?;
        if let Node::Map(_) = node {
            self.check_constraints(node, primitive)?;
        }

        let kind = match primitive {
            Primitive::Integer => PropertyKind::Integer {
                minimum: schema_field(node, "minimum", Node::as_i64)?,
                maximum: schema_field(node, "maximum", Node::as_i64)?,
            },
            Primitive::Number => PropertyKind::Number {
                minimum: schema_field(node, "minimum", Node::as_f64)?,
                maximum: schema_field(node, "maximum", Node::as_f64)?,
            },
            Primitive::String => PropertyKind::String {
                min_length: schema_field(node, "minLength", Node::as_u64)?,
                max_length: schema_field(node, "maxLength", Node::as_u64)?,
                pattern: text_field(node, "pattern")?,
                enum_values: schema_field(node, "enum", enum_literals)?,
            },
            Primitive::Boolean => PropertyKind::Boolean,
            Primitive::Date => PropertyKind::Date,
            Primitive::Array => {
                let items = node.get_opt("items").ok_or_else(|| {
                    SpecError::invalid_schema("array schema without `items`")
                })?;
                PropertyKind::Array {
                    items: Box::new(self.resolve_node(items, None)?),
                }
            }
            Primitive::Object => {
                let (properties, required) = self.resolve_object(node)?;
                PropertyKind::Object {
                    properties,
                    required,
                }
            }
        };

        Ok(Property {
            title: text_field(node, "title")?,
            description: text_field(node, "description")?,
            kind,
        })
    }

    fn primitive_of(
        &self,
        node: &Node,
        default: Option<Primitive>,
    ) -> Result<Primitive, SpecError> {
        // A bare string node is shorthand for `{type: <keyword>}`.
        let declared = match node {
            Node::String(_) => Some(node),
            Node::Map(_) => node.get_opt("type"),
            Node::Null => None,
            other => {
                return Err(SpecError::invalid_schema(format!(
                    "expected a schema, found {}",
                    other.kind()
                )));
            }
        };

        match declared {
            Some(Node::String(keyword)) => self.translate(keyword, node),
            Some(Node::List(keywords)) => {
                let non_null: Vec<&Node> = keywords
                    .iter()
                    .filter(|k| !matches!(k, Node::String(s) if s == "null"))
                    .collect();
                match non_null.as_slice() {
                    [Node::String(keyword)] => self.translate(keyword, node),
                    _ => Err(SpecError::invalid_schema(
                        "type lists must name exactly one non-null type",
                    )),
                }
            }
            Some(other) => Err(SpecError::invalid_schema(format!(
                "`type` must be a string, found {}",
                other.kind()
            ))),
            None if node.get_opt("properties").is_some() => Ok(Primitive::Object),
            None if node.get_opt("items").is_some() => Ok(Primitive::Array),
            None => default.ok_or_else(|| SpecError::invalid_schema("missing type")),
        }
    }

    fn translate(&self, keyword: &str, node: &Node) -> Result<Primitive, SpecError> {
        self.dialect
            .primitive(keyword, node)
            .ok_or_else(|| SpecError::invalid_schema(format!("unknown type `{keyword}`")))
    }

    fn check_constraints(&self, node: &Node, primitive: Primitive) -> Result<(), SpecError> {
        for constraint in CONSTRAINTS {
            if node.get_opt(constraint).is_none() || primitive.accepts(constraint) {
                continue;
            }
            match self.strictness {
                Strictness::Strict => {
                    return Err(SpecError::invalid_schema(format!(
                        "`{constraint}` is not allowed on {}",
                        primitive.name()
                    )));
                }
                Strictness::Lenient => {
                    log::debug!(
                        "ignoring `{constraint}` on {} schema",
                        primitive.name()
                    );
                }
            }
        }
        Ok(())
    }

    fn resolve_object(
        &mut self,
        node: &Node,
    ) -> Result<(IndexMap<String, Property>, IndexSet<String>), SpecError> {
        let rules = self.current_rules();
        let mut properties = IndexMap::new();
        let mut required: IndexSet<String> = IndexSet::new();

        // Per-property `required` flags are handled below.
        if let Some(Node::List(names)) = node.get_opt("required") {
            for name in names {
                let name = name.as_str().map_err(schema_error("required"))?;
                required.insert(name.to_string());
            }
        }

        if let Some(children) = node.get_opt("properties") {
            let children = children.as_map().map_err(schema_error("properties"))?;
            for (key, child) in children {
                let flag = match child.get_opt("required") {
                    Some(Node::Bool(flag)) => Some(*flag),
                    _ => None,
                };
                let (name, is_required) = match rules {
                    PropertyRules::JsonSchema => (key.as_str(), flag == Some(true)),
                    PropertyRules::RamlTypes => match key.strip_suffix('?') {
                        Some(name) => (name, flag == Some(true)),
                        None => (key.as_str(), flag.unwrap_or(true)),
                    },
                };
                if is_required {
                    required.insert(name.to_string());
                }
                let property = self.resolve_node(child, None)?;
                properties.insert(name.to_string(), property);
            }
        }

        Ok((properties, required))
    }

    /// A node whose `type` names a definition and which adds properties or
    /// facets of its own. The parent is resolved and the additions are laid
    /// on top of it.
    fn resolve_refinement(&mut self, node: &Node, parent: &str) -> Result<Property, SpecError> {
        let Property {
            title,
            description,
            kind,
        } = self.resolve_named(parent)?;
        let primitive = Primitive::of(&kind);

        if primitive != Primitive::Object && node.get_opt("properties").is_some() {
            return Err(SpecError::invalid_schema(format!(
                "`properties` on `{parent}`, which is {}",
                primitive.name()
            )));
        }
        self.check_constraints(node, primitive)?;

        let kind = match kind {
            PropertyKind::Object {
                mut properties,
                mut required,
            } => {
                let (own, own_required) = self.resolve_object(node)?;
                for (name, property) in own {
                    if own_required.contains(&name) {
                        required.insert(name.clone());
                    } else {
                        required.shift_remove(&name);
                    }
                    properties.insert(name, property);
                }
                PropertyKind::Object {
                    properties,
                    required,
                }
            }
            PropertyKind::Integer { minimum, maximum } => PropertyKind::Integer {
                minimum: schema_field(node, "minimum", Node::as_i64)?.or(minimum),
                maximum: schema_field(node, "maximum", Node::as_i64)?.or(maximum),
            },
            PropertyKind::Number { minimum, maximum } => PropertyKind::Number {
                minimum: schema_field(node, "minimum", Node::as_f64)?.or(minimum),
                maximum: schema_field(node, "maximum", Node::as_f64)?.or(maximum),
            },
            PropertyKind::String {
                min_length,
                max_length,
                pattern,
                enum_values,
            } => PropertyKind::String {
                min_length: schema_field(node, "minLength", Node::as_u64)?.or(min_length),
                max_length: schema_field(node, "maxLength", Node::as_u64)?.or(max_length),
                pattern: text_field(node, "pattern")?.or(pattern),
                enum_values: schema_field(node, "enum", enum_literals)?.or(enum_values),
            },
            other => other,
        };

        Ok(Property {
            title: text_field(node, "title")?.or(title),
            description: text_field(node, "description")?.or(description),
            kind,
        })
    }

    fn resolve_all_of(&mut self, node: &Node, members: &Node) -> Result<Property, SpecError> {
        let members = members.as_list().map_err(schema_error("allOf"))?;

        let mut properties = IndexMap::new();
        let mut required = IndexSet::new();
        let own = match node.get_opt("properties") {
            Some(_) => {
                let (properties, required) = self.resolve_object(node)?;
                Some(PropertyKind::Object {
                    properties,
                    required,
                })
            }
            None => None,
        };

        let resolved: Vec<PropertyKind> = members
            .iter()
            .map(|member| self.resolve_node(member, None).map(|p| p.dereference().kind))
            .collect::<Result<_, _>>()?;

        for kind in resolved.into_iter().chain(own) {
            match kind {
                PropertyKind::Object {
                    properties: member_props,
                    required: member_required,
                } => {
                    properties.extend(member_props);
                    required.extend(member_required);
                }
                _ => {
                    return Err(SpecError::invalid_schema(
                        "`allOf` members must be objects",
                    ));
                }
            }
        }

        Ok(Property {
            title: text_field(node, "title")?,
            description: text_field(node, "description")?,
            kind: PropertyKind::Object {
                properties,
                required,
            },
        })
    }
}

/// Whether a node naming a definition as its `type` adds anything besides
/// metadata.
fn refines(node: &Node) -> bool {
    matches!(node, Node::Map(_))
        && (node.get_opt("properties").is_some()
            || CONSTRAINTS.iter().any(|c| node.get_opt(c).is_some()))
}

fn schema_error(field: &'static str) -> impl Fn(NodeError) -> SpecError {
    move |err| SpecError::invalid_schema(format!("`{field}`: {err}"))
}

fn schema_field<T>(
    node: &Node,
    field: &'static str,
    read: impl Fn(&Node) -> Result<T, NodeError>,
) -> Result<Option<T>, SpecError> {
    node.get_opt(field)
        .map(read)
        .transpose()
        .map_err(schema_error(field))
}

fn text_field(node: &Node, field: &'static str) -> Result<Option<String>, SpecError> {
    schema_field(node, field, |n| n.as_str().map(str::to_string))
}

fn enum_literals(node: &Node) -> Result<IndexSet<String>, NodeError> {
    node.as_list()?.iter().map(Node::scalar_text).collect()
}
