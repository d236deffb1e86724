//! RAML documents: nested resource trees, named parameters and JSON Schema
//! bodies (RAML 0.8) or type declarations (RAML 1.0).

use indexmap::IndexMap;

use super::{SpecFormatParser, select_media_type, status_code};
use crate::config::ParseOptions;
use crate::document::Node;
use crate::error::SpecError;
use crate::path::match_path;
use crate::resolve::{Definitions, Primitive, PropertyRules, SchemaResolver, TypeDialect};
use crate::resource::{
    Method, MethodBuilder, ParameterSet, Resource, ResourceBuilder, normalize_method,
};
use crate::schema::{Property, Schema};

/// RAML built-in types. Embedded JSON schemas reuse the same vocabulary and
/// refer to definitions through `$ref`, but keep JSON Schema's optional
/// properties.
#[derive(Debug, Clone, Copy, Default)]
pub struct RamlDialect;

impl TypeDialect for RamlDialect {
    fn primitive(&self, keyword: &str, _node: &Node) -> Option<Primitive> {
        match keyword {
            "integer" => Some(Primitive::Integer),
            "number" => Some(Primitive::Number),
            "string" => Some(Primitive::String),
            "boolean" => Some(Primitive::Boolean),
            "date" | "date-only" | "datetime" | "datetime-only" => Some(Primitive::Date),
            "array" => Some(Primitive::Array),
            "object" => Some(Primitive::Object),
            _ => None,
        }
    }

    fn reference<'n>(&self, node: &'n Node) -> Result<Option<&'n str>, SpecError> {
        let Some(reference) = node.get_opt("$ref") else {
            return Ok(None);
        };
        let reference = reference.as_str()?;
        if let Some(name) = reference.strip_prefix("#/definitions/") {
            return Ok(Some(name));
        }
        if reference.contains(['#', '/']) || reference.is_empty() {
            return Err(SpecError::invalid_schema(format!(
                "unsupported schema reference `{reference}`"
            )));
        }
        Ok(Some(reference))
    }

    fn type_names_definitions(&self) -> bool {
        true
    }

    fn property_rules(&self) -> PropertyRules {
        PropertyRules::RamlTypes
    }
}

/// Parser for RAML documents.
#[derive(Debug, Clone, Default)]
pub struct RamlParser {
    options: ParseOptions,
}

impl RamlParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl SpecFormatParser for RamlParser {
    fn parse(&self, document: &Node, path: &str) -> Result<Resource, SpecError> {
        let resources = flatten(document)?;
        let found = match_path(resources.iter().map(|r| r.template.as_str()), path)?;
        let matched = resources
            .iter()
            .find(|r| r.template == found.template)
            .ok_or_else(|| SpecError::PathNotFound {
                path: path.to_string(),
                templates: resources.iter().map(|r| r.template.clone()).collect(),
            })?;

        let owned = collect_definitions(document)?;
        let mut definitions = Definitions::new();
        for (name, (node, rules)) in &owned {
            definitions.insert_with_rules(name.clone(), node, *rules);
        }

        let mut walker = Walker {
            options: &self.options,
            definitions: definitions.clone(),
            resolver: SchemaResolver::new(&RamlDialect, definitions, self.options.strictness),
        };

        let mut path_params = ParameterSet::new();
        for name in found.param_names() {
            path_params.insert(name, Property::string(), true);
        }
        for declared in &matched.uri_parameters {
            walker.named_parameters(declared, true, &mut path_params)?;
        }
        let path_params = path_params.into_property();

        let title = match matched.node.get_str("displayName")? {
            Some(name) => Some(name),
            None => document.get_str("title")?,
        };

        let mut builder = ResourceBuilder::new(path, matched.template.as_str())
            .title(title.map(str::to_string))
            .description(matched.description.map(str::to_string))
            .path_parameters(path_params.clone());

        if let Node::Map(entries) = matched.node {
            for (key, declaration) in entries {
                let Some(method) = normalize_method(key) else {
                    continue;
                };
                builder = builder.method(walker.method(method, declaration, &path_params)?)?;
            }
        }

        Ok(builder.build())
    }

    fn paths(&self, document: &Node) -> Result<Vec<String>, SpecError> {
        Ok(flatten(document)?.into_iter().map(|r| r.template).collect())
    }
}

/// A resource of the nested tree together with what it inherits.
struct FlatResource<'d> {
    template: String,
    node: &'d Node,
    uri_parameters: Vec<&'d Node>,
    description: Option<&'d str>,
}

/// Flatten nested resources into full templates, parents before children.
fn flatten(document: &Node) -> Result<Vec<FlatResource<'_>>, SpecError> {
    let mut out = Vec::new();
    flatten_into(document, "", &[], None, &mut out)?;
    Ok(out)
}

fn flatten_into<'d>(
    node: &'d Node,
    prefix: &str,
    uri_parameters: &[&'d Node],
    description: Option<&'d str>,
    out: &mut Vec<FlatResource<'d>>,
) -> Result<(), SpecError> {
    let Node::Map(entries) = node else {
        return Ok(());
    };
    for (key, child) in entries {
        if !key.starts_with('/') {
            continue;
        }
        let template = format!("{prefix}{key}");
        let mut params = uri_parameters.to_vec();
        if let Some(declared) = child.get_opt("uriParameters") {
            params.push(declared);
        }
        let description = child.get_str("description")?.or(description);

        out.push(FlatResource {
            template: template.clone(),
            node: child,
            uri_parameters: params.clone(),
            description,
        });
        flatten_into(child, &template, &params, description, out)?;
    }
    Ok(())
}

/// Named schemas from `schemas` (RAML 0.8) and `types` (RAML 1.0), with the
/// property rules each follows. JSON schema strings are parsed here, and the
/// `definitions` they carry are made available under their own names.
fn collect_definitions(
    document: &Node,
) -> Result<IndexMap<String, (Node, PropertyRules)>, SpecError> {
    let mut out = IndexMap::new();

    if let Some(schemas) = document.get_opt("schemas") {
        let groups: Vec<&Node> = match schemas {
            Node::List(items) => items.iter().collect(),
            other => vec![other],
        };
        for group in groups {
            for (name, declaration) in group.as_map()? {
                let node = match declaration {
                    Node::String(text) => parse_json_schema(name, text)?,
                    other => other.clone(),
                };
                out.insert(name.clone(), (node, PropertyRules::JsonSchema));
            }
        }
    }

    if let Some(types) = document.get_opt("types") {
        for (name, declaration) in types.as_map()? {
            out.insert(name.clone(), (declaration.clone(), PropertyRules::RamlTypes));
        }
    }

    let mut nested = Vec::new();
    for (node, rules) in out.values() {
        if *rules != PropertyRules::JsonSchema {
            continue;
        }
        if let Some(Node::Map(definitions)) = node.get_opt("definitions") {
            for (name, definition) in definitions {
                nested.push((name.clone(), definition.clone()));
            }
        }
    }
    for (name, node) in nested {
        out.entry(name).or_insert((node, PropertyRules::JsonSchema));
    }

    Ok(out)
}

fn parse_json_schema(name: &str, text: &str) -> Result<Node, SpecError> {
    Node::from_json_str(text)
        .map_err(|err| SpecError::invalid_schema(format!("schema `{name}` is not valid JSON: {err}")))
}

struct Walker<'d, 'o> {
    options: &'o ParseOptions,
    definitions: Definitions<'d>,
    resolver: SchemaResolver<'d, RamlDialect>,
}

impl<'d> Walker<'d, '_> {
    fn method(
        &mut self,
        name: &str,
        declaration: &Node,
        path_params: &Property,
    ) -> Result<Method, SpecError> {
        let mut query = ParameterSet::new();
        if let Some(declared) = declaration.get_opt("queryParameters") {
            self.named_parameters(declared, false, &mut query)?;
        }

        let request = match declaration.get_opt("body") {
            Some(body) => self.body_schema(body)?,
            None => None,
        };

        let mut builder = MethodBuilder::new(name)
            .description(declaration.get_str("description")?.map(str::to_string))
            .query_parameters(query.into_property())
            .path_parameters(path_params.clone())
            .request(request);

        if let Some(responses) = declaration.get_opt("responses") {
            for (code, response) in responses.as_map()? {
                let Some(status) = status_code(code) else {
                    log::warn!("skipping non-numeric response `{code}` of {name}");
                    continue;
                };
                let schema = match response.get_opt("body") {
                    Some(body) => self.body_schema(body)?,
                    None => None,
                };
                builder = match schema {
                    Some(schema) => builder.response(status, schema),
                    None => builder.empty_response(status),
                };
            }
        }

        Ok(builder.build())
    }

    /// Add RAML named parameters (`queryParameters`, `uriParameters`) to a
    /// set. Undeclared types default to `string`.
    fn named_parameters(
        &mut self,
        declared: &Node,
        required_by_default: bool,
        set: &mut ParameterSet,
    ) -> Result<(), SpecError> {
        for (name, declaration) in declared.as_map()? {
            let mut property = self
                .resolver
                .resolve_with_default(declaration, Some(Primitive::String))?;
            if property.title.is_none() {
                property.title = declaration.get_str("displayName")?.map(str::to_string);
            }
            let required = match declaration.get_opt("required") {
                Some(flag) => flag.as_bool()?,
                None => required_by_default,
            };
            set.insert(name.clone(), property, required);
        }
        Ok(())
    }

    /// Schema of a `body` declaration: either keyed by media type or, in
    /// RAML 1.0, a type declaration directly.
    fn body_schema(&mut self, body: &Node) -> Result<Option<Schema>, SpecError> {
        let declaration = if ["schema", "type", "properties"]
            .iter()
            .any(|key| body.get_opt(key).is_some())
        {
            Some(body)
        } else {
            select_media_type(body, &self.options.preferred_media_types)?
        };
        let Some(declaration) = declaration else {
            return Ok(None);
        };

        match declaration.get_opt("schema") {
            Some(Node::String(text)) => self.schema_text(text).map(Some),
            Some(schema) => self.resolver.resolve_schema(schema).map(Some),
            None if declaration.get_opt("type").is_some()
                || declaration.get_opt("properties").is_some() =>
            {
                self.resolver.resolve_schema(declaration).map(Some)
            }
            None => Ok(None),
        }
    }

    /// A `schema:` string is either the name of a declared schema or an
    /// inline JSON schema.
    fn schema_text(&mut self, text: &str) -> Result<Schema, SpecError> {
        let trimmed = text.trim();
        if self.definitions.contains(trimmed) {
            let reference = Node::String(trimmed.to_string());
            return self.resolver.resolve_schema(&reference);
        }
        if !trimmed.starts_with('{') {
            return Err(SpecError::UnresolvedReference {
                name: trimmed.to_string(),
            });
        }

        let inline = parse_json_schema("inline", trimmed)?;
        let mut definitions = self.definitions.clone();
        if let Some(nested) = inline.get_opt("definitions") {
            definitions.extend_from_map(nested)?;
        }
        let strictness = self.options.strictness;
        let mut resolver = SchemaResolver::new(&RamlDialect, definitions, strictness)
            .with_rules(PropertyRules::JsonSchema);
        resolver.resolve_schema(&inline)
    }
}
