//! OpenAPI 3.x and Swagger 2.0 documents.

use indexmap::IndexMap;

use super::{SpecFormatParser, select_media_type, status_code};
use crate::config::ParseOptions;
use crate::document::Node;
use crate::error::SpecError;
use crate::path::{PathMatch, match_path};
use crate::resolve::{Definitions, Primitive, SchemaResolver, TypeDialect};
use crate::resource::{
    Method, MethodBuilder, ParameterSet, Resource, ResourceBuilder, normalize_method,
};
use crate::schema::{Property, Schema};

const SCHEMA_REF_PREFIXES: [&str; 2] = ["#/components/schemas/", "#/definitions/"];

/// JSON Schema vocabulary as used by OpenAPI. `format: date` and
/// `format: date-time` refine strings into dates.
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenApiDialect;

impl TypeDialect for OpenApiDialect {
    fn primitive(&self, keyword: &str, node: &Node) -> Option<Primitive> {
        match keyword {
            "integer" => Some(Primitive::Integer),
            "number" => Some(Primitive::Number),
            "string" => match node.get_opt("format").and_then(|f| f.as_str().ok()) {
                Some("date" | "date-time") => Some(Primitive::Date),
                _ => Some(Primitive::String),
            },
            "boolean" => Some(Primitive::Boolean),
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
        SCHEMA_REF_PREFIXES
            .iter()
            .find_map(|prefix| reference.strip_prefix(prefix))
            .filter(|name| !name.is_empty())
            .map(Some)
            .ok_or_else(|| {
                SpecError::invalid_schema(format!("unsupported schema reference `{reference}`"))
            })
    }
}

/// Parser for documents with a top-level `paths` map.
#[derive(Debug, Clone, Default)]
pub struct OpenApiParser {
    options: ParseOptions,
}

impl OpenApiParser {
    pub fn new(options: ParseOptions) -> Self {
        Self { options }
    }
}

impl SpecFormatParser for OpenApiParser {
    fn parse(&self, document: &Node, path: &str) -> Result<Resource, SpecError> {
        let paths = document.get("paths")?.as_map()?;
        let found = match_path(paths.keys().map(String::as_str), path)?;
        let item = document.get("paths")?.get(&found.template)?;

        let mut definitions = Definitions::new();
        if let Some(schemas) = document
            .get_opt("components")
            .and_then(|c| c.get_opt("schemas"))
        {
            definitions.extend_from_map(schemas)?;
        }
        if let Some(schemas) = document.get_opt("definitions") {
            definitions.extend_from_map(schemas)?;
        }

        let mut walker = Walker {
            document,
            options: &self.options,
            resolver: SchemaResolver::new(&OpenApiDialect, definitions, self.options.strictness),
        };
        walker.resource(path, &found, item)
    }

    fn paths(&self, document: &Node) -> Result<Vec<String>, SpecError> {
        Ok(document.get("paths")?.as_map()?.keys().cloned().collect())
    }
}

/// A parameter after `$ref` lookup.
struct Parameter<'d> {
    name: &'d str,
    location: &'d str,
    node: &'d Node,
}

struct Walker<'d, 'o> {
    document: &'d Node,
    options: &'o ParseOptions,
    resolver: SchemaResolver<'d, OpenApiDialect>,
}

impl<'d> Walker<'d, '_> {
    fn resource(
        &mut self,
        path: &str,
        found: &PathMatch,
        item: &'d Node,
    ) -> Result<Resource, SpecError> {
        let info = self.document.get_opt("info");
        let title = item
            .get_str("summary")?
            .or(info.map(|i| i.get_str("title")).transpose()?.flatten());
        let description = item
            .get_str("description")?
            .or(info.map(|i| i.get_str("description")).transpose()?.flatten());

        let shared = self.parameters(item)?;

        let mut path_params = ParameterSet::new();
        for name in found.param_names() {
            path_params.insert(name, Property::string(), true);
        }
        for param in shared.values().filter(|p| p.location == "path") {
            let property = self.parameter_property(param)?;
            path_params.insert(param.name, property, true);
        }

        let mut builder = ResourceBuilder::new(path, found.template.as_str())
            .title(title.map(str::to_string))
            .description(description.map(str::to_string))
            .path_parameters(path_params.into_property());

        for (key, operation) in item.as_map()? {
            let Some(method) = normalize_method(key) else {
                continue;
            };
            let inherited = builder.current_path_parameters().clone();
            let method = self.method(method, operation, &shared, &inherited)?;
            builder = builder.method(method)?;
        }

        Ok(builder.build())
    }

    fn method(
        &mut self,
        name: &str,
        operation: &'d Node,
        shared: &IndexMap<(String, String), Parameter<'d>>,
        inherited: &Property,
    ) -> Result<Method, SpecError> {
        let mut parameters: IndexMap<(String, String), &Parameter<'d>> =
            shared.iter().map(|(k, v)| (k.clone(), v)).collect();
        let own = self.parameters(operation)?;
        for (key, param) in &own {
            parameters.insert(key.clone(), param);
        }

        let mut query = ParameterSet::new();
        let mut path = ParameterSet::from_property(inherited);
        let mut request = None;
        for param in parameters.values() {
            match param.location {
                "query" => {
                    let property = self.parameter_property(param)?;
                    query.insert(param.name, property, is_required(param.node)?);
                }
                "path" => {
                    let property = self.parameter_property(param)?;
                    path.insert(param.name, property, true);
                }
                "body" => {
                    let schema = param.node.get("schema")?;
                    request = Some(self.resolver.resolve_schema(schema)?);
                }
                other => log::debug!("skipping {other} parameter {}", param.name),
            }
        }

        if let Some(body) = operation.get_opt("requestBody") {
            request = self.request_body(body)?;
        }

        let description = match operation.get_str("description")? {
            Some(text) => Some(text),
            None => operation.get_str("summary")?,
        };

        let mut builder = MethodBuilder::new(name)
            .description(description.map(str::to_string))
            .query_parameters(query.into_property())
            .path_parameters(path.into_property())
            .request(request);

        if let Some(responses) = operation.get_opt("responses") {
            for (code, response) in responses.as_map()? {
                let Some(status) = status_code(code) else {
                    log::warn!("skipping non-numeric response `{code}` of {name}");
                    continue;
                };
                let response = self.follow(response)?;
                match self.response_schema(response)? {
                    Some(schema) => builder = builder.response(status, schema),
                    None => builder = builder.empty_response(status),
                }
            }
        }

        Ok(builder.build())
    }

    /// Parameters declared on a path item or operation, keyed by name and
    /// location so operation entries can override path-level ones.
    fn parameters(
        &self,
        node: &'d Node,
    ) -> Result<IndexMap<(String, String), Parameter<'d>>, SpecError> {
        let mut out = IndexMap::new();
        let Some(list) = node.get_opt("parameters") else {
            return Ok(out);
        };
        for entry in list.as_list()? {
            let entry = self.follow(entry)?;
            let param = Parameter {
                name: entry.get("name")?.as_str()?,
                location: entry.get("in")?.as_str()?,
                node: entry,
            };
            out.insert((param.name.to_string(), param.location.to_string()), param);
        }
        Ok(out)
    }

    /// Resolve a parameter's schema; OpenAPI 3 nests it under `schema`,
    /// Swagger 2 declares the type keys on the parameter itself.
    fn parameter_property(&mut self, param: &Parameter<'d>) -> Result<Property, SpecError> {
        let schema = param.node.get_opt("schema").unwrap_or(param.node);
        let property = self
            .resolver
            .resolve_with_default(schema, Some(Primitive::String))?;
        Ok(property.with_description(param.node.get_str("description")?.map(str::to_string)))
    }

    fn request_body(&mut self, body: &'d Node) -> Result<Option<Schema>, SpecError> {
        let body = self.follow(body)?;
        let Some(content) = body.get_opt("content") else {
            return Ok(None);
        };
        match select_media_type(content, &self.options.preferred_media_types)?
            .and_then(|media| media.get_opt("schema"))
        {
            Some(schema) => Ok(Some(self.resolver.resolve_schema(schema)?)),
            None => Ok(None),
        }
    }

    fn response_schema(&mut self, response: &'d Node) -> Result<Option<Schema>, SpecError> {
        let schema = match response.get_opt("content") {
            Some(content) => select_media_type(content, &self.options.preferred_media_types)?
                .and_then(|media| media.get_opt("schema")),
            None => response.get_opt("schema"),
        };
        schema
            .map(|schema| self.resolver.resolve_schema(schema))
            .transpose()
    }

    /// Follow a non-schema `$ref` (parameters, request bodies, responses)
    /// through the document.
    fn follow(&self, node: &'d Node) -> Result<&'d Node, SpecError> {
        let Some(reference) = node.get_opt("$ref") else {
            return Ok(node);
        };
        let reference = reference.as_str()?;
        let pointer = reference.strip_prefix("#/").ok_or_else(|| {
            SpecError::invalid_schema(format!("unsupported reference `{reference}`"))
        })?;

        let mut target = self.document;
        for segment in pointer.split('/') {
            let segment = segment.replace("~1", "/").replace("~0", "~");
            target = target
                .get(&segment)
                .map_err(|_| SpecError::UnresolvedReference {
                    name: reference.to_string(),
                })?;
        }
        if target.get_opt("$ref").is_some() {
            return Err(SpecError::invalid_schema(format!(
                "reference `{reference}` points at another reference"
            )));
        }
        Ok(target)
    }
}

fn is_required(node: &Node) -> Result<bool, SpecError> {
    Ok(node
        .get_opt("required")
        .map(Node::as_bool)
        .transpose()?
        .unwrap_or(false))
}
