use indexmap::{IndexMap, IndexSet};
use serde::Serialize;

use crate::error::SpecError;
use crate::schema::{Property, PropertyKind, Schema};

/// HTTP methods a resource may declare, in canonical order.
pub const METHODS: [&str; 8] = [
    "GET", "PUT", "POST", "DELETE", "OPTIONS", "HEAD", "PATCH", "TRACE",
];

/// Upper-case a method token and check it against [`METHODS`].
pub fn normalize_method(name: &str) -> Option<&'static str> {
    let upper = name.to_ascii_uppercase();
    METHODS.iter().copied().find(|m| *m == upper)
}

/// The unified model of one API path.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Resource {
    path: String,
    template: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    path_parameters: Property,
    methods: IndexMap<String, Method>,
}

impl Resource {
    /// The path the resource was requested with.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// The document template the requested path matched.
    pub fn template(&self) -> &str {
        &self.template
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn path_parameters(&self) -> &Property {
        &self.path_parameters
    }

    pub fn methods(&self) -> &IndexMap<String, Method> {
        &self.methods
    }

    pub fn allowed_methods(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    /// Look up a method case-insensitively.
    pub fn method(&self, name: &str) -> Result<&Method, SpecError> {
        self.methods
            .get(&name.to_ascii_uppercase())
            .ok_or_else(|| SpecError::MethodNotAllowed {
                path: self.path.clone(),
                method: name.to_ascii_uppercase(),
                allowed: self.methods.keys().cloned().collect(),
            })
    }
}

/// One HTTP method declared on a resource.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Method {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    query_parameters: Property,
    path_parameters: Property,
    #[serde(skip_serializing_if = "Option::is_none")]
    request: Option<Schema>,
    responses: IndexMap<u16, Schema>,
    #[serde(skip_serializing_if = "IndexSet::is_empty")]
    empty_responses: IndexSet<u16>,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn query_parameters(&self) -> &Property {
        &self.query_parameters
    }

    pub fn path_parameters(&self) -> &Property {
        &self.path_parameters
    }

    pub fn request(&self) -> Option<&Schema> {
        self.request.as_ref()
    }

    pub fn responses(&self) -> &IndexMap<u16, Schema> {
        &self.responses
    }

    /// Every declared status code, including those without content.
    pub fn declared_statuses(&self) -> Vec<u16> {
        let mut statuses: Vec<u16> = self
            .responses
            .keys()
            .chain(self.empty_responses.iter())
            .copied()
            .collect();
        statuses.sort_unstable();
        statuses
    }

    /// The response schema for a status code. Asking for a status that is
    /// undeclared, or declared without content, is an error.
    pub fn response(&self, status: u16) -> Result<&Schema, SpecError> {
        self.responses
            .get(&status)
            .ok_or_else(|| SpecError::ResponseSchemaMissing {
                method: self.name.clone(),
                status,
                declared: self.empty_responses.contains(&status),
            })
    }
}

/// Accumulates named parameters into an object property.
#[derive(Debug, Clone, Default)]
pub struct ParameterSet {
    properties: IndexMap<String, Property>,
    required: IndexSet<String>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the set from an existing object property.
    pub fn from_property(property: &Property) -> Self {
        let mut set = Self::new();
        if let Some(properties) = property.properties() {
            for (name, prop) in properties {
                let required = property
                    .required()
                    .is_some_and(|r| r.contains(name));
                set.insert(name.clone(), prop.clone(), required);
            }
        }
        set
    }

    /// Add a parameter. A later entry with the same name replaces the earlier
    /// one and keeps its position.
    pub fn insert(&mut self, name: impl Into<String>, property: Property, required: bool) {
        let name = name.into();
        if required {
            self.required.insert(name.clone());
        } else {
            self.required.shift_remove(&name);
        }
        self.properties.insert(name, property);
    }

    pub fn into_property(self) -> Property {
        Property::new(PropertyKind::Object {
            properties: self.properties,
            required: self.required,
        })
    }
}

/// Assembles a [`Resource`].
#[derive(Debug)]
pub struct ResourceBuilder {
    path: String,
    template: String,
    title: Option<String>,
    description: Option<String>,
    path_parameters: Property,
    methods: IndexMap<String, Method>,
}

impl ResourceBuilder {
    pub fn new(path: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            template: template.into(),
            title: None,
            description: None,
            path_parameters: Property::empty_object(),
            methods: IndexMap::new(),
        }
    }

    pub fn title(mut self, title: Option<String>) -> Self {
        self.title = title;
        self
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn path_parameters(mut self, parameters: Property) -> Self {
        self.path_parameters = parameters;
        self
    }

    /// The resource-level path parameters, inherited by every method.
    pub fn current_path_parameters(&self) -> &Property {
        &self.path_parameters
    }

    /// Add a method. Two methods normalizing to the same token are rejected.
    pub fn method(mut self, method: Method) -> Result<Self, SpecError> {
        if self.methods.contains_key(&method.name) {
            return Err(SpecError::invalid_schema(format!(
                "method {} declared twice on {}",
                method.name, self.template
            )));
        }
        self.methods.insert(method.name.clone(), method);
        Ok(self)
    }

    pub fn build(self) -> Resource {
        Resource {
            path: self.path,
            template: self.template,
            title: self.title,
            description: self.description,
            path_parameters: self.path_parameters,
            methods: self.methods,
        }
    }
}

/// Assembles a [`Method`].
#[derive(Debug)]
pub struct MethodBuilder {
    name: String,
    description: Option<String>,
    query_parameters: Option<Property>,
    path_parameters: Option<Property>,
    request: Option<Schema>,
    responses: IndexMap<u16, Schema>,
    empty_responses: IndexSet<u16>,
}

impl MethodBuilder {
    /// Start a method; `name` is upper-cased.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_uppercase(),
            description: None,
            query_parameters: None,
            path_parameters: None,
            request: None,
            responses: IndexMap::new(),
            empty_responses: IndexSet::new(),
        }
    }

    pub fn description(mut self, description: Option<String>) -> Self {
        self.description = description;
        self
    }

    pub fn query_parameters(mut self, parameters: Property) -> Self {
        self.query_parameters = Some(parameters);
        self
    }

    pub fn path_parameters(mut self, parameters: Property) -> Self {
        self.path_parameters = Some(parameters);
        self
    }

    pub fn request(mut self, schema: Option<Schema>) -> Self {
        self.request = schema;
        self
    }

    pub fn response(mut self, status: u16, schema: Schema) -> Self {
        self.empty_responses.shift_remove(&status);
        self.responses.insert(status, schema);
        self
    }

    /// Record a status code that is declared but carries no body.
    pub fn empty_response(mut self, status: u16) -> Self {
        if !self.responses.contains_key(&status) {
            self.empty_responses.insert(status);
        }
        self
    }

    pub fn build(self) -> Method {
        Method {
            name: self.name,
            description: self.description,
            query_parameters: self.query_parameters.unwrap_or_else(Property::empty_object),
            path_parameters: self.path_parameters.unwrap_or_else(Property::empty_object),
            request: self.request,
            responses: self.responses,
            empty_responses: self.empty_responses,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song() -> Schema {
        let mut params = ParameterSet::new();
        params.insert("title", Property::string(), true);
        Schema::new(Some("Song".to_string()), params.into_property())
    }

    fn resource() -> Resource {
        let get = MethodBuilder::new("get")
            .response(200, song())
            .empty_response(204)
            .build();
        ResourceBuilder::new("/foo", "/foo")
            .method(get)
            .unwrap()
            .build()
    }

    #[test]
    fn test_method_lookup_is_case_insensitive() {
        let resource = resource();
        assert_eq!(resource.allowed_methods(), vec!["GET"]);
        assert_eq!(resource.method("get").unwrap().name(), "GET");
    }

    #[test]
    fn test_method_not_allowed() {
        let err = resource().method("POST").unwrap_err();
        match err {
            SpecError::MethodNotAllowed {
                path,
                method,
                allowed,
            } => {
                assert_eq!(path, "/foo");
                assert_eq!(method, "POST");
                assert_eq!(allowed, vec!["GET"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_response_missing_distinguishes_declared() {
        let resource = resource();
        let get = resource.method("GET").unwrap();
        assert_eq!(get.response(200).unwrap().name(), Some("Song"));
        assert!(matches!(
            get.response(204),
            Err(SpecError::ResponseSchemaMissing { declared: true, .. })
        ));
        assert!(matches!(
            get.response(500),
            Err(SpecError::ResponseSchemaMissing { declared: false, .. })
        ));
        assert_eq!(get.declared_statuses(), vec![200, 204]);
    }

    #[test]
    fn test_duplicate_method_rejected() {
        let err = ResourceBuilder::new("/foo", "/foo")
            .method(MethodBuilder::new("get").build())
            .unwrap()
            .method(MethodBuilder::new("GET").build())
            .unwrap_err();
        assert!(matches!(err, SpecError::InvalidSchema { .. }));
    }

    #[test]
    fn test_undeclared_parameters_default_to_empty_object() {
        let method = MethodBuilder::new("delete").build();
        assert_eq!(method.query_parameters(), &Property::empty_object());
        assert!(method.request().is_none());
        assert!(method.responses().is_empty());
    }

    #[test]
    fn test_parameter_set_override_keeps_position() {
        let mut set = ParameterSet::new();
        set.insert("a", Property::string(), true);
        set.insert("b", Property::string(), false);
        set.insert(
            "a",
            Property::string().with_description(Some("again".to_string())),
            false,
        );
        let prop = set.into_property();
        assert_eq!(prop.to_string(), "object{a?: string, b?: string}");
        assert_eq!(prop.property("a").unwrap().description(), Some("again"));
    }

    #[test]
    fn test_model_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Resource>();
        assert_send_sync::<Method>();
        assert_send_sync::<Schema>();
        assert_send_sync::<Property>();
    }

    #[test]
    fn test_normalize_method() {
        assert_eq!(normalize_method("get"), Some("GET"));
        assert_eq!(normalize_method("Patch"), Some("PATCH"));
        assert_eq!(normalize_method("parameters"), None);
    }
}
