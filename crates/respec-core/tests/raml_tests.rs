use respec_core::format::{RamlParser, SpecFormatParser};
use respec_core::{Node, Property, Resource, SpecError};

const TEST: &str = include_str!("fixtures/raml/test.raml");

fn parse(path: &str) -> Result<Resource, SpecError> {
    let document = Node::from_yaml_str(TEST).expect("fixture should be valid YAML");
    RamlParser::default().parse(&document, path)
}

fn assert_parameters(parameters: &Property) {
    let integer = parameters.property("param_integer").expect("param_integer");
    assert_eq!(integer.minimum(), Some(8.0));
    assert_eq!(integer.maximum(), Some(16.0));

    let number = parameters.property("param_number").expect("param_number");
    assert_eq!(number.description(), Some("The number"));

    assert_eq!(parameters.property("param_date").unwrap().type_name(), "date");
    assert_eq!(
        parameters.property("param_boolean").unwrap().type_name(),
        "boolean"
    );

    let string = parameters.property("param_string").expect("param_string");
    assert_eq!(string.min_length(), Some(8));
    assert_eq!(string.max_length(), Some(16));
    assert_eq!(string.pattern(), Some("[A-z]+"));
    let values: Vec<&str> = string.enum_values().unwrap().iter().map(String::as_str).collect();
    assert_eq!(values, vec!["foo", "bar"]);
}

#[test]
fn parse_complex_resource() {
    let resource = parse("/foo").expect("should parse /foo");

    assert_eq!(resource.allowed_methods(), vec!["GET", "POST"]);
    assert_eq!(resource.title(), Some("Bar"));
    assert_eq!(resource.description(), Some("Some description"));

    let get = resource.method("GET").unwrap();
    assert_eq!(get.description(), Some("Informations about the method"));
    let query = get.query_parameters();
    let pages = query.property("pages").expect("pages");
    assert_eq!(pages.description(), Some("The number of pages to return"));
    assert_eq!(pages.type_name(), "string");
    assert_parameters(query);
    assert!(query.required().unwrap().contains("param_boolean"));
    assert!(!query.required().unwrap().contains("pages"));

    let post = resource.method("POST").unwrap();
    assert_eq!(post.query_parameters(), &Property::empty_object());

    let request = post.request().expect("POST should have a request body");
    assert_eq!(request.name(), Some("Song"));
    assert_eq!(request.definition().description(), Some("A canonical song"));
    assert!(request.definition().property("title").is_some());
    assert!(request.definition().property("artist").is_some());

    let response = post.response(200).expect("POST should have a 200 response");
    assert_eq!(response.definition().description(), Some("A canonical song"));
    assert_eq!(
        response.definition().to_string(),
        "object{title: string, artist: string}"
    );
}

#[test]
fn parse_templated_path() {
    let resource = parse("/bar/:bar_id").expect("should match /bar/{bar_id}");

    assert_eq!(resource.template(), "/bar/{bar_id}");
    assert_eq!(resource.allowed_methods(), vec!["GET"]);
    assert_eq!(resource.description(), Some("Returns details about bar"));
    assert_eq!(resource.title(), Some("Music API"));

    let path = resource.path_parameters();
    assert_eq!(path.property("bar_id").unwrap().type_name(), "integer");
    assert_parameters(path);

    let song = resource.method("GET").unwrap().response(200).unwrap();
    assert_eq!(song.name(), None);
    let definition = song.definition();
    assert_eq!(definition.description(), Some("A canonical song"));
    assert_eq!(definition.property("title").unwrap().max_length(), Some(64));
    assert!(definition.property("artist").is_some());
}

#[test]
fn parse_nested_resource() {
    let resource = parse("/foo/bar").expect("should parse nested resource");
    assert_eq!(resource.allowed_methods(), vec!["GET"]);
    assert_eq!(resource.description(), Some("Some description"));
    assert!(matches!(
        resource.method("GET").unwrap().response(204),
        Err(SpecError::ResponseSchemaMissing { declared: true, .. })
    ));
}

#[test]
fn response_without_schema_fails() {
    let resource = parse("/foo").unwrap();
    let err = resource.method("POST").unwrap().response(500).unwrap_err();
    match err {
        SpecError::ResponseSchemaMissing {
            method,
            status,
            declared,
        } => {
            assert_eq!(method, "POST");
            assert_eq!(status, 500);
            assert!(declared);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_path_fails() {
    assert!(matches!(parse("/test"), Err(SpecError::PathNotFound { .. })));
}

#[test]
fn invalid_schema_fails() {
    match parse("/invalid_schema").unwrap_err() {
        SpecError::InvalidSchema { reason } => assert_eq!(reason, "unknown type `foo`"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn invalid_reference_fails() {
    match parse("/invalid_reference").unwrap_err() {
        SpecError::UnresolvedReference { name } => assert_eq!(name, "UnknownSong"),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn method_not_declared_fails() {
    let resource = parse("/bar/1").unwrap();
    match resource.method("DELETE").unwrap_err() {
        SpecError::MethodNotAllowed { allowed, .. } => assert_eq!(allowed, vec!["GET"]),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn lists_flattened_paths() {
    let document = Node::from_yaml_str(TEST).unwrap();
    let paths = RamlParser::default().paths(&document).unwrap();
    assert_eq!(
        paths,
        vec![
            "/foo",
            "/foo/bar",
            "/bar/{bar_id}",
            "/invalid_schema",
            "/invalid_reference"
        ]
    );
}

#[test]
fn raml_types_declarations() {
    let source = r#"
#%RAML 1.0
title: Shop
types:
  Price:
    type: number
    minimum: 0
  Item:
    type: object
    properties:
      name:
        type: string
        required: true
      price: Price
      tags:
        type: array
        items: string
/items/{itemId}:
  put:
    body:
      application/json:
        type: Item
    responses:
      200:
        body:
          application/json:
            type: Item
            description: The stored item
"#;
    let document = Node::from_yaml_str(source).unwrap();
    let resource = RamlParser::default().parse(&document, "/items/7").unwrap();
    let put = resource.method("put").unwrap();

    let request = put.request().unwrap();
    assert_eq!(request.name(), Some("Item"));
    assert_eq!(
        request.definition().to_string(),
        "object{name: string, price: number, tags: array<string>}"
    );
    assert_eq!(
        request.definition().property("price").unwrap().minimum(),
        Some(0.0)
    );

    let response = put.response(200).unwrap();
    assert_eq!(response.definition().description(), Some("The stored item"));
}

const SHOP: &str = r#"
#%RAML 1.0
title: Shop
types:
  Base:
    type: object
    properties:
      id: integer
  Item:
    type: Base
    properties:
      name: string
      note?: string
      sku:
        type: string
        required: false
  Code:
    type: string
    pattern: "[A-Z]+"
/items:
  get:
    queryParameters:
      code:
        type: Code
        maxLength: 8
    responses:
      200:
        body:
          application/json:
            type: Item
  post:
    body:
      application/json:
        type: Base
        description: A new item
        properties:
          name: string
    responses:
      201:
/codes:
  get:
    responses:
      200:
        body:
          application/json:
            type: Code
            properties:
              name: string
"#;

fn parse_shop(path: &str) -> Result<Resource, SpecError> {
    let document = Node::from_yaml_str(SHOP).expect("source should be valid YAML");
    RamlParser::default().parse(&document, path)
}

#[test]
fn type_inheritance_keeps_own_properties() {
    let resource = parse_shop("/items").unwrap();
    let item = resource.method("GET").unwrap().response(200).unwrap();

    assert_eq!(item.name(), Some("Item"));
    assert_eq!(
        item.definition().to_string(),
        "object{id: integer, name: string, note?: string, sku?: string}"
    );
}

#[test]
fn inline_subtype_is_anonymous() {
    let resource = parse_shop("/items").unwrap();
    let request = resource.method("POST").unwrap().request().unwrap();

    assert_eq!(request.name(), None);
    assert_eq!(request.definition().description(), Some("A new item"));
    assert_eq!(
        request.definition().to_string(),
        "object{id: integer, name: string}"
    );
}

#[test]
fn scalar_type_facets_are_refined() {
    let resource = parse_shop("/items").unwrap();
    let query = resource.method("GET").unwrap().query_parameters().clone();
    let code = query.property("code").unwrap();

    assert_eq!(code.type_name(), "string");
    assert_eq!(code.pattern(), Some("[A-Z]+"));
    assert_eq!(code.max_length(), Some(8));
}

#[test]
fn properties_on_scalar_type_fail() {
    match parse_shop("/codes").unwrap_err() {
        SpecError::InvalidSchema { reason } => {
            assert_eq!(reason, "`properties` on `Code`, which is string")
        }
        other => panic!("unexpected error: {other}"),
    }
}
