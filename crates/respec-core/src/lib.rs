pub mod config;
pub mod document;
pub mod error;
pub mod format;
pub mod path;
pub mod resolve;
pub mod resource;
pub mod schema;

pub use config::{ParseOptions, Strictness};
pub use document::Node;
pub use error::{NodeError, SpecError};
pub use format::{Format, SpecFormatParser};
pub use resource::{Method, Resource};
pub use schema::{Property, PropertyKind, Schema};

/// Parse the resource matching `path` out of a document in a known format.
pub fn parse_resource(
    document: &Node,
    path: &str,
    format: Format,
    options: &ParseOptions,
) -> Result<Resource, SpecError> {
    log::debug!("parsing {path} as {format}");
    format.parser(options.clone()).parse(document, path)
}

/// Like [`parse_resource`], detecting the format from the document root.
pub fn parse_resource_auto(
    document: &Node,
    path: &str,
    options: &ParseOptions,
) -> Result<Resource, SpecError> {
    let format = Format::detect(document)?;
    parse_resource(document, path, format, options)
}
