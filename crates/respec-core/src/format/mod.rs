pub mod openapi;
pub mod raml;

use std::fmt;
use std::str::FromStr;

use crate::config::ParseOptions;
use crate::document::Node;
use crate::error::SpecError;
use crate::resource::Resource;

pub use openapi::OpenApiParser;
pub use raml::RamlParser;

/// A parser turning one document format into [`Resource`]s.
pub trait SpecFormatParser {
    /// Build the resource for the first declared path template matching
    /// `path`.
    fn parse(&self, document: &Node, path: &str) -> Result<Resource, SpecError>;

    /// Every path template the document declares, in document order.
    fn paths(&self, document: &Node) -> Result<Vec<String>, SpecError>;
}

/// Supported document formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    OpenApi,
    Raml,
}

impl Format {
    /// Guess the format from the document root.
    pub fn detect(document: &Node) -> Result<Format, SpecError> {
        let Node::Map(root) = document else {
            return Err(SpecError::UnknownFormat);
        };
        if root.contains_key("openapi") || root.contains_key("swagger") {
            return Ok(Format::OpenApi);
        }
        if root.contains_key("title") && root.keys().any(|k| k.starts_with('/')) {
            return Ok(Format::Raml);
        }
        Err(SpecError::UnknownFormat)
    }

    pub fn parser(self, options: ParseOptions) -> Box<dyn SpecFormatParser> {
        match self {
            Format::OpenApi => Box::new(OpenApiParser::new(options)),
            Format::Raml => Box::new(RamlParser::new(options)),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Format::OpenApi => "openapi",
            Format::Raml => "raml",
        }
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Format {
    type Err = SpecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openapi" | "swagger" => Ok(Format::OpenApi),
            "raml" => Ok(Format::Raml),
            _ => Err(SpecError::UnknownFormat),
        }
    }
}

/// Pick the body declaration among media types: the first preferred type
/// that is declared, otherwise the first one registered.
pub(crate) fn select_media_type<'d>(
    content: &'d Node,
    preferred: &[String],
) -> Result<Option<&'d Node>, SpecError> {
    let entries = content.as_map()?;
    let chosen = preferred
        .iter()
        .find_map(|media| entries.get(media))
        .or_else(|| entries.values().next());
    Ok(chosen.filter(|n| !n.is_null()))
}

/// Parse a response key into an HTTP status code.
pub(crate) fn status_code(key: &str) -> Option<u16> {
    key.parse::<u16>()
        .ok()
        .filter(|code| (100..=599).contains(code))
}
