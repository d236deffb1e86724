//! Generic document tree walked by the format parsers.
//!
//! JSON and YAML tokenizing is left to `serde_json` and `serde_yaml_ng`; their
//! values are converted into a [`Node`] so that every format parser reads the
//! same closed set of variants through type-checked accessors.

use indexmap::IndexMap;

use crate::error::{NodeError, SpecError};

/// A node of a parsed API description document.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Null,
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<Node>),
    Map(IndexMap<String, Node>),
}

impl Node {
    /// Tokenize a JSON document into a tree.
    pub fn from_json_str(input: &str) -> Result<Node, SpecError> {
        let value: serde_json::Value = serde_json::from_str(input)?;
        Ok(Node::from(value))
    }

    /// Tokenize a YAML document into a tree.
    pub fn from_yaml_str(input: &str) -> Result<Node, SpecError> {
        let value: serde_yaml_ng::Value = serde_yaml_ng::from_str(input)?;
        Ok(Node::from(value))
    }

    /// Name of the variant, used in type mismatch errors.
    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Bool(_) => "boolean",
            Node::Integer(_) => "integer",
            Node::Float(_) => "number",
            Node::String(_) => "string",
            Node::List(_) => "list",
            Node::Map(_) => "map",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    /// Look up a key on a map node. Fails when the node is not a map or the
    /// key is absent.
    pub fn get(&self, key: &str) -> Result<&Node, NodeError> {
        self.as_map()?
            .get(key)
            .ok_or_else(|| NodeError::NodeNotFound(key.to_string()))
    }

    /// Optional lookup. Returns `None` for non-map nodes, absent keys and
    /// explicit `null` values.
    pub fn get_opt(&self, key: &str) -> Option<&Node> {
        match self {
            Node::Map(map) => map.get(key).filter(|n| !n.is_null()),
            _ => None,
        }
    }

    /// Optional string lookup; a present value of another type is an error.
    pub fn get_str(&self, key: &str) -> Result<Option<&str>, NodeError> {
        self.get_opt(key).map(Node::as_str).transpose()
    }

    pub fn index(&self, index: usize) -> Result<&Node, NodeError> {
        self.as_list()?
            .get(index)
            .ok_or_else(|| NodeError::NodeNotFound(format!("[{index}]")))
    }

    pub fn as_str(&self) -> Result<&str, NodeError> {
        match self {
            Node::String(s) => Ok(s),
            other => Err(other.mismatch("string")),
        }
    }

    pub fn as_bool(&self) -> Result<bool, NodeError> {
        match self {
            Node::Bool(b) => Ok(*b),
            other => Err(other.mismatch("boolean")),
        }
    }

    pub fn as_f64(&self) -> Result<f64, NodeError> {
        match self {
            Node::Integer(i) => Ok(*i as f64),
            Node::Float(f) => Ok(*f),
            other => Err(other.mismatch("number")),
        }
    }

    /// Integral value. Floats without a fractional part are accepted since
    /// JSON tokenizers may produce `8.0` for `8`.
    pub fn as_i64(&self) -> Result<i64, NodeError> {
        match self {
            Node::Integer(i) => Ok(*i),
            Node::Float(f) if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) => {
                Ok(*f as i64)
            }
            other => Err(other.mismatch("integer")),
        }
    }

    pub fn as_u64(&self) -> Result<u64, NodeError> {
        let value = self.as_i64()?;
        u64::try_from(value).map_err(|_| NodeError::TypeMismatch {
            expected: "non-negative integer",
            found: "negative integer",
        })
    }

    pub fn as_map(&self) -> Result<&IndexMap<String, Node>, NodeError> {
        match self {
            Node::Map(map) => Ok(map),
            other => Err(other.mismatch("map")),
        }
    }

    pub fn as_list(&self) -> Result<&[Node], NodeError> {
        match self {
            Node::List(list) => Ok(list),
            other => Err(other.mismatch("list")),
        }
    }

    /// Render a scalar as text, as used for enum literals.
    pub fn scalar_text(&self) -> Result<String, NodeError> {
        match self {
            Node::String(s) => Ok(s.clone()),
            Node::Integer(i) => Ok(i.to_string()),
            Node::Float(f) => Ok(f.to_string()),
            Node::Bool(b) => Ok(b.to_string()),
            other => Err(other.mismatch("scalar")),
        }
    }

    fn mismatch(&self, expected: &'static str) -> NodeError {
        NodeError::TypeMismatch {
            expected,
            found: self.kind(),
        }
    }
}

impl From<serde_json::Value> for Node {
    fn from(value: serde_json::Value) -> Self {
        use serde_json::Value;
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Integer(i),
                None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Node::String(s),
            Value::Array(items) => Node::List(items.into_iter().map(Node::from).collect()),
            Value::Object(map) => {
                Node::Map(map.into_iter().map(|(k, v)| (k, Node::from(v))).collect())
            }
        }
    }
}

impl From<serde_yaml_ng::Value> for Node {
    fn from(value: serde_yaml_ng::Value) -> Self {
        use serde_yaml_ng::Value;
        match value {
            Value::Null => Node::Null,
            Value::Bool(b) => Node::Bool(b),
            Value::Number(n) => match n.as_i64() {
                Some(i) => Node::Integer(i),
                None => Node::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Node::String(s),
            Value::Sequence(items) => Node::List(items.into_iter().map(Node::from).collect()),
            Value::Mapping(map) => Node::Map(
                map.into_iter()
                    .map(|(k, v)| (yaml_key(k), Node::from(v)))
                    .collect(),
            ),
            Value::Tagged(tagged) => Node::from(tagged.value),
        }
    }
}

/// YAML allows non-string keys such as `200:` under `responses`.
fn yaml_key(key: serde_yaml_ng::Value) -> String {
    use serde_yaml_ng::Value;
    match key {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => "null".to_string(),
        other => Node::from(other).scalar_text().unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_map_keeps_order() {
        let node = Node::from_json_str(r#"{"b": 1, "a": 2, "c": 3}"#).unwrap();
        let keys: Vec<&str> = node.as_map().unwrap().keys().map(|k| k.as_str()).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
    }

    #[test]
    fn test_yaml_numeric_keys_are_stringified() {
        let yaml = "responses:\n  200:\n    description: ok\n  500: {}\n";
        let node = Node::from_yaml_str(yaml).unwrap();
        let responses = node.get("responses").unwrap().as_map().unwrap();
        assert!(responses.contains_key("200"));
        assert!(responses.contains_key("500"));
    }

    #[test]
    fn test_get_missing_key() {
        let node = Node::from_json_str(r#"{"a": 1}"#).unwrap();
        assert_eq!(
            node.get("b"),
            Err(NodeError::NodeNotFound("b".to_string()))
        );
        assert!(node.get_opt("b").is_none());
    }

    #[test]
    fn test_get_opt_skips_null() {
        let node = Node::from_yaml_str("get:\nname: x\n").unwrap();
        assert!(node.get_opt("get").is_none());
        assert!(node.get("get").unwrap().is_null());
    }

    #[test]
    fn test_type_mismatch() {
        let node = Node::from_json_str(r#"{"a": "x"}"#).unwrap();
        let err = node.get("a").unwrap().as_i64().unwrap_err();
        assert_eq!(
            err,
            NodeError::TypeMismatch {
                expected: "integer",
                found: "string"
            }
        );
        assert!(node.get("a").unwrap().as_list().is_err());
    }

    #[test]
    fn test_integral_float_is_integer() {
        assert_eq!(Node::Float(8.0).as_i64(), Ok(8));
        assert!(Node::Float(8.5).as_i64().is_err());
        assert!(Node::Integer(-1).as_u64().is_err());
    }

    #[test]
    fn test_out_of_range_float_is_not_integer() {
        assert!(Node::Float(1e30).as_i64().is_err());
        assert!(Node::Float(-1e30).as_i64().is_err());
        assert!(Node::Float(9_223_372_036_854_775_808.0).as_i64().is_err());
        assert_eq!(Node::Float(-9_223_372_036_854_775_808.0).as_i64(), Ok(i64::MIN));
    }

    #[test]
    fn test_index() {
        let node = Node::from_json_str(r#"["foo", "bar"]"#).unwrap();
        assert_eq!(node.index(1).unwrap().as_str(), Ok("bar"));
        assert!(node.index(2).is_err());
    }

    #[test]
    fn test_invalid_json_is_reported() {
        let err = Node::from_json_str("{not json").unwrap_err();
        assert!(matches!(err, SpecError::Json(_)));
    }
}
