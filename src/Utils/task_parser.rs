//! parse document with structure like
//! ```text
//! title1
//! key1: value1, value2
//! key2: value with spaces
//! title2
//! key3: 1.0
//! ```
//! into `HashMap<String, HashMap<String, Option<Vec<Value>>>>`: titles, and per title the pairs
//! key - list of values. One key per line; values are separated by commas and may contain spaces
//! (so that expressions like `T1 - T10` are a single value). A key with an empty value list, or a
//! key required by a template but missing from the document, maps to `None`.
//! Lines starting with `//`, `#`, `%` or `;` are comments.
use nom::{
    IResult, Parser,
    branch::alt,
    bytes::complete::{tag, take_while1},
    character::complete::{alpha1, alphanumeric1, multispace0, space0},
    combinator::{map, map_res, recognize},
    multi::{many0, many1, separated_list0},
    sequence::{delimited, pair, separated_pair, terminated},
};
use std::collections::HashMap;
use std::fmt::Display;

pub type SectionMap = HashMap<String, Option<Vec<Value>>>;
pub type DocumentMap = HashMap<String, SectionMap>;

/// enum to represent different value types:
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Float(f64),
    Integer(i64),
    Boolean(bool),
}

impl Value {
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    pub fn as_boolean(&self) -> Option<bool> {
        if let Value::Boolean(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Float or integer as `f64`.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Integer(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn to_string_value(&self) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Float(f) => f.to_string(),
            Value::Integer(i) => i.to_string(),
            Value::Boolean(b) => b.to_string(),
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::String(s) => write!(f, "{}", s),
            Value::Float(val) => write!(f, "{}", val),
            Value::Integer(val) => write!(f, "{}", val),
            Value::Boolean(val) => write!(f, "{}", val),
        }
    }
}

fn identifier(input: &str) -> IResult<&str, String> {
    let parser = recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ));
    let mut parser = map(parser, String::from);
    parser.parse(input)
}

/// Parses a title (word characters without spaces)
fn parse_title(input: &str) -> IResult<&str, String> {
    let (input, result) = identifier(input)?;
    Ok((input.trim(), result))
}

/// Parses a key (word characters without spaces)
fn parse_key(input: &str) -> IResult<&str, String> {
    identifier(input)
}

/// A single value runs up to the next comma, semicolon or line end.
fn parse_value(input: &str) -> IResult<&str, Value> {
    let value_parser = take_while1(|c: char| !matches!(c, ',' | '\n' | '\r' | ';'));
    let mut value_parser = map_res(value_parser, |s: &str| -> Result<Value, String> {
        let s = s.trim();
        if s.is_empty() {
            return Err("empty value".to_string());
        }
        if let Ok(val) = s.parse::<i64>() {
            Ok(Value::Integer(val))
        } else if let Ok(val) = s.parse::<f64>() {
            Ok(Value::Float(val))
        } else if let Ok(val) = s.parse::<bool>() {
            Ok(Value::Boolean(val))
        } else {
            Ok(Value::String(s.to_string()))
        }
    });
    value_parser.parse(input)
}

fn parse_value_list(input: &str) -> IResult<&str, Vec<Value>> {
    let (input, _) = space0(input)?;
    let separator_coma = delimited(space0, tag(","), space0);
    let mut value_parser = separated_list0(separator_coma, parse_value);
    value_parser.parse(input)
}

/// Parses a key-value pair where value is a list
fn parse_key_value_pair(input: &str) -> IResult<&str, (String, Vec<Value>)> {
    let colon_separator = delimited(space0, tag(":"), space0);
    let mut parser = separated_pair(parse_key, colon_separator, parse_value_list);
    let (input, result) = parser.parse(input)?;
    Ok((input.trim(), result))
}

type Section = (String, Vec<(String, Vec<Value>)>);

/// Parses a section with a title and multiple key-value pairs, in document order
fn parse_section(input: &str) -> IResult<&str, Section> {
    let (input, _) = space0(input)?;
    let (input, title) = parse_title(input)?;
    let (input, _) = multispace0(input)?;
    let mut parser = many1(terminated(parse_key_value_pair, space0));
    let (input, pairs) = parser.parse(input)?;
    Ok((input, (title, pairs)))
}

/// Filters out comment lines (starting with //, #, %, or ;) and blank lines
fn filter_comments(input: &str) -> String {
    input
        .lines()
        .filter(|line| {
            let trimmed = line.trim();
            !trimmed.starts_with("//")
                && !trimmed.starts_with('#')
                && !trimmed.starts_with('%')
                && !trimmed.starts_with(';')
                && !trimmed.is_empty()
        })
        .collect::<Vec<&str>>()
        .join("\n")
}

/// Parses an already comment-free document into its sections
fn parse_document(input: &str) -> IResult<&str, Vec<Section>> {
    many1(delimited(space0, parse_section, multispace0)).parse(input)
}

/// Collects sections into a map; a title or a key within one section may appear only once.
fn collect_document(sections: Vec<Section>) -> Result<DocumentMap, String> {
    let mut result = DocumentMap::new();
    for (title, pairs) in sections {
        let mut title_map = SectionMap::new();
        for (key, values) in pairs {
            let values = if values.is_empty() { None } else { Some(values) };
            if title_map.insert(key.clone(), values).is_some() {
                return Err(format!("key '{}' repeated in section '{}'", key, title));
            }
        }
        if result.contains_key(&title) {
            return Err(format!("section '{}' repeated", title));
        }
        result.insert(title, title_map);
    }
    Ok(result)
}

/// Parses a document, skipping comments; with a template, every title and key of the template
/// is guaranteed to exist in the result (missing keys map to `None`).
pub fn parse_document_as(input: &str, template: Option<DocumentMap>) -> Result<DocumentMap, String> {
    let filtered = filter_comments(input);
    let mut parsed = match parse_document(&filtered) {
        Ok((remaining, sections)) => {
            if !remaining.trim().is_empty() {
                return Err(format!(
                    "Failed to parse entire document. Remaining: '{}'",
                    remaining
                ));
            }
            collect_document(sections)?
        }
        Err(e) => return Err(format!("Parsing error: {:?}", e)),
    };
    if let Some(template) = template {
        for (title, keys_map) in template {
            let section_map = parsed.entry(title).or_default();
            for key in keys_map.into_keys() {
                section_map.entry(key).or_insert(None);
            }
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_title_and_key() {
        let (remaining, title) = parse_title("title_1\n key1: value1").unwrap();
        assert_eq!(title, "title_1");
        assert_eq!(remaining, "key1: value1");

        let (remaining, key) = parse_key("T10: 130").unwrap();
        assert_eq!(key, "T10");
        assert_eq!(remaining, ": 130");
        assert!(parse_key("1abc: 2").is_err());
    }

    #[test]
    fn test_parse_value() {
        let (remaining, value) = parse_value("value1, value2").unwrap();
        assert_eq!(value, Value::String("value1".to_string()));
        assert_eq!(remaining, ", value2");

        let (_, value) = parse_value("123, next").unwrap();
        assert_eq!(value, Value::Integer(123));
        let (_, value) = parse_value("1e-10\n").unwrap();
        assert_eq!(value, Value::Float(1e-10));
        let (_, value) = parse_value("true").unwrap();
        assert_eq!(value, Value::Boolean(true));

        // expressions keep their inner spaces
        let (remaining, value) = parse_value("-(T1 - T2)*U \nnext: 1").unwrap();
        assert_eq!(value, Value::String("-(T1 - T2)*U".to_string()));
        assert_eq!(remaining, "\nnext: 1");
    }

    #[test]
    fn test_parse_value_list() {
        let (remaining, values) = parse_value_list("T1 - T10, 123, 45.67, true").unwrap();
        assert_eq!(
            values,
            vec![
                Value::String("T1 - T10".to_string()),
                Value::Integer(123),
                Value::Float(45.67),
                Value::Boolean(true)
            ]
        );
        assert_eq!(remaining, "");

        let (remaining, values) = parse_value_list("").unwrap();
        assert_eq!(values, Vec::<Value>::new());
        assert_eq!(remaining, "");
    }

    #[test]
    fn test_parse_key_value_pair() {
        let (remaining, (key, values)) = parse_key_value_pair("domain : 0, 5\nkind: x").unwrap();
        assert_eq!(key, "domain");
        assert_eq!(values, vec![Value::Integer(0), Value::Integer(5)]);
        assert_eq!(remaining, "kind: x");

        let (remaining, (key, values)) = parse_key_value_pair("lower: T1 - T10;").unwrap();
        assert_eq!(key, "lower");
        assert_eq!(values, vec![Value::String("T1 - T10".to_string())]);
        assert_eq!(remaining, ";");

        // an empty list does not swallow the next line
        let (remaining, (_, values)) = parse_key_value_pair("key1:\nkey2: 1").unwrap();
        assert!(values.is_empty());
        assert_eq!(remaining, "key2: 1");
    }

    #[test]
    fn test_parse_section() {
        let input = "rhs\nT1: -(T1 - T2)*U\nT2: -0.5*(T1 - T2)*U\nparameters\nU: 1";
        let (remaining, (title, pairs)) = parse_section(input).unwrap();
        assert_eq!(title, "rhs");
        assert_eq!(pairs.len(), 2);
        assert_eq!(pairs[1].0, "T2");
        assert_eq!(
            pairs[1].1,
            vec![Value::String("-0.5*(T1 - T2)*U".to_string())]
        );
        assert_eq!(remaining, "parameters\nU: 1");
    }

    #[test]
    fn test_parse_document_with_comments() {
        let input = "
        // heat exchanger
        model
        independent_var: A
        dependent_vars: T1, T2
        # constants
        parameters
        U: 1.0
        T10: 130
        empty:
        ";
        let doc = parse_document_as(input, None).unwrap();
        assert_eq!(doc.len(), 2);
        assert_eq!(
            doc["model"]["dependent_vars"],
            Some(vec![
                Value::String("T1".to_string()),
                Value::String("T2".to_string())
            ])
        );
        assert_eq!(doc["parameters"]["U"], Some(vec![Value::Float(1.0)]));
        assert_eq!(doc["parameters"]["T10"].as_ref().unwrap()[0].as_number(), Some(130.0));
        assert_eq!(doc["parameters"]["empty"], None);
    }

    #[test]
    fn test_template_fills_missing_keys() {
        let template = HashMap::from([(
            "solver_settings".to_string(),
            HashMap::from([("ftol".to_string(), None), ("xtol".to_string(), None)]),
        )]);
        let doc = parse_document_as("solver_settings\nftol: 1e-8\n", Some(template)).unwrap();
        assert_eq!(doc["solver_settings"]["ftol"], Some(vec![Value::Float(1e-8)]));
        assert_eq!(doc["solver_settings"]["xtol"], None);
    }

    #[test]
    fn test_malformed_document() {
        assert!(parse_document_as("", None).is_err());
        assert!(parse_document_as("model\nno colon here\n", None).is_err());
    }

    #[test]
    fn test_repeated_section_or_key_is_rejected() {
        let input = "rhs\ny: -y\nparameters\nk: 1\nrhs\nz: y\n";
        let err = parse_document_as(input, None).unwrap_err();
        assert!(err.contains("section 'rhs' repeated"));
        let err = parse_document_as("parameters\nk: 1\nk: 2\n", None).unwrap_err();
        assert!(err.contains("key 'k' repeated"));
    }
}
