//! Parser for the annotation service response
//!
//! Expected shape: `{ "stars": [ { "name": string, "x": number, "y": number } ] }`.
//! Coordinates may also arrive as numeric strings such as `"12.5"`.

use std::fmt;

use serde::de::{self, Deserializer, Visitor};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::types::{AnnotationRecord, AnnotationSet, ParseError};

/// Wire form of one star entry
#[derive(Debug, Deserialize)]
struct StarEntry {
    name: String,
    #[serde(deserialize_with = "coordinate")]
    x: f32,
    #[serde(deserialize_with = "coordinate")]
    y: f32,
}

/// Decodes response bodies into annotation sets
#[derive(Debug, Default, Clone, Copy)]
pub struct ResponseParser;

impl ResponseParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a response body, keeping array order
    pub fn parse(&self, body: &str) -> Result<AnnotationSet, ParseError> {
        let document: Value = serde_json::from_str(body).map_err(ParseError::Malformed)?;

        let Value::Object(mut object) = document else {
            return Err(ParseError::NotAnObject(type_name(&document)));
        };

        let stars = match object.remove("stars") {
            Some(Value::Array(stars)) => stars,
            Some(Value::Null) | None => return Err(ParseError::MissingStars),
            Some(other) => return Err(ParseError::StarsNotArray(type_name(&other))),
        };

        let records = stars
            .into_iter()
            .enumerate()
            .map(|(index, entry)| {
                let star = StarEntry::deserialize(entry)
                    .map_err(|source| ParseError::InvalidEntry { index, source })?;
                if star.name.is_empty() {
                    return Err(ParseError::EmptyLabel { index });
                }
                Ok(AnnotationRecord::new(star.name, star.x, star.y))
            })
            .collect::<Result<Vec<_>, _>>()?;

        debug!("Parsed {} star annotations", records.len());
        Ok(AnnotationSet::new(records))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Accept integer, decimal or numeric-string coordinates
fn coordinate<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    struct CoordinateVisitor;

    impl<'de> Visitor<'de> for CoordinateVisitor {
        type Value = f64;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a number or a numeric string")
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> Result<f64, E> {
            Ok(v as f64)
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> Result<f64, E> {
            Ok(v)
        }

        fn visit_str<E: de::Error>(self, v: &str) -> Result<f64, E> {
            v.trim()
                .parse::<f64>()
                .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &self))
        }
    }

    let value = deserializer.deserialize_any(CoordinateVisitor)?;
    let narrowed = value as f32;
    if !narrowed.is_finite() {
        return Err(de::Error::invalid_value(
            de::Unexpected::Float(value),
            &"a finite coordinate",
        ));
    }
    Ok(narrowed)
}
