//! Serde support for optional maps embedded in other documents.
//!
//! Use with `#[serde(default, with = "source_map::serde_map")]` on an
//! `Option<SourceMap>` field. The map travels as a JSON object.

use serde::de::Error as _;
use serde::ser::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use sourcemap::SourceMap;

use crate::SourceMapExt;

pub fn serialize<S>(map: &Option<SourceMap>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let value = match map {
        Some(map) => {
            let json = map.to_json().map_err(S::Error::custom)?;
            Some(serde_json::from_str::<Value>(&json).map_err(S::Error::custom)?)
        }
        None => None,
    };
    value.serialize(serializer)
}

pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<SourceMap>, D::Error>
where
    D: Deserializer<'de>,
{
    // Compilers may send the map as an object or as a JSON string.
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(json)) => crate::parse_map(&json).map(Some).map_err(D::Error::custom),
        Some(value) => {
            let json = serde_json::to_vec(&value).map_err(D::Error::custom)?;
            SourceMap::from_slice(&json).map(Some).map_err(D::Error::custom)
        }
    }
}
