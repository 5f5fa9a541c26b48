// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use serde_json::{Map, Value};

use crate::prelude::*;

mod _core {
    pub(super) use vidshelf_core::catalog::*;
}

pub const TITLE_KEY: &str = "title";

pub const IMAGE_URL_KEY: &str = "image";

pub const STREAM_URL_KEY: &str = "stream";

///////////////////////////////////////////////////////////////////////
// Entry
///////////////////////////////////////////////////////////////////////

/// A catalog entry as represented by the source.
///
/// Extra fields are ignored when deserializing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(test, derive(PartialEq, Eq))]
pub struct Entry {
    title: String,

    #[serde(rename = "image")]
    image_url: String,

    #[serde(rename = "stream")]
    stream_url: String,
}

impl From<Entry> for _core::Entry {
    fn from(from: Entry) -> Self {
        let Entry {
            title,
            image_url,
            stream_url,
        } = from;
        Self {
            title,
            image_url,
            stream_url,
        }
    }
}

impl From<_core::Entry> for Entry {
    fn from(from: _core::Entry) -> Self {
        let _core::Entry {
            title,
            image_url,
            stream_url,
        } = from;
        Self {
            title,
            image_url,
            stream_url,
        }
    }
}

///////////////////////////////////////////////////////////////////////
// Candidate
///////////////////////////////////////////////////////////////////////

fn field_value(object: &mut Map<String, Value>, key: &str) -> _core::FieldValue {
    match object.remove(key) {
        None => _core::FieldValue::Missing,
        Some(Value::String(text)) => _core::FieldValue::Text(text),
        Some(_) => _core::FieldValue::NotText,
    }
}

/// Map an arbitrary element of the catalog array to a candidate.
///
/// Elements that are not objects result in a candidate without
/// any fields that will be rejected.
#[must_use]
pub fn candidate_from_value(value: Value) -> _core::Candidate {
    let Value::Object(mut object) = value else {
        return Default::default();
    };
    _core::Candidate {
        title: field_value(&mut object, TITLE_KEY),
        image_url: field_value(&mut object, IMAGE_URL_KEY),
        stream_url: field_value(&mut object, STREAM_URL_KEY),
    }
}

const fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Decode the response body of the catalog source.
///
/// The body must be a JSON document with an array at the top level.
/// The elements are not validated.
pub fn decode_candidates(body: &[u8]) -> Result<Vec<_core::Candidate>, _core::LoadError> {
    let document = serde_json::from_slice::<Value>(body)
        .map_err(|err| _core::LoadError::Format(err.to_string()))?;
    let Value::Array(elements) = document else {
        let kind = value_kind(&document);
        log::debug!("Expected an array at the top level instead of {kind}");
        return Err(_core::LoadError::Format(format!(
            "expected an array instead of {kind}"
        )));
    };
    Ok(elements.into_iter().map(candidate_from_value).collect())
}
