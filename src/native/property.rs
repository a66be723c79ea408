/*!
 * Property Conversion
 *
 * Reads a native property and converts it to a typed value, dispatching on
 * the type tag the native library reports for the handle.
 */

use super::api::NativeApi;
use super::constants::*;
use crate::core::errors::{VixError, VixResult};
use crate::core::types::{NativeHandle, PropertyId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Native property type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PropertyType {
    Any,
    Integer,
    String,
    Bool,
    Handle,
    Int64,
    Blob,
    Unknown(i32),
}

impl From<i32> for PropertyType {
    fn from(tag: i32) -> Self {
        match tag {
            VIX_PROPERTYTYPE_ANY => PropertyType::Any,
            VIX_PROPERTYTYPE_INTEGER => PropertyType::Integer,
            VIX_PROPERTYTYPE_STRING => PropertyType::String,
            VIX_PROPERTYTYPE_BOOL => PropertyType::Bool,
            VIX_PROPERTYTYPE_HANDLE => PropertyType::Handle,
            VIX_PROPERTYTYPE_INT64 => PropertyType::Int64,
            VIX_PROPERTYTYPE_BLOB => PropertyType::Blob,
            other => PropertyType::Unknown(other),
        }
    }
}

impl PropertyType {
    pub fn tag(self) -> i32 {
        match self {
            PropertyType::Any => VIX_PROPERTYTYPE_ANY,
            PropertyType::Integer => VIX_PROPERTYTYPE_INTEGER,
            PropertyType::String => VIX_PROPERTYTYPE_STRING,
            PropertyType::Bool => VIX_PROPERTYTYPE_BOOL,
            PropertyType::Handle => VIX_PROPERTYTYPE_HANDLE,
            PropertyType::Int64 => VIX_PROPERTYTYPE_INT64,
            PropertyType::Blob => VIX_PROPERTYTYPE_BLOB,
            PropertyType::Unknown(tag) => tag,
        }
    }
}

/// Converted property value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    String(String),
    Int(i32),
    Int64(i64),
    Bool(bool),
}

impl PropertyValue {
    pub fn property_type(&self) -> PropertyType {
        match self {
            PropertyValue::String(_) => PropertyType::String,
            PropertyValue::Int(_) => PropertyType::Integer,
            PropertyValue::Int64(_) => PropertyType::Int64,
            PropertyValue::Bool(_) => PropertyType::Bool,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer value widened to 64 bits
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int(v) => Some(i64::from(*v)),
            PropertyValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn into_string(self) -> Option<String> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::String(s) => f.write_str(s),
            PropertyValue::Int(v) => write!(f, "{}", v),
            PropertyValue::Int64(v) => write!(f, "{}", v),
            PropertyValue::Bool(v) => write!(f, "{}", v),
        }
    }
}

/// Read property `id` from `handle` and convert it
///
/// Native failures are translated; a type tag with no conversion is an
/// internal error.
pub fn extract_property(
    api: &dyn NativeApi,
    handle: NativeHandle,
    id: PropertyId,
) -> VixResult<PropertyValue> {
    let value = match PropertyType::from(api.property_type(handle, id)?) {
        PropertyType::String => PropertyValue::String(api.string_property(handle, id)?),
        PropertyType::Integer => PropertyValue::Int(api.int_property(handle, id)?),
        PropertyType::Int64 => PropertyValue::Int64(api.int64_property(handle, id)?),
        PropertyType::Bool => PropertyValue::Bool(api.bool_property(handle, id)?),
        other => {
            return Err(VixError::internal(format!(
                "unable to extract this property type ({:?}, property {})",
                other, id
            )))
        }
    };
    Ok(value)
}

/// Properties are read-only through this API
pub fn set_property(id: PropertyId, _value: &PropertyValue) -> VixResult<()> {
    Err(VixError::internal(format!(
        "property {} cannot be set: property writes are not supported",
        id
    )))
}
