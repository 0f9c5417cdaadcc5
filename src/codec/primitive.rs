//! The narrower value type allowed inside List/Map child records. A strict
//! subset of [`crate::codec::frame::FrameType`], grounded on the same
//! principle SpacetimeDB uses for `AlgebraicValue`'s scalar variants: the
//! element type a container holds is a subset of the types a top-level
//! frame can hold.

use crate::codec::frame::{DataFrame, FrameType};
use crate::error::{ContainerError, Error, Result};

/// A scalar value allowed as a List element or Map field value.
#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveData {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    Binary(Vec<u8>),
}

impl PrimitiveData {
    pub fn to_frame(&self) -> DataFrame {
        match self {
            PrimitiveData::Int(v) => DataFrame::int(*v),
            PrimitiveData::Float(v) => DataFrame::float(*v),
            PrimitiveData::String(v) => DataFrame::string(v.clone()),
            PrimitiveData::Bool(v) => DataFrame::bool(*v),
            PrimitiveData::Binary(v) => DataFrame::binary(v.clone()),
        }
    }

    pub fn from_frame(frame: &DataFrame) -> Result<Self> {
        Ok(match frame.frame_type() {
            FrameType::Int => PrimitiveData::Int(frame.as_int()?),
            FrameType::Float => PrimitiveData::Float(frame.as_float()?),
            FrameType::String => PrimitiveData::String(frame.as_string()?.to_owned()),
            FrameType::Bool => PrimitiveData::Bool(frame.as_bool()?),
            FrameType::Binary => PrimitiveData::Binary(frame.as_binary()?.to_vec()),
            other => {
                return Err(Error::Container(ContainerError::UnsupportedType(other.name())));
            }
        })
    }
}

impl std::fmt::Display for PrimitiveData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimitiveData::Int(v) => write!(f, "{v}"),
            PrimitiveData::Float(v) => write!(f, "{v}"),
            PrimitiveData::String(v) => write!(f, "{v}"),
            PrimitiveData::Bool(v) => write!(f, "{v}"),
            PrimitiveData::Binary(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}
