//! Call-header decoding.
//!
//! Function selection and row cardinality are not part of the row payload.
//! Clients attach them once per call as protobuf-encoded binary metadata.
//! An absent entry falls back to its default; a present but undecodable entry
//! is a [`SseError::MalformedHeader`].

use prost::Message;
use tonic::metadata::{BinaryMetadataValue, MetadataMap};

use sse_common::{Result, SseError};

use crate::v1;

/// Metadata key of the encoded [`v1::CommonRequestHeader`].
pub const COMMON_REQUEST_HEADER_KEY: &str = "qlik-commonrequestheader-bin";
/// Metadata key of the encoded [`v1::FunctionRequestHeader`].
pub const FUNCTION_REQUEST_HEADER_KEY: &str = "qlik-functionrequestheader-bin";
/// Function id reported when no function header is attached. Never a catalog entry.
pub const INVALID_FUNCTION_ID: i32 = 3;

/// Side-channel values read once at call start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallHeader {
    /// Rows the client declared it will send; 0 when undeclared.
    pub cardinality: u64,
    pub function_id: i32,
    pub app_id: String,
    pub user_id: String,
    pub version: String,
}

impl Default for CallHeader {
    fn default() -> Self {
        Self {
            cardinality: 0,
            function_id: INVALID_FUNCTION_ID,
            app_id: String::new(),
            user_id: String::new(),
            version: String::new(),
        }
    }
}

impl CallHeader {
    pub fn from_metadata(metadata: &MetadataMap) -> Result<Self> {
        let mut header = Self::default();
        if let Some(common) = decode_common(metadata)? {
            header.cardinality = cardinality_of(&common)?;
            header.app_id = common.app_id;
            header.user_id = common.user_id;
        }
        if let Some(function) =
            decode_entry::<v1::FunctionRequestHeader>(metadata, FUNCTION_REQUEST_HEADER_KEY)?
        {
            header.function_id = function.function_id;
            header.version = function.version;
        }
        Ok(header)
    }

    /// Attach this header to outgoing call metadata.
    pub fn write_to(&self, metadata: &mut MetadataMap) {
        let common = v1::CommonRequestHeader {
            app_id: self.app_id.clone(),
            user_id: self.user_id.clone(),
            cardinality: i64::try_from(self.cardinality).unwrap_or(i64::MAX),
        };
        let function = v1::FunctionRequestHeader {
            function_id: self.function_id,
            version: self.version.clone(),
        };
        metadata.insert_bin(
            COMMON_REQUEST_HEADER_KEY,
            BinaryMetadataValue::from_bytes(&common.encode_to_vec()),
        );
        metadata.insert_bin(
            FUNCTION_REQUEST_HEADER_KEY,
            BinaryMetadataValue::from_bytes(&function.encode_to_vec()),
        );
    }
}

/// Declared row cardinality, or 0 when the common header is absent.
pub fn read_cardinality(metadata: &MetadataMap) -> Result<u64> {
    match decode_common(metadata)? {
        Some(common) => cardinality_of(&common),
        None => Ok(0),
    }
}

/// Selected function id, or [`INVALID_FUNCTION_ID`] when the function header is absent.
pub fn read_function_id(metadata: &MetadataMap) -> Result<i32> {
    Ok(
        decode_entry::<v1::FunctionRequestHeader>(metadata, FUNCTION_REQUEST_HEADER_KEY)?
            .map(|h| h.function_id)
            .unwrap_or(INVALID_FUNCTION_ID),
    )
}

fn decode_common(metadata: &MetadataMap) -> Result<Option<v1::CommonRequestHeader>> {
    decode_entry(metadata, COMMON_REQUEST_HEADER_KEY)
}

fn cardinality_of(common: &v1::CommonRequestHeader) -> Result<u64> {
    u64::try_from(common.cardinality).map_err(|_| SseError::MalformedHeader {
        key: COMMON_REQUEST_HEADER_KEY,
        reason: format!("negative cardinality {}", common.cardinality),
    })
}

fn decode_entry<M>(metadata: &MetadataMap, key: &'static str) -> Result<Option<M>>
where
    M: Message + Default,
{
    let Some(value) = metadata.get_bin(key) else {
        return Ok(None);
    };
    let bytes = value.to_bytes().map_err(|e| SseError::MalformedHeader {
        key,
        reason: format!("invalid binary metadata encoding: {e}"),
    })?;
    M::decode(bytes)
        .map(Some)
        .map_err(|e| SseError::MalformedHeader {
            key,
            reason: format!("protobuf decode failed: {e}"),
        })
}
