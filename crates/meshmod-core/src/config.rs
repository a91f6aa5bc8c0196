//! Module configuration records
//!
//! Every module keeps a small byte-serializable configuration record in
//! the persistent store, keyed by its module id. Records are packed
//! little-endian and their serialized length must be a multiple of 4 for
//! storage alignment. The first four bytes are a common header carrying
//! the module id, a version tag for migration, and the active flag.
//!
//! On load, the module branches on the stored version: the current
//! version parses directly, older known versions are migrated in place,
//! and anything unknown makes the module fall back to its hard-coded
//! defaults rather than operate on unmigrated data.

use crate::packet::ModuleId;
use thiserror::Error;

/// Errors raised while applying a stored configuration record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored version tag has no migration path
    #[error("unknown configuration version {0}")]
    UnknownVersion(u8),
    /// Record length does not match any known version
    #[error("configuration record of {got} bytes, expected {expected}")]
    WrongLength { got: usize, expected: usize },
    /// Record length violates the 4-byte storage alignment
    #[error("configuration record of {0} bytes is not a multiple of 4")]
    Misaligned(usize),
    /// Field name not recognized by the generic accessor
    #[error("unknown configuration field `{0}`")]
    UnknownField(String),
    /// Value cannot be parsed for the addressed field
    #[error("bad value `{value}` for field `{field}`")]
    BadValue { field: String, value: String },
}

/// Serialized size of the common header
pub const HEADER_LEN: usize = 4;

/// Common leading fields of every module configuration record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfigHeader {
    /// Owning module, doubles as the storage key
    pub module_id: ModuleId,
    /// Record layout version, bumped on incompatible changes
    pub module_version: u8,
    /// Module participates in dispatch when set
    pub module_active: bool,
}

impl ConfigHeader {
    /// Create a header for the current version of a module's record
    pub fn new(module_id: ModuleId, module_version: u8) -> Self {
        Self {
            module_id,
            module_version,
            module_active: true,
        }
    }

    /// Serialize to the 4-byte packed layout (one byte reserved)
    pub fn to_bytes(&self) -> [u8; HEADER_LEN] {
        [
            self.module_id.to_u8(),
            self.module_version,
            self.module_active as u8,
            0,
        ]
    }

    /// Parse from the leading bytes of a record
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        if bytes.len() < HEADER_LEN {
            return Err(ConfigError::WrongLength {
                got: bytes.len(),
                expected: HEADER_LEN,
            });
        }
        Ok(Self {
            module_id: ModuleId::new(bytes[0]),
            module_version: bytes[1],
            module_active: bytes[2] != 0,
        })
    }
}

/// Check the 4-byte storage alignment of a serialized record
pub fn check_alignment(bytes: &[u8]) -> Result<(), ConfigError> {
    if bytes.len() % 4 != 0 {
        return Err(ConfigError::Misaligned(bytes.len()));
    }
    Ok(())
}

/// Parse a boolean config value from its text form
///
/// Accepts the spellings the terminal surface produces.
pub fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value {
        "1" | "on" | "true" => Ok(true),
        "0" | "off" | "false" => Ok(false),
        _ => Err(ConfigError::BadValue {
            field: field.to_string(),
            value: value.to_string(),
        }),
    }
}

/// Parse a u32 config value from its text form
pub fn parse_u32(field: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse().map_err(|_| ConfigError::BadValue {
        field: field.to_string(),
        value: value.to_string(),
    })
}
