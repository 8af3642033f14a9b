//! Versioned save-file shapes and the linear migration chain between them.
//!
//! Each `vN` module holds the structs that describe the file at that version
//! and a `migrate` taking it to `vN+1`. Loading dispatches on the `v` tag,
//! checks the document against that version's shape and then migrates
//! forward to [`CURRENT_VERSION`].

pub mod v1;
pub mod v2;
pub mod v3;
pub mod v4;

use serde_json::Value;
use tracing::debug;

use crate::{Error, Result};

pub use v4::SaveFile;

pub const CURRENT_VERSION: u32 = 4;

/// A save file at whichever version it was written.
#[derive(Debug, Clone, PartialEq)]
pub enum Versioned {
    V1(v1::SaveFile),
    V2(v2::SaveFile),
    V3(v3::SaveFile),
    V4(v4::SaveFile),
}

impl Versioned {
    pub fn parse(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|err| Error::Schema(format!("save file is not valid JSON: {err}")))?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self> {
        let version = value
            .get("v")
            .and_then(Value::as_u64)
            .ok_or_else(|| Error::Schema("save file has no numeric version tag".to_string()))?;

        let parsed = match version {
            1 => serde_json::from_value(value).map(Versioned::V1),
            2 => serde_json::from_value(value).map(Versioned::V2),
            3 => serde_json::from_value(value).map(Versioned::V3),
            4 => serde_json::from_value(value).map(Versioned::V4),
            other => return Err(Error::Schema(format!("unknown save file version {other}"))),
        };
        parsed.map_err(|err| Error::Schema(format!("save file does not match version {version}: {err}")))
    }

    pub fn version(&self) -> u32 {
        match self {
            Versioned::V1(_) => 1,
            Versioned::V2(_) => 2,
            Versioned::V3(_) => 3,
            Versioned::V4(_) => 4,
        }
    }

    /// Run the remaining migrations.
    pub fn into_current(self) -> SaveFile {
        let mut file = self;
        loop {
            let from = file.version();
            file = match file {
                Versioned::V1(old) => Versioned::V2(v1::migrate(old)),
                Versioned::V2(old) => Versioned::V3(v2::migrate(old)),
                Versioned::V3(old) => Versioned::V4(v3::migrate(old)),
                Versioned::V4(current) => return current,
            };
            debug!(from, to = file.version(), "migrated save file");
        }
    }
}

/// Parse a save file of any known version and bring it up to date.
pub fn load(json: &str) -> Result<SaveFile> {
    Ok(Versioned::parse(json)?.into_current())
}
