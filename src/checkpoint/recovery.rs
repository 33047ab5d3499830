//! Status file persistence
//!
//! Provides serialization of status dumps to/from files with versioning.

use serde::{de::DeserializeOwned, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;

use super::state::{StatusDump, STATUS_VERSION};
use crate::error::CheckpointError;

/// Magic bytes marking a binary status file
const BINARY_MAGIC: &[u8; 4] = b"GTST";

/// Format for status serialization
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum StatusFormat {
    /// JSON format (human-readable, larger)
    Json,
    /// Binary format (compact, fast, bit-exact)
    #[default]
    Binary,
}

/// Write a component state to a status file
pub fn write_status<T>(
    path: impl AsRef<Path>,
    component: &str,
    payload: &T,
    format: StatusFormat,
) -> Result<(), CheckpointError>
where
    T: Serialize,
{
    let dump = StatusDump::new(component, payload);
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);

    match format {
        StatusFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &dump)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        }
        StatusFormat::Binary => {
            // Version header, then magic bytes for format identification
            writer.write_all(&STATUS_VERSION.to_le_bytes())?;
            writer.write_all(BINARY_MAGIC)?;
            bincode::serialize_into(&mut writer, &dump)
                .map_err(|e| CheckpointError::Serialization(e.to_string()))?;
        }
    }

    writer.flush()?;
    tracing::debug!(path = %path.as_ref().display(), component, ?format, "status written");
    Ok(())
}

/// Read a component state from a status file written by [`write_status`].
///
/// The format is detected from the file header.
pub fn read_status<T>(path: impl AsRef<Path>, component: &str) -> Result<T, CheckpointError>
where
    T: DeserializeOwned,
{
    let path = path.as_ref();
    if !path.exists() {
        return Err(CheckpointError::NotFound(path.display().to_string()));
    }

    let mut reader = BufReader::new(File::open(path)?);
    let mut header = [0u8; 8];
    let is_binary = match reader.read_exact(&mut header) {
        Ok(()) => &header[4..8] == BINARY_MAGIC,
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => false,
        Err(e) => return Err(e.into()),
    };

    let dump: StatusDump<T> = if is_binary {
        let version = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        if version > STATUS_VERSION {
            return Err(CheckpointError::VersionMismatch {
                expected: STATUS_VERSION,
                found: version,
            });
        }
        bincode::deserialize_from(&mut reader)
            .map_err(|e| CheckpointError::Deserialization(e.to_string()))?
    } else {
        // JSON, re-read from the start
        drop(reader);
        let reader = BufReader::new(File::open(path)?);
        serde_json::from_reader(reader)
            .map_err(|e| CheckpointError::Deserialization(e.to_string()))?
    };

    dump.into_payload(component).map_err(|e| {
        tracing::warn!(path = %path.display(), error = %e, "incompatible status dump");
        e
    })
}
