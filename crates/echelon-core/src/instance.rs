//! Instance persistence: save and load a network configuration as JSON.
//!
//! An instance file is a versioned envelope around a [`SupplyNetwork`], so
//! the format can evolve without silently misreading old files. State
//! history is not persisted here; it is an output, reproducible from the
//! instance and a seed.

use crate::network::SupplyNetwork;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Current instance file format version.
pub const FORMAT_VERSION: u32 = 1;

/// Errors that can occur reading or writing an instance file.
#[derive(Debug, thiserror::Error)]
pub enum InstanceError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    /// The file was written by an incompatible format version.
    #[error("unsupported instance format version {found} (expected {FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },
}

#[derive(Serialize, Deserialize)]
struct InstanceFile {
    version: u32,
    network: SupplyNetwork,
}

/// Serialize a network to a JSON string.
pub fn to_json(network: &SupplyNetwork) -> Result<String, InstanceError> {
    let file = InstanceFile {
        version: FORMAT_VERSION,
        network: network.clone(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Deserialize a network from a JSON string.
pub fn from_json(json: &str) -> Result<SupplyNetwork, InstanceError> {
    let file: InstanceFile = serde_json::from_str(json)?;
    if file.version != FORMAT_VERSION {
        return Err(InstanceError::UnsupportedVersion {
            found: file.version,
        });
    }
    Ok(file.network)
}

/// Write a network to an instance file.
pub fn save_instance(network: &SupplyNetwork, path: &Path) -> Result<(), InstanceError> {
    std::fs::write(path, to_json(network)?)?;
    Ok(())
}

/// Read a network from an instance file.
pub fn load_instance(path: &Path) -> Result<SupplyNetwork, InstanceError> {
    from_json(&std::fs::read_to_string(path)?)
}
