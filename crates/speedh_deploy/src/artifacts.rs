//! Creation code sources.
//!
//! The orchestrator never compiles anything; it reads the `bytecode` field of
//! Hardhat artifacts laid out as `<dir>/<Role>.sol/<Role>.json`, or, for dry
//! runs, asks the simulated chain for its role markers.

use std::path::{Path, PathBuf};

use alloy_primitives::{hex, Bytes};
use serde::Deserialize;
use speedh_blockchain::SimulatedChain;
use speedh_shared::ContractRole;

use crate::error::{DeployError, DeployResult};

/// Supplies the creation code of each role.
pub trait ArtifactSource: Send + Sync {
    /// Creation code (constructor included) for `role`.
    ///
    /// # Errors
    ///
    /// [`DeployError::Artifact`] if the code cannot be produced.
    fn creation_code(&self, role: ContractRole) -> DeployResult<Bytes>;
}

/// Reads compiled Hardhat artifacts from disk.
#[derive(Debug, Clone)]
pub struct HardhatArtifacts {
    root: PathBuf,
}

#[derive(Deserialize)]
struct ArtifactFile {
    bytecode: String,
}

impl HardhatArtifacts {
    /// Artifacts rooted at `root` (usually `artifacts/contracts`).
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Artifact file of `role`.
    #[must_use]
    pub fn path_for(&self, role: ContractRole) -> PathBuf {
        let name = role.name();
        self.root.join(format!("{name}.sol")).join(format!("{name}.json"))
    }

    fn fail(role: ContractRole, path: &Path, reason: impl Into<String>) -> DeployError {
        DeployError::Artifact {
            role,
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }
}

impl ArtifactSource for HardhatArtifacts {
    fn creation_code(&self, role: ContractRole) -> DeployResult<Bytes> {
        let path = self.path_for(role);
        let text =
            std::fs::read_to_string(&path).map_err(|e| Self::fail(role, &path, e.to_string()))?;
        let artifact: ArtifactFile =
            serde_json::from_str(&text).map_err(|e| Self::fail(role, &path, e.to_string()))?;

        let code = hex::decode(artifact.bytecode.trim())
            .map_err(|e| Self::fail(role, &path, format!("bytecode is not hex: {e}")))?;
        if code.is_empty() {
            return Err(Self::fail(
                role,
                &path,
                "bytecode is empty (abstract contract or interface?)",
            ));
        }
        Ok(code.into())
    }
}

/// Role markers understood by [`SimulatedChain`].
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedArtifacts;

impl ArtifactSource for SimulatedArtifacts {
    fn creation_code(&self, role: ContractRole) -> DeployResult<Bytes> {
        Ok(SimulatedChain::creation_code(role))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_artifact(root: &Path, role: ContractRole, body: &str) {
        let artifacts = HardhatArtifacts::new(root);
        let path = artifacts.path_for(role);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn test_reads_bytecode_field() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(
            dir.path(),
            ContractRole::HayToken,
            r#"{"contractName":"SpeedH_HayToken","abi":[],"bytecode":"0x6080604052"}"#,
        );

        let code = HardhatArtifacts::new(dir.path())
            .creation_code(ContractRole::HayToken)
            .unwrap();
        assert_eq!(code.as_ref(), &[0x60, 0x80, 0x60, 0x40, 0x52]);
    }

    #[test]
    fn test_artifact_layout() {
        let path = HardhatArtifacts::new("artifacts/contracts").path_for(ContractRole::Stats);
        assert_eq!(
            path,
            PathBuf::from("artifacts/contracts/SpeedH_Stats.sol/SpeedH_Stats.json")
        );
    }

    #[test]
    fn test_missing_artifact_names_role() {
        let dir = tempfile::tempdir().unwrap();
        let err = HardhatArtifacts::new(dir.path())
            .creation_code(ContractRole::NftHorse)
            .unwrap_err();
        assert!(matches!(err, DeployError::Artifact { role: ContractRole::NftHorse, .. }));
    }

    #[test]
    fn test_empty_bytecode_rejected() {
        let dir = tempfile::tempdir().unwrap();
        write_artifact(dir.path(), ContractRole::Stats, r#"{"bytecode":"0x"}"#);
        let err = HardhatArtifacts::new(dir.path())
            .creation_code(ContractRole::Stats)
            .unwrap_err();
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_simulated_markers_match_chain() {
        for role in ContractRole::ALL {
            assert_eq!(
                SimulatedArtifacts.creation_code(role).unwrap(),
                SimulatedChain::creation_code(role)
            );
        }
    }
}
