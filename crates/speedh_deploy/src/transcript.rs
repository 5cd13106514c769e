//! # Deployment Transcript
//!
//! Append-only Markdown log of one orchestrator run, written next to the
//! tracing output rather than through it. Every write is flushed so a crash
//! mid-run leaves everything up to the failing step on disk.
//!
//! ```text
//! # Deployment Log
//!
//! - **Network**: telosTestnet
//! - **Timestamp**: 2024-05-01T12:00:00+00:00
//!
//! ## Deployer
//! ...
//! ## Deploy contracts
//! ## Set contract references
//! ## Final balance
//! ## Address book
//! ```

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use alloy_primitives::Address;
use chrono::{DateTime, Local};
use speedh_blockchain::TxReceipt;
use speedh_shared::constants::NATIVE_SYMBOL;
use speedh_shared::{BalanceDelta, NativeAmount};

use crate::error::{DeployError, DeployResult};

/// Open transcript file.
#[derive(Debug)]
pub struct Transcript {
    path: PathBuf,
    file: File,
}

impl Transcript {
    /// `deployment_<YYYYMMDD_HHMMSS>.md`.
    #[must_use]
    pub fn file_name(started: &DateTime<Local>) -> String {
        format!("deployment_{}.md", started.format("%Y%m%d_%H%M%S"))
    }

    /// Creates the transcript under `logs_dir` and writes the header.
    ///
    /// # Errors
    ///
    /// [`DeployError::Io`] if the directory or file cannot be created.
    pub fn create(logs_dir: &Path, network: &str, started: DateTime<Local>) -> DeployResult<Self> {
        fs::create_dir_all(logs_dir).map_err(|e| DeployError::io(logs_dir, e))?;
        let path = logs_dir.join(Self::file_name(&started));
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| DeployError::io(&path, e))?;

        let mut transcript = Self { path, file };
        transcript.write(&format!(
            "# Deployment Log\n\n- **Network**: {network}\n- **Timestamp**: {}\n",
            started.to_rfc3339()
        ))?;
        Ok(transcript)
    }

    /// Location on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write(&mut self, text: &str) -> DeployResult<()> {
        self.file
            .write_all(text.as_bytes())
            .and_then(|()| self.file.flush())
            .map_err(|e| DeployError::io(&self.path, e))
    }

    /// `## title`
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn section(&mut self, title: &str) -> DeployResult<()> {
        self.write(&format!("\n## {title}\n\n"))
    }

    /// `### title`
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn subsection(&mut self, title: &str) -> DeployResult<()> {
        self.write(&format!("\n### {title}\n\n"))
    }

    /// Free-form line.
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn line(&mut self, text: &str) -> DeployResult<()> {
        self.write(&format!("{text}\n"))
    }

    /// Balance reading, with the change since the previous reading if any.
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn balance(
        &mut self,
        balance: NativeAmount,
        delta: Option<BalanceDelta>,
    ) -> DeployResult<()> {
        let line = match delta {
            Some(delta) => format!(
                "> **Balance**: `{balance} {NATIVE_SYMBOL}`  (**Δ** `{delta} {NATIVE_SYMBOL}`)"
            ),
            None => format!("> **Balance**: `{balance} {NATIVE_SYMBOL}`"),
        };
        self.line(&line)
    }

    /// Successful transaction line.
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn success(&mut self, title: &str, receipt: &TxReceipt) -> DeployResult<()> {
        self.line(&format!(
            "- ✅ {title} | tx: `{}` | gasUsed: `{}`",
            receipt.hash, receipt.gas_used
        ))
    }

    /// Failed step line.
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn failure(&mut self, title: &str, message: &str) -> DeployResult<()> {
        self.line(&format!("- ❌ {title} | error: {message}"))
    }

    /// Role kept from the address book.
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn reused(&mut self, name: &str, address: Address) -> DeployResult<()> {
        self.line(&format!("- ♻️ Reusing {name} at `{}`", address.to_checksum(None)))
    }

    /// `- **name**: address` for every entry.
    ///
    /// # Errors
    ///
    /// I/O errors.
    pub fn address_listing<'a, I>(&mut self, entries: I) -> DeployResult<()>
    where
        I: IntoIterator<Item = (&'a str, Address)>,
    {
        let mut text = String::new();
        for (name, address) in entries {
            text.push_str(&format!("- **{name}**: `{}`\n", address.to_checksum(None)));
        }
        self.write(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::B256;
    use chrono::TimeZone;

    fn started() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 1, 12, 30, 5).unwrap()
    }

    #[test]
    fn test_file_name_format() {
        assert_eq!(Transcript::file_name(&started()), "deployment_20240501_123005.md");
    }

    #[test]
    fn test_sections_and_lines() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = Transcript::create(dir.path(), "telosTestnet", started()).unwrap();

        transcript.section("Deployer").unwrap();
        transcript
            .balance(NativeAmount::from_whole(600), None)
            .unwrap();
        transcript
            .balance(
                NativeAmount::from_whole(599),
                Some(NativeAmount::from_whole(599).delta_from(NativeAmount::from_whole(600))),
            )
            .unwrap();
        let receipt = TxReceipt {
            hash: B256::repeat_byte(0xab),
            success: true,
            gas_used: 48_000,
            contract_address: None,
            block_number: Some(7),
        };
        transcript.success("SpeedH_Stats.setContractHayToken(HayToken)", &receipt).unwrap();
        transcript
            .failure("SpeedH_Stats.setContractNFTHorse(NFT_Horse)", "execution reverted")
            .unwrap();

        let text = fs::read_to_string(transcript.path()).unwrap();
        assert!(text.starts_with("# Deployment Log\n\n- **Network**: telosTestnet\n"));
        assert!(text.contains("\n## Deployer\n"));
        assert!(text.contains("> **Balance**: `600.0 TLOS`\n"));
        assert!(text.contains("(**Δ** `-1.0 TLOS`)"));
        assert!(text.contains("- ✅ SpeedH_Stats.setContractHayToken(HayToken) | tx: `0xabab"));
        assert!(text.contains("gasUsed: `48000`"));
        assert!(text.contains(
            "- ❌ SpeedH_Stats.setContractNFTHorse(NFT_Horse) | error: execution reverted"
        ));
    }

    #[test]
    fn test_address_listing() {
        let dir = tempfile::tempdir().unwrap();
        let mut transcript = Transcript::create(dir.path(), "local", started()).unwrap();
        transcript
            .address_listing([("SpeedH_Stats", Address::with_last_byte(1))])
            .unwrap();

        let text = fs::read_to_string(transcript.path()).unwrap();
        assert!(text.contains("- **SpeedH_Stats**: `0x0000000000000000000000000000000000000001`"));
    }
}
