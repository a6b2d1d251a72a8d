//! Device UID extraction through OpenOCD.
//!
//! OpenOCD is asked to dump two words at the UID address; the reply line
//! looks like `0x1fff7580: 4d91ec53 e5dda7d7`. The UID is the word at
//! `address + 4` followed by the word at `address`, upper-case hex.

use std::{io, process::Stdio, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::process::Command;

/// Why a UID could not be read. Each cause has its own message.
#[derive(Debug, Error)]
pub enum DevUidError {
    /// The debugger binary could not be spawned.
    #[error("debugger tool `{tool}` not found; install OpenOCD or set devuid.openocd_bin")]
    ToolMissing {
        /// Binary that was looked up.
        tool: String,
    },
    /// The debugger ran past its deadline and was killed.
    #[error("debugger did not answer within {secs}s; check the debugger connection")]
    Timeout {
        /// Deadline in seconds.
        secs: u64,
    },
    /// The debugger ran but printed no dump for the UID address.
    #[error("no UID line for address {address:#010x} in debugger output; is a device attached?")]
    UidNotFound {
        /// Address that was dumped.
        address: u32,
    },
    /// Any other process failure.
    #[error("failed to run debugger: {0}")]
    Io(#[from] io::Error),
}

/// OpenOCD invocation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DevUidConfig {
    /// Debugger executable. Default: "openocd".
    #[serde(default = "default_openocd_bin")]
    pub openocd_bin: String,
    /// Probe interface script.
    #[serde(default = "default_interface_cfg")]
    pub interface_cfg: String,
    /// Target chip script.
    #[serde(default = "default_target_cfg")]
    pub target_cfg: String,
    /// Base address of the 64-bit unique id.
    #[serde(default = "default_uid_address")]
    pub uid_address: u32,
    /// Deadline for the whole debugger run. Default: 15.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_openocd_bin() -> String {
    "openocd".into()
}
fn default_interface_cfg() -> String {
    "interface/stlink.cfg".into()
}
fn default_target_cfg() -> String {
    "target/stm32wlx.cfg".into()
}
fn default_uid_address() -> u32 {
    0x1FFF_7580
}
fn default_timeout_secs() -> u64 {
    15
}

impl Default for DevUidConfig {
    fn default() -> Self {
        Self {
            openocd_bin: default_openocd_bin(),
            interface_cfg: default_interface_cfg(),
            target_cfg: default_target_cfg(),
            uid_address: default_uid_address(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Reads the UID of the attached device.
#[derive(Debug, Clone)]
pub struct DevUidReader {
    config: DevUidConfig,
}

impl DevUidReader {
    /// Reader using `config` for every run.
    pub fn new(config: DevUidConfig) -> Self {
        Self { config }
    }

    /// Arguments passed to the debugger binary.
    pub fn command_args(&self) -> Vec<String> {
        vec![
            "-f".into(),
            self.config.interface_cfg.clone(),
            "-f".into(),
            self.config.target_cfg.clone(),
            "-c".into(),
            "init".into(),
            "-c".into(),
            format!("mdw {:#010x} 2", self.config.uid_address),
            "-c".into(),
            "shutdown".into(),
        ]
    }

    /// Runs the debugger and parses its combined output.
    pub async fn read(&self) -> Result<String, DevUidError> {
        let tool = &self.config.openocd_bin;
        let secs = self.config.timeout_secs;
        tracing::info!(tool = %tool, address = %format!("{:#010x}", self.config.uid_address), "reading device uid");

        let child = Command::new(tool)
            .args(self.command_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|err| match err.kind() {
                io::ErrorKind::NotFound => DevUidError::ToolMissing { tool: tool.clone() },
                _ => DevUidError::Io(err),
            })?;

        let output = tokio::time::timeout(Duration::from_secs(secs), child.wait_with_output())
            .await
            .map_err(|_| DevUidError::Timeout { secs })??;

        // OpenOCD logs memory dumps on stderr; scan both streams.
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));

        let uid = parse_uid(&text, self.config.uid_address);
        match &uid {
            Ok(uid) => tracing::info!(uid = %uid, "device uid read"),
            Err(err) => tracing::warn!(status = %output.status, error = %err, "device uid not read"),
        }
        uid
    }
}

/// Extracts the 16-digit UID from a `mdw <address> 2` dump.
pub fn parse_uid(output: &str, address: u32) -> Result<String, DevUidError> {
    output
        .lines()
        .find_map(|line| uid_from_line(line.trim(), address))
        .ok_or(DevUidError::UidNotFound { address })
}

fn uid_from_line(line: &str, address: u32) -> Option<String> {
    let (addr, words) = line.split_once(':')?;
    let addr = addr.trim();
    let hex = addr
        .strip_prefix("0x")
        .or_else(|| addr.strip_prefix("0X"))?;
    if u32::from_str_radix(hex, 16).ok()? != address {
        return None;
    }

    let mut words = words.split_whitespace().filter_map(|w| {
        (w.len() == 8)
            .then(|| u32::from_str_radix(w, 16).ok())
            .flatten()
    });
    let low = words.next()?;
    let high = words.next()?;
    Some(format!("{high:08X}{low:08X}"))
}
