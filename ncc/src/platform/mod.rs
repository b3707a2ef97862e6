//! Platform identification from show command output.
//!
//! Each supported OS family has its own commands and extraction regexes
//! in [`vendors`]. A regex that fails to match leaves the field at
//! [`UNKNOWN`] rather than failing the capture.

mod metadata;
pub mod vendors;

use std::fmt;
use std::str::FromStr;

use log::info;

pub use metadata::{MetadataDocument, ModuleListFile, PlatformMetadata, Platforms};

use crate::cli::CommandRunner;
use crate::error::{PlatformError, Result};

/// Sentinel for fields that could not be extracted.
pub const UNKNOWN: &str = "unknown";

/// Supported device families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceType {
    Xr,
    Xe,
    Nxos,
}

impl DeviceType {
    /// Directory level used in the capture path.
    pub fn os_dir(self) -> &'static str {
        match self {
            DeviceType::Xr => "xr",
            DeviceType::Xe => "xe",
            DeviceType::Nxos => "nx",
        }
    }

    /// `os-type` in platform metadata.
    pub fn os_type(self) -> &'static str {
        match self {
            DeviceType::Xr => "IOS-XR",
            DeviceType::Xe => "IOS-XE",
            DeviceType::Nxos => "NX-OS",
        }
    }

    /// Inventory command run after `show version`.
    pub fn inventory_command(self) -> &'static str {
        match self {
            DeviceType::Xr => vendors::cisco_xr::INVENTORY_COMMAND,
            DeviceType::Xe => vendors::cisco_xe::INVENTORY_COMMAND,
            DeviceType::Nxos => vendors::cisco_nxos::INVENTORY_COMMAND,
        }
    }
}

impl FromStr for DeviceType {
    type Err = PlatformError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "cisco_xr" => Ok(DeviceType::Xr),
            "cisco_ios" | "cisco_xe" => Ok(DeviceType::Xe),
            "cisco_nxos" => Ok(DeviceType::Nxos),
            other => Err(PlatformError::UnknownDeviceType(other.to_string())),
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeviceType::Xr => "cisco_xr",
            DeviceType::Xe => "cisco_xe",
            DeviceType::Nxos => "cisco_nxos",
        })
    }
}

/// What was learned about the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identification {
    pub device_type: DeviceType,
    /// Platform name, e.g. `ASR-9000` or `C3850`.
    pub name: String,
    /// Software version as reported.
    pub version: String,
    pub product_ids: Vec<String>,
}

impl Identification {
    /// Extract what we can from `show version` and inventory output.
    pub fn from_output(device_type: DeviceType, show_version: &str, inventory: &str) -> Self {
        let (version, name, pid) = match device_type {
            DeviceType::Xr => (
                vendors::cisco_xr::software_version(show_version),
                vendors::cisco_xr::platform_name(show_version),
                vendors::cisco_xr::product_id(inventory),
            ),
            DeviceType::Xe => (
                vendors::cisco_xe::software_version(show_version),
                vendors::cisco_xe::platform_name(show_version),
                vendors::cisco_xe::product_id(inventory),
            ),
            DeviceType::Nxos => (
                vendors::cisco_nxos::software_version(show_version),
                vendors::cisco_nxos::platform_name(show_version),
                vendors::cisco_nxos::product_id(inventory),
            ),
        };

        Self {
            device_type,
            name: name.unwrap_or_else(|| UNKNOWN.to_string()),
            version: version.unwrap_or_else(|| UNKNOWN.to_string()),
            product_ids: pid.into_iter().collect(),
        }
    }

    /// Version as used in directory names.
    pub fn version_dir(&self) -> String {
        match self.device_type {
            DeviceType::Nxos => vendors::cisco_nxos::version_dir(&self.version),
            _ => self.version.clone(),
        }
    }

    /// `<git-path>/<os>/<version>`.
    pub fn capture_path(&self, base: &str) -> String {
        format!(
            "{}/{}/{}",
            base.trim_end_matches('/'),
            self.device_type.os_dir(),
            self.version_dir()
        )
    }

    /// Name of the capabilities file for this platform.
    pub fn capabilities_file_name(&self) -> String {
        let name: String = self
            .name
            .to_lowercase()
            .chars()
            .map(|c| if matches!(c, '/' | ':' | '\\') { '_' } else { c })
            .collect();
        format!("{}-capabilities.xml", name)
    }

    /// Platform metadata record for this device.
    pub fn metadata(&self, module_list_file: ModuleListFile) -> PlatformMetadata {
        PlatformMetadata {
            vendor: "cisco".to_string(),
            product_ids: self.product_ids.clone(),
            name: self.name.clone(),
            os_type: self.device_type.os_type().to_string(),
            software_flavor: "ALL".to_string(),
            software_version: self.version.clone(),
            module_list_file,
        }
    }
}

/// Run the show commands for `device_type` and extract platform details.
pub async fn identify<R: CommandRunner>(
    runner: &mut R,
    device_type: DeviceType,
) -> Result<Identification> {
    info!("Identifying {} device", device_type.os_type());
    let show_version = runner.run_command("show version").await?;
    let inventory = runner
        .run_command(device_type.inventory_command())
        .await?;
    let mut identification = Identification::from_output(device_type, &show_version, &inventory);

    if device_type == DeviceType::Xr && identification.product_ids.is_empty() {
        let rack = runner
            .run_command(vendors::cisco_xr::RACK_INVENTORY_COMMAND)
            .await?;
        identification
            .product_ids
            .extend(vendors::cisco_xr::rack_product_id(&rack));
    }

    info!(
        "Found {} {} version '{}'",
        identification.device_type.os_type(),
        identification.name,
        identification.version
    );
    Ok(identification)
}
