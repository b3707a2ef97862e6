//! Cisco IOS-XR.

use std::sync::LazyLock;

use regex::Regex;

/// Inventory command; the chassis entry comes first.
pub const INVENTORY_COMMAND: &str = "show inventory all | begin Chassis";

/// Fallback for systems whose inventory has no `PID:` lines.
pub const RACK_INVENTORY_COMMAND: &str = "show inventory rack";

static VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Version +:? *([0-9.A-Z]+)").expect("static regex"));

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^cisco ([^(]+)\(").expect("static regex"));

static RACK_PID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s+ 0\s+(\S+)").expect("static regex"));

pub fn software_version(show_version: &str) -> Option<String> {
    VERSION.captures(show_version).map(|c| c[1].to_string())
}

/// Platform name with "Series" dropped and spaces turned into dashes.
pub fn platform_name(show_version: &str) -> Option<String> {
    NAME.captures(show_version)
        .map(|c| c[1].replace("Series", "").trim().replace(' ', "-"))
        .filter(|n| !n.is_empty())
}

pub fn product_id(inventory: &str) -> Option<String> {
    super::inventory_pid(inventory)
}

/// Chassis PID from `show inventory rack`.
pub fn rack_product_id(rack_inventory: &str) -> Option<String> {
    RACK_PID.captures(rack_inventory).map(|c| c[1].to_string())
}
