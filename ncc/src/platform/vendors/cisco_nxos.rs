//! Cisco NX-OS.

use std::sync::LazyLock;

use regex::Regex;

pub const INVENTORY_COMMAND: &str = "show inventory";

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s+NXOS: version ([0-9A-Za-z.()_]+)").expect("static regex")
});

static NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s+cisco (\S+)\s.*Chassis").expect("static regex"));

pub fn software_version(show_version: &str) -> Option<String> {
    VERSION.captures(show_version).map(|c| c[1].to_string())
}

/// `9.2(1)` becomes `9.2-1`.
pub fn version_dir(version: &str) -> String {
    version.replace(['(', ')'], "-").trim_matches('-').to_string()
}

pub fn platform_name(show_version: &str) -> Option<String> {
    NAME.captures(show_version).map(|c| c[1].to_string())
}

pub fn product_id(inventory: &str) -> Option<String> {
    super::inventory_pid(inventory)
}
