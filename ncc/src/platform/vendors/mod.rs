//! Per-family show command parsing.

pub mod cisco_nxos;
pub mod cisco_xe;
pub mod cisco_xr;

use std::sync::LazyLock;

use regex::Regex;

/// `PID: <pid>,` as printed by `show inventory` on all three families.
static INVENTORY_PID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"PID: ([^,]+),").expect("static regex"));

/// First product id in `show inventory` output.
pub(crate) fn inventory_pid(inventory: &str) -> Option<String> {
    INVENTORY_PID
        .captures(inventory)
        .map(|c| c[1].trim().to_string())
        .filter(|pid| !pid.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inventory_pid() {
        let inventory = r#"NAME: "Chassis", DESCR: "Cisco ISR4451 Chassis"
PID: ISR4451-X/K9      , VID: V04  , SN: FGL123456
"#;
        assert_eq!(inventory_pid(inventory).as_deref(), Some("ISR4451-X/K9"));
        assert!(inventory_pid("nothing").is_none());
    }
}
