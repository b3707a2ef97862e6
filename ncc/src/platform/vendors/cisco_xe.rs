//! Cisco IOS and IOS-XE.

use std::sync::LazyLock;

use regex::Regex;

pub const INVENTORY_COMMAND: &str = "show inventory";

static VERSION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Cisco IOS XE Software, Version ([a-zA-Z0-9_.]+)").expect("static regex")
});

// Pulls "C3850" out of "WS-C3850-48P"
static NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^cisco (WS-)?([a-zA-Z0-9\-/]+?)(-[0-9][0-9A-Z]+)? \([^)]+\) processor")
        .expect("static regex")
});

pub fn software_version(show_version: &str) -> Option<String> {
    VERSION.captures(show_version).map(|c| c[1].to_string())
}

pub fn platform_name(show_version: &str) -> Option<String> {
    NAME.captures(show_version).map(|c| c[2].to_string())
}

pub fn product_id(inventory: &str) -> Option<String> {
    super::inventory_pid(inventory)
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAT3K: &str = "\
Cisco IOS XE Software, Version 16.09.01
Cisco IOS Software [Fuji], Catalyst L3 Switch Software (CAT3K_CAA-UNIVERSALK9-M), Version 16.9.1, RELEASE SOFTWARE (fc2)
Technical Support: http://www.cisco.com/techsupport

cisco WS-C3850-48P (MIPS) processor (revision AD0) with 797372K/6147K bytes of memory.
Processor board ID FOC1234X0AB
";

    const CSR: &str = "\
Cisco IOS XE Software, Version 16.08.01a
cisco CSR1000V (VXE) processor (revision VXE) with 2190795K/3075K bytes of memory.
";

    #[test]
    fn test_catalyst() {
        assert_eq!(software_version(CAT3K).as_deref(), Some("16.09.01"));
        assert_eq!(platform_name(CAT3K).as_deref(), Some("C3850"));
    }

    #[test]
    fn test_csr() {
        assert_eq!(software_version(CSR).as_deref(), Some("16.08.01a"));
        assert_eq!(platform_name(CSR).as_deref(), Some("CSR1000V"));
    }

    #[test]
    fn test_unrecognized() {
        assert!(software_version("Cisco IOS Software, Version 15.2(4)M").is_none());
        assert!(platform_name("nothing here").is_none());
    }
}
