//! Top-level port lists as reported by yosys `portlist`.
//!
//! Yosys reports a bus as one line with a bit range, while constraint files
//! bind every bit separately. [`PortDecl::scalar_names`] bridges the two.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::LazyLock;

static PORT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(input|output|inout) \[([0-9]+):([0-9]+)\] ([^\n]+)").unwrap()
});

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PortDirection {
    Input,
    Output,
    Inout,
}

/// One port declaration, e.g. `output [5:0] led`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PortDecl {
    pub direction: PortDirection,
    pub name: String,
    pub width: u32,
}

impl PortDecl {
    /// Parse one line of `portlist` output.
    pub fn parse(line: &str) -> Option<Self> {
        let caps = PORT_LINE.captures(line)?;
        let direction = match &caps[1] {
            "input" => PortDirection::Input,
            "output" => PortDirection::Output,
            _ => PortDirection::Inout,
        };
        let msb: u32 = caps[2].parse().ok()?;
        let lsb: u32 = caps[3].parse().ok()?;
        Some(Self {
            direction,
            name: caps[4].trim().to_string(),
            width: msb.abs_diff(lsb) + 1,
        })
    }

    /// One name per bit: the bare name for 1-bit ports, `name[i]` otherwise.
    ///
    /// Bits are numbered from zero whatever the declared range.
    pub fn scalar_names(&self) -> Vec<String> {
        if self.width == 1 {
            vec![self.name.clone()]
        } else {
            (0..self.width)
                .map(|i| format!("{}[{}]", self.name, i))
                .collect()
        }
    }
}

/// Ports from `ports` that `constrained` doesn't mention, in port order.
pub fn missing_ports(ports: &[String], constrained: &[String]) -> Vec<String> {
    let known: HashSet<&str> = constrained.iter().map(String::as_str).collect();
    ports
        .iter()
        .filter(|p| !known.contains(p.as_str()))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bus_port() {
        let port = PortDecl::parse("  output [5:0] led").unwrap();
        assert_eq!(port.direction, PortDirection::Output);
        assert_eq!(port.name, "led");
        assert_eq!(port.width, 6);
    }

    #[test]
    fn test_parse_rejects_other_lines() {
        assert!(PortDecl::parse("module top").is_none());
        assert!(PortDecl::parse("2. Executing PORTLIST pass.").is_none());
    }

    #[test]
    fn test_ascending_range_expands_to_eight_names() {
        let port = PortDecl::parse("input [0:7] data").unwrap();
        let names = port.scalar_names();
        assert_eq!(names.len(), 8);
        assert_eq!(names.first().map(String::as_str), Some("data[0]"));
        assert_eq!(names.last().map(String::as_str), Some("data[7]"));
    }

    #[test]
    fn test_single_bit_port_has_bare_name() {
        let port = PortDecl::parse("input [0:0] clk").unwrap();
        assert_eq!(port.scalar_names(), vec!["clk".to_string()]);
    }

    #[test]
    fn test_offset_range_still_numbers_from_zero() {
        let port = PortDecl::parse("inout [8:5] gpio").unwrap();
        assert_eq!(
            port.scalar_names(),
            vec!["gpio[0]", "gpio[1]", "gpio[2]", "gpio[3]"]
        );
    }

    #[test]
    fn test_missing_ports_keeps_port_order() {
        let ports = vec!["rst".to_string(), "led".to_string(), "clk".to_string()];
        let constrained = vec!["led".to_string()];
        assert_eq!(missing_ports(&ports, &constrained), vec!["rst", "clk"]);
    }
}
