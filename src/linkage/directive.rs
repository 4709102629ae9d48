//! Linkage directive grammar
//!
//! `contract:slot=target` for `link` and `struct_link`, `contract:number`
//! for `address`. None of the three parts may contain `:`, `=` or
//! whitespace. Numbers are decimal or `0x` hex and are compared in
//! canonical form, so `0x1`, `0x01` and `1` name the same slot.

use serde::Serialize;
use std::fmt;

use crate::error::ConfError;

const LINK_FORM: &str = "contractA:slot=contractB or contractA:slot=<number>";
const ADDRESS_FORM: &str = "contract:<number>";

/// A slot, by field name or by canonical number
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(untagged)]
pub enum SlotId {
    Number(String),
    Name(String),
}

impl SlotId {
    fn parse(raw: &str) -> Self {
        match canonical_number(raw) {
            Some(n) => SlotId::Number(n),
            None => SlotId::Name(raw.to_string()),
        }
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotId::Number(n) | SlotId::Name(n) => f.write_str(n),
        }
    }
}

/// What a slot is linked to
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    Contract(String),
    /// Canonical hex constant
    Constant(String),
}

impl fmt::Display for LinkTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkTarget::Contract(c) | LinkTarget::Constant(c) => f.write_str(c),
        }
    }
}

/// One parsed `contract:slot=target` directive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkDirective {
    pub contract: String,
    pub slot: SlotId,
    pub target: LinkTarget,
    /// Directive as written
    pub raw: String,
}

/// Parse a `link` or `struct_link` entry
pub fn parse_link(attr: &str, raw: &str) -> Result<LinkDirective, ConfError> {
    let syntax = || ConfError::LinkSyntax {
        attr: attr.to_string(),
        directive: raw.to_string(),
        expected: LINK_FORM.to_string(),
    };

    let (contract, rest) = raw.split_once(':').ok_or_else(syntax)?;
    let (slot, target) = rest.split_once('=').ok_or_else(syntax)?;
    if ![contract, slot, target].iter().all(|part| is_atom(part)) {
        return Err(syntax());
    }

    let target = match canonical_number(target) {
        Some(n) => LinkTarget::Constant(n),
        None => LinkTarget::Contract(target.to_string()),
    };

    Ok(LinkDirective {
        contract: contract.to_string(),
        slot: SlotId::parse(slot),
        target,
        raw: raw.to_string(),
    })
}

/// Parse an `address` entry into contract and canonical address
pub fn parse_address(raw: &str) -> Result<(String, String), ConfError> {
    let syntax = || ConfError::LinkSyntax {
        attr: "address".to_string(),
        directive: raw.to_string(),
        expected: ADDRESS_FORM.to_string(),
    };

    let (contract, number) = raw.split_once(':').ok_or_else(syntax)?;
    if !is_atom(contract) || !is_atom(number) {
        return Err(syntax());
    }
    let address = canonical_number(number).ok_or_else(syntax)?;
    Ok((contract.to_string(), address))
}

fn is_atom(part: &str) -> bool {
    !part.is_empty() && !part.contains(|c: char| c == ':' || c == '=' || c.is_whitespace())
}

/// Canonical lowercase hex of a decimal or `0x` literal, `None` if not a number
pub fn canonical_number(raw: &str) -> Option<String> {
    let digits = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => {
            if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            hex.to_ascii_lowercase()
        }
        None => {
            if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            decimal_to_hex(raw)
        }
    };

    let trimmed = digits.trim_start_matches('0');
    Some(format!("0x{}", if trimmed.is_empty() { "0" } else { trimmed }))
}

/// Arbitrary-width decimal to hex by repeated division
fn decimal_to_hex(decimal: &str) -> String {
    if let Ok(n) = decimal.parse::<u128>() {
        return format!("{:x}", n);
    }

    let mut digits: Vec<u32> = decimal.bytes().map(|b| u32::from(b - b'0')).collect();
    let mut hex = Vec::new();
    while digits.iter().any(|&d| d != 0) {
        let mut remainder = 0;
        for digit in digits.iter_mut() {
            let acc = remainder * 10 + *digit;
            *digit = acc / 16;
            remainder = acc % 16;
        }
        hex.push(std::char::from_digit(remainder, 16).unwrap_or('0'));
    }
    hex.iter().rev().collect()
}
