//! Raw table records and the load-time validator.
//!
//! A raw table is the channel list exactly as it appears in the model file:
//! stringly-typed width and direction literals, optional byte-order flag,
//! optional unit/scale pair. [`load`] checks every rule in one pass and
//! either returns a fully validated [`RegisterMap`] or the complete list of
//! violations, never a partial map.

use crate::map::{
    BitWidth,
    Channel,
    Direction,
    Overlap,
    Register,
    RegisterMap,
    Scaling,
};
use kstring::KString;
use serde::{
    Deserialize,
    Serialize,
};
use std::collections::HashSet;
use thiserror::Error;
use tracing::{
    debug,
    warn,
};

/// One unvalidated register record, in the shape of the source model file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawRegister {
    pub name: String,
    pub desc: String,
    pub start_address: i64,
    /// Width literal, e.g. `"24B"` (bits, despite the suffix)
    pub data_size: String,
    /// Direction literal, one of `"RD"`, `"WR"`, `"RW"` (any case)
    pub direction: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<f64>,
}

/// One unvalidated channel record, in the shape of the source model file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawChannel {
    pub label: String,
    pub mux_idx: i64,
    pub channel: i64,
    pub i2c_addr: i64,
    /// Absent in the older table revision; defaults to MSB-first
    #[serde(rename = "isMsbFirst", default, skip_serializing_if = "Option::is_none")]
    pub is_msb_first: Option<bool>,
    pub functions: Vec<RawRegister>,
}

/// A single schema rule violation, naming the offending channel/register
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SchemaViolation {
    #[error("channel at position {position} has an empty label")]
    EmptyLabel { position: usize },
    #[error("duplicate channel label {label:?}")]
    DuplicateChannel { label: String },
    #[error("channel {channel:?}: mux_idx {value} out of range")]
    MuxIdxOutOfRange { channel: String, value: i64 },
    #[error("channel {channel:?}: mux channel {value} out of range")]
    MuxChannelOutOfRange { channel: String, value: i64 },
    #[error("channel {channel:?}: i2c_addr {value:#x} outside the 7-bit range")]
    I2cAddrOutOfRange { channel: String, value: i64 },
    #[error("register {register:?} in {channel:?}: start_address {value} out of range")]
    StartAddressOutOfRange {
        channel: String,
        register: String,
        value: i64,
    },
    #[error("register {register:?} in {channel:?}: unsupported data size {literal:?}")]
    UnsupportedDataSize {
        channel: String,
        register: String,
        literal: String,
    },
    #[error("register {register:?} in {channel:?}: unknown direction {literal:?}")]
    UnknownDirection {
        channel: String,
        register: String,
        literal: String,
    },
    #[error("duplicate register name {register:?} in channel {channel:?}")]
    DuplicateRegister { channel: String, register: String },
    #[error("register {register:?} in {channel:?} has a unit but no scale")]
    UnitWithoutScale { channel: String, register: String },
    #[error("register {register:?} in {channel:?} has a scale but no unit")]
    ScaleWithoutUnit { channel: String, register: String },
    #[error("register {register:?} in {channel:?}: scale {scale} is not positive and finite")]
    BadScale {
        channel: String,
        register: String,
        scale: f64,
    },
}

/// Every violation found in one load pass
#[derive(Debug, Error, Clone, PartialEq)]
#[error("register map rejected with {} schema violation(s)", .0.len())]
pub struct SchemaErrors(pub Vec<SchemaViolation>);

fn validate_register(
    channel: &str,
    raw: &RawRegister,
    violations: &mut Vec<SchemaViolation>,
) -> Option<Register> {
    let mut ok = true;

    let start_address = match u16::try_from(raw.start_address) {
        Ok(addr) => addr,
        Err(_) => {
            violations.push(SchemaViolation::StartAddressOutOfRange {
                channel: channel.to_string(),
                register: raw.name.clone(),
                value: raw.start_address,
            });
            ok = false;
            0
        }
    };

    let width = match BitWidth::from_literal(&raw.data_size) {
        Some(width) => width,
        None => {
            violations.push(SchemaViolation::UnsupportedDataSize {
                channel: channel.to_string(),
                register: raw.name.clone(),
                literal: raw.data_size.clone(),
            });
            ok = false;
            BitWidth::Eight
        }
    };

    let direction = match Direction::from_literal(&raw.direction) {
        Some(direction) => direction,
        None => {
            violations.push(SchemaViolation::UnknownDirection {
                channel: channel.to_string(),
                register: raw.name.clone(),
                literal: raw.direction.clone(),
            });
            ok = false;
            Direction::ReadOnly
        }
    };

    let scaling = match (&raw.unit, raw.scale) {
        (Some(unit), Some(scale)) => {
            if scale.is_finite() && scale > 0.0 {
                Some(Scaling {
                    unit: KString::from_ref(unit),
                    factor: scale,
                })
            } else {
                violations.push(SchemaViolation::BadScale {
                    channel: channel.to_string(),
                    register: raw.name.clone(),
                    scale,
                });
                ok = false;
                None
            }
        }
        (Some(_), None) => {
            violations.push(SchemaViolation::UnitWithoutScale {
                channel: channel.to_string(),
                register: raw.name.clone(),
            });
            ok = false;
            None
        }
        (None, Some(_)) => {
            violations.push(SchemaViolation::ScaleWithoutUnit {
                channel: channel.to_string(),
                register: raw.name.clone(),
            });
            ok = false;
            None
        }
        (None, None) => None,
    };

    ok.then(|| Register {
        name: KString::from_ref(&raw.name),
        desc: raw.desc.clone(),
        start_address,
        width,
        direction,
        scaling,
    })
}

fn flag_overlaps(label: &KString, registers: &[Register], overlaps: &mut Vec<Overlap>) {
    for (i, a) in registers.iter().enumerate() {
        for b in &registers[i + 1..] {
            let a_span = a.span();
            let b_span = b.span();
            if a_span.start < b_span.end && b_span.start < a_span.end {
                let address = a.start_address.max(b.start_address);
                warn!(
                    channel = %label,
                    first = %a.name,
                    second = %b.name,
                    address,
                    "register byte spans overlap"
                );
                overlaps.push(Overlap {
                    channel: label.clone(),
                    first: a.name.clone(),
                    second: b.name.clone(),
                    address,
                });
            }
        }
    }
}

/// Validates a raw channel table into an immutable [`RegisterMap`].
///
/// All rules are checked in one pass and every violation found is reported
/// together. Byte-span overlaps within a channel are not violations: the
/// source tables contain an intentional alias, so overlapping pairs are
/// logged and collected on the returned map instead.
///
/// # Errors
/// Returns [`SchemaErrors`] listing every violation; no partial map is ever
/// produced.
pub fn load(raw: Vec<RawChannel>) -> Result<RegisterMap, SchemaErrors> {
    let mut violations = Vec::new();
    let mut channels = Vec::with_capacity(raw.len());
    let mut overlaps = Vec::new();
    let mut seen_labels = HashSet::new();

    for (position, raw_channel) in raw.into_iter().enumerate() {
        let mut ok = true;

        if raw_channel.label.is_empty() {
            violations.push(SchemaViolation::EmptyLabel { position });
            ok = false;
        } else if !seen_labels.insert(raw_channel.label.to_ascii_uppercase()) {
            violations.push(SchemaViolation::DuplicateChannel {
                label: raw_channel.label.clone(),
            });
            ok = false;
        }

        let mux_idx = match u8::try_from(raw_channel.mux_idx) {
            Ok(v) => v,
            Err(_) => {
                violations.push(SchemaViolation::MuxIdxOutOfRange {
                    channel: raw_channel.label.clone(),
                    value: raw_channel.mux_idx,
                });
                ok = false;
                0
            }
        };

        let channel = match u8::try_from(raw_channel.channel) {
            Ok(v) => v,
            Err(_) => {
                violations.push(SchemaViolation::MuxChannelOutOfRange {
                    channel: raw_channel.label.clone(),
                    value: raw_channel.channel,
                });
                ok = false;
                0
            }
        };

        let i2c_addr = match u8::try_from(raw_channel.i2c_addr) {
            Ok(v) if v <= 0x7F => v,
            _ => {
                violations.push(SchemaViolation::I2cAddrOutOfRange {
                    channel: raw_channel.label.clone(),
                    value: raw_channel.i2c_addr,
                });
                ok = false;
                0
            }
        };

        let mut registers = Vec::with_capacity(raw_channel.functions.len());
        let mut seen_names = HashSet::new();
        for raw_register in &raw_channel.functions {
            if !seen_names.insert(raw_register.name.to_ascii_uppercase()) {
                violations.push(SchemaViolation::DuplicateRegister {
                    channel: raw_channel.label.clone(),
                    register: raw_register.name.clone(),
                });
                ok = false;
                continue;
            }
            match validate_register(&raw_channel.label, raw_register, &mut violations) {
                Some(register) => registers.push(register),
                None => ok = false,
            }
        }

        if ok {
            let label = KString::from_ref(&raw_channel.label);
            flag_overlaps(&label, &registers, &mut overlaps);
            channels.push(Channel::new(
                label,
                mux_idx,
                channel,
                i2c_addr,
                raw_channel.is_msb_first.unwrap_or(true),
                registers,
            ));
        }
    }

    if violations.is_empty() {
        debug!(
            channels = channels.len(),
            flagged_overlaps = overlaps.len(),
            "register map loaded"
        );
        Ok(RegisterMap::new(channels, overlaps))
    } else {
        Err(SchemaErrors(violations))
    }
}

/// Converts a validated map back to raw records with canonical literals.
///
/// Loading the result yields an equal map, which makes this the interchange
/// path for external tooling.
#[must_use]
pub fn to_raw(map: &RegisterMap) -> Vec<RawChannel> {
    map.channels()
        .iter()
        .map(|channel| RawChannel {
            label: channel.label().to_string(),
            mux_idx: i64::from(channel.mux_idx()),
            channel: i64::from(channel.channel()),
            i2c_addr: i64::from(channel.i2c_addr()),
            is_msb_first: Some(channel.msb_first()),
            functions: channel
                .registers()
                .iter()
                .map(|register| RawRegister {
                    name: register.name.to_string(),
                    desc: register.desc.clone(),
                    start_address: i64::from(register.start_address),
                    data_size: register.width.literal().to_string(),
                    direction: register.direction.literal().to_string(),
                    unit: register
                        .scaling
                        .as_ref()
                        .map(|s| s.unit.to_string()),
                    scale: register.scaling.as_ref().map(|s| s.factor),
                })
                .collect(),
        })
        .collect()
}

/// Serializes a validated map to JSON in the raw record shape.
///
/// # Errors
/// Returns a [`serde_json::Error`] on serialization failure.
pub fn to_json(map: &RegisterMap) -> serde_json::Result<String> {
    serde_json::to_string_pretty(&to_raw(map))
}

/// Parses raw records from JSON. The result still has to pass [`load`].
///
/// # Errors
/// Returns a [`serde_json::Error`] on malformed JSON.
pub fn from_json(json: &str) -> serde_json::Result<Vec<RawChannel>> {
    serde_json::from_str(json)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin;
    use crate::map::LookupError;

    fn raw_register(name: &str, start_address: i64, data_size: &str) -> RawRegister {
        RawRegister {
            name: name.to_string(),
            desc: name.to_string(),
            start_address,
            data_size: data_size.to_string(),
            direction: "RW".to_string(),
            unit: None,
            scale: None,
        }
    }

    fn raw_channel(label: &str, functions: Vec<RawRegister>) -> RawChannel {
        RawChannel {
            label: label.to_string(),
            mux_idx: 1,
            channel: 4,
            i2c_addr: 0x41,
            is_msb_first: Some(true),
            functions,
        }
    }

    #[test]
    fn test_load_valid_table() {
        let map = load(vec![raw_channel(
            "TA",
            vec![
                raw_register("PULSE WIDTH", 0x00, "24B"),
                raw_register("PERIOD", 0x03, "24B"),
            ],
        )])
        .unwrap();
        assert_eq!(map.channels().len(), 1);
        assert_eq!(map.registers("TA").unwrap().len(), 2);
        assert!(map.overlaps().is_empty());
    }

    #[test]
    fn test_msb_first_defaults_to_true() {
        let mut raw = raw_channel("TA", vec![raw_register("PULSE WIDTH", 0x00, "24B")]);
        raw.is_msb_first = None;
        let map = load(vec![raw]).unwrap();
        assert!(map.channel("TA").unwrap().msb_first());
    }

    #[test]
    fn test_unsupported_data_size_is_reported_with_other_violations() {
        let violations = load(vec![raw_channel(
            "TA",
            vec![
                raw_register("BAD WIDTH", 0x00, "40B"),
                {
                    let mut r = raw_register("BAD DIR", 0x05, "16B");
                    r.direction = "WO".to_string();
                    r
                },
            ],
        )])
        .unwrap_err();
        let widths: Vec<_> = violations
            .0
            .iter()
            .filter(|v| matches!(v, SchemaViolation::UnsupportedDataSize { register, .. } if register == "BAD WIDTH"))
            .collect();
        assert_eq!(widths.len(), 1);
        assert!(violations.0.iter().any(|v| matches!(
            v,
            SchemaViolation::UnknownDirection { register, .. } if register == "BAD DIR"
        )));
        assert_eq!(violations.0.len(), 2);
    }

    #[test]
    fn test_duplicate_labels_and_names_are_case_insensitive() {
        let violations = load(vec![
            raw_channel(
                "Seed",
                vec![
                    raw_register("STATUS", 0x00, "8B"),
                    raw_register("status", 0x01, "8B"),
                ],
            ),
            raw_channel("SEED", vec![]),
        ])
        .unwrap_err();
        assert!(violations
            .0
            .contains(&SchemaViolation::DuplicateRegister {
                channel: "Seed".to_string(),
                register: "status".to_string(),
            }));
        assert!(violations
            .0
            .contains(&SchemaViolation::DuplicateChannel {
                label: "SEED".to_string(),
            }));
    }

    #[test]
    fn test_unit_scale_copresence() {
        let mut with_unit = raw_register("ADC VD", 0x10, "16B");
        with_unit.unit = Some("mV".to_string());
        let mut with_scale = raw_register("ADC CD", 0x0E, "16B");
        with_scale.scale = Some(0.160);
        let violations = load(vec![raw_channel("Seed", vec![with_unit, with_scale])])
            .unwrap_err();
        assert_eq!(
            violations.0,
            vec![
                SchemaViolation::UnitWithoutScale {
                    channel: "Seed".to_string(),
                    register: "ADC VD".to_string(),
                },
                SchemaViolation::ScaleWithoutUnit {
                    channel: "Seed".to_string(),
                    register: "ADC CD".to_string(),
                },
            ]
        );
    }

    #[test]
    fn test_bad_scale() {
        for bad in [0.0, -0.5, f64::INFINITY, f64::NAN] {
            let mut raw = raw_register("CURRENT DRV", 0x06, "16B");
            raw.unit = Some("mA".to_string());
            raw.scale = Some(bad);
            let violations = load(vec![raw_channel("TA", vec![raw])]).unwrap_err();
            assert!(matches!(
                violations.0.as_slice(),
                [SchemaViolation::BadScale { .. }]
            ));
        }
    }

    #[test]
    fn test_out_of_range_fields() {
        let mut raw = raw_channel("TA", vec![raw_register("PULSE WIDTH", -1, "24B")]);
        raw.mux_idx = -1;
        raw.i2c_addr = 0x80;
        let violations = load(vec![raw]).unwrap_err();
        assert!(violations
            .0
            .iter()
            .any(|v| matches!(v, SchemaViolation::MuxIdxOutOfRange { value: -1, .. })));
        assert!(violations
            .0
            .iter()
            .any(|v| matches!(v, SchemaViolation::I2cAddrOutOfRange { value: 0x80, .. })));
        assert!(violations
            .0
            .iter()
            .any(|v| matches!(v, SchemaViolation::StartAddressOutOfRange { value: -1, .. })));
    }

    #[test]
    fn test_empty_label() {
        let violations = load(vec![raw_channel("", vec![])]).unwrap_err();
        assert_eq!(
            violations.0,
            vec![SchemaViolation::EmptyLabel { position: 0 }]
        );
    }

    #[test]
    fn test_overlap_is_flagged_not_rejected() {
        let map = load(vec![raw_channel(
            "Seed",
            vec![
                {
                    let mut r = raw_register("ADC VD", 0x10, "16B");
                    r.direction = "RD".to_string();
                    r
                },
                {
                    let mut r = raw_register("STATUS", 0x10, "8B");
                    r.direction = "RD".to_string();
                    r
                },
            ],
        )])
        .unwrap();
        assert_eq!(map.overlaps().len(), 1);
        let overlap = &map.overlaps()[0];
        assert_eq!(overlap.channel, "Seed");
        assert_eq!(overlap.first, "ADC VD");
        assert_eq!(overlap.second, "STATUS");
        assert_eq!(overlap.address, 0x10);
    }

    #[test]
    fn test_lookup_misses() {
        let map = load(builtin::current_model()).unwrap();
        assert!(matches!(
            map.resolve("TA", "NONEXISTENT"),
            Err(LookupError::UnknownRegister { .. })
        ));
        assert!(matches!(
            map.resolve("Pump", "STATUS"),
            Err(LookupError::UnknownChannel(_))
        ));
    }

    #[test]
    fn test_json_round_trip() {
        let map = load(builtin::current_model()).unwrap();
        let json = to_json(&map).unwrap();
        let reloaded = load(from_json(&json).unwrap()).unwrap();
        assert_eq!(map, reloaded);
    }
}
