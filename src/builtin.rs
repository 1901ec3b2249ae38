//! The shipped channel tables for the laser driver hardware.
//!
//! Two revisions exist in the field. The legacy table predates the byte-order
//! flag and the engineering-unit annotations; the current table carries both
//! plus the registers added after the first hardware spin. Both pass
//! [`crate::schema::load`] unchanged.
//!
//! Unit labels are reproduced verbatim from the hardware documentation,
//! casing inconsistencies included ("us" vs "uS", "mv" vs "mV"). They are
//! opaque labels here; normalizing them is a datasheet question, not a
//! schema one.

use crate::schema::{
    RawChannel,
    RawRegister,
};

fn reg(name: &str, desc: &str, start_address: i64, data_size: &str, direction: &str) -> RawRegister {
    RawRegister {
        name: name.to_string(),
        desc: desc.to_string(),
        start_address,
        data_size: data_size.to_string(),
        direction: direction.to_string(),
        unit: None,
        scale: None,
    }
}

fn scaled(
    name: &str,
    desc: &str,
    start_address: i64,
    data_size: &str,
    direction: &str,
    unit: &str,
    scale: f64,
) -> RawRegister {
    RawRegister {
        unit: Some(unit.to_string()),
        scale: Some(scale),
        ..reg(name, desc, start_address, data_size, direction)
    }
}

/// The original table revision: no byte-order flag, no unit annotations.
///
/// The Seed channel's STATUS byte shares address 0x10 with the wider ADC VD
/// word; the loader flags the pair as an overlap.
#[must_use]
pub fn legacy_model() -> Vec<RawChannel> {
    vec![
        RawChannel {
            label: "TA".to_string(),
            mux_idx: 1,
            channel: 4,
            i2c_addr: 0x41,
            is_msb_first: None,
            functions: vec![
                reg("PULSE WIDTH", "Pulse Width", 0x00, "24B", "RW"),
                reg("PERIOD", "Period", 0x03, "24B", "RW"),
                reg("CURRENT DRV", "Current Drive", 0x06, "16B", "RW"),
                reg("CURRENT LIMIT", "Current Limit", 0x08, "16B", "RW"),
                reg("PWM MON CL", "PWM Monitor Current Limit", 0x0A, "16B", "RW"),
                reg("CW MON CL", "CW Monitor Current Limit", 0x0C, "16B", "RW"),
                reg("STATIC CTL", "Static Control", 0x20, "16B", "RW"),
                reg("DYNAMIC CTL", "Dynamic Control", 0x22, "16B", "RW"),
            ],
        },
        RawChannel {
            label: "Seed".to_string(),
            mux_idx: 1,
            channel: 5,
            i2c_addr: 0x41,
            is_msb_first: None,
            functions: vec![
                reg("DDS CTRL", "DDS Control", 0x00, "16B", "RW"),
                reg("DDS GAIN", "DDS Gain", 0x02, "16B", "RW"),
                reg("CW GAIN", "CW Gain", 0x04, "16B", "RW"),
                reg("DDS CL", "DDS Current Limit", 0x06, "16B", "RW"),
                reg("CW CL", "CW Current Limit", 0x08, "16B", "RW"),
                reg("ADC DDS CL", "ADC DDS Current Limit", 0x0A, "16B", "RW"),
                reg("ADC CW CL", "ADC CW Current Limit", 0x0C, "16B", "RW"),
                reg("ADC CD", "ADC Current Data", 0x0E, "16B", "RD"),
                reg("ADC VD", "ADC Voltage Data", 0x10, "16B", "RD"),
                reg("STATUS", "Status", 0x10, "8B", "RD"),
                reg("STATIC CTRL", "Static Control", 0x20, "16B", "RW"),
                reg("DYNAMIC CTRL", "Dynamic Control", 0x22, "16B", "WR"),
            ],
        },
        RawChannel {
            label: "Safety EE".to_string(),
            mux_idx: 1,
            channel: 6,
            i2c_addr: 0x41,
            is_msb_first: None,
            functions: vec![
                reg("PULSE WIDTH LL", "Pulse Width Lower Limit", 0x00, "32B", "RW"),
                reg("PULSE WIDTH UL", "Pulse Width Upper Limit", 0x04, "32B", "RW"),
                reg("RATE LL", "Rate Lower Limit", 0x08, "32B", "RW"),
                reg("RATE UL", "Rate Upper Limit", 0x0C, "32B", "RW"),
                reg("DRIVE CL", "Drive Current Limit", 0x10, "16B", "RW"),
                reg("PWM CURRENT", "PWM Drive Current", 0x12, "16B", "RW"),
                reg("CW CURRENT", "CW Drive Current", 0x14, "16B", "RW"),
                reg("PWM MONITOR CL", "PWM Monitor Current Limit", 0x16, "16B", "RW"),
                reg("CW MONITOR CL", "CW Monitor Current Limit", 0x18, "16B", "RW"),
                reg("STATIC CTRL", "Static control bits", 0x20, "16B", "RW"),
                reg("DYNAMIC CTRL", "Dynamic control bits", 0x22, "16B", "WR"),
            ],
        },
        RawChannel {
            label: "Safety OPT".to_string(),
            mux_idx: 1,
            channel: 7,
            i2c_addr: 0x41,
            is_msb_first: None,
            functions: vec![
                reg("PULSE WIDTH LL", "Pulse Width Lower Limit", 0x00, "32B", "RW"),
                reg("PULSE WIDTH UL", "Pulse Width Upper Limit", 0x04, "32B", "RW"),
                reg("RATE LL", "Rate Lower Limit", 0x08, "32B", "RW"),
                reg("RATE UL", "Rate Upper Limit", 0x0C, "32B", "RW"),
                reg("DRIVE CL", "Drive Current Limit", 0x10, "16B", "RW"),
                reg("PWM CURRENT", "PWM Drive Current", 0x12, "16B", "RW"),
                reg("CW CURRENT", "CW Drive Current", 0x14, "16B", "RW"),
                reg("PWM MONITOR CL", "PWM Monitor Current Limit", 0x16, "16B", "RW"),
                reg("CW MONITOR CL", "CW Monitor Current Limit", 0x18, "16B", "RW"),
                reg("STATIC CTRL", "Static control bits", 0x20, "16B", "RW"),
            ],
        },
    ]
}

/// The current table revision: explicit byte order, unit annotations, and
/// the registers added after the first hardware spin.
#[must_use]
pub fn current_model() -> Vec<RawChannel> {
    vec![
        RawChannel {
            label: "TA".to_string(),
            mux_idx: 1,
            channel: 4,
            i2c_addr: 0x41,
            is_msb_first: Some(true),
            functions: vec![
                scaled("PULSE WIDTH", "Pulse Width", 0x00, "24B", "RW", "us", 0.320),
                scaled("PERIOD", "Period", 0x03, "24B", "RW", "uS", 0.320),
                scaled("CURRENT DRV", "Current Drive", 0x06, "16B", "RW", "mA", 0.160),
                scaled("CURRENT LIMIT", "Current Limit", 0x08, "16B", "RW", "mA", 0.160),
                scaled("PWM MON CL", "PWM Monitor Current Limit", 0x0A, "16B", "RW", "mA", 0.160),
                scaled("CW MON CL", "CW Monitor Current Limit", 0x0C, "16B", "RW", "mA", 0.160),
                reg("STATIC CTL", "Static Control", 0x20, "16B", "RW"),
                reg("DYNAMIC CTL", "Dynamic Control", 0x22, "16B", "RW"),
                reg("STATUS", "Status", 0x24, "8B", "RD"),
            ],
        },
        RawChannel {
            label: "Seed".to_string(),
            mux_idx: 1,
            channel: 5,
            i2c_addr: 0x41,
            is_msb_first: Some(true),
            functions: vec![
                reg("DDS CTRL", "DDS Control", 0x00, "16B", "RW"),
                reg("DDS GAIN", "DDS Gain", 0x02, "16B", "RW"),
                reg("CW GAIN", "CW Gain", 0x04, "16B", "RW"),
                scaled("DDS CL", "DDS Current Limit", 0x06, "16B", "RW", "mA", 0.160),
                scaled("CW CL", "CW Current Limit", 0x08, "16B", "RW", "mA", 0.160),
                scaled("ADC DDS CL", "ADC DDS Current Limit", 0x0A, "16B", "RW", "mA", 0.160),
                scaled("ADC CW CL", "ADC CW Current Limit", 0x0C, "16B", "RW", "mA", 0.160),
                scaled("ADC CD", "ADC Current Data", 0x0E, "16B", "RD", "mA", 0.160),
                scaled("ADC VD", "ADC Voltage Data", 0x10, "16B", "RD", "mv", 0.805),
                reg("STATUS", "Status", 0x12, "8B", "RD"),
                reg("STATIC CTRL", "Static Control", 0x20, "16B", "RW"),
                reg("DYNAMIC CTRL", "Dynamic Control", 0x22, "16B", "WR"),
            ],
        },
        RawChannel {
            label: "Safety EE".to_string(),
            mux_idx: 1,
            channel: 6,
            i2c_addr: 0x41,
            is_msb_first: Some(true),
            functions: vec![
                scaled("PULSE WIDTH LL", "Pulse Width Lower Limit", 0x00, "32B", "RW", "us", 0.320),
                scaled("PULSE WIDTH UL", "Pulse Width Upper Limit", 0x04, "32B", "RW", "us", 0.320),
                scaled("RATE LL", "Rate Lower Limit", 0x08, "32B", "RW", "Hz", 0.5),
                scaled("RATE UL", "Rate Upper Limit", 0x0C, "32B", "RW", "Hz", 0.5),
                scaled("DRIVE CL", "Drive Current Limit", 0x10, "16B", "RW", "mA", 0.160),
                scaled("PWM CURRENT", "PWM Drive Current", 0x12, "16B", "RW", "mA", 0.160),
                scaled("CW CURRENT", "CW Drive Current", 0x14, "16B", "RW", "mA", 0.160),
                scaled("PWM MONITOR CL", "PWM Monitor Current Limit", 0x16, "16B", "RW", "mV", 0.805),
                scaled("CW MONITOR CL", "CW Monitor Current Limit", 0x18, "16B", "RW", "mV", 0.805),
                reg("STATIC CTRL", "Static control bits", 0x20, "16B", "RW"),
                reg("DYNAMIC CTRL", "Dynamic control bits", 0x22, "16B", "WR"),
            ],
        },
        RawChannel {
            label: "Safety OPT".to_string(),
            mux_idx: 1,
            channel: 7,
            i2c_addr: 0x41,
            is_msb_first: Some(true),
            functions: vec![
                scaled("PULSE WIDTH LL", "Pulse Width Lower Limit", 0x00, "32B", "RW", "us", 0.320),
                scaled("PULSE WIDTH UL", "Pulse Width Upper Limit", 0x04, "32B", "RW", "us", 0.320),
                scaled("RATE LL", "Rate Lower Limit", 0x08, "32B", "RW", "Hz", 0.5),
                scaled("RATE UL", "Rate Upper Limit", 0x0C, "32B", "RW", "Hz", 0.5),
                scaled("DRIVE CL", "Drive Current Limit", 0x10, "16B", "RW", "mA", 0.160),
                scaled("PWM CURRENT", "PWM Drive Current", 0x12, "16B", "RW", "mA", 0.160),
                scaled("CW CURRENT", "CW Drive Current", 0x14, "16B", "RW", "mA", 0.160),
                scaled("PWM MONITOR CL", "PWM Monitor Current Limit", 0x16, "16B", "RW", "mV", 0.805),
                scaled("CW MONITOR CL", "CW Monitor Current Limit", 0x18, "16B", "RW", "mV", 0.805),
                reg("STATIC CTRL", "Static control bits", 0x20, "16B", "RW"),
                reg("DYNAMIC CTRL", "Dynamic control bits", 0x22, "16B", "WR"),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::map::{
        BitWidth,
        Direction,
    };
    use crate::schema::load;

    #[test]
    fn test_legacy_model_loads() {
        let map = load(legacy_model()).unwrap();
        assert_eq!(map.channels().len(), 4);
        // The byte-order flag defaults when the table predates it
        assert!(map.channel("TA").unwrap().msb_first());
    }

    #[test]
    fn test_legacy_seed_alias_is_flagged() {
        let map = load(legacy_model()).unwrap();
        assert_eq!(map.overlaps().len(), 1);
        let overlap = &map.overlaps()[0];
        assert_eq!(overlap.channel, "Seed");
        assert_eq!(overlap.first, "ADC VD");
        assert_eq!(overlap.second, "STATUS");
        assert_eq!(overlap.address, 0x10);
    }

    #[test]
    fn test_current_model_loads_without_overlaps() {
        let map = load(current_model()).unwrap();
        assert_eq!(map.channels().len(), 4);
        assert!(map.overlaps().is_empty());
    }

    #[test]
    fn test_current_ta_pulse_width() {
        let map = load(current_model()).unwrap();
        let reg = map.resolve("TA", "PULSE WIDTH").unwrap();
        assert_eq!(reg.start_address, 0x00);
        assert_eq!(reg.width, BitWidth::TwentyFour);
        assert_eq!(reg.direction, Direction::ReadWrite);
        let scaling = reg.scaling.as_ref().unwrap();
        assert_eq!(scaling.unit, "us");
        assert!((scaling.factor - 0.320).abs() < f64::EPSILON);
    }

    #[test]
    fn test_write_only_literal_stays_write_only() {
        let map = load(current_model()).unwrap();
        let reg = map.resolve("Seed", "DYNAMIC CTRL").unwrap();
        assert_eq!(reg.direction, Direction::WriteOnly);
        assert!(!reg.direction.readable());
    }

    #[test]
    fn test_channel_addressing() {
        let map = load(current_model()).unwrap();
        let seed = map.channel("Seed").unwrap();
        assert_eq!(seed.mux_idx(), 1);
        assert_eq!(seed.channel(), 5);
        assert_eq!(seed.i2c_addr(), 0x41);
    }
}
