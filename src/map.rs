//! The validated register map model and its lookup accessors.

use kstring::KString;
use std::collections::HashMap;
use thiserror::Error;

/// The permitted register widths, in bits.
///
/// The source tables write these as `"8B"`..`"32B"`; the suffix denotes bits,
/// not bytes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum BitWidth {
    Eight,
    Sixteen,
    TwentyFour,
    ThirtyTwo,
}

impl BitWidth {
    /// Width in bits
    #[must_use]
    pub fn bits(self) -> u32 {
        match self {
            BitWidth::Eight => 8,
            BitWidth::Sixteen => 16,
            BitWidth::TwentyFour => 24,
            BitWidth::ThirtyTwo => 32,
        }
    }

    /// Number of bytes a register of this width occupies on the bus
    #[must_use]
    pub fn byte_len(self) -> u16 {
        match self {
            BitWidth::Eight => 1,
            BitWidth::Sixteen => 2,
            BitWidth::TwentyFour => 3,
            BitWidth::ThirtyTwo => 4,
        }
    }

    /// The canonical table literal for this width
    #[must_use]
    pub fn literal(self) -> &'static str {
        match self {
            BitWidth::Eight => "8B",
            BitWidth::Sixteen => "16B",
            BitWidth::TwentyFour => "24B",
            BitWidth::ThirtyTwo => "32B",
        }
    }

    pub(crate) fn from_literal(literal: &str) -> Option<Self> {
        if literal.eq_ignore_ascii_case("8B") {
            Some(BitWidth::Eight)
        } else if literal.eq_ignore_ascii_case("16B") {
            Some(BitWidth::Sixteen)
        } else if literal.eq_ignore_ascii_case("24B") {
            Some(BitWidth::TwentyFour)
        } else if literal.eq_ignore_ascii_case("32B") {
            Some(BitWidth::ThirtyTwo)
        } else {
            None
        }
    }
}

/// The access direction of a register.
///
/// `"WR"` is strictly write-only, never a synonym for `"RW"`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Direction {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl Direction {
    /// The canonical table literal for this direction
    #[must_use]
    pub fn literal(self) -> &'static str {
        match self {
            Direction::ReadOnly => "RD",
            Direction::WriteOnly => "WR",
            Direction::ReadWrite => "RW",
        }
    }

    #[must_use]
    pub fn readable(self) -> bool {
        self != Direction::WriteOnly
    }

    #[must_use]
    pub fn writable(self) -> bool {
        self != Direction::ReadOnly
    }

    pub(crate) fn from_literal(literal: &str) -> Option<Self> {
        if literal.eq_ignore_ascii_case("RD") {
            Some(Direction::ReadOnly)
        } else if literal.eq_ignore_ascii_case("WR") {
            Some(Direction::WriteOnly)
        } else if literal.eq_ignore_ascii_case("RW") {
            Some(Direction::ReadWrite)
        } else {
            None
        }
    }
}

/// Linear conversion from a raw register value to a physical unit.
///
/// Unit labels are opaque; the table's casing (`"us"` vs `"uS"`) is preserved
/// as-is and carries no semantics here.
#[derive(Debug, Clone, PartialEq)]
pub struct Scaling {
    pub unit: KString,
    /// Positive, finite multiplier: `raw * factor` is the physical value
    pub factor: f64,
}

/// A named, addressable field within a channel's address space
#[derive(Debug, Clone, PartialEq)]
pub struct Register {
    pub name: KString,
    pub desc: String,
    /// Byte offset within the channel's address space
    pub start_address: u16,
    pub width: BitWidth,
    pub direction: Direction,
    pub scaling: Option<Scaling>,
}

impl Register {
    /// The byte span `[start_address, start_address + byte_len)` this
    /// register occupies
    #[must_use]
    pub fn span(&self) -> std::ops::Range<u32> {
        let start = u32::from(self.start_address);
        start..start + u32::from(self.width.byte_len())
    }

    /// Converts a raw register value to its physical value, `raw * factor`.
    ///
    /// The raw value is assumed already masked to the register's width; no
    /// rounding or clamping is applied here.
    ///
    /// # Errors
    /// Returns [`ConversionError::NoScaleDefined`] when this register has no
    /// scale factor.
    #[allow(clippy::cast_precision_loss)]
    pub fn to_physical(&self, raw: u64) -> Result<f64, ConversionError> {
        let scaling = self
            .scaling
            .as_ref()
            .ok_or_else(|| ConversionError::NoScaleDefined(self.name.clone()))?;
        Ok(raw as f64 * scaling.factor)
    }
}

/// A logical hardware endpoint behind the I2C multiplexer
#[derive(Debug, Clone, PartialEq)]
pub struct Channel {
    label: KString,
    mux_idx: u8,
    channel: u8,
    i2c_addr: u8,
    msb_first: bool,
    registers: Vec<Register>,
    // Case-folded name -> position in `registers`
    index: HashMap<String, usize>,
}

impl Channel {
    /// Register names must already be unique under case folding.
    pub(crate) fn new(
        label: KString,
        mux_idx: u8,
        channel: u8,
        i2c_addr: u8,
        msb_first: bool,
        registers: Vec<Register>,
    ) -> Self {
        let index = registers
            .iter()
            .enumerate()
            .map(|(i, r)| (r.name.to_ascii_uppercase(), i))
            .collect();
        Channel {
            label,
            mux_idx,
            channel,
            i2c_addr,
            msb_first,
            registers,
            index,
        }
    }

    #[must_use]
    pub fn label(&self) -> &KString {
        &self.label
    }

    /// Upstream multiplexer index
    #[must_use]
    pub fn mux_idx(&self) -> u8 {
        self.mux_idx
    }

    /// Output channel number on the multiplexer
    #[must_use]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// 7-bit bus address
    #[must_use]
    pub fn i2c_addr(&self) -> u8 {
        self.i2c_addr
    }

    /// Byte-order flag for multi-byte registers
    #[must_use]
    pub fn msb_first(&self) -> bool {
        self.msb_first
    }

    /// Registers in table order
    #[must_use]
    pub fn registers(&self) -> &[Register] {
        &self.registers
    }

    /// Looks up a register by name, case-insensitively.
    ///
    /// # Errors
    /// Returns [`LookupError::UnknownRegister`] when no register has this
    /// name.
    pub fn register(&self, name: &str) -> Result<&Register, LookupError> {
        self.index
            .get(&name.to_ascii_uppercase())
            .map(|&i| &self.registers[i])
            .ok_or_else(|| LookupError::UnknownRegister {
                channel: self.label.clone(),
                name: KString::from_ref(name),
            })
    }
}

/// A pair of registers within one channel whose byte spans intersect.
///
/// The source tables contain at least one intentional alias (a status byte
/// overlaying a wider data word), so overlaps are reported, not rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Overlap {
    pub channel: KString,
    pub first: KString,
    pub second: KString,
    /// First byte address shared by both spans
    pub address: u16,
}

/// The validated, immutable channel/register table.
///
/// Constructed once via [`crate::schema::load`]; never mutated afterwards,
/// so shared references are safe across threads.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterMap {
    channels: Vec<Channel>,
    // Case-folded label -> position in `channels`
    index: HashMap<String, usize>,
    overlaps: Vec<Overlap>,
}

impl RegisterMap {
    /// Channel labels must already be unique under case folding.
    pub(crate) fn new(channels: Vec<Channel>, overlaps: Vec<Overlap>) -> Self {
        let index = channels
            .iter()
            .enumerate()
            .map(|(i, c)| (c.label.to_ascii_uppercase(), i))
            .collect();
        RegisterMap {
            channels,
            index,
            overlaps,
        }
    }

    /// Channels in table order
    #[must_use]
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    /// Looks up a channel by label, case-insensitively.
    ///
    /// # Errors
    /// Returns [`LookupError::UnknownChannel`] when no channel has this
    /// label.
    pub fn channel(&self, label: &str) -> Result<&Channel, LookupError> {
        self.index
            .get(&label.to_ascii_uppercase())
            .map(|&i| &self.channels[i])
            .ok_or_else(|| LookupError::UnknownChannel(KString::from_ref(label)))
    }

    /// The registers of the named channel, in table order.
    ///
    /// # Errors
    /// Returns [`LookupError::UnknownChannel`] when no channel has this
    /// label.
    pub fn registers(&self, label: &str) -> Result<&[Register], LookupError> {
        Ok(self.channel(label)?.registers())
    }

    /// Resolves a register by channel label and register name. The returned
    /// register carries the start address, width, direction, and optional
    /// scaling.
    ///
    /// # Errors
    /// Returns [`LookupError::UnknownChannel`] or
    /// [`LookupError::UnknownRegister`] on a miss.
    pub fn resolve(&self, label: &str, name: &str) -> Result<&Register, LookupError> {
        self.channel(label)?.register(name)
    }

    /// Address overlaps flagged at load time
    #[must_use]
    pub fn overlaps(&self) -> &[Overlap] {
        &self.overlaps
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LookupError {
    #[error("unknown channel {0:?}")]
    UnknownChannel(KString),
    #[error("unknown register {name:?} in channel {channel:?}")]
    UnknownRegister { channel: KString, name: KString },
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConversionError {
    #[error("register {0:?} has no scale factor defined")]
    NoScaleDefined(KString),
}
