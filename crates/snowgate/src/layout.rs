//! # Runtime Snowflake bit layout
//!
//! A [`SnowflakeLayout`] partitions the low 63 bits of a `u64` into four
//! fields. The most significant bit is always zero so every ID is also a
//! non-negative `i64`.
//!
//! ```text
//!  Bit Index:  63   62 ...                                               0
//!              +----+-----------+--------------+-----------+--------------+
//!  Field:      | 0  | timestamp | datacenter   | machine   | sequence     |
//!              +----+-----------+--------------+-----------+--------------+
//!              |<-- MSB ----------------- 64 bits ----------------- LSB ->|
//! ```
//!
//! The timestamp receives whatever the other three fields leave over, so a
//! `5/5/12` layout yields the classic 41-bit millisecond timestamp.

use core::fmt;

use crate::{Error, Result};

/// Number of usable bits in an ID. The sign bit is reserved.
pub const ID_BITS: u8 = 63;

/// Identifies one of the caller supplied ID components.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Component {
    Datacenter,
    Machine,
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Datacenter => f.write_str("datacenter"),
            Self::Machine => f.write_str("machine"),
        }
    }
}

/// A packed Snowflake ID.
///
/// The value is only meaningful together with the [`SnowflakeLayout`] that
/// produced it; use [`SnowflakeLayout::decompose`] to read the fields back.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SnowflakeId(u64);

impl SnowflakeId {
    /// Wraps a raw integer without checking it against any layout.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw integer.
    pub const fn to_raw(self) -> u64 {
        self.0
    }

    /// Returns the ID as a signed integer, the representation used on the
    /// wire. IDs composed by a layout never set the sign bit.
    pub const fn to_i64(self) -> i64 {
        self.0 as i64
    }
}

impl fmt::Display for SnowflakeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The four fields of a Snowflake ID.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SnowflakeParts {
    /// Milliseconds since the generator epoch.
    pub timestamp: u64,
    pub datacenter_id: u64,
    pub machine_id: u64,
    /// Position of the ID within its millisecond.
    pub sequence: u64,
}

/// Bit widths of the datacenter, machine and sequence fields.
///
/// Construct with [`SnowflakeLayout::new`], which rejects layouts that leave
/// no room for the timestamp or have no sequence space.
///
/// # Example
///
/// ```
/// use snowgate::{SnowflakeLayout, SnowflakeParts};
///
/// let layout = SnowflakeLayout::new(5, 5, 12).unwrap();
/// assert_eq!(layout.timestamp_bits(), 41);
///
/// let parts = SnowflakeParts { timestamp: 1000, datacenter_id: 3, machine_id: 7, sequence: 1 };
/// let id = layout.compose(parts);
/// assert_eq!(layout.decompose(id), parts);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SnowflakeLayout {
    datacenter_bits: u8,
    machine_bits: u8,
    sequence_bits: u8,
}

impl Default for SnowflakeLayout {
    fn default() -> Self {
        Self::TWITTER
    }
}

impl SnowflakeLayout {
    /// Twitter's original split: 41-bit timestamp, 5-bit datacenter, 5-bit
    /// machine and 12-bit sequence.
    pub const TWITTER: Self = Self {
        datacenter_bits: 5,
        machine_bits: 5,
        sequence_bits: 12,
    };

    /// Creates a layout from explicit field widths.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLayout`] if `sequence_bits` is zero or the three
    /// widths leave less than one bit for the timestamp.
    pub fn new(datacenter_bits: u8, machine_bits: u8, sequence_bits: u8) -> Result<Self> {
        if sequence_bits == 0 {
            return Err(Error::InvalidLayout {
                reason: "sequence needs at least one bit",
            });
        }
        let used = u16::from(datacenter_bits) + u16::from(machine_bits) + u16::from(sequence_bits);
        if used >= u16::from(ID_BITS) {
            return Err(Error::InvalidLayout {
                reason: "datacenter, machine and sequence bits must sum to less than 63",
            });
        }
        Ok(Self {
            datacenter_bits,
            machine_bits,
            sequence_bits,
        })
    }

    pub const fn timestamp_bits(&self) -> u8 {
        ID_BITS - self.datacenter_bits - self.machine_bits - self.sequence_bits
    }

    pub const fn datacenter_bits(&self) -> u8 {
        self.datacenter_bits
    }

    pub const fn machine_bits(&self) -> u8 {
        self.machine_bits
    }

    pub const fn sequence_bits(&self) -> u8 {
        self.sequence_bits
    }

    const fn machine_shift(&self) -> u8 {
        self.sequence_bits
    }

    const fn datacenter_shift(&self) -> u8 {
        self.sequence_bits + self.machine_bits
    }

    const fn timestamp_shift(&self) -> u8 {
        self.sequence_bits + self.machine_bits + self.datacenter_bits
    }

    const fn mask(bits: u8) -> u64 {
        (1 << bits) - 1
    }

    pub const fn max_timestamp(&self) -> u64 {
        Self::mask(self.timestamp_bits())
    }

    pub const fn max_datacenter_id(&self) -> u64 {
        Self::mask(self.datacenter_bits)
    }

    pub const fn max_machine_id(&self) -> u64 {
        Self::mask(self.machine_bits)
    }

    pub const fn max_sequence(&self) -> u64 {
        Self::mask(self.sequence_bits)
    }

    /// Largest value the given component can take under this layout.
    pub const fn max_component(&self, component: Component) -> u64 {
        match component {
            Component::Datacenter => self.max_datacenter_id(),
            Component::Machine => self.max_machine_id(),
        }
    }

    /// Validates a caller supplied component value.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidIdentifierComponent`] if `value` is negative or
    /// wider than the component's field.
    pub fn check_component(&self, component: Component, value: i64) -> Result<u64> {
        let max = self.max_component(component);
        match u64::try_from(value) {
            Ok(v) if v <= max => Ok(v),
            _ => Err(Error::InvalidIdentifierComponent {
                component,
                value,
                max,
            }),
        }
    }

    /// Packs the fields into an ID. Each field is masked to its width, so
    /// callers are expected to validate first.
    pub const fn compose(&self, parts: SnowflakeParts) -> SnowflakeId {
        let t = (parts.timestamp & self.max_timestamp()) << self.timestamp_shift();
        let d = (parts.datacenter_id & self.max_datacenter_id()) << self.datacenter_shift();
        let m = (parts.machine_id & self.max_machine_id()) << self.machine_shift();
        let s = parts.sequence & self.max_sequence();
        SnowflakeId(t | d | m | s)
    }

    /// Splits an ID back into its fields.
    pub const fn decompose(&self, id: SnowflakeId) -> SnowflakeParts {
        let raw = id.0;
        SnowflakeParts {
            timestamp: (raw >> self.timestamp_shift()) & self.max_timestamp(),
            datacenter_id: (raw >> self.datacenter_shift()) & self.max_datacenter_id(),
            machine_id: (raw >> self.machine_shift()) & self.max_machine_id(),
            sequence: raw & self.max_sequence(),
        }
    }
}
