use crate::ToRegisterValue;

/// Bit 7: current multiplier (CM)
const CURRENT_RANGE_HIGH: u8 = 1 << 7;
/// Bit 6: voltage band (HC)
const VOLTAGE_BAND_HIGH: u8 = 1 << 6;
/// Bits 5..0: voltage gain (CC0..CC5)
pub(crate) const VOLTAGE_GAIN_MASK: u8 = 0b0011_1111;

/// Current multiplier, selects the output current range
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CurrentRange {
    /// 1/12 to 127/128 of the current set by R-EXT
    #[default]
    Low,
    /// 1/3 to 127/32 of the current set by R-EXT
    High,
}

impl ToRegisterValue<u8> for CurrentRange {
    fn register_value(&self) -> u8 {
        match self {
            CurrentRange::Low => 0,
            CurrentRange::High => CURRENT_RANGE_HIGH,
        }
    }
}

impl From<bool> for CurrentRange {
    fn from(high: bool) -> Self {
        if high {
            CurrentRange::High
        } else {
            CurrentRange::Low
        }
    }
}

/// Voltage band of the output current gain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum VoltageBand {
    #[default]
    Low,
    High,
}

impl ToRegisterValue<u8> for VoltageBand {
    fn register_value(&self) -> u8 {
        match self {
            VoltageBand::Low => 0,
            VoltageBand::High => VOLTAGE_BAND_HIGH,
        }
    }
}

impl From<bool> for VoltageBand {
    fn from(high: bool) -> Self {
        if high {
            VoltageBand::High
        } else {
            VoltageBand::Low
        }
    }
}

/// Content of the chip's (volatile) configuration register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Configuration {
    pub(crate) current_range: CurrentRange,
    pub(crate) voltage_band: VoltageBand,
    /// Accepted as 0..127, only the low 6 bits end up in the register.
    pub(crate) voltage_gain: u8,
}

impl Default for Configuration {
    /// Low current range, low voltage band, maximum gain.
    fn default() -> Self {
        Self {
            current_range: CurrentRange::Low,
            voltage_band: VoltageBand::Low,
            voltage_gain: 127,
        }
    }
}

impl Configuration {
    pub fn new(current_range: CurrentRange, voltage_band: VoltageBand, voltage_gain: u8) -> Self {
        Self {
            current_range,
            voltage_band,
            voltage_gain,
        }
    }

    pub fn current_range(&self) -> CurrentRange {
        self.current_range
    }

    pub fn voltage_band(&self) -> VoltageBand {
        self.voltage_band
    }

    pub fn voltage_gain(&self) -> u8 {
        self.voltage_gain
    }

    /// True if `voltage_gain` has bits set that don't fit into the register.
    pub fn gain_truncated(&self) -> bool {
        self.voltage_gain & !VOLTAGE_GAIN_MASK != 0
    }
}

impl ToRegisterValue<u8> for Configuration {
    fn register_value(&self) -> u8 {
        self.current_range.register_value()
            | self.voltage_band.register_value()
            | (self.voltage_gain & VOLTAGE_GAIN_MASK)
    }
}

/// Builder for creating a [`Configuration`].
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    pub(crate) configuration: Configuration,
}

macro_rules! builder_property {
    ($field:ident, $field_type:path, $doc:literal) => {
        #[doc = $doc]
        pub fn $field(mut self, $field: $field_type) -> Self {
            self.configuration.$field = $field;
            self
        }
    };
}

impl ConfigBuilder {
    /// Starts from [`Configuration::default`].
    pub fn new() -> Self {
        Self::default()
    }

    builder_property!(current_range, CurrentRange, "Current multiplier setting");
    builder_property!(voltage_band, VoltageBand, "Voltage band setting");
    builder_property!(
        voltage_gain,
        u8,
        "Voltage gain (0..127), only the lower 6 bits are written"
    );

    pub fn build(self) -> Configuration {
        self.configuration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = ConfigBuilder::new()
            .current_range(CurrentRange::High)
            .voltage_gain(32)
            .build();

        assert_eq!(config.current_range(), CurrentRange::High);
        assert_eq!(config.voltage_band(), VoltageBand::Low);
        assert_eq!(config.voltage_gain(), 32);
    }

    #[test]
    fn test_register_value() {
        let value = |current: bool, band: bool, gain: u8| {
            Configuration::new(current.into(), band.into(), gain).register_value()
        };

        assert_eq!(value(true, true, 63), 0b1111_1111);
        assert_eq!(value(false, false, 0), 0b0000_0000);
        assert_eq!(value(true, false, 32), 0b1010_0000);
        assert_eq!(value(false, true, 1), 0b0100_0001);
    }

    #[test]
    fn test_gain_is_masked() {
        let config = Configuration::default();

        assert!(config.gain_truncated());
        assert_eq!(config.register_value(), 0b0011_1111);
        assert!(!Configuration::new(CurrentRange::Low, VoltageBand::Low, 63).gain_truncated());
    }
}
