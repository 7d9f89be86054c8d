//! Driver for the Texas Instruments TLC5926/TLC5927 16-channel and TLC5916/TLC5917
//! 8-channel constant-current LED sink drivers, bit-banged over GPIO.
//!
//! Datasheets: <https://www.ti.com/lit/ds/symlink/tlc5926.pdf>,
//! <https://www.ti.com/lit/ds/symlink/tlc5916.pdf>
//!
//! Only SDI and CLK are required. LE enables flicker free updates, /OE enables power
//! control, brightness (if on a PWM channel), mode switching and configuration. SDO is
//! needed for reading the error status. Of a daisy chain only the error status of the
//! first chip can be read.

#![cfg_attr(not(test), no_std)]

mod configuration;
pub mod interface;
mod waveform;

pub use configuration::{ConfigBuilder, Configuration, CurrentRange, VoltageBand};
use embedded_hal::delay::DelayNs;
pub use embedded_hal::digital::PinState;
use interface::{BitOrder, Direction, Line, PinAccess};
use waveform::Waveform;

/// Error enum for the TLC59xx driver
#[derive(Debug)]
pub enum Error<IE> {
    /// An interface related error has occured
    Interface(IE),
}

/// Time to wait between arming error detection and reading the status (at least 2µs)
pub const T_ERROR_DETECT_US: u32 = 3;

/// Default on time of [`Tlc59xx::flash`]
pub const DEFAULT_FLASH_ON_MS: u32 = 50;

/// Default off time before and after the on time of [`Tlc59xx::flash`]
pub const DEFAULT_FLASH_BRACKET_MS: u32 = 200;

pub trait ToRegisterValue<T> {
    fn register_value(&self) -> T;
}

/// Operating mode of the chip, as far as the driver knows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Normal,
    Configuration,
    ErrorDetect,
    /// Not switched yet, or a switch has been interrupted.
    Unknown,
}

/// Error status read back from the first chip of a chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ErrorStatus {
    value: u16,
    outputs: u8,
}

impl ErrorStatus {
    pub(crate) fn from_reg_value(value: u16, outputs: u8) -> Self {
        ErrorStatus { value, outputs }
    }

    /// Raw status word, bit n belongs to output n.
    pub fn value(&self) -> u16 {
        self.value
    }

    /// True, if an open or short circuit has been detected on `output`.
    pub fn is_faulty(&self, output: u8) -> bool {
        output < self.outputs && self.value & (1 << output) > 0
    }

    /// True, if any output reports an error.
    pub fn any(&self) -> bool {
        self.value != 0
    }

    /// Indices of all outputs with a detected error, lowest first.
    pub fn faulty_outputs(&self) -> impl Iterator<Item = u8> {
        let status = *self;
        (0..self.outputs).filter(move |&output| status.is_faulty(output))
    }
}

mod seal {
    pub trait Sealed {}
}

/// Marker trait for a device variant.
pub trait DeviceVariant: seal::Sealed {
    /// Number of outputs, which is also the length of the shift register.
    const OUTPUTS: u8;

    /// Name used in log messages.
    const NAME: &'static str;
}

macro_rules! device_variant {
    ($name:ident, $outputs:literal, $chip:literal) => {
        #[doc(hidden)]
        #[derive(Debug, Clone, Copy)]
        pub struct $name;
        impl DeviceVariant for $name {
            const OUTPUTS: u8 = $outputs;
            const NAME: &'static str = $chip;
        }
        impl seal::Sealed for $name {}
    };
}

device_variant!(Variant5916, 8, "TLC5916");
device_variant!(Variant5917, 8, "TLC5917");
device_variant!(Variant5926, 16, "TLC5926");
device_variant!(Variant5927, 16, "TLC5927");

pub type Tlc5916<I, D> = Tlc59xx<Variant5916, I, D>;
pub type Tlc5917<I, D> = Tlc59xx<Variant5917, I, D>;
pub type Tlc5926<I, D> = Tlc59xx<Variant5926, I, D>;
pub type Tlc5927<I, D> = Tlc59xx<Variant5927, I, D>;

macro_rules! warn_debug {
    ($self:ident, $($arg:tt)+) => {
        if $self.debugging {
            log::warn!("[{} #{}] {}", $self.name(), $self.id, format_args!($($arg)+));
        }
    };
}

macro_rules! debug {
    ($self:ident, $($arg:tt)+) => {
        if $self.debugging {
            log::debug!("[{} #{}] {}", $self.name(), $self.id, format_args!($($arg)+));
        }
    };
}

/// Generic driver for all TLC59xx variants.
///
/// Operations that only change the chip's state return `&mut Self`, so they can be
/// chained with `?`. Operations that need a line which isn't wired do nothing and log a
/// warning (if [`Tlc59xx::debug`] is enabled).
pub struct Tlc59xx<DV, I, D> {
    interface: I,
    delay: D,
    /// 0 until attached
    chain_length: u8,
    duty_cycle: bool,
    debugging: bool,
    id: u8,
    mode: Mode,
    _phantom_data: core::marker::PhantomData<DV>,
}

impl<DV: DeviceVariant, I, D, IE> Tlc59xx<DV, I, D>
where
    I: PinAccess<Error = Error<IE>>,
    D: DelayNs,
{
    /// Number of outputs per chip
    pub const OUTPUTS: u8 = DV::OUTPUTS;

    /// Create a new, not yet attached driver. No line is touched until [`Tlc59xx::attach`].
    pub fn new(interface: I, delay: D) -> Self {
        Tlc59xx {
            interface,
            delay,
            chain_length: 0,
            duty_cycle: false,
            debugging: false,
            id: 0,
            mode: Mode::Unknown,
            _phantom_data: core::marker::PhantomData,
        }
    }

    /// Identifier shown in log messages, to tell multiple chains apart.
    pub fn with_id(mut self, id: u8) -> Self {
        self.id = id;
        self
    }

    /// Enable or disable warnings and debug messages.
    pub fn debug(&mut self, enable: bool) -> &mut Self {
        self.debugging = enable;
        self
    }

    fn name(&self) -> &'static str {
        DV::NAME
    }

    pub fn id(&self) -> u8 {
        self.id
    }

    pub fn is_attached(&self) -> bool {
        self.chain_length > 0
    }

    /// Number of chained chips, 0 if not attached.
    pub fn chain_length(&self) -> u8 {
        self.chain_length
    }

    /// Whether /OE is on a PWM capable line, as determined by [`Tlc59xx::attach`].
    pub fn duty_cycle_capable(&self) -> bool {
        self.duty_cycle
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn interface(&self) -> &I {
        &self.interface
    }

    /// Destroys the driver and returns the owned interface and delay.
    pub fn release(self) -> (I, D) {
        (self.interface, self.delay)
    }

    /// Attach a single chip, see [`Tlc59xx::attach_chain`].
    pub fn attach(&mut self) -> Result<&mut Self, Error<IE>> {
        self.attach_chain(1)
    }

    /// Sets up the lines for `chain_length` daisy chained chips and powers the outputs
    /// (if /OE is wired). Can only be done once, later calls are ignored.
    pub fn attach_chain(&mut self, chain_length: u8) -> Result<&mut Self, Error<IE>> {
        if self.is_attached() {
            warn_debug!(self, "Warning, already attached.");
            return Ok(self);
        }

        if chain_length == 0 {
            warn_debug!(self, "Chain length of 0, attaching a single chip.");
        }
        self.chain_length = chain_length.max(1);

        self.interface.configure(Line::Clock, Direction::Output)?;
        self.interface.write_line(Line::Clock, false)?;
        self.interface.configure(Line::DataIn, Direction::Output)?;

        if self.wired(Line::LatchEnable) {
            self.interface.configure(Line::LatchEnable, Direction::Output)?;
            self.interface.write_line(Line::LatchEnable, false)?;
        }

        if self.wired(Line::OutputEnable) {
            self.interface.configure(Line::OutputEnable, Direction::Output)?;
            self.duty_cycle = self.interface.supports_duty_cycle(Line::OutputEnable);
            self.on()?;
        }

        if self.wired(Line::DataOut) {
            // don't sink, the line may be shared by a chain
            self.interface.configure(Line::DataOut, Direction::Input)?;
        }

        debug!(
            self,
            "Attached to {} chip(s), LE: {}, /OE: {} (PWM: {}), SDO: {}",
            self.chain_length,
            self.wired(Line::LatchEnable),
            self.wired(Line::OutputEnable),
            self.duty_cycle,
            self.wired(Line::DataOut)
        );

        Ok(self)
    }

    fn wired(&self, line: Line) -> bool {
        self.interface.is_wired(line)
    }

    /// Checks that the driver is attached and all `lines` are wired. Logs a warning otherwise.
    fn require(&self, lines: &[Line], operation: &str) -> bool {
        if !self.is_attached() {
            warn_debug!(self, "Can't do {}, not attached.", operation);
            return false;
        }

        if let Some(line) = lines.iter().find(|line| !self.wired(**line)) {
            warn_debug!(self, "Can't do {} without {:?}.", operation, line);
            return false;
        }

        true
    }

    /// Shifts `word` into the chain, MSB first, without latching. Only the lower
    /// [`DeviceVariant::OUTPUTS`] bits are shifted.
    pub fn shift(&mut self, word: u16) -> Result<(), Error<IE>> {
        if self.require(&[], "shift()") {
            self.shift_word(word)?;
        }

        Ok(())
    }

    fn shift_word(&mut self, word: u16) -> Result<(), Error<IE>> {
        let bytes = word.to_be_bytes();

        for byte in &bytes[bytes.len() - DV::OUTPUTS as usize / 8..] {
            self.interface.shift_out(BitOrder::MsbFirst, *byte)?;
        }

        Ok(())
    }

    /// Shifts `word` and latches it, if LE is wired.
    pub fn send(&mut self, word: u16) -> Result<&mut Self, Error<IE>> {
        if self.require(&[], "send()") {
            self.shift_word(word)?;
            if self.wired(Line::LatchEnable) {
                self.latch()?;
            }
        }

        Ok(self)
    }

    /// Sets all outputs of all chips in the chain to `level`.
    pub fn all(&mut self, level: PinState) -> Result<&mut Self, Error<IE>> {
        if !self.require(&[], "all()") {
            return Ok(self);
        }

        let fill = match level {
            PinState::High => u16::MAX,
            PinState::Low => 0,
        };

        for _ in 0..self.chain_length {
            self.shift_word(fill)?;
        }

        if self.wired(Line::LatchEnable) {
            self.latch()?;
        }

        Ok(self)
    }

    /// Shifts the lowest `count` bits of `bits`, highest of them first.
    ///
    /// With a non-zero `delay_between_ms` every bit is latched and followed by a delay,
    /// which animates the bits walking through the chain. Otherwise the bits are latched
    /// once at the end.
    pub fn send_bits(
        &mut self,
        count: u8,
        bits: u16,
        delay_between_ms: u32,
    ) -> Result<&mut Self, Error<IE>> {
        if !self.require(&[], "send_bits()") {
            return Ok(self);
        }

        if count > DV::OUTPUTS {
            warn_debug!(self, "send_bits() of {} bits, sending {}.", count, DV::OUTPUTS);
        }
        let count = count.min(DV::OUTPUTS);
        let latch = self.wired(Line::LatchEnable);

        for i in (0..count).rev() {
            self.interface.write_line(Line::DataIn, bits & (1 << i) != 0)?;
            self.interface.write_line(Line::Clock, true)?;
            self.interface.write_line(Line::Clock, false)?;

            if delay_between_ms > 0 {
                if latch {
                    self.latch()?;
                }
                self.delay.delay_ms(delay_between_ms);
            }
        }

        if delay_between_ms == 0 && latch {
            self.latch()?;
        }

        Ok(self)
    }

    /// Pulses LE, which makes the shifted data visible on the outputs.
    pub fn latch_pulse(&mut self) -> Result<&mut Self, Error<IE>> {
        if self.require(&[Line::LatchEnable], "latch_pulse()") {
            self.latch()?;
        }

        Ok(self)
    }

    fn latch(&mut self) -> Result<(), Error<IE>> {
        // LE idles low
        self.interface.write_line(Line::LatchEnable, true)?;
        self.interface.write_line(Line::LatchEnable, false)
    }

    fn play(&mut self, waveform: Waveform) -> Result<(), Error<IE>> {
        for frame in waveform.frames() {
            self.interface.write_line(Line::Clock, frame.clk)?;
            self.interface.write_line(Line::OutputEnable, frame.oe)?;
            self.interface.write_line(Line::LatchEnable, frame.le)?;
        }

        self.interface.write_line(Line::Clock, false)
    }

    /// Plays the transition waveform followed by `target`. Needs LE and /OE.
    fn switch_mode(&mut self, target: Waveform) -> Result<(), Error<IE>> {
        debug!(self, "Switch mode...");

        if self.duty_cycle {
            // PWM output inhibits plain writes
            self.interface.configure(Line::OutputEnable, Direction::Output)?;
        }

        self.mode = Mode::Unknown;
        self.play(Waveform::Transition)?;
        debug!(self, "{}", target.name());
        self.play(target)?;
        self.mode = target.mode();

        Ok(())
    }

    /// Switches the chip (back) to normal mode. Needs LE and /OE.
    pub fn normal_mode(&mut self) -> Result<&mut Self, Error<IE>> {
        if self.require(&[Line::LatchEnable, Line::OutputEnable], "normal_mode()") {
            self.switch_mode(Waveform::Normal)?;
        }

        Ok(self)
    }

    /// Turns all outputs on, so there is a defined state to detect errors on or to
    /// configure from. Needs LE.
    fn send_all_on(&mut self) -> Result<(), Error<IE>> {
        self.shift_word(u16::MAX)?;
        self.latch()
    }

    /// Reads the error status of the first chip in the chain, bit n being output n. A
    /// set bit signals an open or shorted LED. Needs LE, /OE and SDO, returns 0 without.
    ///
    /// All outputs are turned on for detection, the previous pattern is not restored.
    /// The chip is back in normal mode afterwards.
    pub fn error_detect(&mut self) -> Result<u16, Error<IE>> {
        if !self.require(
            &[Line::LatchEnable, Line::OutputEnable, Line::DataOut],
            "error_detect()",
        ) {
            return Ok(0);
        }

        self.send_all_on()?;
        self.switch_mode(Waveform::ErrorDetect)?;
        self.delay.delay_us(T_ERROR_DETECT_US);

        debug!(self, "Read status...");
        self.play(Waveform::ErrorDetectReady)?;

        self.interface.configure(Line::DataOut, Direction::Input)?;
        // SDI is clocked in while SDO is clocked out
        self.interface.write_line(Line::DataIn, false)?;

        let status = self.read_status()?;
        debug!(self, "Error detect status {:0width$b}", status, width = DV::OUTPUTS as usize);

        self.interface.configure(Line::DataOut, Direction::Output)?;
        self.switch_mode(Waveform::Normal)?;

        Ok(status)
    }

    /// Like [`Tlc59xx::error_detect`], wrapped in an [`ErrorStatus`].
    pub fn error_status(&mut self) -> Result<ErrorStatus, Error<IE>> {
        let status = self.error_detect()?;
        Ok(ErrorStatus::from_reg_value(status, DV::OUTPUTS))
    }

    fn read_status(&mut self) -> Result<u16, Error<IE>> {
        if self.mode != Mode::ErrorDetect {
            warn_debug!(self, "Can't read status in {:?} mode.", self.mode);
            return Ok(0);
        }

        let mut status = 0u16;

        for _ in 0..DV::OUTPUTS {
            let bit = self.interface.read_line(Line::DataOut)?;
            status = (status << 1) | bit as u16;

            self.interface.write_line(Line::Clock, true)?;
            self.interface.write_line(Line::Clock, false)?;
        }

        Ok(status)
    }

    /// Samples SDO once. Returns low if SDO is not wired.
    pub fn read_sdo(&mut self) -> Result<PinState, Error<IE>> {
        if !self.require(&[Line::DataOut], "read_sdo()") {
            return Ok(PinState::Low);
        }

        self.interface.configure(Line::DataOut, Direction::Input)?;
        let level = self.interface.read_line(Line::DataOut)?;

        Ok(PinState::from(level))
    }

    /// Writes the configuration register. Needs LE and /OE.
    ///
    /// `voltage_gain` is accepted as 0..127, but only its lower 6 bits are written.
    pub fn config(
        &mut self,
        hi_lo_current: bool,
        hi_lo_voltage_band: bool,
        voltage_gain: u8,
    ) -> Result<&mut Self, Error<IE>> {
        self.configure(&Configuration::new(
            hi_lo_current.into(),
            hi_lo_voltage_band.into(),
            voltage_gain,
        ))
    }

    /// Writes `configuration` to the configuration register of every chip in the chain
    /// that sees it. Needs LE and /OE. The chip is back in normal mode afterwards.
    pub fn configure(&mut self, configuration: &Configuration) -> Result<&mut Self, Error<IE>> {
        if !self.require(&[Line::LatchEnable, Line::OutputEnable], "config()") {
            return Ok(self);
        }

        if configuration.gain_truncated() {
            warn_debug!(
                self,
                "Voltage gain {} doesn't fit 6 bits, writing {}.",
                configuration.voltage_gain(),
                configuration.register_value() & configuration::VOLTAGE_GAIN_MASK
            );
        }

        self.send_all_on()?;
        self.switch_mode(Waveform::Configuration)?;

        // zero padding MSB first, then the register LSB first (CM, HC, CC0..CC5 end up
        // in the right place)
        for _ in 1..DV::OUTPUTS / 8 {
            self.interface.shift_out(BitOrder::MsbFirst, 0)?;
        }
        self.interface
            .shift_out(BitOrder::LsbFirst, configuration.register_value())?;

        self.latch()?;
        self.switch_mode(Waveform::Normal)?;

        Ok(self)
    }

    fn set_output_enable(&mut self, enable: bool) -> Result<(), Error<IE>> {
        if self.duty_cycle {
            // PWM output inhibits plain writes
            self.interface.configure(Line::OutputEnable, Direction::Output)?;
        }

        // /OE is active low
        self.interface.write_line(Line::OutputEnable, !enable)
    }

    /// Powers the outputs. Needs /OE.
    pub fn on(&mut self) -> Result<&mut Self, Error<IE>> {
        if self.require(&[Line::OutputEnable], "on()") {
            debug!(self, "ON");
            self.set_output_enable(true)?;
        }

        Ok(self)
    }

    /// Turns the outputs off, the shifted pattern is kept. Needs /OE.
    pub fn off(&mut self) -> Result<&mut Self, Error<IE>> {
        if self.require(&[Line::OutputEnable], "off()") {
            debug!(self, "OFF");
            self.set_output_enable(false)?;
        }

        Ok(self)
    }

    /// Dims all outputs to `brightness`/255 by driving /OE with a duty cycle. Needs /OE
    /// on a PWM capable line.
    pub fn brightness(&mut self, brightness: u8) -> Result<&mut Self, Error<IE>> {
        if !self.require(&[Line::OutputEnable], "brightness()") {
            return Ok(self);
        }

        if !self.duty_cycle {
            warn_debug!(self, "Warning, /OE is not on a PWM.");
            return Ok(self);
        }

        // /OE is active low
        self.interface
            .set_duty_cycle(Line::OutputEnable, u8::MAX - brightness)?;

        Ok(self)
    }

    /// Brings the chain into a known state: normal mode, outputs off, all shift register
    /// bits cleared, default configuration, outputs on. Steps needing unwired lines are
    /// skipped.
    ///
    /// Writing the configuration latches all outputs on, so with LE and /OE wired the
    /// first chip of the chain ends up fully lit. Send a pattern afterwards to clear it.
    pub fn reset(&mut self) -> Result<&mut Self, Error<IE>> {
        if !self.require(&[], "reset()") {
            return Ok(self);
        }

        let le = self.wired(Line::LatchEnable);
        let oe = self.wired(Line::OutputEnable);

        if self.duty_cycle {
            self.interface.configure(Line::OutputEnable, Direction::Output)?;
        }

        if le && oe {
            self.normal_mode()?;
        }

        if oe {
            self.off()?;
        }

        if self.wired(Line::DataOut) {
            self.interface.configure(Line::DataOut, Direction::Input)?;
        }

        self.all(PinState::Low)?;

        if le && oe {
            self.configure(&Configuration::default())?;
        }

        if oe {
            self.on()?;
        }

        Ok(self)
    }

    /// Flashes the current pattern: off, wait `bracket_ms`, on, wait `on_ms`, off, wait
    /// `bracket_ms`, and on again if `leave_on`. Needs /OE.
    pub fn flash(
        &mut self,
        on_ms: u32,
        bracket_ms: u32,
        leave_on: bool,
    ) -> Result<&mut Self, Error<IE>> {
        self.off()?;
        self.delay.delay_ms(bracket_ms);
        self.on()?;
        self.delay.delay_ms(on_ms);
        self.off()?;
        self.delay.delay_ms(bracket_ms);

        if leave_on {
            self.on()?;
        }

        Ok(self)
    }

    pub fn delay_ms(&mut self, ms: u32) -> Result<&mut Self, Error<IE>> {
        self.delay.delay_ms(ms);
        Ok(self)
    }

    pub fn delay_us(&mut self, us: u32) -> Result<&mut Self, Error<IE>> {
        self.delay.delay_us(us);
        Ok(self)
    }
}

#[cfg(test)]
impl<DV, D> Tlc59xx<DV, interface::mock::MockInterface, D> {
    pub(crate) fn mock(&mut self) -> &mut interface::mock::MockInterface {
        &mut self.interface
    }
}
