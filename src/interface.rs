use core::convert::Infallible;

use embedded_hal::digital::{self, InputPin, OutputPin, PinState};
use embedded_hal::pwm::{self, SetDutyCycle};

use crate::Error;

/// Logical signal lines of the chip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Line {
    /// SDI, serial data in
    DataIn,
    /// CLK
    Clock,
    /// LE(ED1), latch enable
    LatchEnable,
    /// /OE(ED2), output enable (active low)
    OutputEnable,
    /// SDO, serial data out / error status
    DataOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BitOrder {
    MsbFirst,
    LsbFirst,
}

/// Trait for giving access to the chip's signal lines.
///
/// Levels are electrical: `true` is high. Writes to lines that aren't wired are ignored,
/// reads from them return low.
pub trait PinAccess {
    type Error;

    /// Whether `line` is connected.
    fn is_wired(&self, line: Line) -> bool;

    fn configure(&mut self, line: Line, direction: Direction) -> Result<(), Self::Error>;

    fn write_line(&mut self, line: Line, level: bool) -> Result<(), Self::Error>;

    fn read_line(&mut self, line: Line) -> Result<bool, Self::Error>;

    /// Whether `line` can output a hardware duty cycle.
    fn supports_duty_cycle(&self, line: Line) -> bool;

    /// Drives a duty cycle of `duty`/255 on `line`.
    fn set_duty_cycle(&mut self, line: Line, duty: u8) -> Result<(), Self::Error>;

    /// Clocks `value` out on SDI/CLK, one clock pulse per bit. CLK is expected to idle low.
    fn shift_out(&mut self, order: BitOrder, value: u8) -> Result<(), Self::Error> {
        for i in 0..8 {
            let bit = match order {
                BitOrder::MsbFirst => value & (0x80 >> i),
                BitOrder::LsbFirst => value & (1 << i),
            };

            self.write_line(Line::DataIn, bit != 0)?;
            self.write_line(Line::Clock, true)?;
            self.write_line(Line::Clock, false)?;
        }

        Ok(())
    }
}

/// Error of a [`GpioInterface`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GpioError {
    Digital(digital::ErrorKind),
    Pwm(pwm::ErrorKind),
}

impl From<GpioError> for Error<GpioError> {
    fn from(error: GpioError) -> Self {
        Error::Interface(error)
    }
}

fn digital_error<E: digital::Error>(error: E) -> GpioError {
    GpioError::Digital(error.kind())
}

fn pwm_error<E: pwm::Error>(error: E) -> GpioError {
    GpioError::Pwm(error.kind())
}

/// Placeholder for a line that isn't connected.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPin;

impl digital::ErrorType for NoPin {
    type Error = Infallible;
}

impl OutputPin for NoPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

impl InputPin for NoPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(false)
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(true)
    }
}

/// Driver side of the /OE line.
pub trait OutputEnableLine {
    /// Whether this line can be driven with a duty cycle.
    const DUTY_CYCLE: bool;

    /// Called when the driver needs plain levels on the line again.
    fn configure(&mut self, _direction: Direction) -> Result<(), GpioError> {
        Ok(())
    }

    fn set_level(&mut self, high: bool) -> Result<(), GpioError>;

    /// Drives `duty`/255. Lines without duty cycle support round to fully on/off.
    fn set_duty(&mut self, duty: u8) -> Result<(), GpioError>;
}

impl OutputEnableLine for NoPin {
    const DUTY_CYCLE: bool = false;

    fn set_level(&mut self, _high: bool) -> Result<(), GpioError> {
        Ok(())
    }

    fn set_duty(&mut self, _duty: u8) -> Result<(), GpioError> {
        Ok(())
    }
}

/// /OE on a plain digital output.
#[derive(Debug)]
pub struct DigitalOutputEnable<P>(pub P);

impl<P: OutputPin> OutputEnableLine for DigitalOutputEnable<P> {
    const DUTY_CYCLE: bool = false;

    fn set_level(&mut self, high: bool) -> Result<(), GpioError> {
        self.0.set_state(PinState::from(high)).map_err(digital_error)
    }

    fn set_duty(&mut self, duty: u8) -> Result<(), GpioError> {
        self.set_level(duty >= 128)
    }
}

/// A PWM channel whose pin can be switched back to a plain digital output.
///
/// On most MCUs a pin in PWM mode ignores GPIO writes, so the pin has to be handed back
/// to the GPIO peripheral before levels can be driven on it.
pub trait PwmPin: SetDutyCycle {
    /// Leaves PWM mode, the pin is a digital output afterwards.
    fn enter_digital(&mut self) -> Result<(), Self::Error>;

    /// Hands the pin (back) to the PWM peripheral.
    fn enter_pwm(&mut self) -> Result<(), Self::Error>;

    /// Drives a level while in digital mode.
    fn write_level(&mut self, high: bool) -> Result<(), Self::Error>;
}

/// /OE on a PWM channel.
///
/// Levels are driven in digital mode, duty cycles in PWM mode. The mode is switched on
/// demand, the channel is assumed to start out in PWM mode.
#[derive(Debug)]
pub struct PwmOutputEnable<C> {
    channel: C,
    pwm: bool,
}

impl<C: PwmPin> PwmOutputEnable<C> {
    pub fn new(channel: C) -> Self {
        Self { channel, pwm: true }
    }

    pub fn into_inner(self) -> C {
        self.channel
    }

    fn enter_digital(&mut self) -> Result<(), GpioError> {
        if self.pwm {
            self.channel.enter_digital().map_err(pwm_error)?;
            self.pwm = false;
        }

        Ok(())
    }
}

impl<C: PwmPin> OutputEnableLine for PwmOutputEnable<C> {
    const DUTY_CYCLE: bool = true;

    fn configure(&mut self, direction: Direction) -> Result<(), GpioError> {
        match direction {
            Direction::Output => self.enter_digital(),
            Direction::Input => Ok(()),
        }
    }

    fn set_level(&mut self, high: bool) -> Result<(), GpioError> {
        self.enter_digital()?;
        self.channel.write_level(high).map_err(pwm_error)
    }

    fn set_duty(&mut self, duty: u8) -> Result<(), GpioError> {
        if !self.pwm {
            self.channel.enter_pwm().map_err(pwm_error)?;
            self.pwm = true;
        }

        self.channel
            .set_duty_cycle_fraction(duty as u16, u8::MAX as u16)
            .map_err(pwm_error)
    }
}

/// [`PinAccess`] over `embedded-hal` pins.
///
/// Pin directions are fixed by the HAL pin types, so direction changes requested by the
/// driver don't have an electrical effect here: SDI, CLK and LE are outputs, SDO is an
/// input (which keeps it from disturbing a chained SDO line). The exception is a PWM
/// /OE, which is taken out of PWM mode when configured as an output.
pub struct GpioInterface<SDI, CLK, LE = NoPin, OE = NoPin, SDO = NoPin> {
    pub(crate) sdi: SDI,
    pub(crate) clk: CLK,
    pub(crate) le: Option<LE>,
    pub(crate) oe: Option<OE>,
    pub(crate) sdo: Option<SDO>,
}

impl<SDI: OutputPin, CLK: OutputPin> GpioInterface<SDI, CLK> {
    /// Minimal two wire setup: LE tied to CLK, /OE tied to GND.
    pub fn new(sdi: SDI, clk: CLK) -> Self {
        Self {
            sdi,
            clk,
            le: None,
            oe: None,
            sdo: None,
        }
    }
}

impl<SDI, CLK, LE, OE, SDO> GpioInterface<SDI, CLK, LE, OE, SDO> {
    pub fn with_latch_enable<P: OutputPin>(self, le: P) -> GpioInterface<SDI, CLK, P, OE, SDO> {
        GpioInterface {
            sdi: self.sdi,
            clk: self.clk,
            le: Some(le),
            oe: self.oe,
            sdo: self.sdo,
        }
    }

    /// Connects /OE to a plain digital output. Brightness control is not available.
    pub fn with_output_enable<P: OutputPin>(
        self,
        oe: P,
    ) -> GpioInterface<SDI, CLK, LE, DigitalOutputEnable<P>, SDO> {
        GpioInterface {
            sdi: self.sdi,
            clk: self.clk,
            le: self.le,
            oe: Some(DigitalOutputEnable(oe)),
            sdo: self.sdo,
        }
    }

    /// Connects /OE to a PWM channel, enabling brightness control.
    pub fn with_pwm_output_enable<C: PwmPin>(
        self,
        oe: C,
    ) -> GpioInterface<SDI, CLK, LE, PwmOutputEnable<C>, SDO> {
        GpioInterface {
            sdi: self.sdi,
            clk: self.clk,
            le: self.le,
            oe: Some(PwmOutputEnable::new(oe)),
            sdo: self.sdo,
        }
    }

    pub fn with_data_out<P: InputPin>(self, sdo: P) -> GpioInterface<SDI, CLK, LE, OE, P> {
        GpioInterface {
            sdi: self.sdi,
            clk: self.clk,
            le: self.le,
            oe: self.oe,
            sdo: Some(sdo),
        }
    }

    /// Destroys the interface and returns the pins (SDI, CLK, LE, /OE, SDO).
    pub fn release(self) -> (SDI, CLK, Option<LE>, Option<OE>, Option<SDO>) {
        (self.sdi, self.clk, self.le, self.oe, self.sdo)
    }
}

impl<SDI, CLK, LE, OE, SDO> PinAccess for GpioInterface<SDI, CLK, LE, OE, SDO>
where
    SDI: OutputPin,
    CLK: OutputPin,
    LE: OutputPin,
    OE: OutputEnableLine,
    SDO: InputPin,
{
    type Error = Error<GpioError>;

    fn is_wired(&self, line: Line) -> bool {
        match line {
            Line::DataIn | Line::Clock => true,
            Line::LatchEnable => self.le.is_some(),
            Line::OutputEnable => self.oe.is_some(),
            Line::DataOut => self.sdo.is_some(),
        }
    }

    fn configure(&mut self, line: Line, direction: Direction) -> Result<(), Self::Error> {
        if let (Line::OutputEnable, Some(oe)) = (line, self.oe.as_mut()) {
            oe.configure(direction)?;
        }

        Ok(())
    }

    fn write_line(&mut self, line: Line, level: bool) -> Result<(), Self::Error> {
        let state = PinState::from(level);

        match line {
            Line::DataIn => self.sdi.set_state(state).map_err(digital_error)?,
            Line::Clock => self.clk.set_state(state).map_err(digital_error)?,
            Line::LatchEnable => {
                if let Some(le) = self.le.as_mut() {
                    le.set_state(state).map_err(digital_error)?;
                }
            }
            Line::OutputEnable => {
                if let Some(oe) = self.oe.as_mut() {
                    oe.set_level(level)?;
                }
            }
            Line::DataOut => {}
        }

        Ok(())
    }

    fn read_line(&mut self, line: Line) -> Result<bool, Self::Error> {
        match (line, self.sdo.as_mut()) {
            (Line::DataOut, Some(sdo)) => Ok(sdo.is_high().map_err(digital_error)?),
            _ => Ok(false),
        }
    }

    fn supports_duty_cycle(&self, line: Line) -> bool {
        line == Line::OutputEnable && self.oe.is_some() && OE::DUTY_CYCLE
    }

    fn set_duty_cycle(&mut self, line: Line, duty: u8) -> Result<(), Self::Error> {
        if let (Line::OutputEnable, Some(oe)) = (line, self.oe.as_mut()) {
            oe.set_duty(duty)?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::mock::{PwmEvent, RecordingPwm};
    use super::*;
    use embedded_hal_mock::eh1::digital::{
        Mock as PinMock, State as PinMockState, Transaction as PinTransaction,
    };

    #[test]
    fn test_shift_out_msb_first() {
        let mut sdi = PinMock::new(&[
            PinTransaction::set(PinMockState::High),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::High),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::High),
        ]);
        let clk_expectations: Vec<_> = (0..8)
            .flat_map(|_| {
                [
                    PinTransaction::set(PinMockState::High),
                    PinTransaction::set(PinMockState::Low),
                ]
            })
            .collect();
        let mut clk = PinMock::new(&clk_expectations);

        let mut gpio_if = GpioInterface::new(sdi.clone(), clk.clone());
        gpio_if.shift_out(BitOrder::MsbFirst, 0b1010_0001).unwrap();

        sdi.done();
        clk.done();
    }

    #[test]
    fn test_shift_out_lsb_first() {
        let mut sdi = PinMock::new(&[
            PinTransaction::set(PinMockState::High),
            PinTransaction::set(PinMockState::High),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::Low),
            PinTransaction::set(PinMockState::Low),
        ]);
        let clk_expectations: Vec<_> = (0..8)
            .flat_map(|_| {
                [
                    PinTransaction::set(PinMockState::High),
                    PinTransaction::set(PinMockState::Low),
                ]
            })
            .collect();
        let mut clk = PinMock::new(&clk_expectations);

        let mut gpio_if = GpioInterface::new(sdi.clone(), clk.clone());
        gpio_if.shift_out(BitOrder::LsbFirst, 0b0000_0011).unwrap();

        sdi.done();
        clk.done();
    }

    #[test]
    fn test_two_wire_ignores_missing_lines() {
        let mut sdi = PinMock::new(&[]);
        let mut clk = PinMock::new(&[]);

        let mut gpio_if = GpioInterface::new(sdi.clone(), clk.clone());

        assert!(gpio_if.is_wired(Line::DataIn));
        assert!(gpio_if.is_wired(Line::Clock));
        assert!(!gpio_if.is_wired(Line::LatchEnable));
        assert!(!gpio_if.is_wired(Line::OutputEnable));
        assert!(!gpio_if.is_wired(Line::DataOut));
        assert!(!gpio_if.supports_duty_cycle(Line::OutputEnable));

        gpio_if.write_line(Line::LatchEnable, true).unwrap();
        gpio_if.write_line(Line::OutputEnable, true).unwrap();
        assert!(!gpio_if.read_line(Line::DataOut).unwrap());

        sdi.done();
        clk.done();
    }

    #[test]
    fn test_latch_and_output_enable() {
        let mut le = PinMock::new(&[
            PinTransaction::set(PinMockState::High),
            PinTransaction::set(PinMockState::Low),
        ]);
        let mut oe = PinMock::new(&[PinTransaction::set(PinMockState::Low)]);
        let mut sdo = PinMock::new(&[PinTransaction::get(PinMockState::High)]);

        let mut gpio_if = GpioInterface::new(PinMock::new(&[]), PinMock::new(&[]))
            .with_latch_enable(le.clone())
            .with_output_enable(oe.clone())
            .with_data_out(sdo.clone());

        assert!(gpio_if.is_wired(Line::LatchEnable));
        assert!(gpio_if.is_wired(Line::OutputEnable));
        assert!(gpio_if.is_wired(Line::DataOut));
        assert!(!gpio_if.supports_duty_cycle(Line::OutputEnable));

        gpio_if.write_line(Line::LatchEnable, true).unwrap();
        gpio_if.write_line(Line::LatchEnable, false).unwrap();
        gpio_if.write_line(Line::OutputEnable, false).unwrap();
        assert!(gpio_if.read_line(Line::DataOut).unwrap());

        let (mut sdi, mut clk, _, _, _) = gpio_if.release();
        sdi.done();
        clk.done();
        le.done();
        oe.done();
        sdo.done();
    }

    #[test]
    fn test_pwm_output_enable() {
        let mut gpio_if =
            GpioInterface::new(NoPin, NoPin).with_pwm_output_enable(RecordingPwm::default());

        assert!(gpio_if.supports_duty_cycle(Line::OutputEnable));
        assert!(!gpio_if.supports_duty_cycle(Line::LatchEnable));

        gpio_if.set_duty_cycle(Line::OutputEnable, 55).unwrap();
        gpio_if.write_line(Line::OutputEnable, false).unwrap();
        gpio_if.write_line(Line::OutputEnable, true).unwrap();
        gpio_if.set_duty_cycle(Line::OutputEnable, 200).unwrap();

        let (_, _, _, oe, _) = gpio_if.release();
        assert_eq!(
            oe.unwrap().into_inner().events,
            vec![
                PwmEvent::Duty(55),
                PwmEvent::Digital,
                PwmEvent::Level(false),
                PwmEvent::Level(true),
                PwmEvent::Pwm,
                PwmEvent::Duty(200),
            ]
        );
    }

    #[test]
    fn test_pwm_output_enable_configure_leaves_pwm() {
        let mut gpio_if =
            GpioInterface::new(NoPin, NoPin).with_pwm_output_enable(RecordingPwm::default());

        gpio_if.set_duty_cycle(Line::OutputEnable, 10).unwrap();
        gpio_if.configure(Line::OutputEnable, Direction::Output).unwrap();
        // already digital, nothing to do
        gpio_if.configure(Line::OutputEnable, Direction::Output).unwrap();
        gpio_if.configure(Line::OutputEnable, Direction::Input).unwrap();
        gpio_if.configure(Line::LatchEnable, Direction::Output).unwrap();

        let (_, _, _, oe, _) = gpio_if.release();
        assert_eq!(
            oe.unwrap().into_inner().events,
            vec![PwmEvent::Duty(10), PwmEvent::Digital]
        );
    }
}
