//! Fixed clock / output-enable / latch-enable waveforms used to move the chip
//! between its operating modes.
//!
//! Timing diagrams: <https://www.ti.com/lit/ds/symlink/tlc5926.pdf> (section "Operating
//! Mode Switching").

use crate::Mode;

/// One step of a waveform: the levels driven on CLK, /OE and LE at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub clk: bool,
    pub oe: bool,
    pub le: bool,
}

const fn f(clk: bool, oe: bool, le: bool) -> Frame {
    Frame { clk, oe, le }
}

const L: bool = false;
const H: bool = true;

// CLK -+-+-+
// /OE ++--++  /OE low for less than 2µs
// LE  ------
const TRANSITION: [Frame; 6] = [
    f(L, H, L),
    f(H, H, L),
    f(L, L, L),
    f(H, L, L),
    f(L, H, L),
    f(H, H, L),
];

// CLK -+-+
// /OE ++++
// LE  ----
const NORMAL: [Frame; 4] = [
    f(L, H, L),
    f(H, H, L),
    // fill
    f(L, H, L),
    f(H, H, L),
];

// CLK -+-+
// /OE ++++
// LE  ++--
const CONFIGURATION: [Frame; 4] = [
    f(L, H, H),
    f(H, H, H),
    // fill
    f(L, H, L),
    f(H, H, L),
];

// CLK -+-+-+-+
// /OE ++++----
// LE  ++------
// Outputs sink current from the first /OE low on.
const ERROR_DETECT: [Frame; 8] = [
    f(L, H, H),
    f(H, H, H),
    // fill
    f(L, H, L),
    f(H, H, L),
    // /OE low, 1 of 3
    f(L, L, L),
    f(H, L, L),
    // /OE low, 2 of 3
    f(L, L, L),
    f(H, L, L),
];

// /OE low 3 of 3, then back high without a clock edge. Status is valid on SDO afterwards.
const ERROR_DETECT_READY: [Frame; 3] = [f(L, L, L), f(H, L, L), f(L, H, L)];

/// Waveform tables. Each variant names exactly one hardware-mandated table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    /// "Enter special mode" gesture, played before every mode table.
    Transition,
    Normal,
    Configuration,
    ErrorDetect,
    /// Completes the /OE arming sequence after [`Waveform::ErrorDetect`].
    ErrorDetectReady,
}

impl Waveform {
    pub const fn frames(self) -> &'static [Frame] {
        match self {
            Waveform::Transition => &TRANSITION,
            Waveform::Normal => &NORMAL,
            Waveform::Configuration => &CONFIGURATION,
            Waveform::ErrorDetect => &ERROR_DETECT,
            Waveform::ErrorDetectReady => &ERROR_DETECT_READY,
        }
    }

    /// Mode the chip is in once this table has been played after [`Waveform::Transition`].
    pub const fn mode(self) -> Mode {
        match self {
            Waveform::Normal => Mode::Normal,
            Waveform::Configuration => Mode::Configuration,
            Waveform::ErrorDetect | Waveform::ErrorDetectReady => Mode::ErrorDetect,
            Waveform::Transition => Mode::Unknown,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Waveform::Transition => "transition",
            Waveform::Normal => "normal mode",
            Waveform::Configuration => "configuration mode",
            Waveform::ErrorDetect => "error detect mode",
            Waveform::ErrorDetectReady => "error detect ready",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock_edges(frames: &[Frame]) -> usize {
        frames
            .windows(2)
            .filter(|pair| !pair[0].clk && pair[1].clk)
            .count()
    }

    #[test]
    fn test_transition_pulses_oe_once() {
        let frames = Waveform::Transition.frames();

        assert_eq!(clock_edges(frames), 3);
        assert!(frames.iter().all(|frame| !frame.le));
        assert_eq!(frames.iter().filter(|frame| !frame.oe).count(), 2);
        assert!(frames.last().unwrap().oe);
    }

    #[test]
    fn test_mode_tables_mark_le() {
        assert!(Waveform::Normal.frames().iter().all(|frame| !frame.le));
        assert!(Waveform::Configuration.frames()[..2].iter().all(|frame| frame.le));
        assert!(Waveform::ErrorDetect.frames()[..2].iter().all(|frame| frame.le && frame.oe));
    }

    #[test]
    fn test_error_detect_arms_oe_three_times() {
        let low_pulses = Waveform::ErrorDetect
            .frames()
            .iter()
            .chain(Waveform::ErrorDetectReady.frames())
            .filter(|frame| !frame.oe && frame.clk)
            .count();

        assert_eq!(low_pulses, 3);

        let last = Waveform::ErrorDetectReady.frames().last().unwrap();
        assert!(!last.clk && last.oe);
    }

    #[test]
    fn test_modes() {
        assert_eq!(Waveform::Normal.mode(), Mode::Normal);
        assert_eq!(Waveform::Configuration.mode(), Mode::Configuration);
        assert_eq!(Waveform::ErrorDetect.mode(), Mode::ErrorDetect);
        assert_eq!(Waveform::Transition.mode(), Mode::Unknown);
    }
}
