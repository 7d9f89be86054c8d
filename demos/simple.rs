use embedded_hal::delay::DelayNs;
use tlc59xx::{interface::GpioInterface, ConfigBuilder, CurrentRange, PinState, Tlc5926};

fn main() {
    // placeholders, replace with instances from your HAL
    let sdi = embedded_hal_mock::eh1::digital::Mock::new(&[]);
    let clk = embedded_hal_mock::eh1::digital::Mock::new(&[]);
    let le = embedded_hal_mock::eh1::digital::Mock::new(&[]);
    let oe = embedded_hal_mock::eh1::digital::Mock::new(&[]);
    let mut delay = embedded_hal_mock::eh1::delay::NoopDelay::new();

    let interface = GpioInterface::new(sdi, clk)
        .with_latch_enable(le)
        .with_output_enable(oe);
    let mut shift_register = Tlc5926::new(
        interface,
        embedded_hal_mock::eh1::delay::NoopDelay::new(),
    );

    shift_register
        .debug(true)
        .attach()
        .unwrap()
        .off()
        .unwrap()
        .reset()
        .unwrap();

    let config = ConfigBuilder::new()
        .current_range(CurrentRange::High)
        .voltage_gain(48)
        .build();
    shift_register.configure(&config).unwrap();

    let marquee = [
        0b0001_1000,
        0b0011_1100,
        0b0110_0110,
        0b1100_0011,
        0b1000_0001,
        0b0000_0000,
    ];

    loop {
        // alternate on/off, flicker free because LE is wired
        shift_register.send(0xAAAA).unwrap();
        delay.delay_ms(1000);
        shift_register.send(0x5555).unwrap();
        delay.delay_ms(1000);

        shift_register
            .off()
            .unwrap()
            .all(PinState::Low)
            .unwrap()
            .on()
            .unwrap();

        // walk 4 bits in, one at a time
        shift_register.send_bits(4, 0x8, 200).unwrap();

        for pattern in marquee {
            shift_register.send(pattern).unwrap();
            delay.delay_ms(200);
        }

        // shift without latching, then show the pattern
        shift_register.shift(0x0808).unwrap();
        shift_register
            .latch_pulse()
            .unwrap()
            .flash(tlc59xx::DEFAULT_FLASH_ON_MS, tlc59xx::DEFAULT_FLASH_BRACKET_MS, true)
            .unwrap();
    }
}
