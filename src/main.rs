//! Audio Interface Main Application
//!
//! Entry point for the STM32G474-based USB audio interface firmware.
//! Initializes hardware, registers the audio control handler with the USB
//! stack and spawns the bus tasks.

#![no_std]
#![no_main]

use defmt::{info, unwrap};
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_stm32::gpio::{Level, Output, Speed};
use embassy_stm32::usb::Driver;
use embassy_stm32::{bind_interrupts, peripherals, usb};
use embassy_usb::{Builder, UsbDevice};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use audio_interface::hal::bus::I2sPins;
use audio_interface::prelude::*;
use audio_interface::usb::class::{AudioControlHandler, SETTINGS};

bind_interrupts!(struct Irqs {
    USB_LP => usb::InterruptHandler<peripherals::USB>;
});

type UsbDriver = Driver<'static, peripherals::USB>;

/// Period of one transmitter tick when bit-banging the bus
const BUS_TICK: Duration = Duration::from_micros(10);

/// Audio class function codes (UAC3 audio control interface)
const AUDIO_CLASS: u8 = 0x01;
const AUDIO_CONTROL_SUBCLASS: u8 = 0x01;
const UAC3_PROTOCOL: u8 = 0x30;

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Audio Interface Firmware v{}", env!("CARGO_PKG_VERSION"));

    let mut config = embassy_stm32::Config::default();
    {
        use embassy_stm32::rcc::{mux, Hsi48Config};
        // USB needs a 48 MHz clock trimmed against SOF
        config.rcc.hsi48 = Some(Hsi48Config { sync_from_usb: true });
        config.rcc.mux.clk48sel = mux::Clk48sel::HSI48;
    }
    let p = embassy_stm32::init(config);

    info!("Peripherals initialized");

    // Status LED (PA5 on Nucleo boards)
    let led = Output::new(p.PA5, Level::Low, Speed::Low);

    // I2S bus: PB13 = BCLK, PB12 = LRCLK, PB15 = SDATA
    let bus = I2sPins::new(
        Output::new(p.PB13, Level::High, Speed::VeryHigh),
        Output::new(p.PB12, Level::Low, Speed::VeryHigh),
        Output::new(p.PB15, Level::Low, Speed::VeryHigh),
    );

    let driver = Driver::new(p.USB, Irqs, p.PA12, p.PA11);
    let device = build_usb_device(driver);

    info!("USB initialized ({=u16:#x}:{=u16:#x})", USB_VID, USB_PID);

    unwrap!(spawner.spawn(usb_task(device)));
    unwrap!(spawner.spawn(i2s_task(bus)));
    unwrap!(spawner.spawn(heartbeat_task(led)));

    info!("Tasks spawned");
}

/// Describe the device and register the audio control handler
fn build_usb_device(driver: UsbDriver) -> UsbDevice<'static, UsbDriver> {
    static CONFIG_DESC: StaticCell<[u8; 256]> = StaticCell::new();
    static BOS_DESC: StaticCell<[u8; 256]> = StaticCell::new();
    static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();
    static HANDLER: StaticCell<AudioControlHandler<'static>> = StaticCell::new();

    let mut usb_config = embassy_usb::Config::new(USB_VID, USB_PID);
    usb_config.manufacturer = Some("Audio Interface Project");
    usb_config.product = Some("USB Audio Interface");
    usb_config.serial_number = Some("000001");
    usb_config.max_packet_size_0 = USB_CONTROL_PACKET_SIZE;

    let mut builder = Builder::new(
        driver,
        usb_config,
        CONFIG_DESC.init([0; 256]),
        BOS_DESC.init([0; 256]),
        &mut [],
        CONTROL_BUF.init([0; 64]),
    );

    {
        let mut function = builder.function(AUDIO_CLASS, AUDIO_CONTROL_SUBCLASS, UAC3_PROTOCOL);
        let mut interface = function.interface();
        let _ = interface.alt_setting(AUDIO_CLASS, AUDIO_CONTROL_SUBCLASS, UAC3_PROTOCOL, None);
    }

    builder.handler(HANDLER.init(AudioControlHandler::new(&SETTINGS)));
    builder.build()
}

/// USB device task - services the control pipe
#[embassy_executor::task]
async fn usb_task(mut device: UsbDevice<'static, UsbDriver>) -> ! {
    device.run().await
}

/// I2S bus task - ticks the transmitter and follows the power domain
#[embassy_executor::task]
async fn i2s_task(mut bus: I2sPins<Output<'static>, Output<'static>, Output<'static>>) {
    let mut transmitter = I2sTransmitter::new();
    let mut samples = SampleRegisters::default();
    let mut clock = DEFAULT_CLOCK;
    let mut phase: u16 = 0;
    let mut ticker = Ticker::every(BUS_TICK);

    info!(
        "I2S bus: divider={} width={} ({} Hz frames at full rate)",
        clock.divider(),
        clock.sample_width(),
        clock.sample_rate_hz(SYSTEM_CLOCK_HZ)
    );

    loop {
        match select(SETTINGS.wait(), ticker.next()).await {
            Either::First(settings) => {
                let active = settings
                    .power_state()
                    .is_some_and(PowerDomainState::is_active);
                clock = if active {
                    DEFAULT_CLOCK
                } else {
                    ClockConfiguration::DISABLED
                };
                if !active {
                    let Ok(()) = bus.park();
                }
                info!("I2S bus {}", if active { "enabled" } else { "disabled" });
            }
            Either::Second(()) => {
                let lines = transmitter.tick(clock, &samples);
                // Parked while stopped
                if transmitter.is_running() {
                    let Ok(()) = bus.drive(lines);
                }

                if let Some(channel) = transmitter.need_sample() {
                    // Sawtooth test tone, right channel inverted
                    phase = phase.wrapping_add(64);
                    let level = match channel {
                        Channel::Left => phase,
                        Channel::Right => !phase,
                    };
                    samples.load(channel, SampleWord::new(u32::from(level) << 8));
                }
            }
        }
    }
}

/// Heartbeat task - blinks LED to show system is running
#[embassy_executor::task]
async fn heartbeat_task(mut led: Output<'static>) {
    loop {
        led.set_high();
        Timer::after(Duration::from_millis(100)).await;
        led.set_low();
        Timer::after(Duration::from_millis(900)).await;
    }
}
