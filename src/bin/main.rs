#![no_std]
#![no_main]

use core::fmt::Write as _;

use defmt::{error, info, warn};
use defmt_rtt as _;
use embassy_executor::Spawner;
use embassy_futures::select::{select, Either};
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals::{UART1, USB};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use embassy_rp::usb::Driver;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_time::Delay;
use embassy_usb::class::cdc_acm::State;
use embassy_usb::{Builder, Config as UsbConfig};
use heapless::String;
use pelco_core::config::MIN_RX_BUFFER;
use pelco_ptz::{
    configure_usb_console, observer, BaudRate, BusConfig, BusEngine, BusError, ConsoleError,
    HexTrace, Rs485Transport, Shell, ShellConfig, UsbConsole, PROMPT,
};
use static_cell::StaticCell;

#[cfg(feature = "rs485-direction")]
use embassy_rp::gpio::{Level, Output};

#[cfg(feature = "dev-panic")]
use panic_probe as _;
#[cfg(feature = "prod-panic")]
use panic_reset as _;

bind_interrupts!(struct Irqs {
    UART1_IRQ => BufferedInterruptHandler<UART1>;
    USBCTRL_IRQ => embassy_rp::usb::InterruptHandler<USB>;
});

/// Reported by `build_ver`.
const BUILD_ID: &str = env!("CARGO_PKG_VERSION");

/// Pelco-D address of the camera on the bus.
const CAMERA_ADDRESS: u8 = 1;

#[cfg(feature = "baud-9600")]
const BAUD: BaudRate = BaudRate::B9600;
#[cfg(all(feature = "baud-4800", not(feature = "baud-9600")))]
const BAUD: BaudRate = BaudRate::B4800;
#[cfg(not(any(feature = "baud-4800", feature = "baud-9600")))]
const BAUD: BaudRate = BaudRate::B2400;

/// UART1 on GPIO 8 (TX) / GPIO 9 (RX), DE/RE on GPIO 10 when wired.
const BUS: BusConfig = bus_config();

const fn bus_config() -> BusConfig {
    let config = BusConfig::new(1, 8, 9)
        .with_baud(BAUD)
        .with_address(CAMERA_ADDRESS);
    #[cfg(feature = "rs485-direction")]
    let config = config.with_direction_pin(10);
    config
}

/// Console reply buffer; `help` is the longest output.
const REPLY_LEN: usize = 2048;

type Engine = BusEngine<CriticalSectionRawMutex, Rs485Transport<'static>>;

/// Traces from the observer task waiting to be printed on the console.
static TRACES: Channel<CriticalSectionRawMutex, HexTrace, 8> = Channel::new();

static ENGINE: StaticCell<Engine> = StaticCell::new();

/// RS-485 UART buffers.
static TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static RX_BUF: StaticCell<[u8; MIN_RX_BUFFER]> = StaticCell::new();

/// USB device configuration buffers.
static CONFIG_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static BOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static MSOS_DESCRIPTOR: StaticCell<[u8; 256]> = StaticCell::new();
static CONTROL_BUF: StaticCell<[u8; 64]> = StaticCell::new();

/// CDC-ACM state.
static CDC_STATE: StaticCell<State> = StaticCell::new();

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Pelco PTZ bridge starting...");

    let p = embassy_rp::init(embassy_rp::config::Config::default());

    // --- RS-485 Setup ---
    let mut uart_config = UartConfig::default();
    uart_config.baudrate = BUS.baud.bps();

    let tx_buf = TX_BUF.init([0; 256]);
    let rx_buf = RX_BUF.init([0; MIN_RX_BUFFER]);
    let uart = Uart::new_blocking(p.UART1, p.PIN_8, p.PIN_9, uart_config);
    let uart = uart.into_buffered(Irqs, tx_buf, rx_buf);

    #[cfg(feature = "rs485-direction")]
    let direction = Some(Output::new(p.PIN_10, Level::High));
    #[cfg(not(feature = "rs485-direction"))]
    let direction = None;

    let transport = match Rs485Transport::new(uart, direction, &BUS) {
        Ok(transport) => transport,
        Err(e) => {
            error!("RS-485 init failed: {}", BusError::from(e));
            return;
        }
    };
    let engine: &'static Engine = ENGINE.init(BusEngine::new(BUS, transport));
    info!(
        "RS-485 ready: {} baud, camera address {}",
        BUS.baud.bps(),
        BUS.address
    );

    // --- USB Setup ---
    let usb_driver = Driver::new(p.USB, Irqs);

    let mut usb_config = UsbConfig::new(0x1209, 0x0001); // pid.codes test VID/PID
    usb_config.manufacturer = Some("Rust PTZ");
    usb_config.product = Some("Pelco-D PTZ Bridge");
    usb_config.serial_number = Some("001");
    usb_config.max_power = 100;
    usb_config.max_packet_size_0 = 64;

    let config_descriptor = CONFIG_DESCRIPTOR.init([0; 256]);
    let bos_descriptor = BOS_DESCRIPTOR.init([0; 256]);
    let msos_descriptor = MSOS_DESCRIPTOR.init([0; 256]);
    let control_buf = CONTROL_BUF.init([0; 64]);

    let mut builder = Builder::new(
        usb_driver,
        usb_config,
        config_descriptor,
        bos_descriptor,
        msos_descriptor,
        control_buf,
    );

    let cdc_state = CDC_STATE.init(State::new());
    let class = configure_usb_console(&mut builder, cdc_state);
    let usb_device = builder.build();
    let console = UsbConsole::new(class);

    // Spawn tasks (spawn the SpawnToken, then unwrap)
    spawner.spawn(usb_task(usb_device)).unwrap();
    spawner.spawn(observer_task(engine)).unwrap();
    spawner.spawn(console_task(console, engine)).unwrap();

    info!("Pelco PTZ bridge initialized, waiting for console...");
}

/// USB device task - runs the USB stack.
#[embassy_executor::task]
async fn usb_task(mut device: embassy_usb::UsbDevice<'static, Driver<'static, USB>>) {
    device.run().await;
}

/// Observer task - traces bus traffic while `pelco_log on` is in effect.
#[embassy_executor::task]
async fn observer_task(engine: &'static Engine) {
    observer::run(engine, Delay, |trace| {
        if TRACES.try_send(trace.clone()).is_err() {
            warn!("Console busy, dropped trace of {} bytes", trace.count());
        }
    })
    .await
}

/// Console task - reads command lines and runs them through the shell.
#[embassy_executor::task]
async fn console_task(mut console: UsbConsole<'static>, engine: &'static Engine) {
    let mut shell = Shell::new(
        engine,
        ShellConfig {
            build_id: BUILD_ID,
            ..ShellConfig::default()
        },
    );
    let mut reply: String<REPLY_LEN> = String::new();

    loop {
        console.wait_connection().await;
        info!("Console connected");

        if let Err(e) = serve(&mut console, &mut shell, &mut reply).await {
            warn!("Console closed: {:?}", e);
        }
    }
}

/// Serve one console session until the host disconnects.
async fn serve(
    console: &mut UsbConsole<'static>,
    shell: &mut Shell<'static, CriticalSectionRawMutex, Rs485Transport<'static>>,
    reply: &mut String<REPLY_LEN>,
) -> Result<(), ConsoleError> {
    reply.clear();
    let _ = writeln!(reply, "Pelco-D PTZ bridge {}. Type 'help'.", BUILD_ID);
    console.write_str(reply).await?;
    console.write_str(PROMPT).await?;

    loop {
        reply.clear();
        match select(console.read_line(), TRACES.receive()).await {
            Either::First(Ok(line)) => {
                let status = shell.execute(line, reply).await;
                if status != 0 {
                    info!("Command exited with status {}", status);
                }
            }
            Either::First(Err(ConsoleError::Disconnected)) => {
                return Err(ConsoleError::Disconnected);
            }
            Either::First(Err(e)) => {
                error!("Console input rejected: {:?}", e);
                let _ = writeln!(reply, "Input rejected.");
            }
            Either::Second(trace) => {
                console.interject(trace.as_str()).await?;
                continue;
            }
        }
        console.write_str(reply).await?;
        console.write_str(PROMPT).await?;
    }
}
