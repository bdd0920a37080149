//! Serial console logging.
//!
//! Records go to COM1 as `"<level>: <message>"` lines. The verbosity is the
//! `log` crate's global max level, which the debug console nudges one step
//! at a time.

use log::{Level, LevelFilter};

/// Lowercase prefix written in front of each message.
pub fn label(level: Level) -> &'static str {
    match level {
        Level::Error => "error",
        Level::Warn => "warn",
        Level::Info => "info",
        Level::Debug => "debug",
        Level::Trace => "trace",
    }
}

/// One step less verbose; `Off` stays `Off`.
pub fn quieter(level: LevelFilter) -> LevelFilter {
    match level {
        LevelFilter::Off | LevelFilter::Error => LevelFilter::Off,
        LevelFilter::Warn => LevelFilter::Error,
        LevelFilter::Info => LevelFilter::Warn,
        LevelFilter::Debug => LevelFilter::Info,
        LevelFilter::Trace => LevelFilter::Debug,
    }
}

/// One step more verbose; `Trace` stays `Trace`.
pub fn louder(level: LevelFilter) -> LevelFilter {
    match level {
        LevelFilter::Off => LevelFilter::Error,
        LevelFilter::Error => LevelFilter::Warn,
        LevelFilter::Warn => LevelFilter::Info,
        LevelFilter::Info => LevelFilter::Debug,
        LevelFilter::Debug | LevelFilter::Trace => LevelFilter::Trace,
    }
}

#[cfg(target_os = "none")]
pub use self::serial::{emergency, init, read_byte, SERIAL};

#[cfg(target_os = "none")]
mod serial {
    use super::label;
    use core::fmt::{self, Write};
    use log::{LevelFilter, Log, Metadata, Record};
    use spin::Mutex;
    use uart_16550::SerialPort;
    use x86_64::instructions::interrupts;

    pub static SERIAL: Mutex<SerialPort> = Mutex::new(unsafe { SerialPort::new(0x3F8) });

    struct SerialLogger;

    static LOGGER: SerialLogger = SerialLogger;

    impl Log for SerialLogger {
        fn enabled(&self, metadata: &Metadata) -> bool {
            metadata.level() <= log::max_level()
        }

        fn log(&self, record: &Record) {
            if !self.enabled(record.metadata()) {
                return;
            }
            // A trap must never spin on a lock its own victim holds.
            interrupts::without_interrupts(|| {
                let mut serial = SERIAL.lock();
                let _ = writeln!(serial, "{}: {}", label(record.level()), record.args());
            });
        }

        fn flush(&self) {}
    }

    /// Brings up COM1 (receive interrupts on) and installs the logger.
    pub fn init(level: LevelFilter) -> Result<(), &'static str> {
        SERIAL.lock().init();
        log::set_logger(&LOGGER).map_err(|_| "logger already installed")?;
        log::set_max_level(level);
        Ok(())
    }

    /// Last words from the panic handler.
    pub fn emergency(args: fmt::Arguments) {
        // Whoever held the port is never coming back.
        unsafe { SERIAL.force_unlock() };
        let mut serial = SERIAL.lock();
        let _ = writeln!(serial, "panic: {}", args);
    }

    /// A byte the UART has already signalled as received.
    pub fn read_byte() -> u8 {
        SERIAL.lock().receive()
    }
}
