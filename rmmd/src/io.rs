use spinning_top::{guard::SpinlockGuard, Spinlock};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotConnected,
    AlreadyExists,
    Unsupported,
    Other,
}

#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    pub fn new(kind: ErrorKind) -> Error {
        Error { kind }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

pub type Result<T> = core::result::Result<T, Error>;

pub trait Device {
    fn initialize(&mut self) -> Result<()>;
    fn initialized(&self) -> bool;
}

pub trait Write {
    fn write_all(&mut self, buf: &[u8]) -> Result<()>;
}

pub trait ConsoleWriter: Device + Write + Send {}

/// The console EL3 logs to, usually the platform UART.
pub struct Stdout {
    device: Option<&'static mut dyn ConsoleWriter>,
}

impl Stdout {
    pub const fn new() -> Self {
        Self { device: None }
    }

    pub fn attach(&mut self, device: &'static mut dyn ConsoleWriter) -> Result<()> {
        if !device.initialized() {
            device.initialize()?;
        }
        self.device.replace(device);
        Ok(())
    }

    pub fn is_attached(&self) -> bool {
        self.device.is_some()
    }
}

impl Default for Stdout {
    fn default() -> Self {
        Self::new()
    }
}

impl Write for Stdout {
    fn write_all(&mut self, buf: &[u8]) -> Result<()> {
        self.device
            .as_mut()
            .map(|dev| dev.write_all(buf))
            .unwrap_or(Err(Error::new(ErrorKind::NotConnected)))
    }
}

impl core::fmt::Write for Stdout {
    fn write_str(&mut self, s: &str) -> core::fmt::Result {
        self.write_all(s.as_bytes()).map_err(|_| core::fmt::Error)
    }
}

static STDOUT: Spinlock<Stdout> = Spinlock::new(Stdout::new());

pub fn stdout() -> SpinlockGuard<'static, Stdout> {
    STDOUT.lock()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::boxed::Box;
    use std::vec::Vec;

    #[derive(Default)]
    struct Buffer {
        ready: bool,
        bytes: Vec<u8>,
    }

    impl Device for Buffer {
        fn initialize(&mut self) -> Result<()> {
            self.ready = true;
            Ok(())
        }

        fn initialized(&self) -> bool {
            self.ready
        }
    }

    impl Write for Buffer {
        fn write_all(&mut self, buf: &[u8]) -> Result<()> {
            self.bytes.extend_from_slice(buf);
            Ok(())
        }
    }

    impl ConsoleWriter for Buffer {}

    #[test]
    fn detached_stdout_is_not_connected() {
        let mut out = Stdout::new();
        let err = out.write_all(b"lost").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotConnected);
    }

    #[test]
    fn attach_initializes_device() {
        let buffer: &'static mut Buffer = Box::leak(Box::default());
        let ptr: *const Buffer = buffer;

        let mut out = Stdout::new();
        out.attach(buffer).unwrap();
        assert!(out.is_attached());
        out.write_all(b"RMMD").unwrap();
        core::fmt::Write::write_fmt(&mut out, format_args!(" {}", 1)).unwrap();
        drop(out);

        // SAFETY: the buffer is leaked and `out` no longer borrows it.
        let buffer = unsafe { &*ptr };
        assert!(buffer.ready);
        assert_eq!(buffer.bytes, b"RMMD 1");
    }
}
