use crate::io::stdout;

use core::fmt::{self, Write};
use log::{Level, LevelFilter, Metadata, Record};

struct SimpleLogger;

impl log::Log for SimpleLogger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record<'_>) {
        if self.enabled(record.metadata()) {
            let _ = format(&mut *stdout(), record);
        }
    }

    fn flush(&self) {}
}

/// `[LEVEL]target -- message`, in red for warnings and errors.
fn format<W: Write>(out: &mut W, record: &Record<'_>) -> fmt::Result {
    if record.level() <= Level::Warn {
        writeln!(
            out,
            "\x1b[0;31m[{}]{} -- {}\x1b[0m",
            record.level(),
            record.target(),
            record.args()
        )
    } else {
        writeln!(
            out,
            "[{}]{} -- {}",
            record.level(),
            record.target(),
            record.args()
        )
    }
}

static LOGGER: SimpleLogger = SimpleLogger;

pub fn register_global_logger(maxlevel: LevelFilter) -> Result<(), log::SetLoggerError> {
    log::set_logger(&LOGGER)?;
    log::set_max_level(maxlevel);
    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;
    use std::string::String;

    fn render(level: Level, args: fmt::Arguments<'_>) -> String {
        let mut out = String::new();
        let record = Record::builder()
            .level(level)
            .target("islet_rmmd::rmi")
            .args(args)
            .build();
        format(&mut out, &record).unwrap();
        out
    }

    #[test]
    fn info_is_plain() {
        assert_eq!(
            render(Level::Info, format_args!("RMM init {}", "end")),
            "[INFO]islet_rmmd::rmi -- RMM init end\n"
        );
    }

    #[test]
    fn warn_is_highlighted() {
        assert_eq!(
            render(Level::Warn, format_args!("secure caller")),
            "\x1b[0;31m[WARN]islet_rmmd::rmi -- secure caller\x1b[0m\n"
        );
    }
}
