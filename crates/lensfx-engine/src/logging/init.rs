use std::io::Write;
use std::sync::Once;

/// Filter used when neither `LoggingConfig::env_filter` nor `RUST_LOG` is set.
pub const DEFAULT_FILTER: &str =
    "info,lensfx_engine=info,lensfx_studio=info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "lensfx_engine=debug,wgpu_core=warn").
///
/// `write_style` controls ANSI coloring behavior.
///
/// `show_thread` prefixes each line with the emitting thread's name.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
    pub show_thread: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
            show_thread: true,
        }
    }
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored.
/// Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let mut builder = env_logger::Builder::new();

        let filter = config
            .env_filter
            .or_else(|| std::env::var("RUST_LOG").ok())
            .unwrap_or_else(|| DEFAULT_FILTER.to_string());
        builder.parse_filters(&filter);

        builder.write_style(config.write_style);

        if config.show_thread {
            builder.format(|buf, record| {
                let thread = std::thread::current();
                let style = buf.default_level_style(record.level());
                writeln!(
                    buf,
                    "[{} {style}{:<5}{style:#} {} {}] {}",
                    buf.timestamp_millis(),
                    record.level(),
                    thread.name().unwrap_or("<unnamed>"),
                    record.target(),
                    record.args()
                )
            });
        }

        // Tests and embedders may have installed a logger already.
        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized (filter: {filter})");
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_is_idempotent() {
        init_logging(LoggingConfig::default());
        init_logging(LoggingConfig {
            env_filter: Some("trace".into()),
            ..LoggingConfig::default()
        });
        log::info!("still alive");
    }

    #[test]
    fn default_filter_quiets_wgpu() {
        assert!(DEFAULT_FILTER.contains("wgpu_core=warn"));
        assert!(DEFAULT_FILTER.contains("lensfx_engine=info"));
    }
}
