use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::PanicHookInfo;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{Layer, filter::EnvFilter, fmt};

const ENV_DEBUG: &str = "FORWARDER_DEBUG";

/// Routes panics through `tracing` so they end up in the same (JSON) stream as every other log
/// line, on a single line unless a backtrace was captured.
fn report_panic(panic_info: &PanicHookInfo<'_>) {
    // only captured when RUST_BACKTRACE or RUST_LIB_BACKTRACE is set
    let backtrace = Backtrace::capture();
    let backtrace_captured = backtrace.status() == BacktraceStatus::Captured;
    let payload = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
        Some(*s)
    } else {
        panic_info
            .payload()
            .downcast_ref::<String>()
            .map(|s| s.as_str())
    };

    match (panic_info.location(), payload, backtrace_captured) {
        (Some(location), Some(payload), false) => {
            tracing::error!(
                "{}:{}:{}: {}",
                location.file(),
                location.line(),
                location.column(),
                payload,
            );
        }
        _ => {
            tracing::error!("{}\n{}", panic_info, backtrace);
        }
    };
}

/// Installs the global subscriber. `RUST_LOG` overrides the level, which defaults to `info`, or
/// `debug` when `FORWARDER_DEBUG=true`. Debug mode also switches from flattened JSON to text.
pub fn register() {
    let debug_mode = std::env::var(ENV_DEBUG).is_ok_and(|v| v.eq_ignore_ascii_case("true"));
    let default_log_level = if debug_mode {
        // the AWS SDK is very chatty at debug
        "debug,aws_smithy_runtime=info,aws_config=info,hyper=info"
    } else {
        "info"
    };

    // RUST_LOG wins when set
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::builder()
            .with_default_directive(Level::INFO.into())
            .parse_lossy(default_log_level)
    });

    let layer = if debug_mode {
        fmt::layer().boxed()
    } else {
        fmt::layer()
            .with_ansi(false)
            .json()
            .flatten_event(true)
            .boxed()
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .init();

    std::panic::set_hook(Box::new(report_panic));
}
