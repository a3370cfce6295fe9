//! Process wide tracing setup.

use {
    std::{panic::PanicHookInfo, sync::Once},
    tracing::level_filters::LevelFilter,
    tracing_subscriber::EnvFilter,
};

/// Initializes tracing for the process. Calling it more than once is a no-op.
///
/// `env_filter` has the same syntax as `RUST_LOG`. Everything is written to
/// stderr so that stdout stays reserved for command output.
pub fn initialize(env_filter: &str, use_json: bool) {
    static ONCE: Once = Once::new();
    ONCE.call_once(|| set_tracing_subscriber(env_filter, use_json));
}

fn set_tracing_subscriber(env_filter: &str, use_json: bool) {
    let filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .parse_lossy(env_filter);

    if use_json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_current_span(true)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(atty::is(atty::Stream::Stderr))
            .init();
    }

    std::panic::set_hook(Box::new(tracing_panic_hook));
}

/// Panic hook that prints roughly the same message as the default panic hook
/// but uses tracing so that the message ends up in the configured format.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
