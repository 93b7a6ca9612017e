use std::panic::PanicHookInfo;

/// Replaces the default panic hook with one that reports through `tracing`,
/// so panics end up in the same log stream as everything else.
pub fn install() {
    std::panic::set_hook(Box::new(tracing_panic_hook));
}

/// Prints roughly the same message as the default panic hook but uses
/// `tracing::error!` instead of stderr.
fn tracing_panic_hook(panic: &PanicHookInfo) {
    let thread = std::thread::current();
    let name = thread.name().unwrap_or("<unnamed>");
    let backtrace = std::backtrace::Backtrace::force_capture();
    tracing::error!("thread '{name}' {panic}\nstack backtrace:\n{backtrace}");
}
