//! Process-wide failure policy.

/// Any panic, in a handler, a spawned task or `main`, terminates the process
/// with status 1. Restarting is left to the process supervisor.
///
/// The hook exits before unwinding, so a panic inside a tokio task cannot be
/// swallowed by its `JoinHandle`.
pub fn install_panic_policy() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %info, "Uncaught panic, exiting");
        eprintln!("Uncaught exception: {}", info);
        std::process::exit(1);
    }));
}
