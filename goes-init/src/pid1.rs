//! PID 1 signal hygiene and zombie reaping.
//!
//! Uses `sigaction` (not `signal`) for non-resetting handlers with
//! well-defined cross-platform behavior. The kernel never delivers
//! default-action fatal signals to PID 1, but TTY job-control stops and
//! pipe errors would still wedge the supervisor mid-boot, so those are
//! ignored explicitly. SIGCHLD keeps its default disposition: setting it
//! to SIG_IGN would make the kernel auto-reap children and race the
//! `waitpid` calls behind `Command::wait`.

/// Install a `sigaction` handler for the given signal with `SA_RESTART`.
fn set_handler(sig: libc::c_int, handler: libc::sighandler_t) {
    // SAFETY: zeroed sigaction is valid; we fill sa_handler and sa_flags.
    let mut sa: libc::sigaction = unsafe { std::mem::zeroed() };
    sa.sa_sigaction = handler;
    sa.sa_flags = libc::SA_RESTART;
    // SAFETY: sa is properly initialized, sig is a valid signal number.
    unsafe {
        libc::sigaction(sig, &sa, std::ptr::null_mut());
    }
}

/// Signal setup for PID 1 operation.
pub fn install_signal_handlers() {
    set_handler(libc::SIGTTIN, libc::SIG_IGN);
    set_handler(libc::SIGTTOU, libc::SIG_IGN);
    set_handler(libc::SIGPIPE, libc::SIG_IGN);
}

/// Reap all zombie child processes (non-blocking).
///
/// Orphaned processes reparent to PID 1; this runs between emergency-shell
/// sessions so they never accumulate.
pub fn reap_zombies() {
    loop {
        // SAFETY: plain waitpid with WNOHANG; no memory is handed to the
        // kernel beyond the null status pointer.
        let result = unsafe { libc::waitpid(-1, std::ptr::null_mut(), libc::WNOHANG) };
        // result > 0: reaped a zombie, continue
        // result == 0: no more zombies ready to be reaped
        // result < 0: error (ECHILD = no children)
        if result <= 0 {
            break;
        }
    }
}
