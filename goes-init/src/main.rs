//! `/init` - the kernel's handoff point into the appliance initrd.
//!
//! Startup sequence:
//! 1. Refuse to do anything unless genuinely PID 1 under the reserved name
//! 2. Install PID 1 signal handlers
//! 3. Prime the virtual filesystems (best-effort)
//! 4. Read the boot configuration from the environment, once
//! 5. Run the pivot/finalize sequence under the recovery boundary; this
//!    never returns

use goes_common::{log_error, log_info};
use goes_init::config::{self, BootConfig};
use goes_init::hooks::HookSet;
use goes_init::{bootstrap, pid1, recovery};
use std::path::Path;
use std::process::ExitCode;

const LOG_TAG: &str = "boot:init";

fn main() -> ExitCode {
    let argv0 = std::env::args().next().unwrap_or_default();
    if !config::is_boot_supervisor(std::process::id(), &argv0) {
        log_error!(
            LOG_TAG,
            "must run as PID 1 under {}; invoked as {argv0}",
            config::SUPERVISOR_NAME
        );
        return ExitCode::FAILURE;
    }

    pid1::install_signal_handlers();

    let hooks = HookSet::production();
    bootstrap::prime_virtual_filesystems(Path::new("/"), hooks.ops.as_ref());

    let config = BootConfig::from_env();
    log_info!(LOG_TAG, "boot supervisor starting");

    recovery::run_supervisor(&config, &hooks)
}
