//! Failure recovery: network re-image, then the perpetual shell.
//!
//! Two nested boundaries wrap the whole boot transition. The outer one
//! catches any fatal error (or panic) from the hook + pivot + finalize
//! sequence and attempts a network re-image when one is configured. The
//! inner one is unconditional: whatever the outer boundary did or failed
//! to do, control ends in the emergency shell.

use crate::config::{BootConfig, RecoveryImages};
use crate::error::BootError;
use crate::finalize::{self, Handoff};
use crate::hooks::{Fetcher, HookSet};
use crate::pivot::{self, PivotPlan};
use crate::shell;
use goes_common::{log_error, log_info, telemetry::record_boot_op};
use std::convert::Infallible;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Instant;
use thiserror::Error;

const LOG_TAG: &str = "boot:recovery";

/// Fixed destination filenames, keyed to the reload call.
const KERNEL_IMAGE: &str = "kernel";
const INITRD_IMAGE: &str = "initramfs";
const FDT_IMAGE: &str = "fdt";

/// Command line handed to the reloaded kernel.
pub const RELOAD_CMDLINE: &str = "console=ttyS0,115200";

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("fetched {got} of {want} images, refusing partial reload")]
    Incomplete { got: usize, want: usize },

    #[error("kernel reload: {0}")]
    Reload(#[source] std::io::Error),
}

/// Run the whole boot transition under the recovery boundary. Never
/// returns: success hands off to the target init (this process image is
/// replaced), and every other path ends in the emergency shell.
pub fn run_supervisor(config: &BootConfig, hooks: &HookSet) -> ! {
    let plan = PivotPlan::new(config.overwrite_supervisor);
    match catch_unwind(AssertUnwindSafe(|| {
        boot_sequence(config, &plan, Path::new("/"), hooks)
    })) {
        Ok(Ok(())) => {
            log_info!(LOG_TAG, "boot sequence finished with no target handoff");
        }
        Ok(Err(e)) => {
            log_error!(LOG_TAG, "boot failed: {e}");
            attempt_recovery(config, hooks);
        }
        Err(_) => {
            log_error!(LOG_TAG, "boot sequence panicked");
            attempt_recovery(config, hooks);
        }
    }
    shell::supervise(hooks.shell.as_ref())
}

/// The fatal-error scope the outer boundary guards: board hook, pivot,
/// finalize, daemon start. Runs at most once per process lifetime.
pub fn boot_sequence(
    config: &BootConfig,
    plan: &PivotPlan,
    target_root: &Path,
    hooks: &HookSet,
) -> Result<(), BootError> {
    if let Some(hook) = &hooks.pre_boot {
        hook.run().map_err(BootError::Hook)?;
    }

    if let Some(root) = &config.root {
        pivot::pivot(plan, root, config.script.as_deref(), hooks)?;
    } else {
        log_info!(LOG_TAG, "no goesroot configured, staying on ramdisk root");
    }

    finalize::prepare_target(target_root, hooks.ops.as_ref())?;
    match finalize::exec_target_init(target_root)? {
        Handoff::NoTargetInit => {}
    }

    match &hooks.daemon {
        Some(daemon) => daemon.start().map_err(BootError::DaemonStart)?,
        None => log_info!(LOG_TAG, "no target init and no daemon starter configured"),
    }
    Ok(())
}

/// The outer boundary's recovery attempt. Guarded by its own catch so a
/// failing or panicking reinstall still falls through to the shell.
fn attempt_recovery(config: &BootConfig, hooks: &HookSet) {
    let Some(images) = &config.recovery else {
        log_info!(LOG_TAG, "no recovery images configured");
        return;
    };
    match catch_unwind(AssertUnwindSafe(|| {
        reinstall(images, Path::new("."), hooks)
    })) {
        Ok(Err(e)) => log_error!(LOG_TAG, "recovery: {e}"),
        Ok(Ok(never)) => match never {},
        Err(_) => log_error!(LOG_TAG, "recovery attempt panicked"),
    }
}

/// Fetch the configured images and reload into them. The reload fires only
/// when every requested image arrived; a partial set never boots.
pub fn reinstall(
    images: &RecoveryImages,
    dest_dir: &Path,
    hooks: &HookSet,
) -> Result<Infallible, RecoveryError> {
    let requests = build_requests(images, dest_dir);
    let want = requests.len();

    let start = Instant::now();
    let got = fetch_all(&requests, hooks.fetcher.as_ref());
    record_boot_op("recovery_fetch", start.elapsed(), got == want, None);

    if got != want {
        return Err(RecoveryError::Incomplete { got, want });
    }
    log_info!(LOG_TAG, "all {want} recovery images loaded");

    let kernel = dest_dir.join(KERNEL_IMAGE);
    let initramfs = images
        .initramfs
        .as_ref()
        .map(|_| dest_dir.join(INITRD_IMAGE));
    hooks
        .reloader
        .reload(&kernel, initramfs.as_deref(), RELOAD_CMDLINE)
        .map_err(RecoveryError::Reload)
}

fn build_requests(images: &RecoveryImages, dest_dir: &Path) -> Vec<(String, PathBuf)> {
    let mut requests = vec![(images.kernel.clone(), dest_dir.join(KERNEL_IMAGE))];
    if let Some(url) = &images.initramfs {
        requests.push((url.clone(), dest_dir.join(INITRD_IMAGE)));
    }
    if let Some(url) = &images.fdt {
        requests.push((url.clone(), dest_dir.join(FDT_IMAGE)));
    }
    requests
}

/// Issue the fetches concurrently (the destinations are disjoint), join,
/// and count successes. Individual failures are logged, never aborting the
/// sibling fetches; the caller decides at the barrier.
fn fetch_all(requests: &[(String, PathBuf)], fetcher: &dyn Fetcher) -> usize {
    thread::scope(|scope| {
        let handles: Vec<_> = requests
            .iter()
            .map(|(url, dest)| {
                scope.spawn(move || match fetcher.fetch(url, dest) {
                    Ok(()) => true,
                    Err(e) => {
                        log_error!(LOG_TAG, "fetch {url}: {e}");
                        false
                    }
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().unwrap_or(false))
            .filter(|ok| *ok)
            .count()
    })
}
