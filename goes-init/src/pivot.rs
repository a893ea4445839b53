//! Root pivot orchestration.
//!
//! The one-shot sequence that takes the system from the initrd root to the
//! persistent root. Every step is fatal unless noted; a fatal step aborts
//! the whole attempt and the caller routes to recovery. The sequence runs
//! at most once per process lifetime and is never resumed from a failed
//! step.
//!
//! Ordering constraints that must hold:
//! - nothing on the old root is removed before the new root is fully
//!   populated and the live mounts relocated
//! - the virtual filesystems are moved, never unmounted and remounted
//! - the switch (bind-move plus chroot) is one logical operation; if either
//!   half fails the root state is indeterminate and recovery takes over

use crate::error::BootError;
use crate::hooks::HookSet;
use crate::skeleton::{SkeletonSpec, create_dir_with_mode};
use goes_common::{log_info, telemetry::record_boot_op};
use std::path::PathBuf;
use std::time::Instant;

const LOG_TAG: &str = "boot:pivot";

/// Where the new root is staged before the switch.
pub const STAGING_PATH: &str = "/newroot";

/// One live mount to relocate into the new root. The moves are mutually
/// independent; only the destination directory must exist first.
#[derive(Debug, Clone)]
pub struct Relocation {
    /// Mount path on the ramdisk root.
    pub source: PathBuf,
    /// Destination relative to the new root.
    pub dest: String,
    /// Mode for the destination directory if it has to be created.
    pub mode: u32,
}

pub fn default_relocations() -> Vec<Relocation> {
    let mv = |source: &str, dest: &str, mode| Relocation {
        source: PathBuf::from(source),
        dest: dest.to_string(),
        mode,
    };
    vec![
        mv("/run", "run", 0o755),
        mv("/sys", "sys", 0o555),
        mv("/proc", "proc", 0o555),
        mv("/dev", "dev", 0o755),
    ]
}

/// Everything the pivot needs beyond the collaborators: where to stage,
/// which skeleton to lay down, which live mounts to carry across.
pub struct PivotPlan {
    pub staging: PathBuf,
    pub old_root: PathBuf,
    pub skeleton: SkeletonSpec,
    pub relocations: Vec<Relocation>,
    pub overwrite_supervisor: bool,
}

impl PivotPlan {
    pub fn new(overwrite_supervisor: bool) -> Self {
        Self {
            staging: PathBuf::from(STAGING_PATH),
            old_root: PathBuf::from("/"),
            skeleton: SkeletonSpec::target_root(),
            relocations: default_relocations(),
            overwrite_supervisor,
        }
    }
}

/// Mount `root` at the staging path, run the optional boot script against
/// it, populate it, relocate the live virtual filesystems, then switch.
pub fn pivot(
    plan: &PivotPlan,
    root: &str,
    script: Option<&str>,
    hooks: &HookSet,
) -> Result<(), BootError> {
    // 1. Staging mountpoint.
    if plan.staging.symlink_metadata().is_err() {
        create_dir_with_mode(&plan.staging, 0o755).map_err(|e| BootError::Staging {
            path: plan.staging.display().to_string(),
            source: e,
        })?;
    }

    // 2. Attach the target root.
    let start = Instant::now();
    let mounted = hooks.mounter.mount(root, &plan.staging);
    let mount_err = mounted.as_ref().err().map(ToString::to_string);
    record_boot_op("mount_root", start.elapsed(), mounted.is_ok(), mount_err.as_deref());
    mounted.map_err(|e| BootError::RootMount {
        device: root.to_string(),
        path: plan.staging.display().to_string(),
        source: e,
    })?;
    log_info!(LOG_TAG, "mounted {root} on {}", plan.staging.display());

    // 3. Boot script, resolved inside the new root. A malformed or erroring
    // script must not leave the device half-configured, so this is fatal.
    if let Some(script) = script {
        let script_path = plan.staging.join(script.trim_start_matches('/'));
        hooks
            .script
            .run_script(&script_path, &plan.staging)
            .map_err(|e| BootError::BootScript {
                path: script_path.display().to_string(),
                source: e,
            })?;
    }

    // 4. Skeleton: the new root must be able to host the supervisor.
    plan.skeleton.apply(&plan.staging, plan.overwrite_supervisor)?;

    // 5. Relocate the live virtual filesystems, preserving mount identity.
    for mv in &plan.relocations {
        let dest = plan.staging.join(&mv.dest);
        if dest.symlink_metadata().is_err() {
            create_dir_with_mode(&dest, mv.mode).map_err(|e| BootError::MakeDir {
                path: dest.display().to_string(),
                source: e,
            })?;
        }
        hooks
            .ops
            .move_mount(&mv.source, &dest)
            .map_err(|e| BootError::MoveMount {
                from: mv.source.display().to_string(),
                to: dest.display().to_string(),
                source: e,
            })?;
    }

    // 6. Enter the staged root; the switch below operates on `.`.
    hooks
        .ops
        .enter(&plan.staging)
        .map_err(|e| BootError::ChangeDir {
            path: plan.staging.display().to_string(),
            source: e,
        })?;

    // 7. Old-root cleanup, strictly after relocation. Best-effort: the old
    // root is about to be discarded.
    plan.skeleton.cleanup_old_root(&plan.old_root);

    // 8-9. The switch. Both halves succeed or the root state is
    // indeterminate and recovery takes over.
    hooks
        .ops
        .move_root(&plan.staging)
        .map_err(|e| BootError::SwitchRoot {
            path: plan.staging.display().to_string(),
            source: e,
        })?;
    hooks.ops.change_root().map_err(BootError::ChangeRoot)?;

    log_info!(LOG_TAG, "switched root to {root}");
    Ok(())
}
