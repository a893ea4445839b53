//! Boot configuration from the kernel-provided environment.
//!
//! The kernel passes unrecognized `name=value` command-line words to init as
//! environment variables, so `goesroot=...` on the kernel command line
//! arrives here through `std::env`. Configuration is read exactly once at
//! startup and is immutable afterwards.

use goes_common::log_error;

const LOG_TAG: &str = "boot:config";

/// The reserved program name the kernel invokes the supervisor under.
pub const SUPERVISOR_NAME: &str = "/init";

/// True when this process is the kernel's first user-space process running
/// under the reserved init name. Both conditions are required: PID 1 alone
/// would also match a later re-exec of the same binary under another name.
pub fn is_boot_supervisor(pid: u32, argv0: &str) -> bool {
    pid == 1 && argv0 == SUPERVISOR_NAME
}

/// Recovery image descriptor from `goesinstaller`: 1-3 comma-separated
/// URLs, `KERNEL[,INITRAMFS[,FDT]]`. The kernel URL is mandatory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryImages {
    pub kernel: String,
    pub initramfs: Option<String>,
    pub fdt: Option<String>,
}

impl RecoveryImages {
    pub fn parse(raw: &str) -> Option<Self> {
        let mut parts = raw.split(',');
        let kernel = parts.next().unwrap_or("").trim();
        if kernel.is_empty() {
            return None;
        }
        let mut optional = || {
            parts
                .next()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
        };
        let initramfs = optional();
        let fdt = optional();
        Some(Self {
            kernel: kernel.to_string(),
            initramfs,
            fdt,
        })
    }

    /// How many images the descriptor asks for.
    pub fn requested(&self) -> usize {
        1 + usize::from(self.initramfs.is_some()) + usize::from(self.fdt.is_some())
    }
}

/// Process-wide boot configuration, derived once from the environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootConfig {
    /// Device or mountpoint of the persistent root. Absent: stay on the
    /// ramdisk root and skip the pivot entirely.
    pub root: Option<String>,
    /// Optional boot script inside the new root, run before the skeleton
    /// is laid down.
    pub script: Option<String>,
    pub recovery: Option<RecoveryImages>,
    /// `goes=overwrite`: re-copy the supervisor binary into the new root
    /// even when a copy already exists there.
    pub overwrite_supervisor: bool,
}

impl BootConfig {
    pub fn from_env() -> Self {
        let (root, script) = split_root_param(&std::env::var("goesroot").unwrap_or_default());

        let installer = std::env::var("goesinstaller").unwrap_or_default();
        let recovery = if installer.is_empty() {
            None
        } else {
            let parsed = RecoveryImages::parse(&installer);
            if parsed.is_none() {
                log_error!(LOG_TAG, "goesinstaller: kernel URL missing, recovery disabled");
            }
            parsed
        };

        let overwrite_supervisor = std::env::var("goes").is_ok_and(|v| v == "overwrite");

        Self {
            root,
            script,
            recovery,
            overwrite_supervisor,
        }
    }
}

/// `goesroot` is `ROOT[:SCRIPT]`, split on the platform path-list separator.
fn split_root_param(raw: &str) -> (Option<String>, Option<String>) {
    let mut fields = raw.split(':');
    let mut field = || {
        fields
            .next()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
    };
    let root = field();
    let script = field();
    (root, script)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supervisor_predicate_requires_both_conditions() {
        assert!(is_boot_supervisor(1, "/init"));
        assert!(!is_boot_supervisor(1, "/sbin/init"));
        assert!(!is_boot_supervisor(1, "goes-init"));
        assert!(!is_boot_supervisor(42, "/init"));
    }

    #[test]
    fn root_param_splits_root_and_script() {
        assert_eq!(split_root_param(""), (None, None));
        assert_eq!(
            split_root_param("/dev/sda1"),
            (Some("/dev/sda1".into()), None)
        );
        assert_eq!(
            split_root_param("/dev/sda1:/etc/boot.conf"),
            (Some("/dev/sda1".into()), Some("/etc/boot.conf".into()))
        );
        assert_eq!(split_root_param(":"), (None, None));
        assert_eq!(split_root_param(":/etc/boot.conf"), (None, Some("/etc/boot.conf".into())));
    }

    #[test]
    fn installer_descriptor_parses_one_to_three_urls() {
        let one = RecoveryImages::parse("http://x/k").unwrap();
        assert_eq!(one.kernel, "http://x/k");
        assert_eq!(one.initramfs, None);
        assert_eq!(one.fdt, None);
        assert_eq!(one.requested(), 1);

        let two = RecoveryImages::parse("http://x/k,http://x/i").unwrap();
        assert_eq!(two.initramfs.as_deref(), Some("http://x/i"));
        assert_eq!(two.requested(), 2);

        let three = RecoveryImages::parse("http://x/k,http://x/i,http://x/f").unwrap();
        assert_eq!(three.fdt.as_deref(), Some("http://x/f"));
        assert_eq!(three.requested(), 3);
    }

    #[test]
    fn installer_descriptor_allows_skipping_the_initramfs() {
        let images = RecoveryImages::parse("http://x/k,,http://x/f").unwrap();
        assert_eq!(images.initramfs, None);
        assert_eq!(images.fdt.as_deref(), Some("http://x/f"));
        assert_eq!(images.requested(), 2);
    }

    #[test]
    fn installer_descriptor_requires_a_kernel() {
        assert_eq!(RecoveryImages::parse(""), None);
        assert_eq!(RecoveryImages::parse(",http://x/i"), None);
        assert_eq!(RecoveryImages::parse("  ,http://x/i"), None);
    }
}
