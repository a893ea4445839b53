//! Kernel reload via kexec_file_load(2).
//!
//! Loads the staged recovery kernel and reboots straight into it, bypassing
//! the bootloader. Only returns on error.

use crate::hooks::Reloader;
use nix::sys::reboot::{RebootMode, reboot};
use std::convert::Infallible;
use std::ffi::CString;
use std::fs::File;
use std::io;
use std::os::fd::AsRawFd;
use std::path::Path;

/// From <linux/kexec.h>; not exported by libc.
const KEXEC_FILE_NO_INITRAMFS: libc::c_ulong = 0x4;

pub struct KexecReloader;

impl Reloader for KexecReloader {
    fn reload(
        &self,
        kernel: &Path,
        initramfs: Option<&Path>,
        cmdline: &str,
    ) -> io::Result<Infallible> {
        let kernel_file = File::open(kernel)?;
        let initrd_file = initramfs.map(File::open).transpose()?;
        let cmdline = CString::new(cmdline).map_err(io::Error::other)?;

        let mut flags: libc::c_ulong = 0;
        let initrd_fd = match &initrd_file {
            Some(f) => f.as_raw_fd(),
            None => {
                flags |= KEXEC_FILE_NO_INITRAMFS;
                -1
            }
        };

        // cmdline_len counts the terminating NUL.
        let cmdline_len = cmdline.as_bytes_with_nul().len();

        // SAFETY: both fds are owned by `File`s that outlive the call, and
        // the command line is NUL-terminated with the advertised length.
        let rc = unsafe {
            libc::syscall(
                libc::SYS_kexec_file_load,
                kernel_file.as_raw_fd(),
                initrd_fd,
                cmdline_len,
                cmdline.as_ptr(),
                flags,
            )
        };
        if rc != 0 {
            return Err(io::Error::last_os_error());
        }

        match reboot(RebootMode::RB_KEXEC) {
            Ok(never) => match never {},
            Err(e) => Err(e.into()),
        }
    }
}
