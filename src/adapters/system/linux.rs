use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use super::cmd::{checked_output, command_failed, output_with_timeout};
use super::SystemOps;
use crate::config::Config;
use crate::constants::{DROP_CACHES_PATH, HOST_MNT_NS, QUERY_COMMAND_TIMEOUT_SECS};
use crate::fs::mount::parse_mount_table;
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::{FsKind, LoopBinding, MountEntry};

/// Production [`SystemOps`] backed by `losetup`, `blkid`, `mount` and `umount`.
#[derive(Debug, Clone)]
pub struct LinuxSystem {
    command_timeout: Duration,
    host_namespace: bool,
    mount_table: PathBuf,
}

impl LinuxSystem {
    #[must_use]
    pub fn new(command_timeout: Duration, host_namespace: bool, mount_table: PathBuf) -> Self {
        Self {
            command_timeout,
            host_namespace,
            mount_table,
        }
    }

    #[must_use]
    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            cfg.timeouts.command(),
            cfg.host_namespace,
            cfg.mount_table.clone(),
        )
    }

    /// Build a mount-namespace aware command: `nsenter --mount=/proc/1/ns/mnt -- <program>`.
    fn host_command(&self, program: &str) -> Command {
        if self.host_namespace {
            let mut cmd = Command::new("nsenter");
            cmd.arg(format!("--mount={HOST_MNT_NS}")).arg("--").arg(program);
            cmd
        } else {
            Command::new(program)
        }
    }

    fn mount_point_command(&self, target: &Path) -> Command {
        let mut cmd = self.host_command("mkdir");
        cmd.arg("-p").arg(target);
        cmd
    }

    fn attach_with(&self, image: &Path, nooverlap: bool) -> Result<std::process::Output> {
        let mut cmd = Command::new("losetup");
        cmd.args(["--find", "--show"]);
        if nooverlap {
            cmd.arg("--nooverlap");
        }
        cmd.arg(image);
        output_with_timeout("losetup", &mut cmd, self.command_timeout)
    }
}

/// Parse `losetup -j <image>` output: `/dev/loop0: [2049]:131 (/backingfiles/x.img)`.
pub(crate) fn parse_losetup_assoc(stdout: &str, image: &Path) -> Vec<LoopBinding> {
    stdout
        .lines()
        .filter_map(|line| {
            let (dev, _) = line.split_once(':')?;
            let dev = dev.trim();
            if !dev.starts_with("/dev/") {
                return None;
            }
            Some(LoopBinding {
                device: PathBuf::from(dev),
                image: image.to_path_buf(),
            })
        })
        .collect()
}

fn option_unsupported(stderr: &[u8]) -> bool {
    let s = String::from_utf8_lossy(stderr).to_ascii_lowercase();
    s.contains("unrecognized option") || s.contains("invalid option") || s.contains("unknown option")
}

impl SystemOps for LinuxSystem {
    fn loop_bindings(&self, image: &Path) -> Result<Vec<LoopBinding>> {
        let mut cmd = Command::new("losetup");
        cmd.arg("-j").arg(image);
        let out = checked_output(
            "losetup",
            &mut cmd,
            Duration::from_secs(QUERY_COMMAND_TIMEOUT_SECS),
        )?;
        Ok(parse_losetup_assoc(
            &String::from_utf8_lossy(&out.stdout),
            image,
        ))
    }

    fn attach_loop(&self, image: &Path) -> Result<PathBuf> {
        let mut out = self.attach_with(image, true)?;
        if !out.status.success() && option_unsupported(&out.stderr) {
            log::info!("losetup lacks --nooverlap; falling back to plain attach");
            out = self.attach_with(image, false)?;
        }
        if !out.status.success() {
            return Err(command_failed("losetup", &out));
        }
        let dev = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if dev.is_empty() {
            return Err(Error::new(
                ErrorKind::Command,
                format!("losetup printed no device for {}", image.display()),
            ));
        }
        Ok(PathBuf::from(dev))
    }

    fn probe_fs(&self, device: &Path) -> Result<FsKind> {
        let mut cmd = Command::new("blkid");
        cmd.args(["-o", "value", "-s", "TYPE"]).arg(device);
        let out = checked_output(
            "blkid",
            &mut cmd,
            Duration::from_secs(QUERY_COMMAND_TIMEOUT_SECS),
        )?;
        let raw = String::from_utf8_lossy(&out.stdout);
        FsKind::from_probe(&raw).ok_or_else(|| {
            Error::new(
                ErrorKind::Command,
                format!(
                    "unsupported filesystem '{}' on {}",
                    raw.trim(),
                    device.display()
                ),
            )
        })
    }

    fn mount(&self, device: &Path, target: &Path, fs: FsKind, options: &str) -> Result<()> {
        // The mount point has to exist in the namespace the mount lands in.
        if self.host_namespace {
            let mut mkdir = self.mount_point_command(target);
            if let Err(e) = checked_output("mkdir", &mut mkdir, self.command_timeout) {
                log::warn!("could not create mount point {}: {e}", target.display());
            }
        } else if let Err(e) = std::fs::create_dir_all(target) {
            log::warn!("could not create mount point {}: {e}", target.display());
        }
        let mut cmd = self.host_command("mount");
        cmd.args(["-t", fs.as_str(), "-o", options])
            .arg(device)
            .arg(target);
        checked_output("mount", &mut cmd, self.command_timeout).map(|_| ())
    }

    fn unmount(&self, target: &Path) -> Result<()> {
        let mut cmd = self.host_command("umount");
        cmd.arg(target);
        checked_output("umount", &mut cmd, self.command_timeout).map(|_| ())
    }

    fn mounts(&self) -> Result<Vec<MountEntry>> {
        let raw = std::fs::read_to_string(&self.mount_table)
            .map_err(|e| Error::io(format!("read {}", self.mount_table.display()), &e))?;
        Ok(parse_mount_table(&raw))
    }

    fn sync(&self) -> Result<()> {
        rustix::fs::sync();
        Ok(())
    }

    fn drop_caches(&self) -> Result<()> {
        std::fs::write(DROP_CACHES_PATH, b"3")
            .map_err(|e| Error::io(format!("write {DROP_CACHES_PATH}"), &e))
    }
}
