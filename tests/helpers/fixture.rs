//! A tempdir-backed gadget: configfs tree, partition images, UDC class dir and lock path.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use lunyard::adapters::{FixedMode, LockManager};
use lunyard::config::Config;
use lunyard::types::{Partition, PresentMode};
use lunyard::Lunyard;

use super::emitter::{TestAudit, TestEmitter};
use super::fake_system::FakeSystem;

pub const UDC_NAME: &str = "fe980000.usb";

pub struct Fixture {
    pub td: tempfile::TempDir,
    pub cfg: Config,
    pub sys: FakeSystem,
    pub facts: TestEmitter,
}

impl Fixture {
    /// Gadget bound to [`UDC_NAME`], every LUN backed by its image, no loops, no mounts.
    pub fn new(parts: &[(&str, u32)]) -> Self {
        let td = tempfile::tempdir().expect("tempdir");
        let root = td.path().to_path_buf();
        let gadget = root.join("cfg/usb_gadget/teslausb");
        let msd = gadget.join("functions/mass_storage.0");
        fs::create_dir_all(root.join("backingfiles")).unwrap();
        fs::create_dir_all(root.join(format!("udc/{UDC_NAME}"))).unwrap();
        fs::create_dir_all(&msd).unwrap();
        fs::write(gadget_udc(&gadget), format!("{UDC_NAME}\n")).unwrap();

        let mut partitions = Vec::new();
        for (name, lun) in parts {
            let image = root.join(format!("backingfiles/{name}.img"));
            fs::write(&image, b"FAT").unwrap();
            let lun_dir = msd.join(format!("lun.{lun}"));
            fs::create_dir_all(&lun_dir).unwrap();
            fs::write(lun_dir.join("file"), image.display().to_string()).unwrap();
            fs::write(lun_dir.join("forced_eject"), b"").unwrap();
            partitions.push(Partition {
                name: (*name).to_string(),
                lun: *lun,
                image,
                ro_mount: root.join(format!("mnt/{name}-ro")),
                rw_mount: root.join(format!("mnt/{name}")),
                fs: None,
            });
        }

        let mut cfg = Config::with_partitions(partitions);
        cfg.configfs_root = root.join("cfg");
        cfg.udc_class_dir = root.join("udc");
        cfg.lock_path = root.join("run/quick_edit.lock");
        cfg.mount_table = root.join("mounts");
        cfg.host_namespace = false;
        cfg.restore.backoff_ms = 1;
        cfg.timeouts.cancel_grace_secs = 1;

        Self {
            td,
            cfg,
            sys: FakeSystem::default(),
            facts: TestEmitter::default(),
        }
    }

    /// Like [`Fixture::new`] plus each image bound to a loop device and mounted read-only.
    pub fn serving(parts: &[(&str, u32)]) -> Self {
        let fx = Self::new(parts);
        for p in &fx.cfg.partitions {
            let dev = fx.sys.bind(&p.image);
            fx.sys.add_mount(&dev, &p.ro_mount, "ro,relatime,uid=1000,gid=1000");
        }
        fx
    }

    pub fn api(&self) -> Lunyard<TestEmitter, TestAudit> {
        self.api_in(PresentMode::Present)
    }

    pub fn api_in(&self, mode: PresentMode) -> Lunyard<TestEmitter, TestAudit> {
        Lunyard::new(self.facts.clone(), TestAudit, self.cfg.clone())
            .with_system(Box::new(self.sys.clone()))
            .with_mode_indicator(Box::new(FixedMode(mode)))
    }

    pub fn api_with_lock(&self, lock: Box<dyn LockManager>) -> Lunyard<TestEmitter, TestAudit> {
        self.api().with_lock_manager(lock)
    }

    pub fn part(&self, name: &str) -> &Partition {
        self.cfg.partition(name).expect("partition")
    }

    pub fn lun_attr(&self, lun: u32) -> PathBuf {
        self.cfg
            .configfs_root
            .join(format!("usb_gadget/teslausb/functions/mass_storage.0/lun.{lun}/file"))
    }

    pub fn lun_backing(&self, lun: u32) -> String {
        fs::read_to_string(self.lun_attr(lun)).unwrap().trim().to_string()
    }

    pub fn udc_attr(&self) -> PathBuf {
        gadget_udc(&self.cfg.configfs_root.join("usb_gadget/teslausb"))
    }

    /// Leave a lock record behind, as a crashed or concurrent holder would, aged `age`.
    pub fn plant_lock(&self, age: Duration) {
        let path = &self.cfg.lock_path;
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"999999 someone-else").unwrap();
        set_age(path, age);
    }
}

fn gadget_udc(gadget: &Path) -> PathBuf {
    gadget.join("UDC")
}

pub fn set_age(path: &Path, age: Duration) {
    fs::File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(SystemTime::now() - age)
        .unwrap();
}
