use std::fs;
use std::path::Path;

use lunyard::fs::ops;
use lunyard::gadget::lun::backing_matches;
use lunyard::QuickEditOptions;

use crate::helpers::fixture::Fixture;

#[test]
fn copy_into_lightshow_succeeds_and_leaves_gadget_healthy() {
    let fx = Fixture::serving(&[("lightshow", 1), ("music", 2)]);
    let src = fx.td.path().join("show.fseq");
    fs::write(&src, b"fseq-frames").unwrap();
    let api = fx.api();

    let dest = Path::new("LightShow/show.fseq").to_path_buf();
    let res = api.quick_edit(
        "lightshow",
        move |w| ops::copy_into(w, &src, &dest),
        QuickEditOptions::default(),
    );

    assert!(res.success, "{}", res.message);
    assert!(res.message.contains("copied"), "{}", res.message);
    let p = fx.part("lightshow");
    assert_eq!(
        fs::read(p.rw_mount.join("LightShow/show.fseq")).unwrap(),
        b"fseq-frames"
    );
    assert!(backing_matches(&fx.lun_backing(1), &p.image));
    let ro = fx.sys.mounted_at(&p.ro_mount).expect("read-only mount restored");
    assert!(!ro.is_read_write());
    assert!(fx.sys.mounted_at(&p.rw_mount).is_none());

    let state = api.check_and_recover_gadget_state();
    assert!(state.healthy, "{state:?}");
    assert!(state.fixes_applied.is_empty());
}

#[test]
fn transition_walks_states_in_order_and_releases_lock() {
    let fx = Fixture::serving(&[("lightshow", 1)]);
    let api = fx.api();
    let res = api.quick_edit("lightshow", |_w| Ok("noop".into()), QuickEditOptions::default());
    assert!(res.success);

    assert_eq!(
        fx.facts.states(),
        vec![
            "backing_cleared",
            "ro_unmounted",
            "loop_ready",
            "rw_mounted",
            "callback_running",
            "synced",
            "backing_restored",
            "rw_unmounted",
            "ro_mounted",
        ]
    );
    assert!(!fx.cfg.lock_path.exists());
    assert!(!api.check_operation_in_progress().in_progress);
    assert_eq!(fx.facts.find("lock.acquire", "success").len(), 1);
    assert_eq!(fx.facts.find("postflight", "success").len(), 1);
}

#[test]
fn lun_is_empty_while_the_window_is_open() {
    let fx = Fixture::serving(&[("music", 0)]);
    let attr = fx.lun_attr(0);
    let api = fx.api();
    let res = api.quick_edit(
        "music",
        move |_w| {
            let seen = fs::read_to_string(&attr)?;
            Ok(format!("lun reads '{}'", seen.trim()))
        },
        QuickEditOptions::default(),
    );
    assert!(res.success);
    assert_eq!(res.message, "lun reads ''");
}
