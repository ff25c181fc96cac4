use std::fs;

use lunyard::QuickEditOptions;

use crate::helpers::fixture::Fixture;

#[test]
fn critical_restore_failure_never_overrides_the_result() {
    let fx = Fixture::serving(&[("lightshow", 1)]);
    let lun_dir = fx.lun_attr(1).parent().unwrap().to_path_buf();
    let api = fx.api();
    // The gadget loses the LUN while the window is open.
    let res = api.quick_edit(
        "lightshow",
        move |_w| {
            fs::remove_dir_all(&lun_dir)?;
            Ok("edited".into())
        },
        QuickEditOptions::default(),
    );
    assert!(res.success, "{}", res.message);
    assert_eq!(res.message, "edited");
    assert!(fx.facts.has_error_id("cleanup", "E_RESTORE_FAILED"));
    // Read-only service is still attempted after the LUN failure.
    assert!(fx.sys.mounted_at(&fx.part("lightshow").ro_mount).is_some());

    let state = api.check_and_recover_gadget_state();
    assert!(!state.healthy);
    assert!(!state.errors.is_empty());
}

#[test]
fn degraded_ro_remount_keeps_result_and_surfaces_in_health() {
    let fx = Fixture::serving(&[("music", 0)]);
    let api = fx.api();
    fx.sys.fail("mount_ro");
    let res = api.quick_edit("music", |_w| Ok("renamed a to b".into()), QuickEditOptions::default());
    assert!(res.success);
    assert_eq!(res.message, "renamed a to b");

    assert!(fx.facts.has_error_id("cleanup", "E_MOUNT"));
    let post = fx.facts.find("postflight", "warn");
    assert_eq!(post[0]["degraded"], true);

    let state = api.check_and_recover_gadget_state();
    assert!(!state.healthy);
    assert!(state.issues.iter().any(|i| i.contains("read-only mount")));
}

#[test]
fn cache_drop_failure_is_ignored() {
    let fx = Fixture::serving(&[("music", 0)]);
    fx.sys.fail("drop_caches");
    let res = fx
        .api()
        .quick_edit("music", |_w| Ok("ok".into()), QuickEditOptions::default());
    assert!(res.success);
    assert_eq!(fx.sys.count_calls("drop_caches"), 1);
    assert!(fx.facts.find("postflight", "success").len() == 1);
}

#[test]
fn cleanup_leaves_a_foreign_rw_mount_alone() {
    let fx = Fixture::serving(&[("music", 0)]);
    let p = fx.part("music").clone();
    let foreign = std::path::Path::new("/dev/sdz1");
    fx.sys.add_mount(foreign, &p.rw_mount, "rw,relatime");

    let res = fx
        .api()
        .quick_edit("music", |_w| Ok("never runs".into()), QuickEditOptions::default());
    assert!(!res.success);
    assert!(res.message.ends_with("(E_MOUNT)"), "{}", res.message);

    let unmounts_of_rw = fx
        .sys
        .calls()
        .iter()
        .filter(|c| *c == &format!("unmount {}", p.rw_mount.display()))
        .count();
    assert_eq!(unmounts_of_rw, 0);
    let still = fx.sys.mounted_at(&p.rw_mount).expect("foreign mount kept");
    assert_eq!(still.source.as_path(), foreign);
    // Read-only service comes back regardless.
    assert!(fx.sys.mounted_at(&p.ro_mount).is_some());
}
