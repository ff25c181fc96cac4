use std::fs;
use std::time::Duration;

use lunyard::gadget::lun::backing_matches;
use lunyard::types::PresentMode;

use crate::helpers::fixture::{Fixture, UDC_NAME};

#[test]
fn rebind_restores_luns_and_rebinds_same_controller() {
    let fx = Fixture::serving(&[("lightshow", 1), ("music", 2)]);
    fs::write(fx.lun_attr(2), b"").unwrap();
    let res = fx.api().rebind(Duration::from_millis(20));
    assert!(res.success, "{}", res.message);
    assert!(res.message.contains(UDC_NAME));
    assert_eq!(fs::read_to_string(fx.udc_attr()).unwrap().trim(), UDC_NAME);
    assert!(backing_matches(&fx.lun_backing(1), &fx.part("lightshow").image));
    assert!(backing_matches(&fx.lun_backing(2), &fx.part("music").image));
    assert_eq!(fx.facts.find("rebind", "success").len(), 1);
    assert!(!fx.cfg.lock_path.exists());
}

#[test]
fn unbound_gadget_uses_first_available_controller() {
    let fx = Fixture::serving(&[("music", 0)]);
    fs::write(fx.udc_attr(), b"\n").unwrap();
    let res = fx.api().rebind(Duration::from_millis(1));
    assert!(res.success, "{}", res.message);
    assert_eq!(fs::read_to_string(fx.udc_attr()).unwrap().trim(), UDC_NAME);
}

#[test]
fn no_controller_is_a_gadget_error() {
    let fx = Fixture::serving(&[("music", 0)]);
    fs::write(fx.udc_attr(), b"\n").unwrap();
    fs::remove_dir(fx.cfg.udc_class_dir.join(UDC_NAME)).unwrap();
    let res = fx.api().rebind(Duration::from_millis(1));
    assert!(!res.success);
    assert!(res.message.ends_with("(E_GADGET)"), "{}", res.message);
}

#[test]
fn rebind_refuses_in_edit_mode() {
    let fx = Fixture::serving(&[("music", 0)]);
    let res = fx.api_in(PresentMode::Edit).rebind(Duration::from_millis(1));
    assert!(!res.success);
    assert!(res.message.contains("edit mode"));
    assert_eq!(fs::read_to_string(fx.udc_attr()).unwrap().trim(), UDC_NAME);
}

#[test]
fn rebind_waits_for_the_transition_lock() {
    let mut fx = Fixture::serving(&[("music", 0)]);
    fx.cfg.timeouts.lock_secs = 0;
    fx.plant_lock(Duration::from_secs(1));
    let api = fx.api();
    let res = api.rebind(Duration::from_millis(1));
    assert!(!res.success);
    assert!(res.message.ends_with("(E_LOCKING)"));
}
