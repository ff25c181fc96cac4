use lunyard::QuickEditOptions;

use crate::helpers::fixture::Fixture;

#[test]
fn sequential_edits_reuse_one_loop_device() {
    let fx = Fixture::new(&[("lightshow", 1)]);
    let api = fx.api();
    let image = fx.part("lightshow").image.clone();

    for i in 0..3 {
        let res = api.quick_edit("lightshow", move |_w| Ok(format!("pass {i}")), QuickEditOptions::default());
        assert!(res.success, "{}", res.message);
        assert_eq!(fx.sys.bindings_for(&image), 1);
    }

    assert_eq!(fx.sys.count_calls("attach"), 1);
    let st = fx.sys.state();
    let sources: Vec<_> = st.mount_history.iter().map(|m| m.source.clone()).collect();
    assert_eq!(sources.len(), 6, "one rw and one ro mount per edit");
    assert!(sources.windows(2).all(|w| w[0] == w[1]), "{sources:?}");
}

#[test]
fn existing_binding_is_reused_not_duplicated() {
    let fx = Fixture::serving(&[("music", 0)]);
    let image = fx.part("music").image.clone();
    let api = fx.api();
    let res = api.quick_edit("music", |_w| Ok("ok".into()), QuickEditOptions::default());
    assert!(res.success);
    assert_eq!(fx.sys.count_calls("attach"), 0);
    assert_eq!(fx.sys.bindings_for(&image), 1);
}
