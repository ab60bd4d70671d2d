//! Hot reload registration and trigger bookkeeping.

use modswap_reload::{ReloadError, trigger_label};
use modswap_testing::{ModFixture, TestHost, Variant, assert_reload_count};

#[test]
fn register_adds_trigger() {
    let host = TestHost::new(Variant::Simple).unwrap();
    let foo = host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();

    assert_eq!(host.labels(), vec!["(0) Reload Foo by Nytra"]);
    assert_eq!(host.reloader().registry().label_for(&foo).unwrap(), "(0) Reload Foo by Nytra");
    assert_reload_count!(host, "Foo.Foo", 0);
}

#[test]
fn double_registration_rejected() {
    let host = TestHost::new(Variant::Simple).unwrap();
    let foo = host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();

    assert!(matches!(
        host.reloader().register_for_hot_reload(&foo),
        Err(ReloadError::AlreadyRegistered(_))
    ));
    assert_eq!(host.labels().len(), 1);
    assert_eq!(host.reloader().registry().len(), 1);
}

#[test]
fn missing_metadata_renders_null() {
    let host = TestHost::new(Variant::Simple).unwrap();
    let bare = ModFixture::new("Bare", "Bare.Bare");
    let instance = host.install_registered("Bare.wasm", &bare).unwrap();

    assert_eq!(trigger_label(&instance, 0), "(0) Reload NULL by NULL");
    assert_eq!(host.labels(), vec!["(0) Reload NULL by NULL"]);
}

#[test]
fn independent_mods_have_independent_counts() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.install_registered(
        "Bar.wasm",
        &ModFixture::new("Bar", "Bar.Bar").with_name("Bar").with_author("Nytra"),
    )
    .unwrap();
    host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

    host.reloader().hot_reload("Foo.Foo").unwrap();
    host.reloader().hot_reload("Foo.Foo").unwrap();

    assert_reload_count!(host, "Foo.Foo", 2);
    assert_reload_count!(host, "Bar.Bar", 0);
    assert_reload_count!(host, "Baz.Baz", 0);

    let mut labels = host.labels();
    labels.sort();
    assert_eq!(labels, vec!["(0) Reload Bar by Nytra", "(2) Reload Foo by Nytra"]);
}

#[test]
fn reload_count_increments_by_one() {
    for variant in [Variant::Simple, Variant::Package] {
        let host = TestHost::new(variant).unwrap();
        host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
        host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

        for n in 1..=4 {
            let report = host.reloader().hot_reload("Foo.Foo").unwrap();
            assert_eq!(report.reload_count, n);
            assert_reload_count!(host, "Foo.Foo", n);
            assert_eq!(host.labels(), vec![format!("({n}) Reload Foo by Nytra")]);
        }
    }
}

#[test]
fn remove_menu_option_detaches_trigger() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    let path = host.reloader().settings().menu_path.clone();

    assert!(host.reloader().remove_menu_option(&path, "(0) Reload Foo by Nytra"));
    assert!(!host.reloader().remove_menu_option(&path, "(0) Reload Foo by Nytra"));
    assert!(host.labels().is_empty());
    assert!(!host.invoke("(0) Reload Foo by Nytra"));
}
