//! End-to-end hot reload through both host adapters.

use std::sync::Arc;

use serde_json::json;

use modswap_kernel::ConfigValue;
use modswap_kernel::instance::Registration;
use modswap_kernel::manifest::{ConfigKeySpec, ModTypeDescriptor};
use modswap_reload::ReloadError;
use modswap_testing::{Hooks, ModFixture, TestHost, Variant, assert_reload_count};

const VARIANTS: [Variant; 2] = [Variant::Simple, Variant::Package];

fn foo_with_volume() -> ModFixture {
    ModFixture::foo().with_config_key(
        ConfigKeySpec::scalar("volume", "f32").with_default(json!(0.5)),
    )
}

#[test]
fn foo_end_to_end() {
    for variant in VARIANTS {
        let host = TestHost::new(variant).unwrap();
        let foo = host.install_registered("Foo.wasm", &foo_with_volume()).unwrap();
        assert_eq!(host.labels(), vec!["(0) Reload Foo by Nytra"]);

        foo.configuration()
            .unwrap()
            .unwrap()
            .set("volume", ConfigValue::f32(0.8))
            .unwrap();

        host.stage("Foo.wasm", &foo_with_volume()).unwrap();
        let report = host.reloader().hot_reload("Foo.Foo").unwrap();

        // teardown ran on the old module
        assert_eq!(host.teardown_count("Foo"), 1, "{variant:?}");

        // new instance is bound to the trigger
        let current = host.current("Foo.Foo").unwrap();
        assert!(!Arc::ptr_eq(&current, &foo));
        assert_eq!(current.module_name(), report.module_name);
        assert!(report.module_name.starts_with("Foo-"));
        assert_eq!(host.labels(), vec!["(1) Reload Foo by Nytra"]);
        assert_reload_count!(host, "Foo.Foo", 1);
        assert_eq!(report.reload_count, 1);

        // configuration carried over
        let config = current.configuration().unwrap().unwrap();
        assert_eq!(config.get("volume"), Some(ConfigValue::f32(0.8)));
        assert!(config.ptr_eq(&foo.raw_configuration().unwrap()));
        assert_eq!(report.migration.unwrap().migrated, vec!["volume"]);

        // startup hook got the original instance's handle
        assert_eq!(
            host.startup_handles(&report.module_name),
            vec![foo.handle().as_abi()]
        );

        // host bookkeeping resolves the new module
        let resolved = host.reloader().adapter().resolve_module(&report.module_name).unwrap();
        assert!(Arc::ptr_eq(&resolved, &current));
        assert!(current.is_finished_loading());
    }
}

#[test]
fn trigger_reloads_repeatedly() {
    for variant in VARIANTS {
        let host = TestHost::new(variant).unwrap();
        let foo = host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
        host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

        for n in 0..3 {
            let label = format!("({n}) Reload Foo by Nytra");
            assert!(host.invoke(&label), "{variant:?}: missing trigger {label}");
        }
        assert_reload_count!(host, "Foo.Foo", 3);
        assert_eq!(host.labels(), vec!["(3) Reload Foo by Nytra"]);

        let current = host.current("Foo.Foo").unwrap();
        assert!(Arc::ptr_eq(
            &host.reloader().registry().original_of(&current).unwrap(),
            &foo
        ));
        assert_eq!(
            host.startup_handles(current.module_name()),
            vec![foo.handle().as_abi()]
        );
    }
}

#[test]
fn simple_adapter_records_replacement_file() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    let staged = host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

    host.reloader().hot_reload("Foo.Foo").unwrap();
    let current = host.current("Foo.Foo").unwrap();
    assert_eq!(
        current.registration(),
        Some(Registration::AssemblyFile {
            file: staged.clone(),
            sha256: None
        })
    );
    assert_eq!(current.location(), staged);
    assert_eq!(host.loaded_mods().len(), 2);
}

#[test]
fn package_adapter_replaces_package() {
    let host = TestHost::new(Variant::Package).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.stage("Foo.wasm", &ModFixture::foo().with_version("2.0.0")).unwrap();

    host.reloader().hot_reload("Foo.Foo").unwrap();

    let loader = host.package_loader().unwrap();
    assert_eq!(loader.packages().len(), 1);
    let package = loader.package("Foo.Foo").unwrap();
    assert_eq!(package.description(), "Hot Reloaded Mod");
    assert_eq!(package.version().to_string(), "2.0.0");
    assert_eq!(host.loaded_mods().len(), 1);
}

#[test]
fn replacement_file_name_matches_ignoring_case() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.stage("FOO.Wasm", &ModFixture::foo()).unwrap();

    assert!(host.reloader().hot_reload("Foo.Foo").is_ok());
}

#[test]
fn missing_replacement_leaves_host_untouched() {
    for variant in VARIANTS {
        let host = TestHost::new(variant).unwrap();
        let foo = host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
        std::fs::create_dir_all(host.staging_dir()).unwrap();
        std::fs::write(host.staging_dir().join("Foo.txt"), b"not a module").unwrap();
        let loaded_before = host.loaded_mods();

        let err = host.reloader().hot_reload("Foo.Foo").unwrap_err();
        assert!(matches!(err, ReloadError::ReplacementMissing(_)), "{err}");

        assert_eq!(host.teardown_count("Foo"), 0);
        let loaded_after = host.loaded_mods();
        assert_eq!(loaded_after.len(), loaded_before.len());
        assert!(Arc::ptr_eq(&loaded_after[0], &loaded_before[0]));
        assert!(Arc::ptr_eq(&host.current("Foo.Foo").unwrap(), &foo));
        assert_eq!(host.labels(), vec!["(0) Reload Foo by Nytra"]);
        assert_reload_count!(host, "Foo.Foo", 0);
    }
}

#[test]
fn missing_watched_directory() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();

    assert!(matches!(
        host.reloader().hot_reload("Foo.Foo"),
        Err(ReloadError::WatchedDirectoryMissing(_))
    ));
}

#[test]
fn unregistered_type() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install("Foo.wasm", &ModFixture::foo()).unwrap();
    host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

    assert!(matches!(
        host.reloader().hot_reload("Foo.Foo"),
        Err(ReloadError::NotRegistered(t)) if t == "Foo.Foo"
    ));
}

#[test]
fn missing_teardown_hook_aborts_before_teardown() {
    let host = TestHost::new(Variant::Simple).unwrap();
    let old = ModFixture::foo().with_hooks(Hooks::StartupOnly);
    host.install_registered("Foo.wasm", &old).unwrap();
    host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

    assert!(matches!(
        host.reloader().hot_reload("Foo.Foo"),
        Err(ReloadError::MissingTeardownHook { .. })
    ));
    assert_eq!(host.labels(), vec!["(0) Reload Foo by Nytra"]);
    assert_eq!(host.modules().len(), 1);
}

#[test]
fn missing_startup_hook_tears_down_but_registers_nothing() {
    for variant in VARIANTS {
        let host = TestHost::new(variant).unwrap();
        host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
        host.stage("Foo.wasm", &ModFixture::foo().with_hooks(Hooks::TeardownOnly))
            .unwrap();
        let loaded_before = host.loaded_mods().len();

        assert!(matches!(
            host.reloader().hot_reload("Foo.Foo"),
            Err(ReloadError::MissingStartupHook { .. })
        ));

        assert_eq!(host.teardown_count("Foo"), 1);
        assert_eq!(host.loaded_mods().len(), loaded_before);
        assert!(host.labels().is_empty());
        assert_reload_count!(host, "Foo.Foo", 0);
    }
}

#[test]
fn mod_type_matched_by_full_name() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.stage("Foo.wasm", &ModFixture::foo().with_type_name("Bar.Foo"))
        .unwrap();

    assert!(matches!(
        host.reloader().hot_reload("Foo.Foo"),
        Err(ReloadError::ModTypeNotFound { .. })
    ));
    assert_eq!(host.loaded_mods().len(), 1);
}

#[test]
fn mod_type_found_among_several() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    let replacement = ModFixture::foo()
        .with_type_name("Foo.Helper")
        .with_extra_type(ModTypeDescriptor::new("Foo.Foo").with_name("Foo"));
    host.stage("Foo.wasm", &replacement).unwrap();

    let report = host.reloader().hot_reload("Foo.Foo").unwrap();
    assert_eq!(report.type_name, "Foo.Foo");
    assert_eq!(host.current("Foo.Foo").unwrap().type_name(), "Foo.Foo");
}

#[test]
fn trapping_teardown_propagates() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered(
        "Foo.wasm",
        &ModFixture::foo().with_hooks(Hooks::TrappingTeardown),
    )
    .unwrap();
    host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

    assert!(matches!(
        host.reloader().hot_reload("Foo.Foo"),
        Err(ReloadError::HookFailed(_))
    ));
    // trigger was removed before the hook ran and is not restored
    assert!(host.labels().is_empty());
    assert_eq!(host.modules().len(), 1);
}

#[test]
fn malformed_replacement_fails_rewrite() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    std::fs::create_dir_all(host.staging_dir()).unwrap();
    std::fs::write(host.staging_dir().join("Foo.wasm"), b"garbage").unwrap();

    assert!(matches!(
        host.reloader().hot_reload("Foo.Foo"),
        Err(ReloadError::RewriteFailed(_))
    ));
}
