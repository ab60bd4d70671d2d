//! Configuration hand-off across reloads.

use serde_json::json;

use modswap_kernel::manifest::{ConfigKeySpec, TypeSpec};
use modswap_kernel::schema::{ConfigValue, EnumVariant, IntRepr, Validator, ValueType};
use modswap_reload::SkipReason;
use modswap_testing::{ModFixture, TestHost, Variant};

fn quality(variants: &[(&str, i64)]) -> ConfigKeySpec {
    ConfigKeySpec::new(
        "quality",
        TypeSpec::Enum {
            name: "Foo.Quality".to_string(),
            repr: IntRepr::U8,
            variants: variants
                .iter()
                .map(|(name, value)| EnumVariant::new(name, *value))
                .collect(),
        },
    )
    .with_default(json!("Low"))
}

#[test]
fn same_name_and_type_carries_value() {
    let fixture = ModFixture::foo()
        .with_config_key(ConfigKeySpec::scalar("volume", "f32").with_default(json!(0.5)))
        .with_config_key(ConfigKeySpec::scalar("title", "string").with_default(json!("Foo")));

    let host = TestHost::new(Variant::Simple).unwrap();
    let foo = host.install_registered("Foo.wasm", &fixture).unwrap();
    let config = foo.configuration().unwrap().unwrap();
    config.set("volume", ConfigValue::f32(0.8)).unwrap();

    host.stage("Foo.wasm", &fixture).unwrap();
    let report = host.reloader().hot_reload("Foo.Foo").unwrap();
    let migration = report.migration.unwrap();
    assert_eq!(migration.migrated, vec!["volume"]);
    assert!(migration.is_clean());

    let current = host.current("Foo.Foo").unwrap().configuration().unwrap().unwrap();
    assert_eq!(current.get("volume"), Some(ConfigValue::f32(0.8)));
    // keys that only held a default stay at the new default
    assert!(!current.has_value("title"));
    assert_eq!(current.get("title"), Some(ConfigValue::string("Foo")));
}

#[test]
fn changed_type_keeps_new_default() {
    let old = ModFixture::foo()
        .with_config_key(ConfigKeySpec::scalar("volume", "f32").with_default(json!(0.5)));
    let new = ModFixture::foo()
        .with_config_key(ConfigKeySpec::scalar("volume", "i32").with_default(json!(3)));

    let host = TestHost::new(Variant::Simple).unwrap();
    let foo = host.install_registered("Foo.wasm", &old).unwrap();
    foo.configuration()
        .unwrap()
        .unwrap()
        .set("volume", ConfigValue::f32(0.8))
        .unwrap();

    host.stage("Foo.wasm", &new).unwrap();
    let migration = host.reloader().hot_reload("Foo.Foo").unwrap().migration.unwrap();
    assert!(migration.migrated.is_empty());
    assert_eq!(migration.unmatched, vec!["volume"]);

    let current = host.current("Foo.Foo").unwrap().configuration().unwrap().unwrap();
    assert_eq!(current.get("volume"), Some(ConfigValue::i32(3)));
}

#[test]
fn removed_key_is_discarded() {
    let old = ModFixture::foo()
        .with_config_key(ConfigKeySpec::scalar("legacy", "bool").with_default(json!(false)));

    let host = TestHost::new(Variant::Package).unwrap();
    let foo = host.install_registered("Foo.wasm", &old).unwrap();
    foo.configuration()
        .unwrap()
        .unwrap()
        .set("legacy", ConfigValue::Bool(true))
        .unwrap();

    host.stage(
        "Foo.wasm",
        &ModFixture::foo().with_config_key(ConfigKeySpec::scalar("volume", "f32")),
    )
    .unwrap();
    let migration = host.reloader().hot_reload("Foo.Foo").unwrap().migration.unwrap();
    assert_eq!(migration.unmatched, vec!["legacy"]);

    let current = host.current("Foo.Foo").unwrap().configuration().unwrap().unwrap();
    assert_eq!(current.get("legacy"), None);
    assert_eq!(current.definition().len(), 1);
}

#[test]
fn rejected_value_is_skipped() {
    let old = ModFixture::foo()
        .with_config_key(ConfigKeySpec::scalar("volume", "f32").with_default(json!(0.5)));
    let new = ModFixture::foo().with_config_key(
        ConfigKeySpec::scalar("volume", "f32")
            .with_default(json!(0.5))
            .with_validator(Validator::Range { min: 0.0, max: 1.0 }),
    );

    let host = TestHost::new(Variant::Simple).unwrap();
    let foo = host.install_registered("Foo.wasm", &old).unwrap();
    foo.configuration()
        .unwrap()
        .unwrap()
        .set("volume", ConfigValue::f32(4.0))
        .unwrap();

    host.stage("Foo.wasm", &new).unwrap();
    let migration = host.reloader().hot_reload("Foo.Foo").unwrap().migration.unwrap();
    assert_eq!(migration.skipped.len(), 1);
    assert_eq!(migration.skipped[0].key, "volume");
    assert!(matches!(migration.skipped[0].reason, SkipReason::Rejected(_)));

    let current = host.current("Foo.Foo").unwrap().configuration().unwrap().unwrap();
    assert_eq!(current.get("volume"), Some(ConfigValue::f32(0.5)));
}

#[test]
fn enum_value_follows_new_module() {
    let variants = [("Low", 0), ("High", 2)];
    let fixture = ModFixture::foo().with_config_key(quality(&variants));

    let host = TestHost::new(Variant::Simple).unwrap();
    let foo = host.install_registered("Foo.wasm", &fixture).unwrap();
    let config = foo.configuration().unwrap().unwrap();
    let ValueType::Enum(old_type) = config.definition().key("quality").unwrap().value_type().clone()
    else {
        panic!("quality is an enum key");
    };
    config
        .set("quality", ConfigValue::Enum { ty: old_type, value: 2 })
        .unwrap();

    host.stage("Foo.wasm", &fixture).unwrap();
    let report = host.reloader().hot_reload("Foo.Foo").unwrap();
    assert_eq!(report.migration.unwrap().migrated, vec!["quality"]);

    let current = host.current("Foo.Foo").unwrap().configuration().unwrap().unwrap();
    match current.get("quality") {
        Some(ConfigValue::Enum { ty, value }) => {
            assert_eq!(value, 2);
            assert_eq!(ty.origin.as_deref(), Some(report.module_name.as_str()));
        }
        other => panic!("unexpected value {other:?}"),
    }
}

#[test]
fn enum_value_missing_from_new_module_is_skipped() {
    let host = TestHost::new(Variant::Simple).unwrap();
    let foo = host
        .install_registered(
            "Foo.wasm",
            &ModFixture::foo().with_config_key(quality(&[("Low", 0), ("Ultra", 3)])),
        )
        .unwrap();
    let config = foo.configuration().unwrap().unwrap();
    let ValueType::Enum(old_type) = config.definition().key("quality").unwrap().value_type().clone()
    else {
        panic!("quality is an enum key");
    };
    config
        .set("quality", ConfigValue::Enum { ty: old_type, value: 3 })
        .unwrap();

    host.stage(
        "Foo.wasm",
        &ModFixture::foo().with_config_key(quality(&[("Low", 0), ("High", 2)])),
    )
    .unwrap();
    let migration = host.reloader().hot_reload("Foo.Foo").unwrap().migration.unwrap();
    assert!(matches!(migration.skipped[0].reason, SkipReason::Conversion(_)));
}

#[test]
fn later_reloads_migrate_from_the_original_handle() {
    let fixture = ModFixture::foo()
        .with_config_key(ConfigKeySpec::scalar("volume", "f32").with_default(json!(0.5)));

    let host = TestHost::new(Variant::Package).unwrap();
    let foo = host.install_registered("Foo.wasm", &fixture).unwrap();
    let handle = foo.configuration().unwrap().unwrap();
    handle.set("volume", ConfigValue::f32(0.8)).unwrap();

    host.stage("Foo.wasm", &fixture).unwrap();
    host.reloader().hot_reload("Foo.Foo").unwrap();

    // edits made through the surviving handle are seen by the next reload
    handle.set("volume", ConfigValue::f32(0.25)).unwrap();
    host.reloader().hot_reload("Foo.Foo").unwrap();

    let current = host.current("Foo.Foo").unwrap().configuration().unwrap().unwrap();
    assert!(current.ptr_eq(&handle));
    assert_eq!(current.get("volume"), Some(ConfigValue::f32(0.25)));
    assert_eq!(host.reloader().reload_count_of_type("Foo.Foo"), 2);
}

#[test]
fn mod_without_configuration() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

    let report = host.reloader().hot_reload("Foo.Foo").unwrap();
    assert!(report.migration.is_none());
}
