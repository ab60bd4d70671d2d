//! Module identity rewriting.

use std::collections::HashSet;

use modswap_kernel::image::ModuleImage;
use modswap_reload::IdentityRewriter;
use modswap_testing::{ModFixture, TestHost, Variant};

#[test]
fn rewritten_names_never_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Foo.wasm");
    ModFixture::foo().write(&path).unwrap();

    let names: HashSet<String> = (0..32)
        .map(|_| IdentityRewriter::rewrite(&path).unwrap().new_name)
        .collect();
    assert_eq!(names.len(), 32);
    assert!(names.iter().all(|n| n.starts_with("Foo-")));
}

#[test]
fn source_file_is_not_modified() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Foo.wasm");
    ModFixture::foo().write(&path).unwrap();
    let before = std::fs::read(&path).unwrap();

    let rewritten = IdentityRewriter::rewrite(&path).unwrap();

    assert_eq!(std::fs::read(&path).unwrap(), before);
    assert_eq!(rewritten.original_name, "Foo");
    let image = ModuleImage::parse(&rewritten.bytes).unwrap();
    assert_eq!(image.module_name().unwrap().as_deref(), Some(rewritten.new_name.as_str()));
}

#[test]
fn unnamed_module_uses_file_stem() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Anon.wasm");
    ModFixture::foo().with_module_name(None).write(&path).unwrap();

    let rewritten = IdentityRewriter::rewrite(&path).unwrap();
    assert_eq!(rewritten.original_name, "Anon");
    assert!(rewritten.new_name.starts_with("Anon-"));
}

#[test]
fn same_file_reloads_side_by_side() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

    let first = host.reloader().hot_reload("Foo.Foo").unwrap();
    let second = host.reloader().hot_reload("Foo.Foo").unwrap();

    assert_ne!(first.module_name, second.module_name);
    assert_eq!(host.modules().len(), 3);
    assert!(host.wasm_module("Foo").is_some());
    assert!(host.wasm_module(&first.module_name).is_some());
    assert!(host.wasm_module(&second.module_name).is_some());
}
