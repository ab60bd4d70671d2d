//! File-watcher driven reloads.

use std::io::Write;
use std::time::{Duration, Instant};

use modswap_reload::HotReloadSettings;
use modswap_testing::{ModFixture, TestHost, Variant, assert_reload_count};

const WAIT: Duration = Duration::from_secs(10);

/// Move a finished module into the replacement directory in one step
fn stage_atomically(host: &TestHost, fixture: &ModFixture) {
    let scratch = host.mods_dir().join("Foo.staged");
    fixture.write(&scratch).unwrap();
    std::fs::rename(&scratch, host.staging_dir().join("Foo.wasm")).unwrap();
}

fn settings(auto_reload: bool) -> HotReloadSettings {
    HotReloadSettings::default()
        .with_auto_reload(auto_reload)
        .with_debounce(Duration::from_millis(50))
}

#[test]
fn staged_replacement_reloads_automatically() {
    let host = TestHost::with_settings(Variant::Simple, settings(true)).unwrap();
    std::fs::create_dir_all(host.staging_dir()).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.reloader().start_watching().unwrap();
    assert!(host.reloader().is_watching());

    stage_atomically(&host, &ModFixture::foo());

    let deadline = Instant::now() + WAIT;
    let mut outcomes = Vec::new();
    while outcomes.is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));
        outcomes = host.reloader().process_watch_events();
    }

    assert_eq!(outcomes.len(), 1);
    let (type_name, result) = &outcomes[0];
    assert_eq!(type_name, "Foo.Foo");
    assert!(result.is_ok(), "{result:?}");
    assert_reload_count!(host, "Foo.Foo", 1);
    assert_eq!(host.teardown_count("Foo"), 1);
}

#[test]
fn chunked_write_reloads_once_after_it_settles() {
    let settings = HotReloadSettings::default()
        .with_auto_reload(true)
        .with_debounce(Duration::from_millis(400));
    let host = TestHost::with_settings(Variant::Simple, settings).unwrap();
    std::fs::create_dir_all(host.staging_dir()).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.reloader().start_watching().unwrap();

    let bytes = ModFixture::foo().bytes();
    let (head, tail) = bytes.split_at(bytes.len() / 2);
    let target = host.staging_dir().join("Foo.wasm");
    let mut file = std::fs::File::create(&target).unwrap();
    file.write_all(head).unwrap();
    file.flush().unwrap();

    std::thread::sleep(Duration::from_millis(50));
    assert!(host.reloader().process_watch_events().is_empty());
    assert_eq!(host.teardown_count("Foo"), 0);

    file.write_all(tail).unwrap();
    file.flush().unwrap();
    drop(file);

    let deadline = Instant::now() + WAIT;
    let mut outcomes = Vec::new();
    while outcomes.is_empty() && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(100));
        outcomes = host.reloader().process_watch_events();
    }

    assert_eq!(outcomes.len(), 1);
    let (type_name, result) = &outcomes[0];
    assert_eq!(type_name, "Foo.Foo");
    assert!(result.is_ok(), "{result:?}");

    std::thread::sleep(Duration::from_millis(600));
    assert!(host.reloader().process_watch_events().is_empty());
    assert_reload_count!(host, "Foo.Foo", 1);
    assert_eq!(host.teardown_count("Foo"), 1);
}

#[test]
fn without_auto_reload_changes_are_only_reported() {
    let host = TestHost::with_settings(Variant::Simple, settings(false)).unwrap();
    std::fs::create_dir_all(host.staging_dir()).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.reloader().start_watching().unwrap();

    host.stage("Foo.wasm", &ModFixture::foo()).unwrap();
    std::thread::sleep(Duration::from_millis(500));

    assert!(host.reloader().process_watch_events().is_empty());
    assert_reload_count!(host, "Foo.Foo", 0);
    assert_eq!(host.labels(), vec!["(0) Reload Foo by Nytra"]);
}

#[test]
fn unrelated_files_are_ignored() {
    let host = TestHost::with_settings(Variant::Simple, settings(true)).unwrap();
    std::fs::create_dir_all(host.staging_dir()).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.reloader().start_watching().unwrap();

    host.stage("Other.wasm", &ModFixture::new("Other", "Other.Other")).unwrap();
    std::fs::write(host.staging_dir().join("Foo.txt"), b"notes").unwrap();
    std::thread::sleep(Duration::from_millis(500));

    assert!(host.reloader().process_watch_events().is_empty());
    assert_reload_count!(host, "Foo.Foo", 0);
}

#[test]
fn not_watching_yields_nothing() {
    let host = TestHost::new(Variant::Simple).unwrap();
    host.install_registered("Foo.wasm", &ModFixture::foo()).unwrap();
    host.stage("Foo.wasm", &ModFixture::foo()).unwrap();

    assert!(!host.reloader().is_watching());
    assert!(host.reloader().process_watch_events().is_empty());
}
