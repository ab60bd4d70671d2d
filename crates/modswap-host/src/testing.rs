use modswap_kernel::image::ModuleImage;
use modswap_kernel::manifest::{ModManifest, ModTypeDescriptor};

pub(crate) const HOOKS_WAT: &str = r#"
    (module
      (func (export "before_hot_reload"))
      (func (export "on_hot_reload") (param i64)))
"#;

/// A module named `module_name` declaring one mod type
pub(crate) fn mod_bytes(module_name: &str, type_name: &str, display_name: &str) -> Vec<u8> {
    let mut image = ModuleImage::parse(&wat::parse_str(HOOKS_WAT).unwrap()).unwrap();
    image.set_module_name(module_name).unwrap();
    ModManifest::new()
        .with_mod(
            ModTypeDescriptor::new(type_name)
                .with_name(display_name)
                .with_author("Nytra")
                .with_version("1.2.0")
                .with_link("https://github.com/Nytra/ResoniteHotReloadLib"),
        )
        .write_to(&mut image)
        .unwrap();
    image.to_bytes()
}
