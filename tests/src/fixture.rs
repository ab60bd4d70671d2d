use std::path::Path;

use modswap_kernel::image::ModuleImage;
use modswap_kernel::manifest::{ConfigKeySpec, ModManifest, ModTypeDescriptor};

/// Which hot reload hooks a fixture module exports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Hooks {
    #[default]
    Both,
    TeardownOnly,
    StartupOnly,
    None,
    /// Both, but the teardown hook traps
    TrappingTeardown,
}

/// Builder for a mod module
///
/// The module exports a `torn_down` counter bumped by its teardown hook, and
/// its startup hook passes the handle it receives to `modswap.trace`.
#[derive(Debug, Clone)]
pub struct ModFixture {
    module_name: Option<String>,
    descriptor: ModTypeDescriptor,
    extra_types: Vec<ModTypeDescriptor>,
    hooks: Hooks,
}

impl ModFixture {
    /// `Foo.Foo` named `Foo` by `Nytra`, in a module named `Foo`
    pub fn foo() -> Self {
        Self::new("Foo", "Foo.Foo")
            .with_name("Foo")
            .with_author("Nytra")
            .with_version("1.0.0")
    }

    pub fn new(module_name: &str, type_name: &str) -> Self {
        Self {
            module_name: Some(module_name.to_string()),
            descriptor: ModTypeDescriptor::new(type_name),
            extra_types: Vec::new(),
            hooks: Hooks::Both,
        }
    }

    pub fn with_module_name(mut self, name: Option<&str>) -> Self {
        self.module_name = name.map(str::to_string);
        self
    }

    pub fn with_type_name(mut self, type_name: &str) -> Self {
        self.descriptor.type_name = type_name.to_string();
        self
    }

    pub fn with_name(mut self, name: &str) -> Self {
        self.descriptor = self.descriptor.with_name(name);
        self
    }

    pub fn with_author(mut self, author: &str) -> Self {
        self.descriptor = self.descriptor.with_author(author);
        self
    }

    pub fn with_version(mut self, version: &str) -> Self {
        self.descriptor = self.descriptor.with_version(version);
        self
    }

    pub fn with_link(mut self, link: &str) -> Self {
        self.descriptor = self.descriptor.with_link(link);
        self
    }

    pub fn with_config_key(mut self, key: ConfigKeySpec) -> Self {
        self.descriptor = self.descriptor.with_config_key(key);
        self
    }

    /// Declare another mod type in the same module
    pub fn with_extra_type(mut self, descriptor: ModTypeDescriptor) -> Self {
        self.extra_types.push(descriptor);
        self
    }

    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn type_name(&self) -> &str {
        &self.descriptor.type_name
    }

    pub fn descriptor(&self) -> &ModTypeDescriptor {
        &self.descriptor
    }

    fn wat(&self) -> String {
        let teardown = match self.hooks {
            Hooks::Both | Hooks::TeardownOnly => {
                "(func (export \"before_hot_reload\") global.get $torn i32.const 1 i32.add global.set $torn)"
            }
            Hooks::TrappingTeardown => "(func (export \"before_hot_reload\") unreachable)",
            Hooks::StartupOnly | Hooks::None => "",
        };
        let startup = match self.hooks {
            Hooks::Both | Hooks::StartupOnly | Hooks::TrappingTeardown => {
                "(func (export \"on_hot_reload\") (param i64) local.get 0 call $trace)"
            }
            Hooks::TeardownOnly | Hooks::None => "",
        };
        format!(
            "(module
               (import \"modswap\" \"trace\" (func $trace (param i64)))
               (global $torn (export \"torn_down\") (mut i32) (i32.const 0))
               {teardown}
               {startup})"
        )
    }

    /// The module image
    pub fn bytes(&self) -> Vec<u8> {
        let wasm = wat::parse_str(self.wat()).expect("fixture WAT is valid");
        let mut image = ModuleImage::parse(&wasm).expect("wat output parses");
        if let Some(name) = &self.module_name {
            image.set_module_name(name).expect("module name is writable");
        }

        let mut manifest = ModManifest::new().with_mod(self.descriptor.clone());
        for extra in &self.extra_types {
            manifest = manifest.with_mod(extra.clone());
        }
        manifest.write_to(&mut image).expect("manifest serializes");
        image.to_bytes()
    }

    pub fn write(&self, path: &Path) -> std::io::Result<()> {
        std::fs::write(path, self.bytes())
    }
}
