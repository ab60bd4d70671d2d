use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::image::ImageError;
use crate::instance::InstanceHandle;
use crate::manifest::{ManifestError, ModManifest, ModTypeDescriptor};

// ============================================================================
// 钩子 (Mod-author hooks)
// ============================================================================

/// 卸载钩子导出名, 签名 `() -> ()`
/// Teardown hook export, signature `() -> ()`
pub const TEARDOWN_HOOK: &str = "before_hot_reload";

/// 启动钩子导出名, 签名 `(i64) -> ()`
/// Startup hook export, signature `(i64) -> ()`
pub const STARTUP_HOOK: &str = "on_hot_reload";

/// 钩子类型
/// Hook kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookKind {
    /// 旧实例卸载其效果
    /// The old instance undoes its effects
    Teardown,
    /// 新实例重新应用其效果
    /// The new instance re-applies its effects
    Startup,
}

impl HookKind {
    pub fn export_name(&self) -> &'static str {
        match self {
            HookKind::Teardown => TEARDOWN_HOOK,
            HookKind::Startup => STARTUP_HOOK,
        }
    }
}

impl fmt::Display for HookKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.export_name())
    }
}

/// 钩子调用错误
/// Hook invocation error
#[derive(Debug, Clone, thiserror::Error)]
#[non_exhaustive]
pub enum HookError {
    #[error("Module {module} does not export {hook}")]
    Missing { module: String, hook: HookKind },

    #[error("Hook {hook} of module {module} failed: {message}")]
    Trapped {
        module: String,
        hook: HookKind,
        message: String,
    },
}

// ============================================================================
// 模块系统 (Host module system)
// ============================================================================

/// 模块加载错误
/// Module loading error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ModuleError {
    #[error("Invalid module image: {0}")]
    Image(#[from] ImageError),

    #[error("Invalid mod manifest: {0}")]
    Manifest(#[from] ManifestError),

    #[error("A module named {0} is already loaded")]
    DuplicateIdentity(String),

    #[error("Module {0} carries no mod manifest")]
    NoManifest(String),

    #[error("Failed to compile module {name}: {message}")]
    Compile { name: String, message: String },

    #[error("Failed to instantiate module {name}: {message}")]
    Instantiate { name: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// 已加载的模块
/// A module loaded into the host module system
pub trait LoadedModule: Send + Sync + fmt::Debug {
    /// 模块自声明的名称 (唯一)
    /// Self-declared module name, unique within the module system
    fn name(&self) -> &str;

    /// 模块加载自的文件
    /// File the module was loaded from
    fn location(&self) -> &Path;

    fn manifest(&self) -> &ModManifest;

    /// 按完整类型名查找模组类型
    /// Find a mod type by its full type name
    fn find_mod_type(&self, type_name: &str) -> Option<&ModTypeDescriptor> {
        self.manifest().find(type_name)
    }

    fn has_hook(&self, hook: HookKind) -> bool;

    /// 调用卸载钩子
    /// Invoke the teardown hook
    fn invoke_teardown(&self) -> Result<(), HookError>;

    /// 调用启动钩子, 传入原始实例的句柄
    /// Invoke the startup hook with the handle of the original instance
    fn invoke_startup(&self, original: InstanceHandle) -> Result<(), HookError>;
}

/// 模块系统: 按名称加载模块, 拒绝重复名称
/// Module system: loads modules by name and refuses duplicate names
pub trait ModuleLoader: Send + Sync {
    /// 从内存映像加载模块
    /// Load a module from an in-memory image
    fn load_image(
        &self,
        bytes: Vec<u8>,
        location: &Path,
    ) -> Result<Arc<dyn LoadedModule>, ModuleError>;

    fn module(&self, name: &str) -> Option<Arc<dyn LoadedModule>>;

    fn module_names(&self) -> Vec<String>;
}
