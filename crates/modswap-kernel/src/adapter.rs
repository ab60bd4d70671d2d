use std::path::Path;
use std::sync::Arc;

use crate::instance::{InstanceError, ModInstance};
use crate::manifest::ModTypeDescriptor;
use crate::module::LoadedModule;

// ============================================================================
// 宿主适配器 (Host adapter)
// ============================================================================

/// 宿主适配器错误
/// Host adapter error
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum AdapterError {
    #[error("Failed to construct mod {type_name}: {source}")]
    Construct {
        type_name: String,
        #[source]
        source: InstanceError,
    },

    #[error("Host rejected registration of {type_name}: {message}")]
    Rejected { type_name: String, message: String },

    #[error("Failed to shut down previous registration of {type_name}: {message}")]
    Shutdown { type_name: String, message: String },

    #[error("Mod {0} is not registered with the host loader")]
    NotRegistered(String),
}

/// 宿主适配器: 把新实例登记进宿主加载器的内部簿记
/// Host adapter: records a new instance in the host loader's bookkeeping
///
/// 每种宿主加载器布局对应一个实现。
/// One implementation per host loader layout.
pub trait HostAdapter: Send + Sync {
    /// 适配器名称
    /// Adapter name, for diagnostics
    fn variant(&self) -> &'static str;

    /// 构造新实例并在宿主中登记
    /// Construct the new instance and register it with the host
    ///
    /// `previous` 是被替换的当前实例, `location` 是替换文件路径。
    /// `previous` is the current instance being replaced, `location` the
    /// replacement file.
    fn load_and_register(
        &self,
        previous: &Arc<ModInstance>,
        location: &Path,
        module: Arc<dyn LoadedModule>,
        mod_type: &ModTypeDescriptor,
    ) -> Result<Arc<ModInstance>, AdapterError>;

    /// 移除一个实例的登记
    /// Remove an instance's registration
    fn remove_registration(&self, instance: &Arc<ModInstance>) -> Result<(), AdapterError>;

    /// 按模块名解析实例
    /// Resolve the instance defined by a module name
    fn resolve_module(&self, module_name: &str) -> Option<Arc<ModInstance>>;

    /// 宿主已加载的全部模组
    /// All mods the host has loaded
    fn loaded_mods(&self) -> Vec<Arc<ModInstance>>;
}
