//! Host adapters for the two mod loader layouts

mod package;
mod simple;

pub use package::{HOT_RELOAD_DESCRIPTION, PackageLoaderAdapter};
pub use simple::SimpleLoaderAdapter;

use modswap_host::HostError;
use modswap_kernel::adapter::AdapterError;

fn host_error(type_name: &str, error: HostError) -> AdapterError {
    match error {
        HostError::Instance(source) => AdapterError::Construct {
            type_name: type_name.to_string(),
            source,
        },
        other => AdapterError::Rejected {
            type_name: type_name.to_string(),
            message: other.to_string(),
        },
    }
}
