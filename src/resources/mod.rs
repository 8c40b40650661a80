pub mod configmap;
pub mod deployment;
pub mod labels;
pub mod owner;
pub mod pvc;
pub mod service;

use crate::error::Result;
use tracing::info;

/// Treat losing a create race as success, the object is there either way
pub(crate) fn created_or_exists<K>(
    result: Result<K>,
    kind: &str,
    name: &str,
    namespace: &str,
) -> Result<()> {
    match result {
        Ok(_) => {
            info!("Created {} {} in {}", kind, name, namespace);
            Ok(())
        }
        Err(e) if e.is_already_exists() => {
            info!("{} {} already exists", kind, name);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
