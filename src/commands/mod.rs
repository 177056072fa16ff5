pub mod init;
pub mod list;
pub mod resolve;
pub mod schema;
pub mod start;
pub mod validate;

use std::collections::BTreeMap;
use std::path::Path;

use crate::config;
use crate::descriptor::os_environment;
use crate::registry::Registry;

/// Locate and load the descriptor file for a command.
pub(crate) fn load_registry(explicit: Option<&Path>) -> anyhow::Result<Registry> {
    let path = config::locate(explicit)?;
    Registry::load(&path)
}

/// The environment a launched process would inherit.
pub(crate) fn base_environment(clean: bool) -> BTreeMap<String, String> {
    if clean {
        BTreeMap::new()
    } else {
        os_environment()
    }
}
