use std::env;
use std::path::PathBuf;
use std::sync::LazyLock;

const PROJECT_NAME: &str = env!("CARGO_PKG_NAME");

/// Environment variable that overrides the user config file location.
pub const CONFIG_PATH_ENV: &str = "OVH_INVOICE_CONFIG";

/// Path to the user config file.
///
/// Uses `$OVH_INVOICE_CONFIG` when set, otherwise `$HOME/.config/ovh-invoice.toml`.
/// Returns `None` if neither is available.
pub static CONFIG_PATH: LazyLock<Option<PathBuf>> = LazyLock::new(|| {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV).filter(|value| !value.is_empty()) {
        return Some(PathBuf::from(path));
    }
    let home_dir = dirs::home_dir()?;
    Some(home_dir.join(".config").join(format!("{PROJECT_NAME}.toml")))
});
