#[cfg(feature = "cli")]
pub mod cli;
pub mod migration;
pub mod proxy;

use crate::utils::error::{BridgeError, Result};
use regex::Regex;

#[cfg(feature = "cli")]
pub use cli::{MigrateCli, ProxyCli};
pub use migration::{AdminSeed, DestinationConfig, MigrationPlan};
pub use proxy::{ProxyConfig, RetrySettings};

/// 替換環境變數 (例如 ${BACKEND_URL})，未設定的變數保留原樣
pub fn substitute_env_vars(content: &str) -> Result<String> {
    let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| BridgeError::ConfigError {
        message: format!("invalid substitution pattern: {}", e),
    })?;

    let result = re.replace_all(content, |caps: &regex::Captures| {
        let var_name = &caps[1];
        std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
    });

    Ok(result.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_substitute_known_and_unknown_vars() {
        std::env::set_var("DESA_SUBST_TEST", "http://10.0.0.5:5000");
        let out =
            substitute_env_vars("a = \"${DESA_SUBST_TEST}\"\nb = \"${DESA_SUBST_UNSET_VAR}\"")
                .unwrap();
        assert!(out.contains("http://10.0.0.5:5000"));
        assert!(out.contains("${DESA_SUBST_UNSET_VAR}"));
        std::env::remove_var("DESA_SUBST_TEST");
    }
}
