use serde::Deserialize;
use std::{env, fmt};
use thiserror::Error;

pub const SHOP_URL_VAR: &str = "SHOP_URL";
pub const API_VERSION_VAR: &str = "API_VERSION";
pub const API_TOKEN_VAR: &str = "API_TOKEN";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("missing shop credential `{0}`: pass it explicitly or set {1}")]
    Missing(&'static str, &'static str),
}

/// Per-request values that take precedence over the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CredentialOverrides {
    #[serde(default)]
    pub shop_url: Option<String>,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub api_token: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ShopCredentials {
    pub shop_url: String,
    pub api_version: String,
    pub api_token: String,
}

// keep the token out of logs
impl fmt::Debug for ShopCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ShopCredentials")
            .field("shop_url", &self.shop_url)
            .field("api_version", &self.api_version)
            .field("api_token", &"***")
            .finish()
    }
}

impl ShopCredentials {
    pub fn resolve(overrides: &CredentialOverrides) -> Result<Self, ConfigError> {
        Self::resolve_with(overrides, |key| env::var(key).ok())
    }

    /// Resolves each field as explicit value, then `lookup(VAR)`, then
    /// nothing. Blank values count as absent.
    pub fn resolve_with<L>(overrides: &CredentialOverrides, lookup: L) -> Result<Self, ConfigError>
    where
        L: Fn(&str) -> Option<String>,
    {
        let pick = |explicit: &Option<String>, field: &'static str, var: &'static str| {
            explicit
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .or_else(|| {
                    lookup(var)
                        .map(|v| v.trim().to_string())
                        .filter(|v| !v.is_empty())
                })
                .ok_or(ConfigError::Missing(field, var))
        };

        let shop_url = pick(&overrides.shop_url, "shop_url", SHOP_URL_VAR)?;
        let api_version = pick(&overrides.api_version, "api_version", API_VERSION_VAR)?;
        let api_token = pick(&overrides.api_token, "api_token", API_TOKEN_VAR)?;

        Ok(Self {
            shop_url: normalize_shop_url(&shop_url),
            api_version,
            api_token,
        })
    }

    /// Base of the versioned admin REST API, without a trailing slash.
    pub fn admin_base(&self) -> String {
        format!("{}/admin/api/{}", self.shop_url, self.api_version)
    }
}

fn normalize_shop_url(raw: &str) -> String {
    let trimmed = raw.trim().trim_end_matches('/');
    if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn explicit_values_win_over_environment() {
        let overrides = CredentialOverrides {
            shop_url: Some("override.myshopify.com".into()),
            api_version: None,
            api_token: Some("  ".into()),
        };
        let creds = ShopCredentials::resolve_with(
            &overrides,
            env_of(&[
                ("SHOP_URL", "env.myshopify.com"),
                ("API_VERSION", "2024-10"),
                ("API_TOKEN", "shpat_env"),
            ]),
        )
        .expect("credentials");
        assert_eq!(creds.shop_url, "https://override.myshopify.com");
        assert_eq!(creds.api_version, "2024-10");
        assert_eq!(creds.api_token, "shpat_env");
        assert_eq!(
            creds.admin_base(),
            "https://override.myshopify.com/admin/api/2024-10"
        );
    }

    #[test]
    fn missing_field_is_reported() {
        let err = ShopCredentials::resolve_with(
            &CredentialOverrides::default(),
            env_of(&[("SHOP_URL", "https://shop.test/"), ("API_VERSION", "2024-10")]),
        )
        .expect_err("token missing");
        assert_eq!(err, ConfigError::Missing("api_token", "API_TOKEN"));
    }

    #[test]
    fn debug_hides_token() {
        let creds = ShopCredentials {
            shop_url: "https://shop.test".into(),
            api_version: "2024-10".into(),
            api_token: "shpat_secret".into(),
        };
        assert!(!format!("{creds:?}").contains("shpat_secret"));
    }
}
