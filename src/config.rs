//! Supabase settings. Missing values fall back to `your-...` placeholders
//! that fail on first use instead of blocking startup.

use log::warn;
use serde::Serialize;
use std::env;

pub const PLACEHOLDER_PREFIX: &str = "your-";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Setting {
    pub var: &'static str,
    pub placeholder: &'static str,
}

pub const SUPABASE_URL: Setting = Setting {
    var: "VITE_SUPABASE_URL",
    placeholder: "your-supabase-url",
};

pub const SUPABASE_ANON_KEY: Setting = Setting {
    var: "VITE_SUPABASE_ANON_KEY",
    placeholder: "your-supabase-anon-key",
};

// service role bypasses RLS, never hand this one to client-side code
pub const SUPABASE_SERVICE_ROLE_KEY: Setting = Setting {
    var: "SUPABASE_SERVICE_ROLE_KEY",
    placeholder: "your-service-role-key",
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Env,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolved {
    pub var: &'static str,
    pub value: String,
    pub source: Source,
}

impl Resolved {
    // also catches values copied verbatim from .env.example
    pub fn is_placeholder(&self) -> bool {
        self.source == Source::Placeholder || self.value.starts_with(PLACEHOLDER_PREFIX)
    }

    pub fn redacted(&self) -> String {
        let prefix: String = self.value.chars().take(10).collect();
        if prefix.len() < self.value.len() {
            format!("{prefix}...")
        } else {
            prefix
        }
    }
}

pub fn env_lookup(name: &str) -> Option<String> {
    env::var(name).ok()
}

/// Empty values are treated the same as unset.
pub fn resolve<F>(lookup: F, setting: Setting) -> Resolved
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(setting.var).filter(|v| !v.is_empty()) {
        Some(value) => Resolved {
            var: setting.var,
            value,
            source: Source::Env,
        },
        None => {
            warn!(
                "{} is not set, falling back to placeholder '{}'",
                setting.var, setting.placeholder
            );
            Resolved {
                var: setting.var,
                value: setting.placeholder.to_string(),
                source: Source::Placeholder,
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SupabaseConfig {
    pub url: Resolved,
    pub anon_key: Resolved,
    pub service_role_key: Resolved,
}

impl SupabaseConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(env_lookup)
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            url: resolve(&lookup, SUPABASE_URL),
            anon_key: resolve(&lookup, SUPABASE_ANON_KEY),
            service_role_key: resolve(&lookup, SUPABASE_SERVICE_ROLE_KEY),
        }
    }

    pub fn values(&self) -> [&Resolved; 3] {
        [&self.url, &self.anon_key, &self.service_role_key]
    }

    pub fn incomplete_vars(&self) -> Vec<&'static str> {
        self.values()
            .into_iter()
            .filter(|r| r.is_placeholder())
            .map(|r| r.var)
            .collect()
    }
}
