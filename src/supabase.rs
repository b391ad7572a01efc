use once_cell::sync::Lazy;
use postgrest::Postgrest;

use crate::config::{
    env_lookup, resolve, Setting, SupabaseConfig, SUPABASE_ANON_KEY, SUPABASE_SERVICE_ROLE_KEY,
    SUPABASE_URL,
};

pub trait ClientFactory {
    type Handle;

    fn create(&self, url: &str, key: &str) -> Self::Handle;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct PostgrestFactory;

pub fn rest_endpoint(url: &str) -> String {
    format!("{}/rest/v1", url.trim_end_matches('/'))
}

// same byte rules as http::HeaderValue::from_str, which postgrest unwraps
pub fn is_header_safe(key: &str) -> bool {
    key.bytes()
        .all(|b| b == b'\t' || (0x20..0x7f).contains(&b) || b >= 0x80)
}

impl ClientFactory for PostgrestFactory {
    type Handle = Postgrest;

    fn create(&self, url: &str, key: &str) -> Postgrest {
        let client = Postgrest::new(rest_endpoint(url));

        // an unusable key still yields a handle; requests then fail with 401
        let client = if is_header_safe(key) {
            client
                .insert_header("apikey", key)
                .insert_header("Authorization", format!("Bearer {key}"))
        } else {
            log::warn!("Supabase key contains control characters, building client without auth headers");
            client
        };

        log::debug!("Supabase client created for {url}");
        client
    }
}

pub fn build<F, L>(factory: &F, lookup: L, url: Setting, key: Setting) -> F::Handle
where
    F: ClientFactory,
    L: Fn(&str) -> Option<String>,
{
    let url = resolve(&lookup, url);
    let key = resolve(&lookup, key);
    factory.create(&url.value, &key.value)
}

#[derive(Debug, Clone)]
pub struct Clients<H> {
    pub public: H,
    pub admin: H,
}

impl<H> Clients<H> {
    pub fn init<F>(config: &SupabaseConfig, factory: &F) -> Self
    where
        F: ClientFactory<Handle = H>,
    {
        Self {
            public: factory.create(&config.url.value, &config.anon_key.value),
            admin: factory.create(&config.url.value, &config.service_role_key.value),
        }
    }
}

impl Clients<Postgrest> {
    pub fn from_env() -> Self {
        Self::init(&SupabaseConfig::from_env(), &PostgrestFactory)
    }
}

static CLIENT: Lazy<Postgrest> =
    Lazy::new(|| build(&PostgrestFactory, env_lookup, SUPABASE_URL, SUPABASE_ANON_KEY));

// server-side only
static ADMIN_CLIENT: Lazy<Postgrest> = Lazy::new(|| {
    build(
        &PostgrestFactory,
        env_lookup,
        SUPABASE_URL,
        SUPABASE_SERVICE_ROLE_KEY,
    )
});

pub fn get_client() -> &'static Postgrest {
    &CLIENT
}

pub fn get_admin_client() -> &'static Postgrest {
    &ADMIN_CLIENT
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::fake_env;

    struct PairFactory;

    impl ClientFactory for PairFactory {
        type Handle = (String, String);

        fn create(&self, url: &str, key: &str) -> (String, String) {
            (url.to_string(), key.to_string())
        }
    }

    fn pair(url: &str, key: &str) -> (String, String) {
        (url.to_string(), key.to_string())
    }

    #[test]
    fn test_build_uses_env_values() {
        let lookup = fake_env(&[
            ("VITE_SUPABASE_URL", "https://x.test"),
            ("VITE_SUPABASE_ANON_KEY", "anon123"),
        ]);
        let handle = build(&PairFactory, lookup, SUPABASE_URL, SUPABASE_ANON_KEY);
        assert_eq!(handle, pair("https://x.test", "anon123"));
    }

    #[test]
    fn test_public_and_admin_share_url_not_key() {
        let lookup = fake_env(&[
            ("VITE_SUPABASE_URL", "https://x.test"),
            ("VITE_SUPABASE_ANON_KEY", "anon123"),
        ]);
        let clients = Clients::init(&SupabaseConfig::from_lookup(lookup), &PairFactory);
        assert_eq!(clients.public, pair("https://x.test", "anon123"));
        assert_eq!(clients.admin, pair("https://x.test", "your-service-role-key"));
    }

    #[test]
    fn test_empty_env_builds_from_placeholders() {
        let clients = Clients::init(&SupabaseConfig::from_lookup(fake_env(&[])), &PairFactory);
        assert_eq!(
            clients.public,
            pair("your-supabase-url", "your-supabase-anon-key")
        );
        assert_eq!(
            clients.admin,
            pair("your-supabase-url", "your-service-role-key")
        );
    }

    #[test]
    fn test_all_values_from_env() {
        let lookup = fake_env(&[
            ("VITE_SUPABASE_URL", "https://x.test"),
            ("VITE_SUPABASE_ANON_KEY", "anon123"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service456"),
        ]);
        let clients = Clients::init(&SupabaseConfig::from_lookup(lookup), &PairFactory);
        assert_eq!(clients.public, pair("https://x.test", "anon123"));
        assert_eq!(clients.admin, pair("https://x.test", "service456"));
        assert_eq!(clients.public.0, clients.admin.0);
        assert_ne!(clients.public.1, clients.admin.1);
    }

    #[test]
    fn test_init_is_repeatable() {
        let lookup = fake_env(&[
            ("VITE_SUPABASE_URL", "https://x.test"),
            ("SUPABASE_SERVICE_ROLE_KEY", "service456"),
        ]);
        let config = SupabaseConfig::from_lookup(&lookup);
        let first = Clients::init(&config, &PairFactory);
        let second = Clients::init(&SupabaseConfig::from_lookup(&lookup), &PairFactory);
        assert_eq!(first.public, second.public);
        assert_eq!(first.admin, second.admin);
    }

    #[test]
    fn test_rest_endpoint() {
        assert_eq!(rest_endpoint("https://x.test"), "https://x.test/rest/v1");
        assert_eq!(rest_endpoint("https://x.test/"), "https://x.test/rest/v1");
        assert_eq!(rest_endpoint("your-supabase-url"), "your-supabase-url/rest/v1");
    }

    #[test]
    fn test_postgrest_accepts_placeholders() {
        let clients = Clients::init(
            &SupabaseConfig::from_lookup(fake_env(&[])),
            &PostgrestFactory,
        );
        // building the query must not touch the network
        let _ = clients.public.from("schedules").select("id");
        let _ = clients.admin.from("security_events").select("id");
    }

    #[test]
    fn test_key_with_newline_does_not_panic() {
        let lookup = fake_env(&[
            ("VITE_SUPABASE_URL", "https://x.test"),
            ("VITE_SUPABASE_ANON_KEY", "anon123\n"),
        ]);
        let client = build(&PostgrestFactory, lookup, SUPABASE_URL, SUPABASE_ANON_KEY);
        let _ = client.from("schedules").select("id");

        let admin = PostgrestFactory.create("https://x.test", "service\r\n456");
        let _ = admin.from("security_events").select("id");
    }

    #[test]
    fn test_is_header_safe() {
        assert!(is_header_safe("anon123"));
        assert!(is_header_safe("your-service-role-key"));
        assert!(is_header_safe("tab\tok"));
        assert!(is_header_safe(""));
        assert!(!is_header_safe("anon123\n"));
        assert!(!is_header_safe("a\u{7f}b"));
        assert!(!is_header_safe("a\0b"));
    }

    #[test]
    fn test_global_handles() {
        let _ = get_client().from("schedules").select("id");
        let _ = get_admin_client().from("security_events").select("id");
        assert!(std::ptr::eq(get_client(), get_client()));
    }
}
