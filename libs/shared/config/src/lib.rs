use std::env;
use std::str::FromStr;
use tracing::warn;

/// What a conflict check does when the appointment store cannot be queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConflictPolicy {
    /// Treat the failure as "no conflict" and let the booking through.
    #[default]
    FailOpen,
    /// Treat the failure as blocking until a check succeeds.
    FailClosed,
}

impl FromStr for ConflictPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "fail_open" | "open" => Ok(ConflictPolicy::FailOpen),
            "fail_closed" | "closed" => Ok(ConflictPolicy::FailClosed),
            other => Err(format!("unknown conflict policy '{}'", other)),
        }
    }
}

/// Which appointment status changes are accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransitionPolicy {
    #[default]
    Unrestricted,
    Restricted,
}

impl FromStr for TransitionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "unrestricted" | "any" => Ok(TransitionPolicy::Unrestricted),
            "restricted" | "table" => Ok(TransitionPolicy::Restricted),
            other => Err(format!("unknown transition policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub supabase_jwt_secret: String,
    pub jwt_expiry_hours: i64,
    pub conflict_debounce_ms: u64,
    pub conflict_policy: ConflictPolicy,
    pub transition_policy: TransitionPolicy,
    pub port: u16,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            supabase_url: String::new(),
            supabase_anon_key: String::new(),
            supabase_jwt_secret: String::new(),
            jwt_expiry_hours: 168,
            conflict_debounce_ms: 500,
            conflict_policy: ConflictPolicy::default(),
            transition_policy: TransitionPolicy::default(),
            port: 3000,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let config = Self {
            supabase_url: env::var("SUPABASE_URL")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_URL not set, using empty value");
                    String::new()
                }),
            supabase_anon_key: env::var("SUPABASE_ANON_PUBLIC_KEY")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_ANON_PUBLIC_KEY not set, using empty value");
                    String::new()
                }),
            supabase_jwt_secret: env::var("SUPABASE_JWT_SECRET")
                .unwrap_or_else(|_| {
                    warn!("SUPABASE_JWT_SECRET not set, using empty value");
                    String::new()
                }),
            jwt_expiry_hours: parse_or("JWT_EXPIRY_HOURS", defaults.jwt_expiry_hours),
            conflict_debounce_ms: parse_or("CONFLICT_DEBOUNCE_MS", defaults.conflict_debounce_ms),
            conflict_policy: parse_or("CONFLICT_CHECK_POLICY", defaults.conflict_policy),
            transition_policy: parse_or("STATUS_TRANSITIONS", defaults.transition_policy),
            port: parse_or("PORT", defaults.port),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.supabase_url.is_empty()
            && !self.supabase_anon_key.is_empty()
            && !self.supabase_jwt_secret.is_empty()
    }
}

fn parse_or<T>(key: &str, fallback: T) -> T
where
    T: FromStr + std::fmt::Debug,
{
    match env::var(key) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {:?}", key, raw, fallback);
            fallback
        }),
        Err(_) => fallback,
    }
}
