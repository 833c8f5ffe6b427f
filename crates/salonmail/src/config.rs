use crate::emails::dispatcher::DispatchConfig;
use crate::emails::schedule::SchedulePolicy;
use std::time::Duration;

// Config is the one place runtime settings are read from the environment.
#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub admin_addr: Option<String>,
    pub api_token: Option<String>,
    pub migrate_on_startup: bool,

    pub page_size: i64,
    pub send_timeout_secs: u64,
    pub tick_secs: u64,
    pub lock_key: i64,

    pub smtp: Option<SmtpConfig>,
    pub mail_from: String,
    pub mail_from_name: Option<String>,
    pub shop_name: String,

    pub schedule: SchedulePolicy,
}

#[derive(Clone, Debug)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// Advisory lock key shared by every dispatcher process pointed at the same database.
pub const DEFAULT_LOCK_KEY: i64 = 0x5a4c_4d41_494c;

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| anyhow::anyhow!("DATABASE_URL is missing"))?;

        let admin_addr = env_or_fallback("SALONMAIL_ADMIN_ADDR", "ADMIN_ADDR")
            .and_then(|s| normalize_optional_addr(&s));

        let api_token = env_or_fallback("SALONMAIL_API_TOKEN", "API_TOKEN");

        let migrate_on_startup = env_bool("SALONMAIL_MIGRATE_ON_STARTUP").unwrap_or(false);

        let page_size = env_parse("SALONMAIL_PAGE_SIZE")
            .unwrap_or(100_i64)
            .clamp(1, 1_000);

        let send_timeout_secs = env_parse("SALONMAIL_SEND_TIMEOUT_SECS")
            .unwrap_or(30_u64)
            .clamp(1, 600);

        let tick_secs = env_parse("SALONMAIL_TICK_SECS")
            .unwrap_or(60_u64)
            .max(1);

        let lock_key = env_parse("SALONMAIL_LOCK_KEY").unwrap_or(DEFAULT_LOCK_KEY);

        let smtp = match env_or_fallback("SALONMAIL_SMTP_HOST", "SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: env_parse("SALONMAIL_SMTP_PORT").unwrap_or(587),
                username: env_or_fallback("SALONMAIL_SMTP_USERNAME", "SMTP_USERNAME"),
                password: env_or_fallback("SALONMAIL_SMTP_PASSWORD", "SMTP_PASSWORD"),
            }),
            None => None,
        };

        let mail_from = env_or_fallback("SALONMAIL_MAIL_FROM", "MAIL_FROM")
            .unwrap_or_else(|| "no-reply@example.com".to_string());
        let mail_from_name = env_or_fallback("SALONMAIL_MAIL_FROM_NAME", "MAIL_FROM_NAME");
        let shop_name = env_or_fallback("SALONMAIL_SHOP_NAME", "SHOP_NAME")
            .unwrap_or_else(|| "Salon".to_string());

        let defaults = SchedulePolicy::default();
        let schedule = SchedulePolicy {
            utc_offset_hours: env_parse("SALONMAIL_UTC_OFFSET_HOURS")
                .unwrap_or(defaults.utc_offset_hours)
                .clamp(-12, 14),
            reminder_hour: env_parse("SALONMAIL_REMINDER_HOUR")
                .unwrap_or(defaults.reminder_hour)
                .min(23),
            thanks_hour: env_parse("SALONMAIL_THANKS_HOUR")
                .unwrap_or(defaults.thanks_hour)
                .min(23),
        };

        Ok(Self {
            database_url,
            admin_addr,
            api_token,
            migrate_on_startup,
            page_size,
            send_timeout_secs,
            tick_secs,
            lock_key,
            smtp,
            mail_from,
            mail_from_name,
            shop_name,
            schedule,
        })
    }

    pub fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            page_size: self.page_size,
            send_timeout: Duration::from_secs(self.send_timeout_secs),
            ..DispatchConfig::default()
        }
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(self.tick_secs)
    }
}

fn env_or_fallback(primary: &str, fallback: &str) -> Option<String> {
    std::env::var(primary)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .or_else(|| std::env::var(fallback).ok().filter(|s| !s.trim().is_empty()))
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.trim().parse().ok())
}

fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes" | "on"))
}

fn normalize_optional_addr(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        return None;
    }
    if matches!(v.to_lowercase().as_str(), "0" | "off" | "false" | "none") {
        return None;
    }
    Some(v.to_string())
}
