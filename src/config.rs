#[derive(clap::ValueEnum, Clone, Debug, Copy)]
pub enum CargoEnv {
    Development,
    Production,
}

#[derive(clap::Parser, Debug)]
pub struct AppConfig {
    // production or development
    #[clap(long, env, value_enum, default_value = "development")]
    pub cargo_env: CargoEnv,

    // port that the app will bind to
    #[clap(long, env, default_value = "5000")]
    pub port: u16,

    // redis is only used to remember episode counts between notifier runs, without it the
    // notifier still runs but never has a previous state to compare against
    #[clap(long, env)]
    pub redis_url: Option<String>,

    // this should be either * for allowing everything, or a comma seperated list of domains like
    // example.com,something.com
    //
    // only applies to the json routes, the video relay always answers with its own fixed headers
    #[clap(long, env, default_value = "*")]
    pub cors_origin: String,

    // optional sentry integration
    #[clap(long, env)]
    pub sentry_dsn: Option<String>,

    // drama catalog the notifier polls
    #[clap(long, env, default_value = "https://dramaqueen.iseries.my.id/api")]
    pub catalog_api_base: String,

    #[clap(long, env)]
    pub catalog_api_key: Option<String>,

    // public site used to build the watch links in notifications, falls back to the catalog base
    // without its /api suffix
    #[clap(long, env)]
    pub site_base_url: Option<String>,

    #[clap(long, env)]
    pub telegram_bot_token: Option<String>,

    #[clap(long, env)]
    pub telegram_channel_id: Option<String>,

    #[clap(long, env, default_value = "https://api.telegram.org")]
    pub telegram_api_base: String,

    // when set, the cron routes want "Authorization: Bearer <secret>"
    #[clap(long, env)]
    pub cron_secret: Option<String>,

    // run the notifier in the background every n minutes, leave unset to only run it through
    // /api/cron/notify
    #[clap(long, env)]
    pub notify_interval_minutes: Option<u64>,
}

impl AppConfig {
    pub fn site_base_url(&self) -> String {
        match &self.site_base_url {
            Some(url) => url.trim_end_matches('/').to_string(),
            None => self
                .catalog_api_base
                .replacen("/api", "", 1)
                .trim_end_matches('/')
                .to_string(),
        }
    }

    /// empty secrets count as unset
    pub fn cron_secret(&self) -> Option<&str> {
        self.cron_secret.as_deref().filter(|s| !s.is_empty())
    }
}

impl Default for AppConfig {
    // mostly here for tests, real deployments go through the env
    fn default() -> Self {
        Self {
            cargo_env: CargoEnv::Development,
            port: 5000,
            redis_url: None,
            cors_origin: "*".to_string(),
            sentry_dsn: None,
            catalog_api_base: "https://dramaqueen.iseries.my.id/api".to_string(),
            catalog_api_key: None,
            site_base_url: None,
            telegram_bot_token: None,
            telegram_channel_id: None,
            telegram_api_base: "https://api.telegram.org".to_string(),
            cron_secret: None,
            notify_interval_minutes: None,
        }
    }
}
