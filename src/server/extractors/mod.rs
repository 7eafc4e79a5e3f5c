mod cron_authentication_extractor;

pub use cron_authentication_extractor::*;
