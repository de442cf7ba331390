use crate::cli::actions::Action;
use anyhow::{Context, Result};
use secrecy::SecretString;

pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    Ok(Action::Server {
        port: matches.get_one::<u16>("port").copied().unwrap_or(8080),
        access_secret: matches
            .get_one::<String>("access-secret")
            .map(|s| SecretString::from(s.as_str()))
            .context("missing required argument: --access-secret")?,
        refresh_secret: matches
            .get_one::<String>("refresh-secret")
            .map(|s| SecretString::from(s.as_str()))
            .context("missing required argument: --refresh-secret")?,
        access_ttl_minutes: matches
            .get_one::<i64>("access-ttl-minutes")
            .copied()
            .unwrap_or(15),
        refresh_ttl_days: matches
            .get_one::<i64>("refresh-ttl-days")
            .copied()
            .unwrap_or(7),
    })
}
