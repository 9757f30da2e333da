/// log4rs setup
///
use anyhow::{anyhow, Result};
use log::LevelFilter;
use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;
use std::str::FromStr;

use crate::config::EngineConfig;

const PATTERN: &str = "{d(%Y-%m-%d %H:%M:%S%.3f)} {h({l:5})} {t} - {m}{n}";

/// initialize logging from the config file named in the engine config, or
/// fall back to a console logger at the configured level.
pub fn init_logging(config: &EngineConfig) -> Result<()> {
    if let Some(path) = &config.log_config {
        return log4rs::init_file(path, Default::default())
            .map_err(|e| anyhow!("log config {}: {}", path.display(), e));
    }

    let level = LevelFilter::from_str(&config.log_level)
        .map_err(|_| anyhow!("unknown log level: {}", config.log_level))?;

    log4rs::init_config(console_config(level)?)?;

    Ok(())
}

fn console_config(level: LevelFilter) -> Result<Config> {
    let stdout = ConsoleAppender::builder()
        .encoder(Box::new(PatternEncoder::new(PATTERN)))
        .build();

    let config = Config::builder()
        .appender(Appender::builder().build("stdout", Box::new(stdout)))
        .build(Root::builder().appender("stdout").build(level))?;

    Ok(config)
}
