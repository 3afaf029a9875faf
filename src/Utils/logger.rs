use simplelog::{
    ColorChoice, CombinedLogger, Config, ConfigBuilder, LevelFilter, SharedLogger, TermLogger,
    TerminalMode, WriteLogger,
};
use std::fs::File;

/// Terminal logger at `level`, plus a plain-text copy in `log_file` when given.
/// A second call fails because the global logger can only be set once.
pub fn init_logger(level: LevelFilter, log_file: Option<&str>) -> Result<(), String> {
    let term_config = ConfigBuilder::new()
        .set_time_level(LevelFilter::Off)
        .set_target_level(LevelFilter::Debug)
        .build();
    let mut loggers: Vec<Box<dyn SharedLogger>> = vec![TermLogger::new(
        level,
        term_config,
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )];
    if let Some(path) = log_file {
        let file = File::create(path)
            .map_err(|e| format!("cannot create log file '{}': {}", path, e))?;
        loggers.push(WriteLogger::new(level, Config::default(), file));
    }
    CombinedLogger::init(loggers).map_err(|e| format!("logger already initialised: {}", e))
}
