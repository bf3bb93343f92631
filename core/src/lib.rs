use log::{LevelFilter, SetLoggerError};
use log4rs::{
    append::{
        console::{ConsoleAppender, Target},
        file::FileAppender,
    },
    config::{Appender, Config, Root},
    encode::pattern::PatternEncoder,
    filter::threshold::ThresholdFilter,
};

pub mod colors;
pub mod constants;
pub mod dice;
pub mod direction;
pub mod flags;
pub mod progression;
pub mod slots;
pub mod stats;
pub mod text;
pub mod types;
pub mod weather;

/// Install the process-wide logger: stderr always, plus an optional append-only
/// log file that records everything down to debug level regardless of the
/// stderr threshold.
pub fn initialize_logger(
    log_level: LevelFilter,
    file_path: Option<&str>,
) -> Result<(), SetLoggerError> {
    let stderr = ConsoleAppender::builder().target(Target::Stderr).build();

    let mut config_builder = Config::builder().appender(
        Appender::builder()
            .filter(Box::new(ThresholdFilter::new(log_level)))
            .build("stderr", Box::new(stderr)),
    );
    let mut root_builder = Root::builder().appender("stderr");

    if let Some(path) = file_path {
        match FileAppender::builder()
            .encoder(Box::new(PatternEncoder::new("{d(%Y-%m-%d %H:%M:%S)} {l} {t} - {m}\n")))
            .build(path)
        {
            Ok(logfile) => {
                config_builder =
                    config_builder.appender(Appender::builder().build("logfile", Box::new(logfile)));
                root_builder = root_builder.appender("logfile");
            }
            Err(e) => eprintln!("Could not open log file {path}: {e}"),
        }
    }

    let config = config_builder
        .build(root_builder.build(LevelFilter::Debug))
        .expect("log4rs config is well-formed");

    let _handle = log4rs::init_config(config)?;
    Ok(())
}
