//! Session logging
//!
//! Every line goes to stdout and to the session's log file, stamped with the
//! seconds elapsed since the session started. At debug and trace levels the
//! source module and thread are added, so events from the MPC worker can be
//! told apart from the control loop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use colored::{ColoredString, Colorize};
use log::{info, Level};
use thiserror::Error;

use crate::session::{self, Session};

pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The global log level must be Info or more verbose, found {0}")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Cannot open the session log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger is already installed: {0}")]
    FernInitError(log::SetLoggerError)
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the global logger for this session.
///
/// `module_levels` overrides the level of individual targets, for example
/// `("walk_lib::swing_traj", LevelFilter::Debug)` to see lift-offs and
/// re-plans while the rest of the executable stays at `Info`.
///
/// Can only succeed once per process.
pub fn logger_init(
    min_level: LevelFilter,
    module_levels: &[(String, LevelFilter)],
    session: &Session
) -> Result<(), LoggerInitError> {
    check_min_level(min_level)?;

    let log_file = fern::log_file(&session.log_file_path)
        .map_err(LoggerInitError::LogFileInitError)?;

    let dispatch = module_levels.iter().fold(
        fern::Dispatch::new()
            .format(|out, message, record| {
                let stamp = session::get_elapsed_seconds();
                let tag = level_tag(record.level());

                if record.level() > Level::Info {
                    out.finish(format_args!(
                        "[{:10.6} {}] {} ({}): {}",
                        stamp,
                        tag,
                        record.target(),
                        std::thread::current().name().unwrap_or("?"),
                        message
                    ))
                } else {
                    out.finish(format_args!("[{:10.6} {}] {}", stamp, tag, message))
                }
            })
            .level(min_level),
        |d, (target, level)| d.level_for(target.clone(), *level),
    );

    dispatch
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging to {:?} at {:?}", session.log_file_path, min_level);
    info!("    Session epoch: {}", session::get_epoch());
    for (target, level) in module_levels {
        info!("    {} at {:?}", target, level);
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Warnings and errors must always reach the log.
fn check_min_level(min_level: LevelFilter) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        Err(LoggerInitError::InvalidMinLogLevel(min_level))
    } else {
        Ok(())
    }
}

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info  => "INF".normal(),
        Level::Warn  => "WRN".yellow(),
        Level::Error => "ERR".red().bold()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_min_level() {
        assert!(check_min_level(LevelFilter::Info).is_ok());
        assert!(check_min_level(LevelFilter::Trace).is_ok());
        assert!(matches!(
            check_min_level(LevelFilter::Warn),
            Err(LoggerInitError::InvalidMinLogLevel(LevelFilter::Warn))
        ));
        assert!(check_min_level(LevelFilter::Off).is_err());
    }

    #[test]
    fn test_level_tags() {
        for level in [Level::Trace, Level::Debug, Level::Info, Level::Warn, Level::Error].iter() {
            assert_eq!(level_tag(*level).len(), 3);
        }
    }
}
