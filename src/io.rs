use std::fmt::Display;
use std::fs;
use std::time::Instant;

use console::Style;

use crate::config::Config;
use crate::error::CleanError;

const ANSI_BLUE: Style = Style::new().blue();

pub fn as_overhead(s: Instant) -> impl Display {
    let e = Instant::now();
    let f = format!("(+{}ms)", e.duration_since(s).as_millis());
    ANSI_BLUE.apply_to(f)
}

/// Delete the entire build directory if it exists and recreate it empty, so
/// no stale output survives into the next build.
pub fn clean(config: &Config) -> Result<(), CleanError> {
    let s = Instant::now();

    if fs::metadata(&config.build).is_ok() {
        fs::remove_dir_all(&config.build) //
            .map_err(CleanError::Remove)?;
    }

    fs::create_dir_all(&config.build) //
        .map_err(CleanError::Create)?;

    eprintln!("Cleaned the build directory {}", as_overhead(s));

    Ok(())
}
