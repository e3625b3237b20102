/*
harvest: Generate a changes report and a release announcement from issue trackers.
Copyright (C) 2022  Marek Suchánek  <msuchane@redhat.com>

This program is free software: you can redistribute it and/or modify
it under the terms of the GNU General Public License as published by
the Free Software Foundation, either version 3 of the License, or
(at your option) any later version.

This program is distributed in the hope that it will be useful,
but WITHOUT ANY WARRANTY; without even the implied warranty of
MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
GNU General Public License for more details.

You should have received a copy of the GNU General Public License
along with this program.  If not, see <https://www.gnu.org/licenses/>.
*/

use color_eyre::eyre::{Result, WrapErr};
use simplelog::{ColorChoice, ConfigBuilder, LevelFilter, TermLogger, TerminalMode};

/// Map the number of `--verbose` occurrences to a log level.
fn verbosity(verbose: usize) -> LevelFilter {
    match verbose {
        // By default, display some essential progress.
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// This function initializes the `simplelog` logging system, which plugs into the `log`
/// infrastructure. The function returns nothing. It only affects the global state when it runs.
pub fn initialize_logger(verbose: usize) -> Result<()> {
    let config = ConfigBuilder::new()
        // The HTTP stack logs every connection at the debug level.
        .add_filter_ignore_str("hyper")
        .add_filter_ignore_str("rustls")
        .add_filter_ignore_str("reqwest")
        // Display a time stamp only for the most verbose level.
        .set_time_level(LevelFilter::Trace)
        .build();

    TermLogger::init(
        verbosity(verbose),
        config,
        // Mixed mode prints errors to stderr and info to stdout.
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .wrap_err("Failed to configure the terminal logging.")?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verbosity_levels() {
        assert_eq!(verbosity(0), LevelFilter::Info);
        assert_eq!(verbosity(1), LevelFilter::Debug);
        assert_eq!(verbosity(5), LevelFilter::Trace);
    }
}
