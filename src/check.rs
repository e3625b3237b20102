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

use chrono::{NaiveDate, NaiveDateTime};
use color_eyre::eyre::{bail, Result};

use crate::aggregate::latest_release;
use crate::model::Release;
use crate::version::SNAPSHOT_SUFFIX;

/// Check that the date is set and that it matches the `chrono` format pattern.
pub fn is_valid_date(date: Option<&str>, pattern: Option<&str>) -> bool {
    let (Some(date), Some(pattern)) = (date, pattern) else {
        return false;
    };
    if date.trim().is_empty() || pattern.trim().is_empty() {
        return false;
    }

    NaiveDate::parse_from_str(date, pattern).is_ok()
        || NaiveDateTime::parse_from_str(date, pattern).is_ok()
}

/// Verify that the release of the project version exists and carries a valid date.
///
/// A snapshot version isn't released yet, so it always passes.
pub fn check_release(releases: &[Release], version: &str, date_format: &str) -> Result<()> {
    if version.ends_with(SNAPSHOT_SUFFIX) {
        log::info!("Skipping the release check for the snapshot version {}.", version);
        return Ok(());
    }

    let release = latest_release(releases, version)?;

    if is_valid_date(release.date.as_deref(), Some(date_format)) {
        log::info!(
            "The release {} has a valid date: {}",
            version,
            release.date.as_deref().unwrap_or_default()
        );
        Ok(())
    } else {
        bail!(
            "The release {} doesn't have a valid date: '{}'. The expected format is `{}`.",
            version,
            release.date.as_deref().unwrap_or_default(),
            date_format
        )
    }
}
