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

#![forbid(unsafe_code)]

use color_eyre::eyre::Result;

use harvest::cli::cli;

fn main() -> Result<()> {
    // Enable backtraces and colored error reports.
    color_eyre::install()?;

    let cli = cli().run();

    harvest::run(&cli)?;

    Ok(())
}
