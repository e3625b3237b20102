/*
harvest: Generate a changes report and a release announcement from issue trackers.
Copyright (C) 2023  Marek Suchánek  <msuchane@redhat.com>

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

/*!
The `init` subcommand, which fills a directory with example configuration files.
*/

use std::fs;
use std::path::{Path, PathBuf};

use color_eyre::eyre::{bail, Result, WrapErr};
use include_dir::{include_dir, Dir, DirEntry};

/// The `example` directory in the source repository.
static EXAMPLE_DIR: Dir = include_dir!("$CARGO_MANIFEST_DIR/example");

/// Copy the example configuration files into the selected directory.
///
/// If the directory doesn't exist, create it. Existing configuration files are never overwritten.
pub fn initialize_directory(dir: &Path) -> Result<()> {
    if !dir.exists() {
        log::info!("The directory does not exist. Creating.");
        fs::create_dir_all(dir).wrap_err("Failed to create the project directory.")?;
    }

    let absolute_target = dir.canonicalize()?;
    log::info!("Initializing a project in {}", absolute_target.display());

    let files = example_files(&EXAMPLE_DIR);

    let existing: Vec<PathBuf> = files
        .iter()
        .map(|file| absolute_target.join(file))
        .filter(|path| path.exists())
        .collect();
    if !existing.is_empty() {
        let list: Vec<String> = existing
            .iter()
            .map(|path| format!("• {}", path.display()))
            .collect();
        bail!(
            "The directory already contains configuration files:\n{}",
            list.join("\n")
        );
    }

    let list: Vec<String> = files
        .iter()
        .map(|file| format!("• {}", absolute_target.join(file).display()))
        .collect();
    log::info!("Creating files:\n{}", list.join("\n"));

    EXAMPLE_DIR
        .extract(&absolute_target)
        .wrap_err("Failed to copy files to the project directory.")?;

    Ok(())
}

/// All the file paths in the example directory, recursively, relative to it.
fn example_files<'a>(dir: &'a Dir) -> Vec<&'a Path> {
    let mut results = Vec::new();

    for entry in dir.entries() {
        match entry {
            DirEntry::File(file) => results.push(file.path()),
            DirEntry::Dir(subdir) => results.append(&mut example_files(subdir)),
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::changes_file::ChangesDocument;
    use crate::config::Project;

    #[test]
    fn initialized_project_loads() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("new-project");

        initialize_directory(&target).unwrap();

        let project = Project::new(&target).unwrap();
        assert_eq!(project.metadata.name, "Example");

        let changes = ChangesDocument::load(&project.changes_file).unwrap();
        assert!(changes.validate().is_empty());
        assert_eq!(changes.releases.len(), 2);
    }

    #[test]
    fn refuse_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();

        initialize_directory(dir.path()).unwrap();

        assert!(initialize_directory(dir.path()).is_err());
    }
}
