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

use std::path::PathBuf;

use bpaf::Bpaf;

use crate::config::System;

/// Generate a changes report and a release announcement from a changes file and issue trackers.
#[derive(Clone, Debug, Bpaf)]
#[bpaf(options, version)]
pub struct Cli {
    /// Display more detailed progress messages.
    #[bpaf(short, long, req_flag(()), many, map(vec_len))]
    pub verbose: usize,

    #[bpaf(external(commands))]
    pub command: Commands,
}

/// Count the occurrences of a repeated flag.
fn vec_len<T>(v: Vec<T>) -> usize {
    v.len()
}

#[derive(Clone, Debug, Bpaf)]
pub enum Commands {
    /// Generate the HTML changes report of all releases.
    #[bpaf(command)]
    Report {
        /// Show the date of each action in the report.
        #[bpaf(short('a'), long)]
        show_action_date: bool,
        /// Path to the project directory. The default is the current working directory.
        #[bpaf(positional("DIR"), fallback(".".into()))]
        project: PathBuf,
    },

    /// Generate the text announcement of the current release.
    #[bpaf(command)]
    Announce {
        /// Path to the project directory. The default is the current working directory.
        #[bpaf(positional("DIR"), fallback(".".into()))]
        project: PathBuf,
    },

    /// Generate the HTML table of the issues in a tracker.
    #[bpaf(command)]
    Issues {
        /// The tracker to download the issues from: jira or github.
        /// The default is the first tracker in the project configuration.
        #[bpaf(long, argument("TRACKER"))]
        tracker: Option<System>,
        /// Comma-separated names of the table columns, such as `Key,Summary,Status`.
        #[bpaf(long, argument("COLUMNS"))]
        columns: Option<String>,
        /// Path to the project directory. The default is the current working directory.
        #[bpaf(positional("DIR"), fallback(".".into()))]
        project: PathBuf,
    },

    /// Check that the current release has a valid release date in the changes file.
    #[bpaf(command)]
    Check {
        /// Path to the project directory. The default is the current working directory.
        #[bpaf(positional("DIR"), fallback(".".into()))]
        project: PathBuf,
    },

    /// Report problems in the changes file.
    #[bpaf(command)]
    Validate {
        /// Path to the project directory. The default is the current working directory.
        #[bpaf(positional("DIR"), fallback(".".into()))]
        project: PathBuf,
    },

    /// Print the Jira query that the configured filters produce.
    #[bpaf(command)]
    Query {
        /// Path to the project directory. The default is the current working directory.
        #[bpaf(positional("DIR"), fallback(".".into()))]
        project: PathBuf,
    },

    /// Initialize an empty project directory.
    #[bpaf(command)]
    Init {
        /// Path to the project directory. The default is the current working directory.
        #[bpaf(positional("DIR"), fallback(".".into()))]
        directory: PathBuf,
    },
}
