// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Arguments for serving cycle data, and what they become once parsed.

use std::path::PathBuf;

use clap::Parser;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::common::{ARG_FILE_HELP, PORT_HELP};
use crate::{
    constants::DEFAULT_PORT,
    io::{expand_input_paths, GlobError},
    messages,
    server::{write_dump_files, Preloaded, Server, ServerConfig},
    wire::ServerType,
    VisdataServerError,
};

#[derive(Parser, Debug, Clone, Default, Serialize, Deserialize)]
pub(super) struct ServeArgs {
    #[clap(long, help = ARG_FILE_HELP.as_str(), parse(from_os_str))]
    pub(super) args_file: Option<PathBuf>,

    /// Paths to the input cycle files. Glob patterns are expanded.
    #[clap(name = "INPUT_FILES", parse(from_os_str), help_heading = "INPUT FILES")]
    #[serde(default)]
    pub(super) input_files: Vec<PathBuf>,

    #[clap(short, long, help = PORT_HELP.as_str(), help_heading = "SERVING")]
    pub(super) port: Option<u16>,

    /// Listen on all network interfaces and serve until killed. Without this,
    /// the preloaded data are written to dump files and the program exits.
    #[clap(long, help_heading = "SERVING")]
    #[serde(default)]
    pub(super) networked: bool,

    /// Files describing a testing session. When given, the server identifies
    /// itself as a testing server and asks clients for usernames. Repeat the
    /// flag for each file.
    #[clap(long, multiple_occurrences(true), help_heading = "SERVING")]
    pub(super) testing: Option<Vec<PathBuf>>,

    /// The directory to write dump files into. Default: the current
    /// directory.
    #[clap(long, help_heading = "OUTPUT FILES")]
    pub(super) dump_dir: Option<PathBuf>,
}

impl ServeArgs {
    /// Both command-line and file arguments overlap in terms of what is
    /// available; this function consolidates everything that was specified
    /// into a single struct. Where applicable, it will prefer CLI parameters
    /// over those in the file.
    ///
    /// This function should only ever merge arguments, and not try to make
    /// sense of them.
    pub(super) fn merge(self) -> Result<ServeArgs, VisdataServerError> {
        debug!("Merging command-line arguments with the argument file");

        let cli_args = self;

        if let Some(arg_file) = cli_args.args_file {
            // Ensure all of the file args are accounted for by pattern
            // matching.
            let ServeArgs {
                args_file: _,
                input_files,
                port,
                networked,
                testing,
                dump_dir,
            } = unpack_arg_file!(arg_file);

            Ok(ServeArgs {
                args_file: None,
                input_files: if cli_args.input_files.is_empty() {
                    input_files
                } else {
                    cli_args.input_files
                },
                port: cli_args.port.or(port),
                networked: cli_args.networked || networked,
                testing: cli_args.testing.or(testing),
                dump_dir: cli_args.dump_dir.or(dump_dir),
            })
        } else {
            Ok(cli_args)
        }
    }

    pub(super) fn parse(self) -> Result<ServeParams, ServeArgsError> {
        debug!("{:#?}", self);

        let ServeArgs {
            args_file: _,
            input_files,
            port,
            networked,
            testing,
            dump_dir,
        } = self;

        if input_files.is_empty() {
            return Err(ServeArgsError::NoInputs);
        }
        let paths = expand_input_paths(&input_files)?;
        let server_type = match testing.as_deref() {
            Some([_, ..]) => ServerType::Testing,
            _ => ServerType::Simulator,
        };

        Ok(ServeParams {
            paths,
            config: ServerConfig {
                port: port.unwrap_or(DEFAULT_PORT),
                networked,
                server_type,
            },
            dump_dir: dump_dir.unwrap_or_else(|| PathBuf::from(".")),
        })
    }

    pub(super) fn run(self, dry_run: bool) -> Result<(), VisdataServerError> {
        let params = self.parse()?;
        messages::InputFiles {
            paths: &params.paths,
        }
        .print();
        if dry_run {
            info!("Dry run -- exiting now.");
            return Ok(());
        }
        params.run()
    }
}

pub(super) struct ServeParams {
    pub(super) paths: Vec<PathBuf>,
    pub(super) config: ServerConfig,
    pub(super) dump_dir: PathBuf,
}

impl ServeParams {
    pub(super) fn run(self) -> Result<(), VisdataServerError> {
        let ServeParams {
            paths,
            config,
            dump_dir,
        } = self;

        let preloaded = Preloaded::load(paths)?;
        messages::IndexSummary {
            index: &preloaded.index,
        }
        .print();

        if !config.networked {
            write_dump_files(&dump_dir, &preloaded)?;
            return Ok(());
        }

        let server = Server::bind(preloaded, &config)?;
        server.run()?;
        Ok(())
    }
}

#[derive(Error, Debug)]
pub(super) enum ServeArgsError {
    #[error("No input cycle files were supplied")]
    NoInputs,

    #[error(transparent)]
    Glob(#[from] GlobError),
}
