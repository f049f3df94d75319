// Copyright 2022 Matthew Ingwersen.
//
// Licensed under the Apache License, Version 2.0 (the "License"); you
// may not use this file except in compliance with the License. You may
// obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or
// implied. See the License for the specific language governing
// permissions and limitations under the License.

//! Implements command-line argument parsing.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Parses the command line arguments.
pub fn parse() -> Args {
    Args::parse()
}

/// The Quandary DNSSEC zone signer
#[derive(Debug, Parser)]
#[clap(author, version)]
pub struct Args {
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Sign the zone once and print the resulting changes
    Sign(SignArgs),

    /// Keep the zone signed, re-signing it whenever needed
    Run(RunArgs),

    /// Generate a secret for a new key
    Keygen,
}

#[derive(Debug, Parser)]
pub struct SignArgs {
    /// Set the configuration file to use
    #[clap(long, value_name = "FILE")]
    pub config: PathBuf,

    /// Replace every signature, even valid ones
    #[clap(long)]
    pub force_resign: bool,

    /// Override the number of signing threads
    #[clap(long, value_name = "N")]
    pub threads: Option<usize>,

    /// Sign as if the current time were this UNIX timestamp
    #[clap(long, value_name = "SECONDS")]
    pub now: Option<u64>,
}

#[derive(Debug, Parser)]
pub struct RunArgs {
    /// Set the configuration file to use
    #[clap(long, value_name = "FILE")]
    pub config: PathBuf,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn command_line_interface_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn sign_arguments_parse() {
        let args = Args::try_parse_from([
            "quandary-signer",
            "sign",
            "--config",
            "signer.toml",
            "--force-resign",
            "--threads",
            "4",
        ])
        .unwrap();
        match args.command {
            Command::Sign(sign_args) => {
                assert_eq!(sign_args.config, PathBuf::from("signer.toml"));
                assert!(sign_args.force_resign);
                assert_eq!(sign_args.threads, Some(4));
                assert_eq!(sign_args.now, None);
            }
            command => panic!("unexpected command {:?}", command),
        }
    }

    #[test]
    fn config_is_required() {
        assert!(Args::try_parse_from(["quandary-signer", "run"]).is_err());
    }
}
