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

//! The Quandary DNSSEC zone signer.

use std::fmt::Write;

mod args;
mod config;
mod run;
mod sign;

use args::Command;

fn main() {
    let args = args::parse();
    match args.command {
        Command::Sign(sign_args) => sign::sign(sign_args),
        Command::Run(run_args) => run::run(run_args),
        Command::Keygen => sign::keygen(),
    }
}

/// Formats `headline` followed by the numbered chain of causes of `e`.
fn describe_error(headline: &str, e: &anyhow::Error) -> String {
    let mut message = String::from(headline);
    for (i, cause) in e.chain().enumerate() {
        write!(message, "\n[{}] {}", i + 1, cause).unwrap();
    }
    message
}
