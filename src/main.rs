//! Thin CLI shell over the rights-resolution engine: parse arguments,
//! default to the invoking user, print one right per line.

use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Lists the effective security rights of an account: rights assigned
/// directly plus rights inherited through local, domain and nested group
/// membership. Requires an elevated process.
#[derive(Debug, Parser)]
#[command(name = "effective-rights", version)]
struct Cli {
    /// Account to inspect, as `name`, `.\name` or `DOMAIN\name`.
    /// Defaults to the invoking user.
    account: Option<String>,

    /// Fail when the account does not resolve instead of printing an
    /// empty list.
    #[arg(long)]
    strict: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    run(&Cli::parse())
}

#[cfg(windows)]
fn run(cli: &Cli) -> ExitCode {
    use win_effective_rights::RightsResolver;
    use win_effective_rights::providers::windows::{
        LsaPolicyStore, SamIdentityLookup, Win32DirectoryService, current_user,
    };

    let directory = match Win32DirectoryService::new() {
        Ok(directory) => directory,
        Err(err) => {
            eprintln!("error: {err}");
            return ExitCode::FAILURE;
        }
    };

    let account = match &cli.account {
        Some(account) => account.clone(),
        None => match current_user() {
            Ok(account) => account.to_string(),
            Err(err) => {
                eprintln!("error: could not determine the invoking user: {err}");
                return ExitCode::FAILURE;
            }
        },
    };

    let resolver =
        RightsResolver::new(SamIdentityLookup::new(), LsaPolicyStore, directory).strict(cli.strict);

    match resolver.all_rights(&account) {
        Ok(resolved) => {
            println!("Effective rights for {}:", resolved.account);
            for right in &resolved.rights {
                println!("{right}");
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

#[cfg(not(windows))]
fn run(cli: &Cli) -> ExitCode {
    let _ = cli;
    eprintln!("effective-rights reads the Windows local security policy and only runs on Windows");
    ExitCode::FAILURE
}
