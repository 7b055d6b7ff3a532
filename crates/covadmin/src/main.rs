mod provision;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use covadmin_config::{get_credentials_path, get_settings_path, CredentialsFile, Settings};
use covadmin_output::{format_credential_option, Console};
use covadmin_soap::ServiceContext;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::provision::{Outcome, ProvisionOptions, Provisioner};

const MAIN_HELP: &str = r#"Covadmin looks up a Coverity Connect user account by username or email
address and, when no account exists, walks through creating one.

A username may contain `*` wildcards. A term containing both an `@` and a
`.` is treated as an email address and every account on the server is
scanned for it.

Server credentials are read from CoverityCreateUser.cfg in the current
directory (an INI file with an [App Settings] section holding CoverityUser,
CoverityPassword, CoverityServer and CoverityPort). Connection and paging
options live in ~/.config/covadmin/config.toml."#;

#[derive(Parser)]
#[command(name = "covadmin")]
#[command(about = MAIN_HELP)]
#[command(version)]
struct Cli {
    #[arg(help = "Username (wildcards allowed) or email address to look up")]
    term: Option<String>,

    #[arg(
        short = 'c',
        long,
        env = "COVADMIN_CREDENTIALS",
        help = "Credentials file (default: ./CoverityCreateUser.cfg)"
    )]
    config: Option<PathBuf>,

    #[arg(short = 'd', long, help = "Domain for new accounts")]
    domain: Option<String>,

    #[arg(long, help = "Print account details as JSON")]
    json: bool,

    #[arg(long, help = "Do not clear the screen on start")]
    no_clear: bool,
}

fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .init();
}

async fn run(cli: Cli, settings: &Settings, console: &mut Console) -> Result<()> {
    if !cli.no_clear {
        console.clear_screen()?;
    }

    let file = CredentialsFile::open(&get_credentials_path(cli.config.as_deref()))?;
    console.line(format!(
        "Configuration file [{}] found so loading configuration...",
        file.path().display()
    ))?;
    let credentials = file.read(settings.connection.use_tls, |option, value| {
        console.line(format_credential_option(option, value))
    })?;
    console.line("Done Loading Configuration Settings")?;

    console.blank()?;
    console.line(format!("Connecting to {}...", credentials.base_url()))?;
    let context = ServiceContext::open(&credentials, settings)
        .await
        .context("Unable to connect to the Coverity Connect web services")?;
    debug!("Defect service reachable at {}", context.defect.endpoint());
    console.line("   Connected.")?;

    let term = match cli.term {
        Some(term) => term.trim().to_string(),
        None => {
            console.blank()?;
            console.prompt("Enter a username or email address to search for: ")?
        }
    };
    if term.is_empty() {
        console.warning("No username or email address given.")?;
        return Ok(());
    }

    let options = ProvisionOptions {
        domain: cli
            .domain
            .unwrap_or_else(|| settings.directory.default_domain.clone()),
        mandatory_role: settings.directory.mandatory_role.clone(),
        page_size: settings.directory.page_size,
        json: cli.json,
    };

    let outcome = Provisioner::new(&context.configuration, options)
        .run(&term, console)
        .await?;
    debug!("Finished with {:?}", outcome);

    console.blank()?;
    match outcome {
        Outcome::Existing(_) => console.line("Done. The user already exists.")?,
        Outcome::Created(_) => console.line("Done. The user was created.")?,
        Outcome::NotCreated => console.line("Done. No user was created.")?,
    }
    Ok(())
}

/// Prints the outcome of a run and returns the process exit code.
fn finish(result: Result<()>, console: &mut Console) -> u8 {
    let code = match result {
        Ok(()) => 0,
        Err(e) => {
            let _ = console.failure(format!("{:#}", e));
            1
        }
    };
    let _ = console.flush();
    code
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let mut console = Console::stdio();

    let result = match Settings::load()
        .with_context(|| format!("Unable to read {}", get_settings_path().display()))
    {
        Ok(settings) => {
            init_logging(&settings.log_level);
            run(cli, &settings, &mut console).await
        }
        Err(e) => Err(e),
    };

    ExitCode::from(finish(result, &mut console))
}
