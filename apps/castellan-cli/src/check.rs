//! Check command: directory connectivity, bind, and search.

use std::path::Path;

use clap::Args;
use dialoguer::Password;

use castellan_directory::{
    CredentialVerifier, DirectoryClient, DirectoryConnector, DirectorySettings, GroupExtractor,
    IdentityResolver, LdapDirectory,
};

use crate::config::AppConfig;
use crate::error::{CliError, CliResult};

/// Arguments for the check command.
#[derive(Args, Debug)]
#[command(about = "Check directory connectivity, bind, and search")]
pub struct CheckArgs {
    /// Username to authenticate against the directory
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password (omit to prompt securely)
    #[arg(short, long)]
    pub password: Option<String>,

    /// Test connectivity with the configured service account instead
    #[arg(short, long)]
    pub service: bool,
}

pub async fn run(config_path: &Path, args: CheckArgs) -> CliResult<()> {
    let config = AppConfig::load(config_path)?;
    let settings = config.directory;
    let directory =
        LdapDirectory::new(settings.clone()).map_err(|e| CliError::Config(e.to_string()))?;

    if args.service {
        check_service(&directory, &settings).await
    } else {
        check_user(&directory, &settings, args).await
    }
}

/// Bind with the configured service account.
async fn check_service(directory: &LdapDirectory, settings: &DirectorySettings) -> CliResult<()> {
    let principal = settings
        .service_bind_dn
        .clone()
        .filter(|dn| !dn.is_empty())
        .ok_or_else(|| {
            CliError::Config(
                "service account not configured (service_bind_dn / service_bind_password)"
                    .to_string(),
            )
        })?;
    let secret = settings.service_bind_password.clone().ok_or_else(|| {
        CliError::Config("service_bind_password is not configured".to_string())
    })?;

    println!("testing directory connectivity with the service account...");

    let mut session = directory.connect().await?;
    let bound = session.bind(&principal, &secret).await;
    session.close().await;

    match bound? {
        true => {
            println!("ok: bind succeeded for {principal}");
            Ok(())
        }
        false => Err(CliError::CheckFailed(format!(
            "bind rejected for {principal}"
        ))),
    }
}

/// Authenticate a user the way the engine does and show what it would see.
async fn check_user(
    directory: &LdapDirectory,
    settings: &DirectorySettings,
    args: CheckArgs,
) -> CliResult<()> {
    let username = args
        .username
        .ok_or_else(|| CliError::Input("username required (or use --service)".to_string()))?;
    let password = match args.password {
        Some(password) => password,
        None => Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| CliError::Input(e.to_string()))?,
    };

    let resolver = IdentityResolver::new(settings.clone());
    let bind = resolver.resolve(directory, &username).await?;
    println!("testing directory connectivity for {}", bind.principal);

    let verifier = CredentialVerifier::new(settings.clone());
    let mut verified = verifier.verify(directory, &bind, &username, &password).await?;

    println!("ok: bind succeeded for {}", bind.principal);
    println!("entry: {}", verified.entry.dn());
    if let Some(mail) = verified.entry.get("mail") {
        println!("  mail: {mail}");
    }

    let extractor = GroupExtractor::new(settings.clone());
    let groups = extractor
        .extract(&mut verified.client, &verified.entry)
        .await;
    verified.client.close().await;

    match groups? {
        groups if groups.is_empty() => println!("  groups: (none)"),
        groups => {
            println!("  groups:");
            for group in &groups {
                println!("    - {group}");
            }
        }
    }

    Ok(())
}
