use std::path::PathBuf;

use anyhow::Result;
use anyhow::bail;
use clap::Parser;
use clap::Subcommand;
use relprep::App;
use relprep::Config;
use relprep::change::ChangeKind;
use relprep::ops::git::RealGit;
use relprep::ops::github::RealGithub;
use relprep::ops::jira::RealJira;
use relprep::ops::prompt::PromptOps;
use relprep::ops::prompt::RealPrompt;
use relprep::ops::secrets::SecretRef;
use relprep::ops::secrets::access_secret;
use relprep::release_notes;
use relprep::repo::RepoList;
use relprep::version::ReleaseVersion;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::ChronoLocal;

#[derive(Parser)]
#[command(name = "relprep")]
#[command(about = "Release preparation: release notes, SNAPSHOT versions and submodule refreshes", long_about = None)]
pub struct Cli {
    /// Log the output of every external command
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile the release notes of a version from JIRA into an .rst file
    ReleaseNotes {
        /// Version to generate release notes for, e.g. 6.1.4
        version: ReleaseVersion,
        /// JIRA user to authenticate as; the API token is prompted for
        username: Option<String>,
        /// Output file (defaults to releaseNotes.rst; .rst is appended if missing)
        #[arg(short, long)]
        output: Option<String>,
        /// GCP project holding the API token secret
        #[arg(long = "passwordProject", requires = "override_user")]
        password_project: Option<String>,
        /// Secret id of the API token
        #[arg(long = "passwordId", requires = "override_user")]
        password_id: Option<String>,
        /// Secret version of the API token
        #[arg(long = "passwordVersion", default_value = "latest")]
        password_version: String,
        /// JIRA user whose API token is read from the secret manager instead of prompted for
        #[arg(long = "overrideUser", requires_all = ["password_project", "password_id"])]
        override_user: Option<String>,
    },
    /// Update versions or submodules across all repositories of a release
    Versions {
        /// Version of the release, e.g. 6.1.4
        version: ReleaseVersion,
        /// Change to apply
        #[arg(value_enum)]
        operation: ChangeKind,
        /// Newline-separated list of owner/name repositories to process
        #[arg(long, default_value = "repos.txt")]
        repos: PathBuf,
        /// File collecting the URLs of the opened PRs
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn setup_logging(verbose: bool) {
    let default_level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    let filter = EnvFilter::builder()
        .with_default_directive(default_level.into())
        .from_env_lossy();
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%H:%M:%S".to_string()))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = Config::load()?;

    match cli.command {
        Commands::ReleaseNotes {
            version,
            username,
            output,
            password_project,
            password_id,
            password_version,
            override_user,
        } => {
            let prompt = RealPrompt;
            let (username, token) = match (override_user, password_project, password_id) {
                (Some(user), Some(project), Some(secret_id)) => {
                    let secret = SecretRef {
                        project,
                        secret_id,
                        version: password_version,
                    };
                    (user, access_secret(&secret).await?)
                }
                _ => {
                    let Some(username) = username else {
                        bail!(
                            "Username is a required parameter, please specify a JIRA username to use for fetching tickets"
                        );
                    };
                    let token = prompt.secret(&format!(
                        "Enter API token created by JIRA user '{}'",
                        username
                    ))?;
                    (username, token)
                }
            };

            let jira = RealJira::new(config.jira_url.clone(), username.clone(), token);
            let app = App::new(config, RealGit, RealGithub, prompt);
            let output = release_notes::output_path(output.as_deref());
            app.cmd_release_notes(&jira, &username, &version, &output, &mut std::io::stdout())
                .await?
        }
        Commands::Versions {
            version,
            operation,
            repos,
            output,
        } => {
            if let Some(output) = output {
                config.pr_output = output;
            }
            let repos = RepoList::load(&repos).await?;
            let app = App::new(config, RealGit, RealGithub, RealPrompt);
            app.cmd_modify_versions(&version, operation, &repos, &mut std::io::stdout())
                .await?
        }
    }

    Ok(())
}
