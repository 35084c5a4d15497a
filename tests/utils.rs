use std::path::Path;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::Layer as _;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::layer::SubscriberExt as _;
use tracing_subscriber::util::SubscriberInitExt as _;

/// Runs git in `dir` and returns its stdout.
pub async fn git(dir: &Path, args: &[&str]) -> anyhow::Result<String> {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("LC_ALL", "C")
        .stdin(Stdio::null())
        .output()
        .await?;
    anyhow::ensure!(
        output.status.success(),
        "git {} failed: {}",
        args.join(" "),
        String::from_utf8_lossy(&output.stderr)
    );
    Ok(String::from_utf8(output.stdout)?)
}

/// Sets the identity needed for commits in a repository.
pub async fn configure_identity(dir: &Path) -> anyhow::Result<()> {
    git(dir, &["config", "user.name", "Test User"]).await?;
    git(dir, &["config", "user.email", "test@example.com"]).await?;
    Ok(())
}

/// Creates a bare repository at `<remotes>/<id>.git` whose single branch
/// `branch` holds `files`.
///
/// The repository is seeded from a scratch clone that is deleted afterwards.
pub async fn create_remote(
    remotes: &Path,
    id: &str,
    branch: &str,
    files: &[(&str, &str)],
) -> anyhow::Result<PathBuf> {
    let bare = remotes.join(format!("{id}.git"));
    tokio::fs::create_dir_all(&bare).await?;
    git(&bare, &["init", "--bare"]).await?;
    let head = format!("refs/heads/{branch}");
    git(&bare, &["symbolic-ref", "HEAD", &head]).await?;

    let seed = remotes.join(format!("{id}.seed"));
    tokio::fs::create_dir_all(&seed).await?;
    git(&seed, &["init"]).await?;
    configure_identity(&seed).await?;
    git(&seed, &["checkout", "-b", branch]).await?;
    for (path, contents) in files {
        let file = seed.join(path);
        if let Some(parent) = file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&file, contents).await?;
    }
    git(&seed, &["add", "-A"]).await?;
    git(&seed, &["commit", "-m", "Initial commit"]).await?;
    let bare_url = bare.to_string_lossy().to_string();
    git(&seed, &["push", &bare_url, branch]).await?;
    tokio::fs::remove_dir_all(&seed).await?;

    Ok(bare)
}

/// Clones a remote into the workspace, ready to commit.
pub async fn clone_into(workspace: &Path, bare: &Path, name: &str) -> anyhow::Result<PathBuf> {
    tokio::fs::create_dir_all(workspace).await?;
    let bare_url = format!("file://{}", bare.display());
    git(workspace, &["clone", &bare_url, name]).await?;
    let dir = workspace.join(name);
    configure_identity(&dir).await?;
    Ok(dir)
}

pub fn setup_logging() -> anyhow::Result<()> {
    let timer = tracing_subscriber::fmt::time::ChronoLocal::new("%H:%M:%S%.3f".into());
    let format = tracing_subscriber::fmt::format().with_timer(timer);
    let filter = tracing_subscriber::EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env()?;
    let subscriber = tracing_subscriber::fmt::layer()
        .event_format(format)
        .with_span_events(FmtSpan::NEW | FmtSpan::CLOSE)
        .with_filter(filter);
    tracing_subscriber::registry().with(subscriber).init();
    Ok(())
}

pub enum TestDir {
    Temp(tempfile::TempDir),
    Kept(std::path::PathBuf),
}

impl TestDir {
    pub fn new() -> std::io::Result<Self> {
        let temp_dir = tempfile::tempdir()?;

        if std::env::var("DEBUG_TESTS").is_ok() {
            let path = temp_dir.keep();
            eprintln!("Test directory kept at: {}", path.display());
            Ok(TestDir::Kept(path))
        } else {
            Ok(TestDir::Temp(temp_dir))
        }
    }

    pub fn path(&self) -> &std::path::Path {
        match self {
            TestDir::Temp(t) => t.path(),
            TestDir::Kept(p) => p.as_path(),
        }
    }
}
