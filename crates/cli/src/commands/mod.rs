// CLI subcommand dispatch and shared plumbing.

use std::future::Future;
use std::path::Path;

use anyhow::{bail, Context};
use clap::Subcommand;
use quire_client::api::HttpDocumentApi;
use quire_client::autosave::DebounceConfig;
use quire_client::config::ClientConfig;
use tracing::debug;

pub mod edit;
pub mod ls;
pub mod new;
pub mod read;

#[derive(Subcommand)]
pub enum Command {
    /// List documents, most recently updated first
    Ls(ls::LsArgs),
    /// Print a document
    Read(read::ReadArgs),
    /// Create a document
    New(new::NewArgs),
    /// Change a document's title or content and save it
    Edit(edit::EditArgs),
}

pub fn run(cmd: Command, settings: &Settings) -> anyhow::Result<()> {
    match cmd {
        Command::Ls(args) => ls::run(args, settings),
        Command::Read(args) => read::run(args, settings),
        Command::New(args) => new::run(args, settings),
        Command::Edit(args) => edit::run(args, settings),
    }
}

/// Resolved connection settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server_url: String,
    pub debounce: DebounceConfig,
}

impl Settings {
    pub fn resolve(server_flag: Option<String>) -> anyhow::Result<Self> {
        let config = ClientConfig::load().context("failed to load client configuration")?;
        let settings = Self::from_config(config, server_flag);
        debug!(server_url = %settings.server_url, "resolved cli settings");
        Ok(settings)
    }

    fn from_config(config: ClientConfig, server_flag: Option<String>) -> Self {
        Self {
            debounce: config.debounce(),
            server_url: server_flag.unwrap_or(config.server_url),
        }
    }

    pub fn api(&self) -> anyhow::Result<HttpDocumentApi> {
        HttpDocumentApi::parse(&self.server_url).context("invalid --server url")
    }
}

/// Run `future` to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: Future>(future: F) -> anyhow::Result<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?;
    Ok(runtime.block_on(future))
}

/// Content from `--content` or `--file`, if either was given.
pub(crate) fn resolve_content(
    content: Option<String>,
    file: Option<&Path>,
) -> anyhow::Result<Option<String>> {
    match (content, file) {
        (Some(_), Some(_)) => bail!("--content and --file cannot be used together"),
        (Some(content), None) => Ok(Some(content)),
        (None, Some(path)) => std::fs::read_to_string(path)
            .map(Some)
            .with_context(|| format!("failed to read content file `{}`", path.display())),
        (None, None) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn server_flag_wins_over_config() {
        let config = ClientConfig { server_url: "http://config:3000".into(), autosave_delay_ms: 400 };
        let settings = Settings::from_config(config.clone(), Some("http://flag:4000".into()));
        assert_eq!(settings.server_url, "http://flag:4000");
        assert_eq!(settings.debounce.window, Duration::from_millis(400));

        let settings = Settings::from_config(config, None);
        assert_eq!(settings.server_url, "http://config:3000");
    }

    #[test]
    fn invalid_server_url_is_reported() {
        let settings = Settings { server_url: "::not a url".into(), debounce: DebounceConfig::default() };
        assert!(settings.api().is_err());
    }

    #[test]
    fn content_file_reads_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let file_path = dir.path().join("note.md");
        std::fs::write(&file_path, "# From disk").unwrap();

        let content = resolve_content(None, Some(&file_path)).unwrap();
        assert_eq!(content.as_deref(), Some("# From disk"));
    }

    #[test]
    fn missing_content_file_is_an_error() {
        let dir = tempfile::TempDir::new().unwrap();
        let error = resolve_content(None, Some(&dir.path().join("absent.md"))).unwrap_err();
        assert!(format!("{error:#}").contains("absent.md"));
    }

    #[test]
    fn inline_content_is_used_as_is() {
        assert_eq!(resolve_content(Some("x".into()), None).unwrap().as_deref(), Some("x"));
        assert_eq!(resolve_content(None, None).unwrap(), None);
        assert!(resolve_content(Some("x".into()), Some(Path::new("y"))).is_err());
    }

    #[test]
    fn block_on_runs_future() {
        assert_eq!(block_on(async { 7 }).unwrap(), 7);
    }
}
