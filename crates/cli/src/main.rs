// quire CLI entry point.

use clap::Parser;

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "quire", about = "Markdown notes on a quire document service")]
struct Cli {
    /// Document service URL. Overrides the config file and QUIRE_SERVER_URL.
    #[arg(long, global = true, value_name = "URL")]
    server: Option<String>,

    #[command(subcommand)]
    command: commands::Command,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = commands::Settings::resolve(cli.server)?;
    commands::run(cli.command, &settings)
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn server_flag_is_global() {
        let cli = Cli::try_parse_from(["quire", "ls", "--server", "http://10.0.0.5:3000"]).unwrap();
        assert_eq!(cli.server.as_deref(), Some("http://10.0.0.5:3000"));
        assert!(matches!(cli.command, commands::Command::Ls(_)));
    }

    #[test]
    fn content_and_file_conflict() {
        let result = Cli::try_parse_from([
            "quire", "edit", "doc-1", "--content", "x", "--file", "notes.md",
        ]);
        assert!(result.is_err());
    }
}
