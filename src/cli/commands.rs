use clap::{Parser, Subcommand};
use lextro::api::{AnswerType, ExplanationLanguage};
use std::path::PathBuf;
use std::str::FromStr;
use tracing::Level;

/// `Lextro` - AI explanations for coding-practice problems.
#[derive(Parser, Debug)]
#[command(name = "lextro")]
#[command(version)]
#[command(about = "Backend and extension runtime for AI problem explanations.", long_about = None)]
pub struct Cli {
    /// Log verbosity (trace, debug, info, warn, error)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: Level,

    /// Use this config file instead of ~/.lextro/config.toml
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the backend HTTP server
    Serve {
        /// Host to bind to (default: server.host from config)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (use 0 for random available port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Extract problem data from a saved problem page and print it as JSON
    Extract {
        /// Saved HTML of the problem page
        file: PathBuf,

        /// URL the page was loaded from
        #[arg(long)]
        url: String,

        /// Print the editor code and examples instead of the full snapshot
        #[arg(long)]
        code: bool,
    },

    /// Run the extension flow against a backend: load a page, then ask for an explanation
    Ask {
        /// Saved HTML of the problem page
        file: PathBuf,

        /// URL the page was loaded from
        #[arg(long)]
        url: String,

        /// Session token placed in the backend's session cookie
        #[arg(long, env = "LEXTRO_SESSION_TOKEN")]
        token: String,

        /// code, logical_explanation or company_approach
        #[arg(long, default_value = "code", value_parser = AnswerType::from_str)]
        answer_type: AnswerType,

        /// english or hinglish
        #[arg(long, default_value = "english", value_parser = ExplanationLanguage::from_str)]
        language: ExplanationLanguage,
    },

    /// List the signed-in user's past queries through the extension runtime
    History {
        /// Session token placed in the backend's session cookie
        #[arg(long, env = "LEXTRO_SESSION_TOKEN")]
        token: String,
    },

    /// Print the effective configuration
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn serve_flags_are_optional() {
        let cli = Cli::try_parse_from(["lextro", "serve"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Serve {
                host: None,
                port: None
            }
        ));
        assert_eq!(cli.log_level, Level::INFO);
    }

    #[test]
    fn ask_parses_enums() {
        let cli = Cli::try_parse_from([
            "lextro",
            "--log-level",
            "debug",
            "ask",
            "page.html",
            "--url",
            "https://leetcode.com/problems/two-sum/",
            "--token",
            "tok",
            "--answer-type",
            "company_approach",
            "--language",
            "Hinglish",
        ])
        .unwrap();
        assert_eq!(cli.log_level, Level::DEBUG);
        match cli.command {
            Commands::Ask {
                answer_type,
                language,
                ..
            } => {
                assert_eq!(answer_type, AnswerType::CompanyApproach);
                assert_eq!(language, ExplanationLanguage::Hinglish);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn ask_rejects_unknown_answer_type() {
        let result = Cli::try_parse_from([
            "lextro",
            "ask",
            "page.html",
            "--url",
            "https://leetcode.com/problems/two-sum/",
            "--token",
            "tok",
            "--answer-type",
            "bogus",
        ]);
        assert!(result.is_err());
    }
}
