use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};

use crate::engine::ScopeDirection;

/// Recon asset inventory with bug bounty scope admission.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Configuration file (TOML format)
    #[arg(long, value_name = "FILE", global = true, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Create a program and make it the default one
    New { program: String },
    /// Set the default program
    Use { program: String },
    /// Disable a program, hiding it from `--all` listings
    Disable { program: String },
    /// Enable a disabled program
    Enable { program: String },
    /// List programs
    Programs {
        #[arg(long)]
        show_disabled: bool,
    },
    /// List programs, or print the program commands work on
    Program {
        #[command(subcommand)]
        action: Option<ProgramAction>,
        #[arg(short, long)]
        program: Option<String>,
    },
    /// List domains
    Domains(ListArgs),
    /// Add, remove or update domains
    Domain {
        #[command(subcommand)]
        action: AssetAction,
    },
    /// List IPs
    Ips {
        #[command(flatten)]
        list: ListArgs,
        /// Drop IPs inside the ranges of `ingest.cdn_filter_path`
        #[arg(long)]
        filter_cdns: bool,
    },
    /// Add, remove or update IPs
    Ip {
        #[command(subcommand)]
        action: AssetAction,
    },
    /// Print inscope or outscope patterns
    Scope(ScopeArgs),
    /// Edit the inscope list
    Inscope {
        #[command(subcommand)]
        action: EditAction,
    },
    /// Edit the outscope list
    Outscope {
        #[command(subcommand)]
        action: EditAction,
    },
    /// Edit the blacklist
    Blacklist {
        #[command(subcommand)]
        action: EditAction,
    },
    /// List URLs
    Urls {
        #[command(flatten)]
        list: ListArgs,
        /// Only URLs of this hostname, across all programs
        #[arg(short = 'd', long = "domain", value_name = "HOSTNAME")]
        hostname: Option<String>,
    },
    /// Add or remove URLs
    Url {
        #[command(subcommand)]
        action: UrlAction,
    },
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramAction {
    /// Same as `programs`
    List {
        #[arg(long)]
        show_disabled: bool,
    },
    /// Print the program commands work on (the default)
    Active,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ListArgs {
    #[arg(short, long)]
    pub program: Option<String>,
    /// List across every program
    #[arg(long, conflicts_with = "program")]
    pub all: bool,
}

#[derive(Args, Debug, Clone)]
pub struct ScopeArgs {
    #[arg(value_enum)]
    pub direction: Direction,
    #[command(flatten)]
    pub list: ListArgs,
    /// With `--all`, include disabled programs
    #[arg(long, requires = "all")]
    pub include_disabled: bool,
    /// Only wildcard patterns, printed without the `*.` prefix
    #[arg(long)]
    pub wildcard: bool,
    /// Only top-level suffixes
    #[arg(long, requires = "wildcard")]
    pub top: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl From<Direction> for ScopeDirection {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::In => ScopeDirection::In,
            Direction::Out => ScopeDirection::Out,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum AssetAction {
    /// Add elements (`host:ip1,ip2` or `ip:domain1,domain2` link lists allowed)
    Add(AddArgs),
    Remove(ElementArgs),
    /// Replace the linked IPs of domains, or the linked domains of IPs
    Update(ElementArgs),
}

#[derive(Subcommand, Debug)]
pub enum UrlAction {
    /// Add URLs, `<url> [<status> <length>]` per line
    Add {
        #[command(flatten)]
        args: AddArgs,
        /// Force the hostname of every URL, allows relative paths
        #[arg(short = 'd', long = "domain", value_name = "HOSTNAME")]
        hostname: Option<String>,
    },
    Remove(ElementArgs),
}

#[derive(Subcommand, Debug)]
pub enum EditAction {
    Add(ElementArgs),
    Remove(ElementArgs),
}

#[derive(Args, Debug, Clone, Default)]
pub struct ElementArgs {
    #[arg(short, long)]
    pub program: Option<String>,
    /// Print `[NEW]`, `[UPDATED]` and `[DELETED]` lines for changed elements
    #[arg(long)]
    pub show_new: bool,
    /// Elements to process; read from stdin when empty or `-`
    pub elements: Vec<String>,
}

#[derive(Args, Debug, Clone, Default)]
pub struct AddArgs {
    #[command(flatten)]
    pub target: ElementArgs,
    /// Tool or feed the elements came from
    #[arg(short, long)]
    pub source: Option<String>,
}

impl ElementArgs {
    pub fn reads_stdin(&self) -> bool {
        self.elements.is_empty() || (self.elements.len() == 1 && self.elements[0] == "-")
    }
}

/// Reads one element per line, trimming whitespace and skipping empty lines.
pub async fn read_elements<R>(reader: R) -> std::io::Result<Vec<String>>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut elements = Vec::new();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if !line.is_empty() {
            elements.push(line.to_string());
        }
    }
    Ok(elements)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_domain_add() {
        let cli = Cli::parse_from([
            "reconscope",
            "domain",
            "add",
            "-p",
            "acme",
            "-s",
            "amass",
            "--show-new",
            "a.acme.com",
        ]);
        match cli.command {
            Command::Domain {
                action: AssetAction::Add(args),
            } => {
                assert_eq!(args.target.program.as_deref(), Some("acme"));
                assert_eq!(args.source.as_deref(), Some("amass"));
                assert!(args.target.show_new);
                assert_eq!(args.target.elements, vec!["a.acme.com"]);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_parse_scope_flags() {
        let cli = Cli::parse_from(["reconscope", "scope", "in", "--all", "--wildcard", "--top"]);
        match cli.command {
            Command::Scope(args) => {
                assert_eq!(args.direction, Direction::In);
                assert!(args.list.all && args.wildcard && args.top);
            }
            other => panic!("unexpected command {:?}", other),
        }
        assert!(Cli::try_parse_from(["reconscope", "scope", "in", "--top"]).is_err());
        assert!(Cli::try_parse_from(["reconscope", "domains", "--all", "-p", "x"]).is_err());
    }

    #[test]
    fn test_parse_program_forms() {
        let cli = Cli::parse_from(["reconscope", "program", "list", "--show-disabled"]);
        assert!(matches!(
            cli.command,
            Command::Program {
                action: Some(ProgramAction::List {
                    show_disabled: true
                }),
                ..
            }
        ));

        let cli = Cli::parse_from(["reconscope", "program", "-p", "acme", "active"]);
        match cli.command {
            Command::Program { action, program } => {
                assert_eq!(action, Some(ProgramAction::Active));
                assert_eq!(program.as_deref(), Some("acme"));
            }
            other => panic!("unexpected command {:?}", other),
        }

        let cli = Cli::parse_from(["reconscope", "program"]);
        assert!(matches!(
            cli.command,
            Command::Program { action: None, .. }
        ));
    }

    #[test]
    fn test_reads_stdin() {
        let mut args = ElementArgs::default();
        assert!(args.reads_stdin());
        args.elements = vec!["-".to_string()];
        assert!(args.reads_stdin());
        args.elements = vec!["a.com".to_string()];
        assert!(!args.reads_stdin());
    }

    #[tokio::test]
    async fn test_read_elements() {
        let input: &[u8] = b"a.acme.com  \n\n   \nb.acme.com\n";
        let elements = read_elements(input).await.unwrap();
        assert_eq!(elements, vec!["a.acme.com", "b.acme.com"]);
    }
}
