//! CLI argument parsing for gopkg

use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "gp")]
#[command(author, version, about = "Translate Go packages into GitHub repositories", long_about = None)]
pub struct Cli {
    /// Go packages (import paths) to translate
    #[arg(required = true, value_name = "PACKAGE")]
    pub packages: Vec<String>,

    /// Lookup timeout in milliseconds
    #[arg(short, long, default_value = "10000")]
    pub timeout_ms: u64,

    /// Print only the repository names, one per line
    #[arg(short, long)]
    pub quiet: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_packages() {
        let cli = Cli::parse_from(["gp", "k8s.io/metrics", "github.com/user/project"]);
        assert_eq!(cli.packages, vec!["k8s.io/metrics", "github.com/user/project"]);
        assert_eq!(cli.timeout_ms, 10_000);
        assert!(!cli.quiet);
    }

    #[test]
    fn test_cli_requires_package() {
        assert!(Cli::try_parse_from(["gp"]).is_err());
    }

    #[test]
    fn test_cli_quiet_and_timeout() {
        let cli = Cli::parse_from(["gp", "-q", "-t", "500", "golang.org/x/net"]);
        assert!(cli.quiet);
        assert_eq!(cli.timeout_ms, 500);
    }
}
