use clap::{Parser, Subcommand};

use crate::models::{FilterPatch, FilterValue};
use crate::resources::Resource;

#[derive(Parser)]
#[command(name = "ledgerdesk")]
#[command(about = "Browse and export investor, transaction, payout and withdrawal records from the back-office API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Sign in and store the session token
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long)]
        password: String,
    },

    /// Sign out and remove the stored session token
    Logout,

    /// Fetch one page of a list
    List {
        /// Resource to list (investors, transactions, pending, payouts, withdrawals, tally)
        resource: String,

        /// Page number
        #[arg(long)]
        page: Option<u32>,

        /// Page size
        #[arg(short, long)]
        limit: Option<u32>,

        /// Free-text search
        #[arg(short, long)]
        search: Option<String>,

        /// Extra filters as key=value (repeatable), e.g. --filter status=pending
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Output format (csv, json)
        #[arg(long, default_value = "csv")]
        format: String,
    },

    /// Download a server-generated export file
    Export {
        /// Resource to export
        resource: String,

        /// Filters as key=value (repeatable), e.g. --filter from=2024-01-01
        #[arg(short, long = "filter")]
        filters: Vec<String>,

        /// Output directory (defaults to LEDGERDESK_DOWNLOAD_DIR)
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Upload a file to an endpoint as multipart form data
    Upload {
        /// Endpoint path, e.g. /investors/import
        endpoint: String,

        /// File to upload
        file: String,

        /// Form field name
        #[arg(long, default_value = "file")]
        field: String,
    },
}

/// How `list` prints its rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
}

impl Commands {
    pub fn parse_resource(resource: &str) -> Result<Resource, anyhow::Error> {
        Resource::parse(resource)
    }

    pub fn parse_output_format(format: &str) -> Result<OutputFormat, anyhow::Error> {
        match format.to_lowercase().as_str() {
            "csv" => Ok(OutputFormat::Csv),
            "json" => Ok(OutputFormat::Json),
            other => Err(anyhow::anyhow!(
                "Unsupported output format: {}. Supported formats: csv, json",
                other
            )),
        }
    }

    /// Turn `key=value` arguments into a patch
    pub fn parse_filters(filters: &[String]) -> Result<FilterPatch, anyhow::Error> {
        filters.iter().try_fold(FilterPatch::new(), |patch, raw| {
            let (key, value) = raw
                .split_once('=')
                .ok_or_else(|| anyhow::anyhow!("Filter must look like key=value, got '{}'", raw))?;
            let key = key.trim();
            if key.is_empty() {
                return Err(anyhow::anyhow!("Filter name missing in '{}'", raw));
            }
            Ok(patch.set(key, FilterValue::parse(value.trim())))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QueryFilters;

    #[test]
    fn test_parse_filters() {
        let patch = Commands::parse_filters(&[
            "status=pending".to_string(),
            "investorId = 42".to_string(),
            "page=3".to_string(),
        ])
        .unwrap();

        let mut filters = QueryFilters::new(10);
        filters.merge(patch);
        assert_eq!(filters.get("status"), Some(&FilterValue::from("pending")));
        assert_eq!(filters.get("investorId"), Some(&FilterValue::Int(42)));
        assert_eq!(filters.page(), 3);
    }

    #[test]
    fn test_parse_filters_rejects_malformed() {
        assert!(Commands::parse_filters(&["status".to_string()]).is_err());
        assert!(Commands::parse_filters(&["=x".to_string()]).is_err());
    }

    #[test]
    fn test_parse_output_format() {
        assert_eq!(Commands::parse_output_format("JSON").unwrap(), OutputFormat::Json);
        assert!(Commands::parse_output_format("xml").is_err());
    }

    #[test]
    fn test_cli_parses_list() {
        let cli = Cli::try_parse_from([
            "ledgerdesk", "list", "payouts", "--limit", "25", "-f", "status=paid", "-f", "from=2024-01-01",
        ])
        .unwrap();
        match cli.command {
            Commands::List { resource, limit, filters, .. } => {
                assert_eq!(resource, "payouts");
                assert_eq!(limit, Some(25));
                assert_eq!(filters.len(), 2);
            }
            _ => panic!("expected list"),
        }
    }
}
