//! xavyo-exrbac - grant an Exchange RBAC role to a directory principal
//!
//! Connects to a domain controller, resolves the Exchange organization, the
//! principal and the Exchange version marker, then creates or updates the
//! role assignment object.

use clap::Parser;
use tracing::debug;
use xavyo_directory::{DirectoryConfig, LdapDirectory};
use xavyo_exchange_rbac::{grant_role, GrantReport, GrantRequest, UpsertAction, DEFAULT_ROLE};

mod error;
mod logging;

use error::CliResult;
use logging::LogLevel;

/// Grant an Exchange RBAC role (ApplicationImpersonation by default)
#[derive(Debug, Parser)]
#[command(name = "xavyo-exrbac")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// DNS domain name, e.g. corp.example.com
    domain: String,

    /// Domain controller host name or IP address
    server: String,

    /// Logon name (sAMAccountName) of the principal to grant the role to
    principal: String,

    /// RBAC role to grant
    #[arg(long, default_value = DEFAULT_ROLE)]
    role: String,

    /// LDAP port (defaults to 389, or 636 with --ssl)
    #[arg(long)]
    port: Option<u16>,

    /// Connect with LDAPS
    #[arg(long, conflicts_with = "starttls")]
    ssl: bool,

    /// Upgrade the connection with STARTTLS
    #[arg(long)]
    starttls: bool,

    /// DN to bind as (anonymous bind when absent)
    #[arg(long, env = "EXRBAC_BIND_DN")]
    bind_dn: Option<String>,

    /// Password for --bind-dn
    #[arg(long, env = "EXRBAC_BIND_PASSWORD", hide_env_values = true)]
    bind_password: Option<String>,

    /// Connection and operation timeout in seconds
    #[arg(long, default_value_t = 30)]
    timeout: u64,

    /// Print progress for each step
    #[arg(short, long)]
    verbose: bool,

    /// Print filters, DNs and result codes
    #[arg(long)]
    debug: bool,

    /// Print everything, including LDAP client internals
    #[arg(long)]
    trace: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the result as JSON instead of text
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn log_level(&self) -> LogLevel {
        LogLevel::from_flags(self.verbose, self.debug, self.trace)
    }

    fn directory_config(&self) -> DirectoryConfig {
        let mut config = DirectoryConfig::new(&self.server).with_timeout_secs(self.timeout);
        if self.ssl {
            config = config.with_ssl();
        }
        if self.starttls {
            config = config.with_starttls();
        }
        if let Some(port) = self.port {
            config = config.with_port(port);
        }
        config.bind_dn = self.bind_dn.clone();
        config.bind_password = self.bind_password.clone();
        config
    }

    fn grant_request(&self) -> GrantRequest {
        GrantRequest::new(&self.domain, &self.principal).with_role(&self.role)
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();
    logging::init_logging(cli.log_level(), cli.json_logs);

    if let Err(e) = run(&cli).await {
        e.print();
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: &Cli) -> CliResult<()> {
    let config = cli.directory_config();
    debug!(config = ?config, "Directory configuration");

    let directory = LdapDirectory::new(config)?;
    let report = grant_role(&directory, &cli.grant_request()).await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    Ok(())
}

fn print_report(report: &GrantReport) {
    for line in report_lines(report) {
        println!("{line}");
    }
}

fn report_lines(report: &GrantReport) -> Vec<String> {
    let action = match report.outcome.action {
        UpsertAction::Created => "Created new role assignment",
        UpsertAction::Updated => "Role assignment already exists, updated",
    };

    vec![
        format!("Domain Base DN: {}", report.base_dn),
        format!("Role DN: {}", report.role_dn),
        format!("Role Assignment Base DN: {}", report.role_assignments_dn),
        format!("User DN found: {}", report.principal_dn),
        format!("{}: {}", action, report.outcome.dn),
        "Role assignment processed successfully.".to_string(),
    ]
}
