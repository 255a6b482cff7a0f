//! Clap derive structures for the `ispdesk` CLI.
//!
//! Defines the command tree, global flags and shared value enums. Also
//! compiled by `build.rs` for man pages, so nothing here may reach
//! beyond `clap`.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ispdesk -- ISP operator console for MikroTik routers and billing
#[derive(Debug, Parser)]
#[command(
    name = "ispdesk",
    version,
    about = "Manage MikroTik routers, subscriber sessions and billing from the command line",
    long_about = "An operator console for small ISPs.\n\n\
        Keeps an inventory of MikroTik routers, tests their reachability,\n\
        edits their configuration over the RouterOS API, watches online\n\
        PPP/hotspot sessions and tracks customers, packages and invoices.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Output format [default: from config, else table]
    #[arg(long, short = 'o', env = "ISPDESK_OUTPUT", global = true)]
    pub output: Option<OutputFormat>,

    /// When to use color output
    #[arg(long, global = true)]
    pub color: Option<ColorMode>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Configuration file
    #[arg(long, env = "ISPDESK_CONFIG", global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// State file (servers, sessions, billing)
    #[arg(long, env = "ISPDESK_STATE", global = true, value_name = "FILE")]
    pub state: Option<PathBuf>,
}

impl GlobalOpts {
    pub fn format(&self) -> OutputFormat {
        self.output.unwrap_or(OutputFormat::Table)
    }

    pub fn color_mode(&self) -> ColorMode {
        self.color.unwrap_or(ColorMode::Auto)
    }
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Log in with the admin credentials and store a session token
    Login(LoginArgs),

    /// Forget the stored session token
    Logout,

    /// Show who the stored session belongs to
    Whoami,

    /// Manage the MikroTik server inventory
    #[command(alias = "srv")]
    Servers(ServersArgs),

    /// View and edit router configuration
    #[command(alias = "rt")]
    Router(RouterArgs),

    /// Watch and disconnect online subscriber sessions
    #[command(alias = "cl")]
    Clients(ClientsArgs),

    /// Manage customers
    #[command(alias = "cust")]
    Customers(CustomersArgs),

    /// Manage service packages
    #[command(alias = "pkg")]
    Packages(PackagesArgs),

    /// Manage invoices
    #[command(alias = "inv")]
    Invoices(InvoicesArgs),

    /// Business overview with optional AI insights
    Dashboard(DashboardArgs),

    /// Manage CLI configuration and stored secrets
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOGIN
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Admin username
    #[arg(long, short = 'u', default_value = "admin")]
    pub username: String,

    /// Admin password (prompted when omitted)
    #[arg(long, env = "ISPDESK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  SERVERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ServersArgs {
    #[command(subcommand)]
    pub command: ServersCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RosVersion {
    V6,
    V7,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ServerStatus {
    Active,
    Disabled,
}

#[derive(Debug, Subcommand)]
pub enum ServersCommand {
    /// List managed servers, newest first
    #[command(alias = "ls")]
    List,

    /// Show one server
    Get {
        /// Server ID
        server: String,
    },

    /// Register a new server
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// IP address or hostname
        #[arg(long)]
        host: String,

        /// RouterOS API port
        #[arg(long, default_value = "8728")]
        port: u32,

        /// API username
        #[arg(long, default_value = "admin")]
        username: String,

        /// API password (prompted when omitted on a terminal)
        #[arg(long)]
        password: Option<String>,

        /// RouterOS major version
        #[arg(id = "ros_version", long = "ros-version", default_value = "v7")]
        version: RosVersion,

        /// Per-call timeout in seconds
        #[arg(long, default_value = "10")]
        timeout: u32,

        /// Initial status
        #[arg(long, default_value = "active")]
        status: ServerStatus,
    },

    /// Change a server's connection profile
    Edit {
        /// Server ID
        server: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        host: Option<String>,

        #[arg(long)]
        port: Option<u32>,

        #[arg(long)]
        username: Option<String>,

        /// New API password (unchanged when omitted)
        #[arg(long)]
        password: Option<String>,

        #[arg(id = "ros_version", long = "ros-version")]
        version: Option<RosVersion>,

        #[arg(long)]
        timeout: Option<u32>,

        #[arg(long)]
        status: Option<ServerStatus>,
    },

    /// Remove a server (asks for confirmation)
    #[command(alias = "rm")]
    Remove {
        /// Server ID
        server: String,
    },

    /// Test that a server answers on its API port
    Test {
        /// Server ID
        server: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  ROUTER
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct RouterArgs {
    #[command(subcommand)]
    pub command: RouterCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Toggle {
    On,
    Off,
}

#[derive(Debug, Subcommand)]
pub enum RouterCommand {
    /// Show a router's configuration
    Show {
        /// Server ID
        server: String,

        /// Use the last loaded copy instead of contacting the router
        #[arg(long)]
        cached: bool,
    },

    /// Edit a router's configuration and apply it in one step
    Edit(RouterEditArgs),
}

#[derive(Debug, Args)]
pub struct RouterEditArgs {
    /// Server ID
    pub server: String,

    /// System identity
    #[arg(long)]
    pub identity: Option<String>,

    /// System date (YYYY-MM-DD)
    #[arg(long)]
    pub date: Option<String>,

    /// System time (HH:MM or HH:MM:SS)
    #[arg(long)]
    pub time: Option<String>,

    /// Enable or disable the NTP client
    #[arg(long)]
    pub ntp: Option<Toggle>,

    #[arg(long)]
    pub ntp_primary: Option<String>,

    #[arg(long)]
    pub ntp_secondary: Option<String>,

    #[arg(long)]
    pub dns_primary: Option<String>,

    #[arg(long)]
    pub dns_secondary: Option<String>,

    /// Enable a firewall rule by ID
    #[arg(long, value_name = "RULE")]
    pub enable_rule: Vec<String>,

    /// Disable a firewall rule by ID
    #[arg(long, value_name = "RULE")]
    pub disable_rule: Vec<String>,

    /// Set a rule's action: RULE=accept|drop|reject
    #[arg(long, value_name = "RULE=ACTION")]
    pub rule_action: Vec<String>,

    /// Set a rule's protocol: RULE=tcp|udp|icmp|any
    #[arg(long, value_name = "RULE=PROTOCOL")]
    pub rule_protocol: Vec<String>,

    /// Set a rule's source address (empty clears it)
    #[arg(long, value_name = "RULE=ADDRESS")]
    pub rule_src: Vec<String>,

    /// Set a rule's destination port (empty clears it)
    #[arg(long, value_name = "RULE=PORT")]
    pub rule_port: Vec<String>,

    /// Rename a rule
    #[arg(long, value_name = "RULE=NAME")]
    pub rule_name: Vec<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CLIENTS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ClientsArgs {
    #[command(subcommand)]
    pub command: ClientsCommand,
}

#[derive(Debug, Subcommand)]
pub enum ClientsCommand {
    /// List online sessions
    #[command(alias = "ls")]
    List {
        /// Case-insensitive text matched against every column
        #[arg(long, short = 'f', default_value = "")]
        filter: String,

        /// Pull fresh sessions from every active server first
        #[arg(long, short = 'r')]
        refresh: bool,
    },

    /// Disconnect a session
    Kick {
        /// Session ID
        session: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CUSTOMERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CustomersArgs {
    #[command(subcommand)]
    pub command: CustomersCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CustomerStatusFilter {
    Active,
    Suspended,
    Inactive,
}

#[derive(Debug, Subcommand)]
pub enum CustomersCommand {
    /// List customers, newest first
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        status: Option<CustomerStatusFilter>,
    },

    /// Show one customer
    Get {
        /// Customer ID
        customer: String,
    },

    /// Add a customer
    Add {
        #[arg(long)]
        name: String,

        #[arg(long)]
        email: String,

        #[arg(long)]
        phone: String,

        /// Package name
        #[arg(long)]
        package: String,

        #[arg(long)]
        address: String,
    },

    /// Import customers from a CSV file (all rows or none)
    Import {
        /// CSV with name, email, phone, package and address columns
        file: PathBuf,
    },

    /// Export customers as CSV
    Export {
        /// Write to a file instead of stdout
        #[arg(long, value_name = "FILE")]
        out: Option<PathBuf>,
    },

    /// Suspend a customer
    Suspend { customer: String },

    /// Reactivate a customer
    Activate { customer: String },

    /// Mark a customer as churned
    Deactivate { customer: String },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  PACKAGES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct PackagesArgs {
    #[command(subcommand)]
    pub command: PackagesCommand,
}

#[derive(Debug, Subcommand)]
pub enum PackagesCommand {
    /// List packages
    #[command(alias = "ls")]
    List,

    /// Add a package
    Add {
        #[arg(long)]
        name: String,

        /// Download/upload, e.g. "100/20 Mbps"
        #[arg(long)]
        speed: String,

        /// Monthly price
        #[arg(long)]
        price: Option<f64>,

        /// e.g. "Unlimited" or "500 GB"
        #[arg(long)]
        data_limit: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  INVOICES
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct InvoicesArgs {
    #[command(subcommand)]
    pub command: InvoicesCommand,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum InvoiceStatusFilter {
    Paid,
    Due,
    Overdue,
}

#[derive(Debug, Subcommand)]
pub enum InvoicesCommand {
    /// List invoices
    #[command(alias = "ls")]
    List {
        #[arg(long)]
        status: Option<InvoiceStatusFilter>,
    },

    /// Issue an invoice
    Create {
        /// Customer ID
        customer: String,

        amount: f64,

        /// Issue date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        issue_date: Option<String>,
    },

    /// Mark an invoice as paid
    Pay {
        /// Invoice ID
        invoice: String,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  DASHBOARD
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct DashboardArgs {
    /// Skip the AI insight call
    #[arg(long)]
    pub no_insights: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the effective configuration (secrets masked)
    Show,

    /// Print the config and state file locations
    Path,

    /// Store the admin password in the system keyring
    SetPassword,

    /// Store the Gemini API key in the system keyring
    SetInsightsKey,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  COMPLETIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
