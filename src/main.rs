use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use serde_json::Value;
use std::path::PathBuf;
use std::time::Duration;

use zdesk::cache::{CacheLayer, CacheStorage, NoopStorage, SqliteStorage};
use zdesk::config::Config;
use zdesk::logging;
use zdesk::zendesk::{
  DownloadOutcome, ReqwestTransport, RequestExecutor, SearchParams, SortOrder, ZendeskClient,
};

type Client = ZendeskClient<ReqwestTransport, Box<dyn CacheStorage>>;

#[derive(Parser, Debug)]
#[command(name = "zdesk")]
#[command(about = "A rate-limit-aware command line client for Zendesk")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/zdesk/config.yaml)
  #[arg(short, long)]
  config: Option<PathBuf>,

  /// Bypass the cache for reads and writes
  #[arg(long, global = true)]
  no_cache: bool,

  /// Increase log verbosity (-v info, -vv debug, -vvv trace)
  #[arg(short, long, action = clap::ArgAction::Count, global = true)]
  verbose: u8,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Show a ticket
  Ticket { id: u64 },
  /// Show several tickets
  Tickets {
    #[arg(required = true)]
    ids: Vec<u64>,
  },
  /// List the comments of a ticket
  Comments { ticket_id: u64 },
  /// Show an organization
  Organization { id: u64 },
  /// Show several organizations
  Organizations {
    #[arg(required = true)]
    ids: Vec<u64>,
  },
  /// List the users of an organization
  OrganizationUsers { id: u64 },
  /// Show a user
  User { id: u64 },
  /// Show several users
  Users {
    #[arg(required = true)]
    ids: Vec<u64>,
  },
  /// Run a search query
  Search {
    query: String,
    #[arg(long, default_value = "updated_at")]
    sort_by: String,
    #[arg(long, default_value = "desc")]
    sort_order: SortOrder,
    /// Stop after the page that reaches this many results
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Update an organization with a JSON object of fields
  UpdateOrganization {
    id: u64,
    #[arg(long)]
    json: String,
  },
  /// Update a user with a JSON object of fields
  UpdateUser {
    id: u64,
    #[arg(long)]
    json: String,
  },
  /// Update a ticket with a JSON object of fields
  UpdateTicket {
    id: u64,
    #[arg(long)]
    json: String,
  },
  /// Download all attachments of a ticket
  Attachments {
    ticket_id: u64,
    /// Target directory (default: attachments_dir from config)
    #[arg(long)]
    dir: Option<PathBuf>,
    /// Download even if the file already exists
    #[arg(long)]
    force: bool,
  },
}

fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _guard = logging::init(args.verbose, config.log_file.as_deref())?;

  let client = build_client(&config)?;
  run(&client, &config, args.command, args.no_cache)
}

fn build_client(config: &Config) -> Result<Client> {
  let transport = ReqwestTransport::new(Duration::from_secs(config.zendesk.timeout_secs))?;
  let executor = RequestExecutor::new(transport, &config.zendesk.url, config.credentials()?)
    .with_policy(config.retry.policy());

  let storage: Box<dyn CacheStorage> = if config.cache.enabled {
    let storage = match &config.cache.path {
      Some(path) => SqliteStorage::open(path)?,
      None => SqliteStorage::open_default()?,
    };
    match config.cache.max_age()? {
      Some(max_age) => Box::new(storage.with_max_age(max_age)),
      None => Box::new(storage),
    }
  } else {
    Box::new(NoopStorage)
  };

  Ok(ZendeskClient::new(executor, CacheLayer::new(storage)))
}

fn run(client: &Client, config: &Config, command: Command, no_cache: bool) -> Result<()> {
  match command {
    Command::Ticket { id } => print_json(&client.get_ticket(id, no_cache)?),
    Command::Tickets { ids } => print_json(&client.get_tickets(&ids)?),
    Command::Comments { ticket_id } => print_json(&client.get_ticket_comments(ticket_id, no_cache)?),
    Command::Organization { id } => print_json(&client.get_organization(id, no_cache)?),
    Command::Organizations { ids } => print_json(&client.get_organizations(&ids)?),
    Command::OrganizationUsers { id } => {
      print_json(&client.get_organization_users(id, no_cache)?)
    }
    Command::User { id } => print_json(&client.get_user(id, no_cache)?),
    Command::Users { ids } => print_json(&client.get_users(&ids)?),
    Command::Search {
      query,
      sort_by,
      sort_order,
      limit,
    } => {
      let mut params = SearchParams::new(query)
        .with_sort_by(sort_by)
        .with_sort_order(sort_order);
      if let Some(limit) = limit {
        params = params.with_size_limit(limit);
      }
      print_json(&client.search(&params, no_cache)?)
    }
    Command::UpdateOrganization { id, json } => {
      print_json(&client.update_organization(id, &parse_fields(&json)?, no_cache)?)
    }
    Command::UpdateUser { id, json } => {
      print_json(&client.update_user(id, &parse_fields(&json)?, no_cache)?)
    }
    Command::UpdateTicket { id, json } => {
      print_json(&client.update_ticket(id, &parse_fields(&json)?, no_cache)?)
    }
    Command::Attachments {
      ticket_id,
      dir,
      force,
    } => {
      let dir = dir.unwrap_or_else(|| config.attachments_dir.clone());
      let outcomes = client.download_ticket_attachments(ticket_id, &dir, force, no_cache)?;
      for outcome in &outcomes {
        match outcome {
          DownloadOutcome::Downloaded { path, bytes } => {
            println!("downloaded {} ({} bytes)", path.display(), bytes)
          }
          DownloadOutcome::Skipped { path } => println!("skipped {}", path.display()),
        }
      }
      Ok(())
    }
  }
}

fn parse_fields(json: &str) -> Result<Value> {
  serde_json::from_str(json).map_err(|e| eyre!("--json is not valid JSON: {}", e))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}
