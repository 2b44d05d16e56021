use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "draftwatch")]
#[command(about = "Watch draft shipments and act on nearby fulfillment options")]
#[command(version)]
pub struct Cli {
	/// Increase verbosity (-v info, -vv debug)
	#[arg(short, long, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	/// Config file (defaults to <config_dir>/draftwatch/config.json)
	#[arg(long, global = true, value_name = "FILE")]
	pub config: Option<PathBuf>,

	/// Output format
	#[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Text)]
	pub format: OutputFormat,

	#[command(subcommand)]
	pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
	/// Log in and show the active account
	Login,

	/// List the accounts selectable from the store menu
	Accounts,

	/// Make another account active
	Switch {
		/// Row key from `accounts`
		row_key: String,
	},

	/// List draft shipments of the active account
	Drafts,

	/// Manage the watch-list
	Watch {
		#[command(subcommand)]
		action: WatchAction,
	},

	/// Show recent log entries, newest first
	Logs {
		#[arg(short, long, default_value_t = 20)]
		limit: usize,
	},

	/// Run one pass over the watch-list now
	Run,

	/// Run passes on the configured trigger until Ctrl-C
	Start,
}

#[derive(Subcommand, Debug)]
pub enum WatchAction {
	/// Watch the draft created at <CREATED>
	Add {
		created: String,
		/// Mile limit for this draft (defaults to the global threshold)
		#[arg(long)]
		max_mile: Option<u32>,
		/// Warehouse codes that end tracking when they appear
		#[arg(long, value_delimiter = ',')]
		targets: Vec<String>,
	},

	/// Stop watching a draft
	#[command(alias = "rm")]
	Remove { created: String },

	/// Replace the mile limit and targets of a watched draft
	Set {
		created: String,
		#[arg(long)]
		max_mile: Option<u32>,
		#[arg(long, value_delimiter = ',')]
		targets: Vec<String>,
	},

	/// Show watched drafts
	#[command(alias = "ls")]
	List,
}
