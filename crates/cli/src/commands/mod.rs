mod account;
mod drafts;
mod run;
mod watch;

use crate::cli::{Cli, Commands, WatchAction};
use crate::context::CommandContext;

pub async fn dispatch(cli: Cli) -> anyhow::Result<()> {
	let ctx = CommandContext::load(cli.config, cli.format)?;
	match cli.command {
		Commands::Login => account::login(&ctx).await,
		Commands::Accounts => account::accounts(&ctx).await,
		Commands::Switch { row_key } => account::switch(&ctx, &row_key).await,
		Commands::Drafts => drafts::list(&ctx).await,
		Commands::Watch { action } => match action {
			WatchAction::Add {
				created,
				max_mile,
				targets,
			} => watch::add(&ctx, &created, max_mile, &targets).await,
			WatchAction::Remove { created } => watch::remove(&ctx, &created),
			WatchAction::Set {
				created,
				max_mile,
				targets,
			} => watch::set(&ctx, &created, max_mile, &targets),
			WatchAction::List => watch::list(&ctx),
		},
		Commands::Logs { limit } => watch::logs(&ctx, limit),
		Commands::Run => run::once(&ctx).await,
		Commands::Start => run::start(&ctx).await,
	}
}
