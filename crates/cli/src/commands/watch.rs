use anyhow::{anyhow, bail};
use draftwatch::extract::find_by_created;
use draftwatch::{auth, list_drafts};

use crate::context::CommandContext;
use crate::output::{emit, logs_text, watch_items_text};

/// Looks the draft up on the live site so the item records its account and origin.
pub async fn add(ctx: &CommandContext, created: &str, max_mile: Option<u32>, targets: &[String]) -> anyhow::Result<()> {
	let mut watcher = ctx.online_watcher()?;
	auth::login(watcher.session_mut()).await?;
	let drafts = list_drafts(watcher.session_mut()).await?;
	let draft = find_by_created(&drafts, created).ok_or_else(|| anyhow!("no draft created {created:?} in the active account"))?;

	if !watcher.add(draft, max_mile, targets)? {
		bail!("{created:?} is already watched");
	}
	let items = watcher.list()?;
	let global = ctx.config.mile_threshold;
	emit(ctx.format, &items, |items| watch_items_text(items, global))
}

pub fn remove(ctx: &CommandContext, created: &str) -> anyhow::Result<()> {
	let mut watcher = ctx.offline_watcher()?;
	if !watcher.remove(created)? {
		bail!("{created:?} is not watched");
	}
	list(ctx)
}

pub fn set(ctx: &CommandContext, created: &str, max_mile: Option<u32>, targets: &[String]) -> anyhow::Result<()> {
	let mut watcher = ctx.offline_watcher()?;
	let item = watcher.update_settings(created, max_mile, targets)?;
	let global = ctx.config.mile_threshold;
	emit(ctx.format, &item, |item| watch_items_text(std::slice::from_ref(item), global))
}

pub fn list(ctx: &CommandContext) -> anyhow::Result<()> {
	let watcher = ctx.offline_watcher()?;
	let items = watcher.list()?;
	let global = ctx.config.mile_threshold;
	emit(ctx.format, &items, |items| watch_items_text(items, global))
}

pub fn logs(ctx: &CommandContext, limit: usize) -> anyhow::Result<()> {
	let watcher = ctx.offline_watcher()?;
	let entries = watcher.recent_logs(limit)?;
	emit(ctx.format, &entries, |e| logs_text(e))
}
