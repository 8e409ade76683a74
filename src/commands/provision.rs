//! Command: apply what changed since the last run.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{GlobalOpts, ProvisionOpts};
use crate::logging::Logger;
use crate::tasks::ApplyOptions;
use crate::tasks::provision::{self, ProvisionReport};

use super::version::version;
use super::{CommandSetup, finish};

impl From<&ProvisionOpts> for ApplyOptions {
    fn from(opts: &ProvisionOpts) -> Self {
        Self {
            links: !opts.no_links,
            commands: !opts.no_commands,
            parents: opts.parents,
            clobber: opts.clobber,
        }
    }
}

/// Run the provision command.
///
/// # Errors
///
/// Returns an error if the declaration cannot be loaded, a link or command
/// fails, or the snapshot cannot be written.
pub fn run(global: &GlobalOpts, opts: &ProvisionOpts, log: &Arc<Logger>) -> Result<()> {
    log.debug(&format!("alter {}", version()));

    let mut setup = CommandSetup::init(global, log)?;
    let ctx = setup
        .context(log, global.dry_run)
        .with_options(ApplyOptions::from(opts));

    let result = provision::provision(&mut setup.machine, &ctx, &setup.store, &opts.only)
        .map(|report| describe(&report, log));
    finish(result.map_err(Into::into), log)
}

fn describe(report: &ProvisionReport, log: &Logger) {
    let (clean, renamed, new, modified) = report.counts();
    log.debug(&format!(
        "{new} new, {modified} modified, {renamed} renamed, {clean} unchanged"
    ));
    if report.applied.disabled > 0 {
        log.warn(&format!(
            "{} queued entries were not applied because their kind is disabled",
            report.applied.disabled
        ));
    }
    if report.snapshot_written {
        log.debug("snapshot updated");
    }
}
