//! Command: remove declared links and forget the snapshot.
use std::sync::Arc;

use anyhow::Result;

use crate::cli::{CleanOpts, GlobalOpts};
use crate::logging::Logger;
use crate::tasks::clean;

use super::{CommandSetup, finish};

/// Run the clean command.
///
/// # Errors
///
/// Returns an error if the declaration cannot be loaded, a link cannot be
/// removed, or the snapshot cannot be rewritten.
pub fn run(global: &GlobalOpts, opts: &CleanOpts, log: &Arc<Logger>) -> Result<()> {
    let setup = CommandSetup::init(global, log)?;
    let ctx = setup.context(log, global.dry_run);

    let result = clean::clean(&setup.machine, &ctx, &setup.store, &opts.only).map(|report| {
        log.debug(&format!(
            "{} links removed, {} left alone",
            report.removed, report.skipped
        ));
        if report.snapshot_cleared {
            log.info("snapshot cleared; the next provision re-applies the cleaned tasks");
        }
    });
    finish(result.map_err(Into::into), log)
}
