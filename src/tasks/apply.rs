//! Applying queued links and commands.
use crate::error::ResourceError;
use crate::machine::Task;
use crate::resources::Applicable;
use crate::resources::command::CommandResource;
use crate::resources::symlink::SymlinkResource;

use super::Context;

/// Side effects performed (or previewed, in a dry run) for one task.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Links created or replaced.
    pub links_created: usize,
    /// Commands executed.
    pub commands_run: usize,
    /// Queued entries left alone because their kind is disabled.
    pub disabled: usize,
}

impl ApplyReport {
    /// Fold another report into this one.
    pub const fn add(&mut self, other: Self) {
        self.links_created += other.links_created;
        self.commands_run += other.commands_run;
        self.disabled += other.disabled;
    }
}

/// Apply the queued links, then the queued commands, of `task`.
///
/// Stops at the first failure; nothing already applied is undone.
///
/// # Errors
///
/// Returns the [`ResourceError`] of the first link or command that failed.
pub fn apply_task(task: &Task, ctx: &Context) -> Result<ApplyReport, ResourceError> {
    let mut report = ApplyReport::default();

    for link in task.links.iter().filter(|l| l.queued) {
        let resource = SymlinkResource::from_link(link, ctx.options.link_options());
        if !ctx.options.links {
            ctx.log
                .debug(&format!("links disabled, not linking {}", resource.description()));
            report.disabled += 1;
            continue;
        }
        if ctx.dry_run {
            ctx.log.dry_run(&format!("would link {}", resource.description()));
        } else {
            resource.apply()?;
            ctx.log.info(&format!("linked {}", resource.description()));
        }
        report.links_created += 1;
    }

    for command in task.commands.iter().filter(|c| c.queued) {
        let resource =
            CommandResource::new(&command.text, &ctx.root, &ctx.environment, ctx.executor.as_ref());
        if !ctx.options.commands {
            ctx.log
                .debug(&format!("commands disabled, not running {}", resource.description()));
            report.disabled += 1;
            continue;
        }
        if ctx.dry_run {
            ctx.log.dry_run(&format!("would run {}", resource.description()));
        } else {
            ctx.log.info(&resource.description());
            resource.apply()?;
        }
        report.commands_run += 1;
    }

    Ok(report)
}
