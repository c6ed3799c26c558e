use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tasklane_app::{
    AppConfig, AsyncKeyValueStore, GroupCatalog, GroupRegistry, HttpTaskApi, RemoteTaskApi,
    TaskCache, TaskSyncService,
};
use tasklane_core::{
    DEFAULT_COLORS, GroupId, GroupInput, TaskDraft, TaskFilter, TaskId, TaskPatch,
};
use tasklane_store::FileStore;
use tracing::debug;

use crate::{Command, GroupCommand, LsFormat};

mod render;

/// Services wired from configuration for one CLI invocation.
pub struct App {
    pub service: TaskSyncService<HttpTaskApi, Arc<FileStore>>,
    pub groups: GroupRegistry<Arc<FileStore>>,
}

impl App {
    /// Build the HTTP client, open the data directory and restore the group registry.
    pub async fn open(config: &AppConfig) -> Result<Self> {
        let data_dir = config.data_dir()?;
        let store = Arc::new(
            FileStore::open(&data_dir)
                .with_context(|| format!("failed to open data directory {}", data_dir.display()))?,
        );
        let remote = HttpTaskApi::new(&config.api.base_url, config.api.timeout())?;
        let cache = TaskCache::new(Arc::clone(&store)).with_freshness(config.cache.freshness());
        let groups = GroupRegistry::load(store).await;
        debug!(data_dir = %data_dir.display(), "Opened tasklane data");
        Ok(Self {
            service: TaskSyncService::new(remote, cache),
            groups,
        })
    }
}

#[allow(clippy::too_many_lines)]
pub async fn run<R, S, G, W>(
    command: Command,
    service: &TaskSyncService<R, S>,
    groups: &mut G,
    out: &mut W,
) -> Result<()>
where
    R: RemoteTaskApi,
    S: AsyncKeyValueStore,
    G: GroupCatalog,
    W: Write,
{
    match command {
        Command::Ls {
            group,
            search,
            done,
            open,
            priorities,
            format,
        } => {
            let completed = match (done, open) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            let mut filter = TaskFilter::default()
                .with_completed(completed)
                .with_tiers(priorities)
                .with_text(search.as_deref());
            if let Some(group) = group {
                filter = filter.in_group(GroupId(group));
            }
            let filter_empty = filter.is_empty();
            let tasks = service.list_filtered(&filter).await?;

            if tasks.is_empty() {
                if filter_empty {
                    writeln!(out, "No tasks found")?;
                } else {
                    writeln!(out, "No tasks matched the provided filters")?;
                }
                return Ok(());
            }
            match format {
                LsFormat::Table => render::task_table(out, &tasks, groups.groups())?,
                LsFormat::Json => writeln!(out, "{}", serde_json::to_string_pretty(&tasks)?)?,
            }
        }
        Command::New {
            title,
            description,
            start,
            end,
            tags,
            priority,
            group,
        } => {
            let group_id = match group {
                Some(raw) => existing_group(groups, raw)?,
                None => groups.selected_group().id,
            };
            let mut draft = TaskDraft::new(title, group_id);
            if let Some(tier) = priority {
                draft = draft.with_tier(tier);
            }
            draft.description = description.unwrap_or_default();
            draft.start_date = start.unwrap_or_default();
            draft.end_date = end.unwrap_or_default();
            draft.tags = tags.unwrap_or_default();

            let task = service.create(&draft).await?;
            writeln!(out, "created task: {} ({})", task.id, task.title)?;
        }
        Command::Edit {
            task,
            title,
            description,
            start,
            end,
            tags,
            priority,
            group,
        } => {
            let group_id = group.map(|raw| existing_group(groups, raw)).transpose()?;
            let mut patch = TaskPatch {
                title,
                description,
                start_date: start,
                end_date: end,
                tags,
                group_id,
                ..TaskPatch::default()
            };
            if let Some(tier) = priority {
                patch = patch.tier(tier);
            }
            if patch.is_empty() {
                bail!("nothing to update; pass at least one field");
            }
            let task = service.update(&TaskId::new(task), &patch).await?;
            writeln!(out, "updated task: {} ({})", task.id, task.title)?;
        }
        Command::Done { task, undo } => {
            let task = service.toggle_completion(&TaskId::new(task), !undo).await?;
            let state = if task.completed { "done" } else { "open" };
            writeln!(out, "{state}: {} ({})", task.id, task.title)?;
        }
        Command::Rm { task } => {
            let id = TaskId::new(task);
            service.delete(&id).await?;
            writeln!(out, "deleted task: {id}")?;
        }
        Command::Group { action } => run_group(action, groups, out).await?,
    }

    Ok(())
}

async fn run_group<G: GroupCatalog, W: Write>(
    action: GroupCommand,
    groups: &mut G,
    out: &mut W,
) -> Result<()> {
    match action {
        GroupCommand::Ls => render::group_list(out, groups.groups(), groups.selected_group().id)?,
        GroupCommand::Add { name, color } => {
            let color = color.unwrap_or_else(|| DEFAULT_COLORS[0].to_owned());
            let group = groups.add_group(GroupInput::new(name, color)).await?;
            writeln!(out, "created group: {} ({})", group.id, group.name)?;
        }
        GroupCommand::Edit { id, name, color } => {
            let group = groups
                .edit_group(GroupId(id), GroupInput::new(name, color))
                .await?;
            writeln!(out, "updated group: {} ({})", group.id, group.name)?;
        }
        GroupCommand::Rm { id } => {
            groups.delete_group(GroupId(id)).await?;
            let selected = groups.selected_group();
            writeln!(out, "deleted group: {id}; selected: {} ({})", selected.id, selected.name)?;
        }
        GroupCommand::Select { id } => {
            groups.select_group(GroupId(id)).await?;
            writeln!(out, "selected group: {}", groups.selected_group().name)?;
        }
    }
    Ok(())
}

fn existing_group<G: GroupCatalog>(groups: &G, raw: u64) -> Result<GroupId> {
    let id = GroupId(raw);
    if groups.group(id).is_none() {
        bail!("group {id} does not exist");
    }
    Ok(id)
}
