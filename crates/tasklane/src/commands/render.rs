use std::io::{self, Write};

use tasklane_core::{Group, GroupId, Task, format_date_display};

pub fn task_table<W: Write>(out: &mut W, tasks: &[Task], groups: &[Group]) -> io::Result<()> {
    writeln!(out, "ID | Done | Priority | Title | Group | Start | End | Created")?;
    writeln!(out, "-- | ---- | -------- | ----- | ----- | ----- | --- | -------")?;

    for task in tasks {
        let done = if task.completed { "[x]" } else { "[ ]" };
        let group = groups
            .iter()
            .find(|g| g.id == task.group_id)
            .map_or_else(|| task.group_id.to_string(), |g| g.name.clone());
        writeln!(
            out,
            "{} | {} | {} | {} | {} | {} | {} | {}",
            task.id,
            done,
            task.priority,
            task.title,
            group,
            or_dash(format_date_display(&task.start_date)),
            or_dash(format_date_display(&task.end_date)),
            or_dash(format_date_display(&task.created_at)),
        )?;
    }
    Ok(())
}

pub fn group_list<W: Write>(out: &mut W, groups: &[Group], selected: GroupId) -> io::Result<()> {
    for group in groups {
        let marker = if group.id == selected { '*' } else { ' ' };
        writeln!(out, "{marker} {} | {} | {}", group.id, group.name, group.color)?;
    }
    Ok(())
}

fn or_dash(value: String) -> String {
    if value.is_empty() { "-".to_owned() } else { value }
}
