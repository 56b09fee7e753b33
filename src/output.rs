use crate::model::{Task, User};

pub fn format_task_detail(task: &Task) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:          {}\n", task.id));
    out.push_str(&format!("Name:        {}\n", task.name));
    out.push_str(&format!("Status:      {}\n", task.status));
    if let Some(ref description) = task.description {
        out.push_str(&format!("Description: {}\n", description));
    }
    if let Some(ref due) = task.due_date {
        out.push_str(&format!("Due:         {}\n", due));
    }
    if let Some(priority) = task.priority {
        out.push_str(&format!("Priority:    {}\n", priority));
    }
    if let Some(ref subject) = task.subject_id {
        out.push_str(&format!("Subject:     {}\n", subject));
    }
    if let Some(updated_at) = task.updated_at {
        out.push_str(&format!("Updated:     {}\n", updated_at));
    }
    out
}

pub fn format_task_list(tasks: &[Task]) -> String {
    let mut out = String::new();
    for task in tasks {
        let priority = task
            .priority
            .map(|p| format!(" [{p}]"))
            .unwrap_or_default();
        let due = task
            .due_date
            .as_ref()
            .map(|d| format!(" (due {d})"))
            .unwrap_or_default();
        out.push_str(&format!(
            "{} #{} {}{}{}\n",
            task.status.icon(),
            task.id,
            task.name,
            priority,
            due
        ));
    }
    out
}

pub fn format_user_list(users: &[User]) -> String {
    let mut out = String::new();
    for user in users {
        out.push_str(&format!("#{} {} <{}>\n", user.id, user.name, user.email));
    }
    out
}
