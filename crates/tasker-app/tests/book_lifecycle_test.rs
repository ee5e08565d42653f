//! End-to-end checks of quick-add, queries, cascades and persistence.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use tasker_app::{
    ExportOptions, StateFile, TaskBook, TaskFilterBuilder, TaskService, TaskUpdate, to_markdown,
};
use tasker_core::id::TODAY;
use tasker_core::{ListId, ListSelection, Priority, SortDirection, SortField, SortOptions, TagId};
use tempfile::TempDir;
use time::OffsetDateTime;
use time::macros::datetime;

const NOW: OffsetDateTime = datetime!(2025-03-10 09:00 +01:00);

fn titles(book: &TaskBook) -> Vec<String> {
    book.visible(NOW).iter().map(|task| task.title.clone()).collect()
}

#[test]
fn today_view_mixes_stored_and_due_today_tasks() {
    let mut book = TaskBook::with_defaults(NOW);
    book.add_list("Work", None, None, NOW).unwrap();
    book.select_list(ListSelection::All).unwrap();

    let mut service = TaskService::new(&mut book, ListId::inbox());
    service.quick_add("Standup notes ~work @today", NOW).unwrap();
    service.quick_add("Quarterly plan ~work @next week", NOW).unwrap();
    service.quick_add("Water plants ~today", NOW).unwrap();

    book.select_list(ListSelection::List(ListId::from(TODAY))).unwrap();
    assert_eq!(titles(&book), vec!["Standup notes", "Water plants"]);
}

#[test]
fn priority_sort_and_filters_compose() {
    let mut book = TaskBook::with_defaults(NOW);
    let mut service = TaskService::new(&mut book, ListId::inbox());
    for line in ["Low one !low", "High one !high #work", "Plain one", "Medium one !2 #work"] {
        service.quick_add(line, NOW).unwrap();
    }

    book.set_sort(SortOptions {
        field: SortField::Priority,
        direction: SortDirection::Asc,
    });
    assert_eq!(titles(&book), vec!["Plain one", "Low one", "Medium one", "High one"]);

    book.set_sort(SortOptions {
        field: SortField::Priority,
        direction: SortDirection::Desc,
    });
    assert_eq!(titles(&book), vec!["High one", "Medium one", "Low one", "Plain one"]);

    let filter = TaskFilterBuilder::new()
        .with_tag_names(&["work".to_owned()], book.tags())
        .unwrap()
        .with_priority(Some("high"))
        .unwrap()
        .build();
    book.set_filter(filter);
    assert_eq!(titles(&book), vec!["High one"]);
}

#[test]
fn state_survives_save_and_reload() {
    let dir = TempDir::with_prefix("tasker-state-").unwrap();
    let file = StateFile::new(dir.path().join("state.json"));

    let mut book = file.load(NOW).unwrap();
    let errands = book.add_list("Errands", Some("#ff0000".into()), None, NOW).unwrap();
    let mut service = TaskService::new(&mut book, ListId::inbox());
    let parent = service.quick_add("Groceries ~errands #shopping !medium", NOW).unwrap().task;
    service.add_subtask(parent, "Milk", NOW).unwrap();
    book.select_list(ListSelection::List(errands.clone())).unwrap();
    book.toggle_theme();
    file.save(&book).unwrap();

    let mut reloaded = file.load(NOW).unwrap();
    let task = reloaded.task(parent).unwrap();
    assert_eq!(task.priority, Priority::Medium);
    assert_eq!(task.list, errands);
    assert_eq!(reloaded.subtasks_of(parent).len(), 1);
    assert_eq!(reloaded.app(), book.app());
    assert!(reloaded.find_tag_by_name("shopping").is_some());

    // Deleting the list re-homes both the task and its subtask.
    assert_eq!(reloaded.delete_list(&errands, NOW).unwrap(), 2);
    assert_eq!(reloaded.app().selected_list, ListSelection::List(ListId::inbox()));
    assert!(reloaded.tasks().all(|task| task.list == ListId::inbox()));

    let shopping = reloaded.find_tag_by_name("shopping").unwrap().id.clone();
    reloaded.delete_tag(&shopping, NOW).unwrap();
    assert!(reloaded.tasks().all(|task| !task.has_tag(&shopping)));
    file.save(&reloaded).unwrap();

    let markdown = to_markdown(&file.load(NOW).unwrap(), &ExportOptions::default(), NOW);
    assert!(markdown.contains("| ⬜ | Groceries | 🟡 medium |  | Inbox |  |"));
    assert!(markdown.contains("| ⬜ | ↳ Milk |  |  | Inbox |  |"));
}

#[test]
fn editing_parent_list_moves_subtasks() {
    let mut book = TaskBook::with_defaults(NOW);
    let home = book.add_list("Home", None, None, NOW).unwrap();
    let mut service = TaskService::new(&mut book, ListId::inbox());
    let parent = service.quick_add("Spring cleaning", NOW).unwrap().task;
    let child = service.add_subtask(parent, "Windows", NOW).unwrap();

    let task = book.task(parent).unwrap();
    let update = TaskUpdate {
        list: Some(home.clone()),
        ..TaskUpdate::default()
    }
    .with_tags(task, &[TagId::from("personal")]);
    book.update_task(parent, &update, NOW).unwrap();

    assert_eq!(book.task(child).unwrap().list, home);
    assert_eq!(book.task(parent).unwrap().tags, vec![TagId::from("personal")]);
}
