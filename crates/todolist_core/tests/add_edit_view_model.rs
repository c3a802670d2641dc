use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedReceiver;
use todolist_core::db::Table;
use todolist_core::{
    AddEditEvent, Category, CategoryRef, ChecklistItem, CoreConfig, Priority, Task, TodoApp,
    UiEvent,
};

const STEP: Duration = Duration::from_secs(2);

fn open_app() -> TodoApp {
    TodoApp::open(&CoreConfig::in_memory(), Handle::current()).unwrap()
}

async fn saved_category(app: &TodoApp, name: &str) -> Category {
    let mut category = Category::new(name, "");
    category.id = app.category_repository().insert(&category).await.unwrap();
    category
}

async fn next_event(events: &mut UnboundedReceiver<UiEvent>) -> UiEvent {
    tokio::time::timeout(STEP, events.recv()).await.unwrap().unwrap()
}

#[tokio::test]
async fn new_form_preselects_first_category_by_name() {
    let app = open_app();
    saved_category(&app, "Work").await;
    let errands = saved_category(&app, "Errands").await;

    let vm = app.add_edit_view_model(None).await.unwrap();
    let form = vm.form();
    assert_eq!(vm.task_id(), None);
    assert_eq!(form.categories.len(), 2);
    assert_eq!(form.selected_category, Some(errands));
    assert_eq!(form.priority, Priority::Low);
    assert!(form.title.is_empty());
}

#[tokio::test]
async fn blank_title_shows_required_message_and_writes_nothing() {
    let app = open_app();
    saved_category(&app, "Work").await;
    let vm = app.add_edit_view_model(None).await.unwrap();
    let mut events = vm.take_ui_events().unwrap();

    vm.on_event(AddEditEvent::TitleChanged("  ".to_string()));
    vm.on_event(AddEditEvent::Save).unwrap().await.unwrap();

    assert_eq!(
        next_event(&mut events).await,
        UiEvent::ShowMessage("Title and category are required.".to_string())
    );
    assert_eq!(app.store().versions().get(Table::Tasks), 0);
}

#[tokio::test]
async fn missing_category_shows_required_message() {
    let app = open_app();
    let vm = app.add_edit_view_model(None).await.unwrap();
    let mut events = vm.take_ui_events().unwrap();
    assert_eq!(vm.form().selected_category, None);

    vm.on_event(AddEditEvent::TitleChanged("Plan trip".to_string()));
    vm.on_event(AddEditEvent::Save).unwrap().await.unwrap();

    assert!(matches!(next_event(&mut events).await, UiEvent::ShowMessage(_)));
}

#[tokio::test]
async fn saving_a_new_task_persists_every_field_and_pops_back() {
    let app = open_app();
    let work = saved_category(&app, "Work").await;
    let home = saved_category(&app, "Home").await;
    let vm = app.add_edit_view_model(None).await.unwrap();
    let mut events = vm.take_ui_events().unwrap();

    for event in [
        AddEditEvent::TitleChanged("Quarterly report".to_string()),
        AddEditEvent::DescriptionChanged("   ".to_string()),
        AddEditEvent::CategoryChanged(work.clone()),
        AddEditEvent::PriorityChanged(Priority::High),
        AddEditEvent::AddChecklistItem,
        AddEditEvent::ChecklistItemTextChanged {
            index: 0,
            text: "collect numbers".to_string(),
        },
        AddEditEvent::AddChecklistItem,
        AddEditEvent::ChecklistItemTextChanged {
            index: 1,
            text: "draft".to_string(),
        },
        AddEditEvent::ChecklistItemCheckedChanged {
            index: 1,
            is_checked: true,
        },
        AddEditEvent::ChecklistItemCheckedChanged {
            index: 9,
            is_checked: true,
        },
    ] {
        assert!(vm.on_event(event).is_none());
    }
    assert_ne!(vm.form().selected_category, Some(home));

    vm.on_event(AddEditEvent::Save).unwrap().await.unwrap();
    assert_eq!(next_event(&mut events).await, UiEvent::PopBack);

    let stored = app.store().query_all_tasks_with_category().unwrap();
    assert_eq!(stored.len(), 1);
    let task = app
        .todo_repository()
        .get_by_id(stored[0].task.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(task.title, "Quarterly report");
    assert_eq!(task.description, None);
    assert_eq!(task.priority, Priority::High);
    assert_eq!(task.category, CategoryRef::Resolved(work));
    assert_eq!(
        task.checklist,
        vec![
            ChecklistItem::new("collect numbers", false),
            ChecklistItem::new("draft", true),
        ]
    );
    assert!(!task.is_completed);
}

#[tokio::test]
async fn editing_keeps_completion_and_updates_in_place() {
    let app = open_app();
    let home = saved_category(&app, "Home").await;
    let mut original = Task::new("Paint fence", home.clone()).with_completed(true);
    original.checklist = vec![ChecklistItem::new("buy paint", true)];
    original.id = app.todo_repository().insert(&original).await.unwrap();

    let vm = app.add_edit_view_model(Some(original.id)).await.unwrap();
    let form = vm.form();
    assert_eq!(form.title, "Paint fence");
    assert_eq!(form.selected_category, Some(home));
    assert_eq!(form.checklist, original.checklist);

    let mut events = vm.take_ui_events().unwrap();
    vm.on_event(AddEditEvent::TitleChanged("Paint shed".to_string()));
    vm.on_event(AddEditEvent::DeleteChecklistItem(0));
    vm.on_event(AddEditEvent::Save).unwrap().await.unwrap();
    assert_eq!(next_event(&mut events).await, UiEvent::PopBack);

    let stored = app
        .todo_repository()
        .get_by_id(original.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.title, "Paint shed");
    assert!(stored.is_completed);
    assert!(stored.checklist.is_empty());
    assert_eq!(app.store().query_all_tasks_with_category().unwrap().len(), 1);
}

#[tokio::test]
async fn dangling_category_loads_without_selection() {
    let app = open_app();
    let gone = saved_category(&app, "Gone").await;
    let id = app
        .todo_repository()
        .insert(&Task::new("Orphan", gone.clone()))
        .await
        .unwrap();
    app.category_repository().delete(&gone).await.unwrap();

    let vm = app.add_edit_view_model(Some(id)).await.unwrap();
    let form = vm.form();
    assert_eq!(form.title, "Orphan");
    assert_eq!(form.selected_category, None);
    assert!(form.categories.is_empty());
}

#[tokio::test]
async fn unknown_task_id_yields_an_empty_form() {
    let app = open_app();
    saved_category(&app, "Work").await;

    let vm = app.add_edit_view_model(Some(999)).await.unwrap();
    assert_eq!(vm.task_id(), Some(999));
    assert!(vm.form().title.is_empty());
    assert_eq!(vm.form().selected_category, None);
}

#[tokio::test]
async fn out_of_range_checklist_edits_leave_the_checklist_alone() {
    let app = open_app();
    saved_category(&app, "Work").await;
    let vm = app.add_edit_view_model(None).await.unwrap();

    vm.on_event(AddEditEvent::AddChecklistItem);
    vm.on_event(AddEditEvent::ChecklistItemTextChanged {
        index: 0,
        text: "outline".to_string(),
    });
    let before = vm.form().checklist;

    for event in [
        AddEditEvent::DeleteChecklistItem(1),
        AddEditEvent::DeleteChecklistItem(usize::MAX),
        AddEditEvent::ChecklistItemTextChanged {
            index: 1,
            text: "ignored".to_string(),
        },
        AddEditEvent::ChecklistItemTextChanged {
            index: 42,
            text: "ignored".to_string(),
        },
        AddEditEvent::ChecklistItemCheckedChanged {
            index: 3,
            is_checked: true,
        },
    ] {
        assert!(vm.on_event(event).is_none());
    }
    assert_eq!(vm.form().checklist, before);
    assert_eq!(before, vec![ChecklistItem::new("outline", false)]);

    vm.on_event(AddEditEvent::DeleteChecklistItem(0));
    vm.on_event(AddEditEvent::DeleteChecklistItem(0));
    assert!(vm.form().checklist.is_empty());
}
