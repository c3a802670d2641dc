//! Add/edit task form state.
//!
//! # Responsibility
//! - Load the form once (categories plus the edited task, if any).
//! - Apply field edits synchronously and save through the repository.
//!
//! # Invariants
//! - Nothing is written while the title is blank or no category is selected.
//! - Saving an existing task keeps the completion flag currently stored.

use crate::model::category::Category;
use crate::model::task::{CategoryRef, ChecklistItem, Priority, Task, TaskId};
use crate::presentation::ui_event::{UiEvent, UiEventChannel};
use crate::presentation::{REQUIRED_FIELDS_MESSAGE, STORAGE_ERROR_MESSAGE};
use crate::repo::category_repo::CategoryRepository;
use crate::repo::task_repo::TodoRepository;
use crate::repo::{RepoError, RepoResult};
use futures::StreamExt;
use log::{error, info, warn};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Editable snapshot shown by the form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddEditForm {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub checklist: Vec<ChecklistItem>,
    pub categories: Vec<Category>,
    pub selected_category: Option<Category>,
}

/// Commands accepted by [`AddEditViewModel::on_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddEditEvent {
    TitleChanged(String),
    DescriptionChanged(String),
    CategoryChanged(Category),
    PriorityChanged(Priority),
    ChecklistItemTextChanged { index: usize, text: String },
    ChecklistItemCheckedChanged { index: usize, is_checked: bool },
    AddChecklistItem,
    DeleteChecklistItem(usize),
    Save,
}

/// View model behind the add/edit screen.
pub struct AddEditViewModel {
    todo_repo: Arc<dyn TodoRepository>,
    task_id: Option<TaskId>,
    form: Mutex<AddEditForm>,
    ui_events: UiEventChannel,
    runtime: Handle,
}

impl AddEditViewModel {
    /// Builds the form, waiting for the initial reads.
    ///
    /// An id that no longer exists yields an empty form rather than an error.
    pub async fn load(
        todo_repo: Arc<dyn TodoRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        task_id: Option<TaskId>,
        runtime: Handle,
    ) -> RepoResult<Self> {
        let categories = category_repo.get_all().next().await.transpose()?;
        let mut form = AddEditForm {
            categories: categories.unwrap_or_default(),
            ..AddEditForm::default()
        };

        match task_id {
            Some(id) => match todo_repo.get_by_id(id).await? {
                Some(task) => populate_from_task(&mut form, task),
                None => warn!("event=form_load module=presentation status=not_found task_id={id}"),
            },
            None => form.selected_category = form.categories.first().cloned(),
        }

        Ok(Self {
            todo_repo,
            task_id,
            form: Mutex::new(form),
            ui_events: UiEventChannel::new(),
            runtime,
        })
    }

    /// `None` when creating a new task.
    pub fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    pub fn form(&self) -> AddEditForm {
        self.form.lock().clone()
    }

    pub fn take_ui_events(&self) -> Option<mpsc::UnboundedReceiver<UiEvent>> {
        self.ui_events.take_receiver()
    }

    /// Applies a form edit, or starts a save.
    ///
    /// Only `Save` returns a background task.
    pub fn on_event(&self, event: AddEditEvent) -> Option<JoinHandle<()>> {
        let mut form = self.form.lock();
        match event {
            AddEditEvent::TitleChanged(title) => form.title = title,
            AddEditEvent::DescriptionChanged(description) => form.description = description,
            AddEditEvent::CategoryChanged(category) => form.selected_category = Some(category),
            AddEditEvent::PriorityChanged(priority) => form.priority = priority,
            AddEditEvent::AddChecklistItem => form.checklist.push(ChecklistItem::default()),
            AddEditEvent::DeleteChecklistItem(index) => {
                if index < form.checklist.len() {
                    form.checklist.remove(index);
                } else {
                    warn_bad_index("checklist_delete", index, form.checklist.len());
                }
            }
            AddEditEvent::ChecklistItemTextChanged { index, text } => {
                let len = form.checklist.len();
                match form.checklist.get_mut(index) {
                    Some(item) => item.text = text,
                    None => warn_bad_index("checklist_text", index, len),
                }
            }
            AddEditEvent::ChecklistItemCheckedChanged { index, is_checked } => {
                let len = form.checklist.len();
                match form.checklist.get_mut(index) {
                    Some(item) => item.is_checked = is_checked,
                    None => warn_bad_index("checklist_checked", index, len),
                }
            }
            AddEditEvent::Save => {
                let snapshot = form.clone();
                drop(form);
                return Some(self.save(snapshot));
            }
        }
        None
    }

    fn save(&self, mut form: AddEditForm) -> JoinHandle<()> {
        let repo = Arc::clone(&self.todo_repo);
        let task_id = self.task_id;
        let events = self.ui_events.sender();

        self.runtime.spawn(async move {
            let category = match form.selected_category.take() {
                Some(category) if !form.title.trim().is_empty() => category,
                _ => {
                    events.send(UiEvent::ShowMessage(REQUIRED_FIELDS_MESSAGE.to_string()));
                    return;
                }
            };

            let result = persist(repo.as_ref(), task_id, form, category).await;

            match result {
                Ok(id) => {
                    info!("event=task_save module=presentation status=ok task_id={id}");
                    events.send(UiEvent::PopBack);
                }
                Err(RepoError::TaskValidation(err)) => {
                    warn!("event=task_save module=presentation status=rejected error={err}");
                    events.send(UiEvent::ShowMessage(REQUIRED_FIELDS_MESSAGE.to_string()));
                }
                Err(err) => {
                    error!("event=task_save module=presentation status=error error={err}");
                    events.send(UiEvent::ShowMessage(STORAGE_ERROR_MESSAGE.to_string()));
                }
            }
        })
    }
}

async fn persist(
    repo: &dyn TodoRepository,
    task_id: Option<TaskId>,
    form: AddEditForm,
    category: Category,
) -> RepoResult<TaskId> {
    let is_completed = match task_id {
        Some(id) => repo
            .get_by_id(id)
            .await?
            .is_some_and(|stored| stored.is_completed),
        None => false,
    };

    let task = Task {
        id: task_id.unwrap_or(0),
        title: form.title,
        description: Some(form.description).filter(|text| !text.trim().is_empty()),
        is_completed,
        priority: form.priority,
        category: CategoryRef::Resolved(category),
        checklist: form.checklist,
    };
    repo.insert(&task).await
}

fn populate_from_task(form: &mut AddEditForm, task: Task) {
    form.title = task.title;
    form.description = task.description.unwrap_or_default();
    form.priority = task.priority;
    form.checklist = task.checklist;
    form.selected_category = match task.category {
        CategoryRef::Resolved(category) => Some(category),
        CategoryRef::Dangling(id) => {
            warn!("event=form_load module=presentation status=dangling_category category_id={id}");
            None
        }
    };
}

fn warn_bad_index(action: &str, index: usize, len: usize) {
    warn!("event={action} module=presentation status=ignored index={index} len={len}");
}
