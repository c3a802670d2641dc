//! Task list presentation state.
//!
//! # Responsibility
//! - Derive the grouped, filtered task view from the live task list.
//! - Accept list commands and turn them into repository writes.
//!
//! # Invariants
//! - Each task appears in exactly one group, matching its completion flag.
//! - Empty groups are never published.
//! - Group contents keep the repository order (newest id first).

use crate::model::category::{Category, CategoryId};
use crate::model::task::{Task, TaskId};
use crate::presentation::shared_state::{SharedState, StateObserver};
use crate::presentation::ui_event::{Route, UiEvent, UiEventChannel};
use crate::presentation::STORAGE_ERROR_MESSAGE;
use crate::repo::category_repo::CategoryRepository;
use crate::repo::task_repo::TodoRepository;
use crate::repo::{RepoResult, RepoStream};
use futures::stream::{self, BoxStream};
use futures::StreamExt;
use indexmap::IndexMap;
use log::{error, info};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Completion-state bucket of the list view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskGroup {
    Active,
    Completed,
}

impl TaskGroup {
    pub fn label(self) -> &'static str {
        match self {
            Self::Active => "Active",
            Self::Completed => "Completed",
        }
    }
}

/// Ordered group → tasks mapping. `Active` precedes `Completed`.
pub type GroupedTasks = IndexMap<TaskGroup, Vec<Task>>;

/// Commands accepted by [`ListViewModel::on_event`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListEvent {
    DeleteTask(Task),
    CompletionChanged { task: Task, is_completed: bool },
    /// `None` clears the filter.
    CategorySelected(Option<Category>),
    /// `None` asks for the create form.
    TaskClicked(Option<TaskId>),
    AddCategory { name: String, emoji: String },
    DeleteCategoryConfirmed(Category),
}

/// Filters by category and partitions by completion.
pub fn derive_groups(tasks: &[Task], category_filter: Option<CategoryId>) -> GroupedTasks {
    let (active, completed): (Vec<Task>, Vec<Task>) = tasks
        .iter()
        .filter(|task| category_filter.map_or(true, |id| task.category_id() == id))
        .cloned()
        .partition(|task| !task.is_completed);

    [(TaskGroup::Active, active), (TaskGroup::Completed, completed)]
        .into_iter()
        .filter(|(_, members)| !members.is_empty())
        .collect()
}

/// View model behind the task list screen.
pub struct ListViewModel {
    todo_repo: Arc<dyn TodoRepository>,
    category_repo: Arc<dyn CategoryRepository>,
    selected_category: watch::Sender<Option<Category>>,
    grouped_tasks: SharedState<Arc<GroupedTasks>>,
    categories: SharedState<Arc<Vec<Category>>>,
    ui_events: UiEventChannel,
    runtime: Handle,
}

impl ListViewModel {
    pub fn new(
        todo_repo: Arc<dyn TodoRepository>,
        category_repo: Arc<dyn CategoryRepository>,
        share_grace: Duration,
        runtime: Handle,
    ) -> Self {
        let (selected_category, filter_rx) = watch::channel(None::<Category>);

        let grouped_tasks = {
            let todo_repo = Arc::clone(&todo_repo);
            SharedState::new(
                "grouped_tasks",
                Arc::new(GroupedTasks::new()),
                share_grace,
                runtime.clone(),
                move || grouped_task_stream(todo_repo.get_all(), filter_rx.clone()),
            )
        };

        let categories = {
            let category_repo = Arc::clone(&category_repo);
            SharedState::new(
                "categories",
                Arc::new(Vec::new()),
                share_grace,
                runtime.clone(),
                move || category_stream(category_repo.get_all()),
            )
        };

        Self {
            todo_repo,
            category_repo,
            selected_category,
            grouped_tasks,
            categories,
            ui_events: UiEventChannel::new(),
            runtime,
        }
    }

    /// Observes the grouped task list.
    ///
    /// The state closes if a stored task can no longer be decoded.
    pub fn grouped_tasks(&self) -> StateObserver<Arc<GroupedTasks>> {
        self.grouped_tasks.subscribe()
    }

    /// Observes all categories sorted by name.
    pub fn categories(&self) -> StateObserver<Arc<Vec<Category>>> {
        self.categories.subscribe()
    }

    pub fn selected_category(&self) -> Option<Category> {
        self.selected_category.borrow().clone()
    }

    /// Takes the one-shot UI event receiver. Only the first call gets it.
    pub fn take_ui_events(&self) -> Option<mpsc::UnboundedReceiver<UiEvent>> {
        self.ui_events.take_receiver()
    }

    /// Dispatches a command without waiting for it.
    ///
    /// Returns the background task for commands that touch storage; `None`
    /// when the command completed synchronously or was a no-op.
    pub fn on_event(&self, event: ListEvent) -> Option<JoinHandle<()>> {
        match event {
            ListEvent::DeleteTask(task) => {
                let repo = Arc::clone(&self.todo_repo);
                Some(self.spawn_write("task_delete", async move {
                    repo.delete(&task).await
                }))
            }
            ListEvent::CompletionChanged { task, is_completed } => {
                let repo = Arc::clone(&self.todo_repo);
                let updated = task.with_completed(is_completed);
                Some(self.spawn_write("task_complete", async move {
                    repo.insert(&updated).await.map(|_| ())
                }))
            }
            ListEvent::CategorySelected(category) => {
                self.selected_category.send_replace(category);
                None
            }
            ListEvent::TaskClicked(task_id) => {
                self.ui_events
                    .sender()
                    .send(UiEvent::Navigate(Route::AddEdit { task_id }));
                None
            }
            ListEvent::AddCategory { name, emoji } => {
                if name.trim().is_empty() {
                    return None;
                }
                let repo = Arc::clone(&self.category_repo);
                let category = Category::new(name, emoji);
                Some(self.spawn_write("category_add", async move {
                    repo.insert(&category).await.map(|_| ())
                }))
            }
            ListEvent::DeleteCategoryConfirmed(category) => {
                // TODO: cascade or reassign to a default category once the
                // product decision is made; tasks keep a dangling reference.
                let repo = Arc::clone(&self.category_repo);
                Some(self.spawn_write("category_delete", async move {
                    repo.delete(&category).await
                }))
            }
        }
    }

    fn spawn_write(
        &self,
        command: &'static str,
        write: impl Future<Output = RepoResult<()>> + Send + 'static,
    ) -> JoinHandle<()> {
        let events = self.ui_events.sender();
        self.runtime.spawn(async move {
            match write.await {
                Ok(()) => info!("event={command} module=presentation status=ok"),
                Err(err) => {
                    error!("event={command} module=presentation status=error error={err}");
                    events.send(UiEvent::ShowMessage(STORAGE_ERROR_MESSAGE.to_string()));
                }
            }
        })
    }
}

struct GroupingState {
    tasks: RepoStream<Vec<Task>>,
    filter: watch::Receiver<Option<Category>>,
    latest: Option<Vec<Task>>,
}

fn grouped_task_stream(
    tasks: RepoStream<Vec<Task>>,
    filter: watch::Receiver<Option<Category>>,
) -> BoxStream<'static, Arc<GroupedTasks>> {
    let state = GroupingState {
        tasks,
        filter,
        latest: None,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            tokio::select! {
                next = state.tasks.next() => match next {
                    Some(Ok(tasks)) => state.latest = Some(tasks),
                    Some(Err(err)) => {
                        error!("event=grouped_tasks module=presentation status=error error={err}");
                        return None;
                    }
                    None => return None,
                },
                changed = state.filter.changed() => {
                    if changed.is_err() {
                        return None;
                    }
                }
            }

            if let Some(tasks) = state.latest.as_deref() {
                let category_filter = state
                    .filter
                    .borrow_and_update()
                    .as_ref()
                    .map(|category| category.id);
                let groups = derive_groups(tasks, category_filter);
                return Some((Arc::new(groups), state));
            }
        }
    })
    .boxed()
}

fn category_stream(categories: RepoStream<Vec<Category>>) -> BoxStream<'static, Arc<Vec<Category>>> {
    categories
        .scan((), |_, result| {
            let next = match result {
                Ok(categories) => Some(Arc::new(categories)),
                Err(err) => {
                    error!("event=categories module=presentation status=error error={err}");
                    None
                }
            };
            futures::future::ready(next)
        })
        .boxed()
}

#[cfg(test)]
mod tests {
    use super::{derive_groups, TaskGroup};
    use crate::model::category::Category;
    use crate::model::task::Task;
    use std::collections::HashSet;

    fn category(id: i64, name: &str) -> Category {
        Category {
            id,
            name: name.to_string(),
            emoji: String::new(),
        }
    }

    fn task(id: i64, category: &Category, is_completed: bool) -> Task {
        let mut task = Task::new(format!("task {id}"), category.clone());
        task.id = id;
        task.is_completed = is_completed;
        task
    }

    #[test]
    fn partitions_preserving_order_and_omitting_empty_groups() {
        let work = category(1, "Work");
        let tasks = vec![
            task(5, &work, false),
            task(4, &work, true),
            task(3, &work, false),
        ];

        let groups = derive_groups(&tasks, None);
        let keys = groups.keys().copied().collect::<Vec<_>>();
        assert_eq!(keys, vec![TaskGroup::Active, TaskGroup::Completed]);
        let active_ids = groups[&TaskGroup::Active]
            .iter()
            .map(|task| task.id)
            .collect::<Vec<_>>();
        assert_eq!(active_ids, vec![5, 3]);

        let only_active = derive_groups(&tasks[..1], None);
        assert!(!only_active.contains_key(&TaskGroup::Completed));
        assert!(derive_groups(&[], None).is_empty());
    }

    #[test]
    fn every_filtered_task_lands_in_exactly_one_matching_group() {
        let work = category(1, "Work");
        let home = category(2, "Home");
        let tasks = (1..=12)
            .map(|id| {
                let owner = if id % 3 == 0 { &home } else { &work };
                task(id, owner, id % 2 == 0)
            })
            .collect::<Vec<_>>();

        for filter in [None, Some(1), Some(2), Some(99)] {
            let groups = derive_groups(&tasks, filter);
            let expected = tasks
                .iter()
                .filter(|task| filter.map_or(true, |id| task.category_id() == id))
                .map(|task| task.id)
                .collect::<HashSet<_>>();

            let mut seen = HashSet::new();
            for (group, members) in &groups {
                assert!(!members.is_empty());
                for member in members {
                    assert_eq!(member.is_completed, *group == TaskGroup::Completed);
                    assert!(seen.insert(member.id), "task {} duplicated", member.id);
                }
            }
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn labels_are_stable() {
        assert_eq!(TaskGroup::Active.label(), "Active");
        assert_eq!(TaskGroup::Completed.label(), "Completed");
    }
}
