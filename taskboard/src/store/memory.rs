//! In-memory document store.
//!
//! Each collection sits behind its own [`RwLock`]. Every trait method takes
//! the relevant lock exactly once, which makes each call atomic: a set-add
//! on a user can never interleave with another write to the same user.
//! Nothing is persisted; documents are lost on restart.

use std::collections::HashMap;

use chrono::Utc;
use taskboard_proto::{Assignment, Task, TaskId, User, UserId};
use tokio::sync::RwLock;

use super::{EntityStore, StoreError, TaskFields, TaskFilter, UserFields};

/// Both collections held in process memory.
pub struct MemoryStore {
    tasks: RwLock<HashMap<TaskId, Task>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Creates a store with empty collections.
    #[must_use]
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Inserts a task document verbatim, bypassing every consistency rule.
    ///
    /// Meant for seeding fixtures and for simulating the state a crash
    /// between primary and secondary writes leaves behind.
    pub async fn insert_raw_task(&self, task: Task) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    /// Inserts a user document verbatim, bypassing every consistency rule
    /// including email uniqueness.
    pub async fn insert_raw_user(&self, user: User) {
        self.users.write().await.insert(user.id.clone(), user);
    }
}

/// Applies `assignment` to `task`, reporting whether anything changed.
fn assign(task: &mut Task, assignment: &Assignment) -> bool {
    if task.assigned_user == assignment.user && task.assigned_user_name == assignment.user_name {
        return false;
    }
    task.assigned_user.clone_from(&assignment.user);
    task.assigned_user_name.clone_from(&assignment.user_name);
    true
}

fn email_taken(users: &HashMap<UserId, User>, email: &str, except: Option<&UserId>) -> bool {
    users
        .values()
        .any(|u| u.email == email && Some(&u.id) != except)
}

impl EntityStore for MemoryStore {
    async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(id).cloned())
    }

    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.read().await.get(id).cloned())
    }

    async fn find_tasks(&self, filter: &TaskFilter) -> Result<Vec<Task>, StoreError> {
        let mut found: Vec<Task> = self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| filter.matches(t))
            .cloned()
            .collect();
        found.sort_by(|a, b| (a.date_created, &a.id).cmp(&(b.date_created, &b.id)));
        Ok(found)
    }

    async fn find_users(&self) -> Result<Vec<User>, StoreError> {
        let mut found: Vec<User> = self.users.read().await.values().cloned().collect();
        found.sort_by(|a, b| (a.date_created, &a.id).cmp(&(b.date_created, &b.id)));
        Ok(found)
    }

    async fn count_tasks(&self, filter: &TaskFilter) -> Result<usize, StoreError> {
        Ok(self
            .tasks
            .read()
            .await
            .values()
            .filter(|t| filter.matches(t))
            .count())
    }

    async fn count_users(&self) -> Result<usize, StoreError> {
        Ok(self.users.read().await.len())
    }

    async fn create_task(&self, fields: TaskFields) -> Result<Task, StoreError> {
        let task = Task {
            id: TaskId::new(),
            name: fields.name,
            description: fields.description,
            deadline: fields.deadline,
            completed: fields.completed,
            assigned_user: fields.assignment.user,
            assigned_user_name: fields.assignment.user_name,
            date_created: Utc::now(),
        };
        self.tasks
            .write()
            .await
            .insert(task.id.clone(), task.clone());
        Ok(task)
    }

    async fn create_user(&self, fields: UserFields) -> Result<User, StoreError> {
        let mut users = self.users.write().await;
        if email_taken(&users, &fields.email, None) {
            return Err(StoreError::DuplicateEmail);
        }
        let user = User {
            id: UserId::new(),
            name: fields.name,
            email: fields.email,
            pending_tasks: fields.pending_tasks,
            date_created: Utc::now(),
        };
        users.insert(user.id.clone(), user.clone());
        drop(users);
        Ok(user)
    }

    async fn update_task(
        &self,
        id: &TaskId,
        fields: TaskFields,
    ) -> Result<Option<Task>, StoreError> {
        let mut tasks = self.tasks.write().await;
        let Some(task) = tasks.get_mut(id) else {
            return Ok(None);
        };
        task.name = fields.name;
        task.description = fields.description;
        task.deadline = fields.deadline;
        task.completed = fields.completed;
        assign(task, &fields.assignment);
        Ok(Some(task.clone()))
    }

    async fn update_user(
        &self,
        id: &UserId,
        fields: UserFields,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.write().await;
        if !users.contains_key(id) {
            return Ok(None);
        }
        if email_taken(&users, &fields.email, Some(id)) {
            return Err(StoreError::DuplicateEmail);
        }
        let updated = users.get_mut(id).map(|user| {
            user.name = fields.name;
            user.email = fields.email;
            user.pending_tasks = fields.pending_tasks;
            user.clone()
        });
        drop(users);
        Ok(updated)
    }

    async fn add_pending_task(&self, user: &UserId, task: &TaskId) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(user) else {
            return Ok(false);
        };
        if user.pending_tasks.contains(task) {
            return Ok(false);
        }
        user.pending_tasks.push(task.clone());
        Ok(true)
    }

    async fn remove_pending_task(
        &self,
        user: &UserId,
        task: &TaskId,
    ) -> Result<bool, StoreError> {
        let mut users = self.users.write().await;
        let Some(user) = users.get_mut(user) else {
            return Ok(false);
        };
        let before = user.pending_tasks.len();
        user.pending_tasks.retain(|t| t != task);
        Ok(user.pending_tasks.len() != before)
    }

    async fn update_tasks(
        &self,
        filter: &TaskFilter,
        assignment: &Assignment,
    ) -> Result<usize, StoreError> {
        let mut tasks = self.tasks.write().await;
        let changed = tasks
            .values_mut()
            .filter(|t| filter.matches(t))
            .fold(0, |n, t| n + usize::from(assign(t, assignment)));
        drop(tasks);
        Ok(changed)
    }

    async fn delete_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.write().await.remove(id))
    }

    async fn delete_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.users.write().await.remove(id))
    }
}
