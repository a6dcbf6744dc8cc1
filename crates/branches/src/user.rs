use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use receiptdesk_core::{Aggregate, AggregateRoot, DomainError, UserId};
use receiptdesk_events::Event;

/// Account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    Admin,
    Branch,
}

/// Aggregate root: User (a branch account or the administrator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    id: UserId,
    username: String,
    role: UserRole,
    branch_name: Option<String>,
    company: Option<String>,
    tin_number: Option<String>,
    removed: bool,
    version: u64,
    created: bool,
}

impl User {
    /// Create an empty, not-yet-registered instance.
    pub fn empty(id: UserId) -> Self {
        Self {
            id,
            username: String::new(),
            role: UserRole::Branch,
            branch_name: None,
            company: None,
            tin_number: None,
            removed: false,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> UserId {
        self.id
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn role(&self) -> UserRole {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == UserRole::Admin
    }

    pub fn branch_name(&self) -> Option<&str> {
        self.branch_name.as_deref()
    }

    pub fn company(&self) -> Option<&str> {
        self.company.as_deref()
    }

    pub fn tin_number(&self) -> Option<&str> {
        self.tin_number.as_deref()
    }

    pub fn is_created(&self) -> bool {
        self.created
    }

    pub fn is_removed(&self) -> bool {
        self.removed
    }

    /// Display name used on orders and reports.
    pub fn display_name(&self) -> &str {
        self.branch_name.as_deref().unwrap_or(&self.username)
    }

    pub fn to_record(&self) -> UserRecord {
        UserRecord {
            id: self.id,
            username: self.username.clone(),
            role: self.role,
            branch_name: self.branch_name.clone(),
            company: self.company.clone(),
            tin_number: self.tin_number.clone(),
        }
    }

    /// Rebuild an account from a plain record (remote import).
    pub fn from_record(record: UserRecord) -> Result<Self, DomainError> {
        let mut user = User::empty(record.id);
        let events = user.handle(&UserCommand::RegisterUser(RegisterUser {
            user_id: record.id,
            username: record.username,
            role: record.role,
            branch_name: record.branch_name,
            company: record.company,
            tin_number: record.tin_number,
            occurred_at: Utc::now(),
        }))?;
        for ev in &events {
            user.apply(ev);
        }
        Ok(user)
    }
}

impl AggregateRoot for User {
    type Id = UserId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Plain, flat account record (export/import shape).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub id: UserId,
    pub username: String,
    pub role: UserRole,
    pub branch_name: Option<String>,
    pub company: Option<String>,
    pub tin_number: Option<String>,
}

/// Command: RegisterUser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterUser {
    pub user_id: UserId,
    pub username: String,
    pub role: UserRole,
    pub branch_name: Option<String>,
    pub company: Option<String>,
    pub tin_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateBranch (admin edit). `None` keeps the current value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateBranch {
    pub user_id: UserId,
    pub username: Option<String>,
    pub branch_name: Option<String>,
    pub company: Option<String>,
    pub tin_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveBranch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveBranch {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserCommand {
    RegisterUser(RegisterUser),
    UpdateBranch(UpdateBranch),
    RemoveBranch(RemoveBranch),
}

/// Event: UserRegistered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRegistered {
    pub user_id: UserId,
    pub username: String,
    pub role: UserRole,
    pub branch_name: Option<String>,
    pub company: Option<String>,
    pub tin_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BranchUpdated (carries the full new details).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchUpdated {
    pub user_id: UserId,
    pub username: String,
    pub branch_name: Option<String>,
    pub company: Option<String>,
    pub tin_number: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: BranchRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRemoved {
    pub user_id: UserId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum UserEvent {
    UserRegistered(UserRegistered),
    BranchUpdated(BranchUpdated),
    BranchRemoved(BranchRemoved),
}

impl Event for UserEvent {
    fn event_type(&self) -> &'static str {
        match self {
            UserEvent::UserRegistered(_) => "branches.user.registered",
            UserEvent::BranchUpdated(_) => "branches.user.updated",
            UserEvent::BranchRemoved(_) => "branches.user.removed",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            UserEvent::UserRegistered(e) => e.occurred_at,
            UserEvent::BranchUpdated(e) => e.occurred_at,
            UserEvent::BranchRemoved(e) => e.occurred_at,
        }
    }
}

impl Aggregate for User {
    type Command = UserCommand;
    type Event = UserEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            UserEvent::UserRegistered(e) => {
                self.id = e.user_id;
                self.username = e.username.clone();
                self.role = e.role;
                self.branch_name = e.branch_name.clone();
                self.company = e.company.clone();
                self.tin_number = e.tin_number.clone();
                self.created = true;
            }
            UserEvent::BranchUpdated(e) => {
                self.username = e.username.clone();
                self.branch_name = e.branch_name.clone();
                self.company = e.company.clone();
                self.tin_number = e.tin_number.clone();
            }
            UserEvent::BranchRemoved(_) => {
                self.removed = true;
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            UserCommand::RegisterUser(cmd) => self.handle_register(cmd),
            UserCommand::UpdateBranch(cmd) => self.handle_update(cmd),
            UserCommand::RemoveBranch(cmd) => self.handle_remove(cmd),
        }
    }
}

/// Trim, turning blank strings into `None`.
fn normalized(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl User {
    fn ensure_live(&self, user_id: UserId) -> Result<(), DomainError> {
        if !self.created || self.removed {
            return Err(DomainError::not_found(format!("user {user_id}")));
        }
        if self.id != user_id {
            return Err(DomainError::precondition("user_id mismatch"));
        }
        Ok(())
    }

    fn handle_register(&self, cmd: &RegisterUser) -> Result<Vec<UserEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("user already exists"));
        }

        let username = cmd.username.trim();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }

        let branch_name = normalized(&cmd.branch_name);
        let company = normalized(&cmd.company);
        if cmd.role == UserRole::Branch {
            if branch_name.is_none() {
                return Err(DomainError::validation("branch name cannot be empty"));
            }
            if company.is_none() {
                return Err(DomainError::validation("company cannot be empty"));
            }
        }

        Ok(vec![UserEvent::UserRegistered(UserRegistered {
            user_id: cmd.user_id,
            username: username.to_string(),
            role: cmd.role,
            branch_name,
            company,
            tin_number: normalized(&cmd.tin_number),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update(&self, cmd: &UpdateBranch) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_live(cmd.user_id)?;

        let username = match &cmd.username {
            Some(u) if u.trim().is_empty() => {
                return Err(DomainError::validation("username cannot be empty"));
            }
            Some(u) => u.trim().to_string(),
            None => self.username.clone(),
        };

        // Blank fields in a patch mean "keep", matching the edit form.
        let branch_name = normalized(&cmd.branch_name).or_else(|| self.branch_name.clone());
        let company = normalized(&cmd.company).or_else(|| self.company.clone());
        let tin_number = match &cmd.tin_number {
            Some(_) => normalized(&cmd.tin_number),
            None => self.tin_number.clone(),
        };

        Ok(vec![UserEvent::BranchUpdated(BranchUpdated {
            user_id: cmd.user_id,
            username,
            branch_name,
            company,
            tin_number,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove(&self, cmd: &RemoveBranch) -> Result<Vec<UserEvent>, DomainError> {
        self.ensure_live(cmd.user_id)?;

        if self.role == UserRole::Admin {
            return Err(DomainError::precondition("the administrator account cannot be removed"));
        }

        Ok(vec![UserEvent::BranchRemoved(BranchRemoved {
            user_id: cmd.user_id,
            occurred_at: cmd.occurred_at,
        })])
    }
}
