use std::sync::Mutex;

use async_trait::async_trait;
use covadmin_soap::{ConfigurationService, SoapError, SoapFault};
use covadmin_types::{
    GroupFilterSpec, GroupSearchResult, PageSpec, UserFilterSpec, UserRecord, UserSearchResult,
    UserSpec,
};
use globset::GlobBuilder;

/// In-memory configuration service that records every request it serves.
#[derive(Default)]
pub struct MemoryConfigService {
    users: Mutex<Vec<UserRecord>>,
    groups: Vec<String>,
    failure: Option<String>,
    user_pages: Mutex<Vec<PageSpec>>,
    group_pages: Mutex<Vec<PageSpec>>,
    created: Mutex<Vec<UserSpec>>,
}

impl MemoryConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, username: &str, email: Option<&str>) -> Self {
        let mut user = UserRecord::new(username);
        user.email = email.map(str::to_string);
        self.lock_users().push(user);
        self
    }

    pub fn with_users(self, users: impl IntoIterator<Item = UserRecord>) -> Self {
        self.lock_users().extend(users);
        self
    }

    pub fn with_groups<S: Into<String>>(mut self, groups: impl IntoIterator<Item = S>) -> Self {
        self.groups.extend(groups.into_iter().map(Into::into));
        self
    }

    /// Every call fails with a server fault carrying `message`.
    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn user_pages(&self) -> Vec<PageSpec> {
        self.user_pages.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn group_pages(&self) -> Vec<PageSpec> {
        self.group_pages.lock().map(|p| p.clone()).unwrap_or_default()
    }

    pub fn created(&self) -> Vec<UserSpec> {
        self.created.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn lock_users(&self) -> std::sync::MutexGuard<'_, Vec<UserRecord>> {
        self.users.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn check_failure(&self) -> Result<(), SoapError> {
        match &self.failure {
            Some(message) => Err(server_fault(message.clone())),
            None => Ok(()),
        }
    }
}

fn server_fault(message: String) -> SoapError {
    SoapError::Fault(SoapFault {
        code: "soap:Server".to_string(),
        message,
        error_code: None,
    })
}

fn matcher(pattern: &str) -> Result<globset::GlobMatcher, SoapError> {
    GlobBuilder::new(pattern)
        .case_insensitive(true)
        .build()
        .map(|g| g.compile_matcher())
        .map_err(|e| server_fault(format!("Invalid pattern {}: {}", pattern, e)))
}

fn slice<T: Clone>(items: &[T], page: &PageSpec) -> Vec<T> {
    items
        .iter()
        .skip(page.start_index as usize)
        .take(page.page_size as usize)
        .cloned()
        .collect()
}

#[async_trait]
impl ConfigurationService for MemoryConfigService {
    async fn get_users(
        &self,
        filter: &UserFilterSpec,
        page: &PageSpec,
    ) -> Result<UserSearchResult, SoapError> {
        self.check_failure()?;
        if let Ok(mut pages) = self.user_pages.lock() {
            pages.push(page.clone());
        }

        let glob = matcher(&filter.name_pattern)?;
        let mut matches: Vec<UserRecord> = self
            .lock_users()
            .iter()
            .filter(|u| glob.is_match(&u.username))
            .cloned()
            .collect();

        match page.sort_field.as_deref() {
            Some("email") => {
                matches.sort_by_key(|u| u.email.as_deref().map(str::to_lowercase));
            }
            _ => matches.sort_by(|a, b| a.username.cmp(&b.username)),
        }
        if page.sort_ascending == Some(false) {
            matches.reverse();
        }

        Ok(UserSearchResult {
            total_count: matches.len() as u64,
            users: slice(&matches, page),
        })
    }

    async fn get_user(&self, username: &str) -> Result<UserRecord, SoapError> {
        self.check_failure()?;
        self.lock_users()
            .iter()
            .find(|u| u.username == username)
            .cloned()
            .ok_or_else(|| server_fault(format!("No user found for user name {}.", username)))
    }

    async fn get_groups(
        &self,
        filter: &GroupFilterSpec,
        page: &PageSpec,
    ) -> Result<GroupSearchResult, SoapError> {
        self.check_failure()?;
        if let Ok(mut pages) = self.group_pages.lock() {
            pages.push(page.clone());
        }

        let glob = matcher(&filter.name_pattern)?;
        let matches: Vec<String> = self
            .groups
            .iter()
            .filter(|g| glob.is_match(g.as_str()))
            .cloned()
            .collect();

        Ok(GroupSearchResult {
            total_count: matches.len() as u64,
            groups: slice(&matches, page),
        })
    }

    async fn create_user(&self, spec: &UserSpec) -> Result<(), SoapError> {
        self.check_failure()?;
        if let Ok(mut created) = self.created.lock() {
            created.push(spec.clone());
        }

        let mut user = UserRecord::new(spec.username.clone());
        user.domain = Some(spec.domain.clone());
        user.groups = spec.group_names.iter().cloned().collect();
        user.created_by = Some("admin".to_string());
        self.lock_users().push(user);
        Ok(())
    }
}
