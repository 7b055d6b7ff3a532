use covadmin_soap::{ConfigurationService, SoapError};
use covadmin_types::{
    looks_like_email, PageCursor, PageSpec, UserFilterSpec, UserRecord, UserSpec,
    MATCH_ALL_PATTERN,
};
use tracing::{debug, info, warn};

use crate::DirectoryError;

const EMAIL_SORT_FIELD: &str = "email";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UsernameMatch {
    Found(UserRecord),
    NotFound,
    /// More than one account matched; none is picked.
    Ambiguous {
        total: u64,
        candidates: Vec<UserRecord>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanProgress {
    pub scanned: u64,
    pub total: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailScan {
    pub found: Option<UserRecord>,
    pub scanned: u64,
    pub total: u64,
    pub pages_fetched: u64,
}

/// Lookups and account creation against the configuration service.
pub struct UserDirectory<'a> {
    service: &'a dyn ConfigurationService,
    page_size: u32,
}

impl<'a> UserDirectory<'a> {
    pub fn new(service: &'a dyn ConfigurationService, page_size: u32) -> Self {
        Self {
            service,
            page_size: page_size.max(1),
        }
    }

    /// `pattern` may carry `*` wildcards; it is sent to the server as is.
    pub async fn find_by_username(&self, pattern: &str) -> Result<UsernameMatch, DirectoryError> {
        let filter = UserFilterSpec::new(pattern);
        let first = self
            .service
            .get_users(&filter, &PageSpec::new(self.page_size, 0))
            .await?;
        let total = first.total_count;

        if total == 0 {
            return Ok(UsernameMatch::NotFound);
        }
        if total == 1 {
            return Ok(match first.users.into_iter().next() {
                Some(user) => UsernameMatch::Found(user),
                None => UsernameMatch::NotFound,
            });
        }

        let mut cursor = PageCursor::new(self.page_size, total);
        cursor.next_page();
        let mut last_len = first.users.len();
        let mut candidates = first.users;

        while last_len >= self.page_size as usize {
            let Some(page) = cursor.next_page() else {
                break;
            };
            let result = self.service.get_users(&filter, &page).await?;
            last_len = result.users.len();
            candidates.extend(result.users);
        }

        warn!("{} users match {}", total, pattern);
        Ok(UsernameMatch::Ambiguous { total, candidates })
    }

    /// Scans every account in fixed-size pages for a case-insensitive exact
    /// email match. A size-1 probe learns the total first; the walk stops at
    /// the first hit, a short page, or once the total is covered.
    pub async fn find_by_email_paged(
        &self,
        email: &str,
        progress: &mut dyn FnMut(ScanProgress),
    ) -> Result<EmailScan, DirectoryError> {
        let filter = UserFilterSpec::new(MATCH_ALL_PATTERN);
        let probe = self
            .service
            .get_users(&filter, &PageSpec::new(1, 0).sorted_by(EMAIL_SORT_FIELD, true))
            .await?;
        let total = probe.total_count;
        debug!("Email scan for {} over {} users", email, total);

        let mut scan = EmailScan {
            found: None,
            scanned: 0,
            total,
            pages_fetched: 0,
        };

        let mut cursor = PageCursor::new(self.page_size, total).sorted_by(EMAIL_SORT_FIELD, true);
        while let Some(page) = cursor.next_page() {
            let result = self.service.get_users(&filter, &page).await?;
            scan.pages_fetched += 1;

            let page_len = result.users.len();
            if page_len == 0 {
                break;
            }

            for user in result.users {
                scan.scanned += 1;
                if user.has_email(email) {
                    progress(ScanProgress {
                        scanned: scan.scanned,
                        total,
                    });
                    scan.found = Some(user);
                    return Ok(scan);
                }
            }

            progress(ScanProgress {
                scanned: scan.scanned,
                total,
            });

            if page_len < cursor.page_size() as usize {
                cursor.finish();
            }
        }

        Ok(scan)
    }

    pub async fn get_user_detail(&self, username: &str) -> Result<UserRecord, DirectoryError> {
        match self.service.get_user(username).await {
            Ok(user) => Ok(user),
            Err(SoapError::Fault(fault)) if fault.is_no_such_user(username) => {
                Err(DirectoryError::NotFound(username.to_string()))
            }
            Err(e) => Err(DirectoryError::Remote(e)),
        }
    }

    /// Creates the account and reads it back. Email-shaped names are refused
    /// before anything is sent.
    pub async fn create_user(
        &self,
        username: &str,
        domain: &str,
        roles: &[String],
    ) -> Result<UserRecord, DirectoryError> {
        if looks_like_email(username) {
            return Err(DirectoryError::EmailUsername(username.to_string()));
        }

        let spec = UserSpec {
            username: username.to_string(),
            domain: domain.to_string(),
            group_names: roles.to_vec(),
        };
        self.service.create_user(&spec).await?;
        info!("Created user {} in domain {} with roles {:?}", username, domain, roles);

        self.get_user_detail(username).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryConfigService;

    fn numbered_users(count: usize) -> Vec<UserRecord> {
        (0..count)
            .map(|i| {
                let mut user = UserRecord::new(format!("user{:03}", i));
                user.email = Some(format!("user{:03}@example.com", i));
                user
            })
            .collect()
    }

    #[tokio::test]
    async fn test_username_single_match() {
        let service = MemoryConfigService::new()
            .with_user("jdoe", Some("jdoe@example.com"))
            .with_user("asmith", None);
        let directory = UserDirectory::new(&service, 50);

        match directory.find_by_username("jdoe").await.unwrap() {
            UsernameMatch::Found(user) => assert_eq!(user.username, "jdoe"),
            other => panic!("expected Found, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_username_no_match() {
        let service = MemoryConfigService::new().with_user("jdoe", None);
        let directory = UserDirectory::new(&service, 50);
        assert_eq!(
            directory.find_by_username("ghost").await.unwrap(),
            UsernameMatch::NotFound
        );
    }

    #[tokio::test]
    async fn test_username_ambiguous_lists_every_candidate() {
        let service = MemoryConfigService::new().with_users(numbered_users(7));
        let directory = UserDirectory::new(&service, 3);

        match directory.find_by_username("user*").await.unwrap() {
            UsernameMatch::Ambiguous { total, candidates } => {
                assert_eq!(total, 7);
                let names: Vec<_> = candidates.iter().map(|u| u.username.as_str()).collect();
                assert_eq!(names.len(), 7);
                assert!(names.contains(&"user006"));
            }
            other => panic!("expected Ambiguous, got {:?}", other),
        }
        let offsets: Vec<u64> = service.user_pages().iter().map(|p| p.start_index).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn test_email_scan_without_match_visits_total() {
        let service = MemoryConfigService::new().with_users(numbered_users(120));
        let directory = UserDirectory::new(&service, 50);
        let mut reports = Vec::new();

        let scan = directory
            .find_by_email_paged("nobody@example.com", &mut |p| reports.push(p))
            .await
            .unwrap();

        assert!(scan.found.is_none());
        assert_eq!(scan.total, 120);
        assert_eq!(scan.scanned, 120);
        assert_eq!(scan.pages_fetched, 3);
        assert_eq!(reports.last().map(|p| p.scanned), Some(120));

        let pages = service.user_pages();
        assert_eq!(pages[0].page_size, 1);
        assert_eq!(pages[0].sort_field.as_deref(), Some("email"));
        let offsets: Vec<u64> = pages[1..].iter().map(|p| p.start_index).collect();
        assert_eq!(offsets, vec![0, 50, 100]);
    }

    #[tokio::test]
    async fn test_email_scan_stops_at_first_match_ignoring_case() {
        let service = MemoryConfigService::new().with_users(numbered_users(120));
        let directory = UserDirectory::new(&service, 50);

        let scan = directory
            .find_by_email_paged("USER060@Example.com", &mut |_| {})
            .await
            .unwrap();

        assert_eq!(scan.found.map(|u| u.username), Some("user060".to_string()));
        assert_eq!(scan.pages_fetched, 2);
        assert_eq!(scan.scanned, 61);
    }

    #[tokio::test]
    async fn test_email_scan_empty_directory_only_probes() {
        let service = MemoryConfigService::new();
        let directory = UserDirectory::new(&service, 50);

        let scan = directory
            .find_by_email_paged("jdoe@example.com", &mut |_| {})
            .await
            .unwrap();

        assert_eq!(scan.total, 0);
        assert_eq!(scan.pages_fetched, 0);
        assert_eq!(service.user_pages().len(), 1);
    }

    #[tokio::test]
    async fn test_detail_not_found_is_recovered() {
        let service = MemoryConfigService::new();
        let directory = UserDirectory::new(&service, 50);
        assert!(matches!(
            directory.get_user_detail("ghost").await,
            Err(DirectoryError::NotFound(name)) if name == "ghost"
        ));
    }

    #[tokio::test]
    async fn test_other_faults_propagate() {
        let service = MemoryConfigService::new().failing("Authentication failed");
        let directory = UserDirectory::new(&service, 50);
        assert!(matches!(
            directory.get_user_detail("jdoe").await,
            Err(DirectoryError::Remote(SoapError::Fault(_)))
        ));
        assert!(directory.find_by_username("jdoe").await.is_err());
    }

    #[tokio::test]
    async fn test_create_refuses_email_username() {
        let service = MemoryConfigService::new();
        let directory = UserDirectory::new(&service, 50);

        let result = directory
            .create_user("jdoe@example.com", "corpzone", &["Users".to_string()])
            .await;
        assert!(matches!(result, Err(DirectoryError::EmailUsername(_))));
        assert!(service.created().is_empty());
    }

    #[tokio::test]
    async fn test_create_reads_back_account() {
        let service = MemoryConfigService::new();
        let directory = UserDirectory::new(&service, 50);
        let roles = vec!["Users".to_string(), "Developers".to_string()];

        let user = directory.create_user("jdoe", "corpzone", &roles).await.unwrap();
        assert_eq!(user.username, "jdoe");
        assert_eq!(user.domain.as_deref(), Some("corpzone"));
        assert!(user.groups.contains("Developers"));
        assert_eq!(service.created()[0].group_names, roles);
    }
}
