use covadmin_soap::ConfigurationService;
use covadmin_types::{GroupFilterSpec, PageCursor, PageSpec};
use tracing::debug;

use crate::DirectoryError;

/// Assignable roles, without the mandatory one, in the order they are
/// offered for selection. Indices stay fixed for the life of the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoleCatalog {
    roles: Vec<String>,
}

impl RoleCatalog {
    pub async fn load(
        service: &dyn ConfigurationService,
        pattern: &str,
        mandatory_role: &str,
        page_size: u32,
    ) -> Result<Self, DirectoryError> {
        let page_size = page_size.max(1);
        let filter = GroupFilterSpec::new(pattern);
        let first = service
            .get_groups(&filter, &PageSpec::new(page_size, 0))
            .await?;

        let mut cursor = PageCursor::new(page_size, first.total_count);
        cursor.next_page();
        let mut last_len = first.groups.len();
        let mut names = first.groups;

        while last_len >= page_size as usize {
            let Some(page) = cursor.next_page() else {
                break;
            };
            let result = service.get_groups(&filter, &page).await?;
            last_len = result.groups.len();
            names.extend(result.groups);
        }

        debug!("Loaded {} groups matching {}", names.len(), pattern);
        Ok(Self::from_names(names, mandatory_role))
    }

    pub fn from_names(names: impl IntoIterator<Item = String>, mandatory_role: &str) -> Self {
        let mandatory = mandatory_role.to_lowercase();
        let mut roles: Vec<String> = names
            .into_iter()
            .filter(|name| name.to_lowercase() != mandatory)
            .collect();
        roles.sort_by(|a, b| a.to_lowercase().cmp(&b.to_lowercase()).then_with(|| a.cmp(b)));
        roles.dedup();
        Self { roles }
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.roles.get(index).map(String::as_str)
    }

    pub fn names(&self) -> &[String] {
        &self.roles
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryConfigService;

    #[test]
    fn test_excludes_mandatory_role_and_sorts() {
        let catalog = RoleCatalog::from_names(
            ["Zeta", "users", "alpha", "Beta", "USERS"].map(String::from),
            "Users",
        );
        assert_eq!(catalog.names(), &["alpha", "Beta", "Zeta"]);
        assert_eq!(catalog.get(1), Some("Beta"));
        assert_eq!(catalog.get(3), None);
    }

    #[test]
    fn test_excludes_non_ascii_mandatory_role() {
        let catalog = RoleCatalog::from_names(
            ["BENUTZER-Ä", "benutzer-ä", "Entwickler"].map(String::from),
            "Benutzer-Ä",
        );
        assert_eq!(catalog.names(), &["Entwickler"]);
    }

    #[test]
    fn test_only_mandatory_role_is_empty() {
        let catalog = RoleCatalog::from_names(vec!["Users".to_string()], "Users");
        assert!(catalog.is_empty());
        assert_eq!(catalog.len(), 0);
    }

    #[tokio::test]
    async fn test_load_accumulates_pages() {
        let groups: Vec<String> = (0..7).map(|i| format!("Group{}", i)).collect();
        let service = MemoryConfigService::new()
            .with_groups(groups)
            .with_groups(["Users"]);

        let catalog = RoleCatalog::load(&service, "*", "Users", 3).await.unwrap();
        assert_eq!(catalog.len(), 7);
        assert_eq!(catalog.get(0), Some("Group0"));

        let offsets: Vec<u64> = service.group_pages().iter().map(|p| p.start_index).collect();
        assert_eq!(offsets, vec![0, 3, 6]);
    }

    #[tokio::test]
    async fn test_load_single_short_page() {
        let service = MemoryConfigService::new().with_groups(["Users", "Admins", "Developers"]);
        let catalog = RoleCatalog::load(&service, "*", "Users", 50).await.unwrap();
        assert_eq!(catalog.names(), &["Admins", "Developers"]);
        assert_eq!(service.group_pages().len(), 1);
    }
}
