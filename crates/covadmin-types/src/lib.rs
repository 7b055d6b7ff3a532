mod page;
mod user;

pub use page::*;
pub use user::*;

pub const DEFAULT_PAGE_SIZE: u32 = 50;
pub const DEFAULT_DOMAIN: &str = "corpzone";
pub const MANDATORY_ROLE: &str = "Users";
pub const MATCH_ALL_PATTERN: &str = "*";

/// The server rejects email-form identifiers as account names, so anything
/// carrying both an `@` and a `.` is treated as an email address.
pub fn looks_like_email(term: &str) -> bool {
    term.contains('@') && term.contains('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_looks_like_email() {
        assert!(looks_like_email("jdoe@example.com"));
        assert!(!looks_like_email("jdoe"));
        assert!(!looks_like_email("jdoe@example"));
        assert!(!looks_like_email("j.doe"));
    }
}
