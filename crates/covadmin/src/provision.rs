use std::io;

use anyhow::Result;
use covadmin_directory::{
    DirectoryError, RoleCatalog, ScanProgress, UserDirectory, UsernameMatch,
};
use covadmin_output::{
    format_ambiguous_users, format_role_table, format_scan_progress, format_selection,
    format_user_record, Console,
};
use covadmin_soap::ConfigurationService;
use covadmin_types::{looks_like_email, UserRecord, MATCH_ALL_PATTERN};
use tracing::info;

#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    pub domain: String,
    pub mandatory_role: String,
    pub page_size: u32,
    pub json: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Existing(UserRecord),
    Created(UserRecord),
    NotCreated,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Choice {
    Skip,
    Role(String),
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SelectionState {
    ShowList,
    AwaitChoice,
    Confirm,
    Done,
}

/// Interprets one answer at the role prompt against the current selection.
pub fn parse_choice(answer: &str, catalog: &RoleCatalog, selected: &[String]) -> Choice {
    let answer = answer.trim();
    if answer.is_empty() {
        return Choice::Skip;
    }
    let Ok(index) = answer.parse::<usize>() else {
        return Choice::Invalid(format!("[{}] is not a valid role number.", answer));
    };
    let Some(role) = catalog.get(index) else {
        return Choice::Invalid(format!(
            "[{}] is out of range, pick a number between 0 and {}.",
            index,
            catalog.len().saturating_sub(1)
        ));
    };
    let folded = role.to_lowercase();
    if selected.iter().any(|s| s.to_lowercase() == folded) {
        return Choice::Invalid(format!("Role [{}] is already selected.", role));
    }
    Choice::Role(role.to_string())
}

/// Runs the role picker until the user accepts a selection. The mandatory
/// role is always first and at most one optional role is added per pass;
/// rejecting the selection starts over from the mandatory role alone.
pub fn select_roles(
    catalog: &RoleCatalog,
    mandatory_role: &str,
    console: &mut Console,
) -> io::Result<Vec<String>> {
    let mut selected = vec![mandatory_role.to_string()];
    let mut state = SelectionState::ShowList;

    loop {
        state = match state {
            SelectionState::ShowList => {
                console.blank()?;
                console.line("Available roles:")?;
                let width = console.width();
                console.line(format_role_table(catalog.names(), width))?;
                SelectionState::AwaitChoice
            }
            SelectionState::AwaitChoice => {
                let answer =
                    console.prompt("Enter the number of the role to add (blank to skip): ")?;
                match parse_choice(&answer, catalog, &selected) {
                    Choice::Skip => SelectionState::Confirm,
                    Choice::Role(role) => {
                        selected.push(role);
                        SelectionState::Confirm
                    }
                    Choice::Invalid(reason) => {
                        console.warning(reason)?;
                        SelectionState::ShowList
                    }
                }
            }
            SelectionState::Confirm => {
                console.blank()?;
                console.line(format_selection(&selected))?;
                let answer = console.prompt("Is this correct? (Y/N): ")?;
                if answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes") {
                    SelectionState::Done
                } else {
                    selected.truncate(1);
                    SelectionState::ShowList
                }
            }
            SelectionState::Done => return Ok(selected),
        }
    }
}

fn needs_account_name(name: &str) -> bool {
    name.is_empty() || looks_like_email(name) || name.contains('*')
}

/// Asks for a real account name while `term` is email-shaped or a pattern.
/// A blank answer cancels.
pub fn resolve_account_name(term: &str, console: &mut Console) -> io::Result<Option<String>> {
    let mut name = term.trim().to_string();
    while needs_account_name(&name) {
        if looks_like_email(&name) {
            console.warning(format!(
                "[{}] looks like an email address, the server needs an account name.",
                name
            ))?;
        } else if !name.is_empty() {
            console.warning(format!("[{}] is not a valid account name.", name))?;
        }
        let answer = console.prompt("Enter the account name to create (blank to cancel): ")?;
        if answer.is_empty() {
            return Ok(None);
        }
        name = answer;
    }
    Ok(Some(name))
}

/// Search first, create only when nothing matched.
pub struct Provisioner<'a> {
    service: &'a dyn ConfigurationService,
    options: ProvisionOptions,
}

impl<'a> Provisioner<'a> {
    pub fn new(service: &'a dyn ConfigurationService, options: ProvisionOptions) -> Self {
        Self { service, options }
    }

    fn directory(&self) -> UserDirectory<'a> {
        UserDirectory::new(self.service, self.options.page_size)
    }

    fn display(&self, console: &mut Console, user: &UserRecord) -> Result<()> {
        if self.options.json {
            console.line(serde_json::to_string_pretty(user)?)?;
        } else {
            console.line(format_user_record(user))?;
        }
        Ok(())
    }

    /// Shows the full record of a matched account. Returns `None` when the
    /// account vanished between the search and the detail lookup.
    async fn show_existing(&self, username: &str, console: &mut Console) -> Result<Option<UserRecord>> {
        console.line(format!("   User was found. Username: {}", username))?;
        match self.directory().get_user_detail(username).await {
            Ok(user) => {
                console.blank()?;
                self.display(console, &user)?;
                Ok(Some(user))
            }
            Err(DirectoryError::NotFound(name)) => {
                console.warning(format!("User [{}] was NOT found.", name))?;
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    pub async fn run(&self, term: &str, console: &mut Console) -> Result<Outcome> {
        console.blank()?;
        console.line(format!("Searching for user: {}", term))?;

        let directory = self.directory();
        let matched = if looks_like_email(term) {
            let mut progress_error: Option<io::Error> = None;
            let scan = {
                let mut report = |p: ScanProgress| {
                    if progress_error.is_none() {
                        if let Err(e) = console.progress(format_scan_progress(p.scanned, p.total)) {
                            progress_error = Some(e);
                        }
                    }
                };
                directory.find_by_email_paged(term, &mut report).await?
            };
            if let Some(e) = progress_error {
                return Err(e.into());
            }
            match scan.found {
                Some(user) => Some(user.username),
                None => {
                    console.warning(format!(
                        "No user with email [{}] was found after scanning {} users.",
                        term, scan.scanned
                    ))?;
                    None
                }
            }
        } else {
            match directory.find_by_username(term).await? {
                UsernameMatch::Found(user) => Some(user.username),
                UsernameMatch::NotFound => {
                    console.warning(format!("User [{}] was NOT found.", term))?;
                    None
                }
                UsernameMatch::Ambiguous { total, candidates } => {
                    console.line(format_ambiguous_users(total, &candidates))?;
                    console.warning("Multiple Users were found.")?;
                    None
                }
            }
        };

        if let Some(username) = matched {
            if let Some(user) = self.show_existing(&username, console).await? {
                return Ok(Outcome::Existing(user));
            }
        }

        self.provision(term, console).await
    }

    async fn provision(&self, term: &str, console: &mut Console) -> Result<Outcome> {
        console.blank()?;
        console.line("Loading available roles...")?;
        let catalog = RoleCatalog::load(
            self.service,
            MATCH_ALL_PATTERN,
            &self.options.mandatory_role,
            self.options.page_size,
        )
        .await?;

        let roles = if catalog.is_empty() {
            console.warning(format!(
                "No optional roles available, assigning only [{}].",
                self.options.mandatory_role
            ))?;
            vec![self.options.mandatory_role.clone()]
        } else {
            select_roles(&catalog, &self.options.mandatory_role, console)?
        };

        let Some(username) = resolve_account_name(term, console)? else {
            console.warning("No account name given, user was NOT created.")?;
            return Ok(Outcome::NotCreated);
        };

        console.blank()?;
        console.line(format!(
            "Creating user [{}] in domain [{}]...",
            username, self.options.domain
        ))?;
        let user = self
            .directory()
            .create_user(&username, &self.options.domain, &roles)
            .await?;
        info!("Provisioned {}", user.username);

        console.line("   User was created.")?;
        console.blank()?;
        self.display(console, &user)?;
        Ok(Outcome::Created(user))
    }
}
