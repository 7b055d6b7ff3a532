use covadmin_config::{PASSWORD_OPTION, PORT_OPTION, SERVER_OPTION, USER_OPTION};
use covadmin_types::UserRecord;

pub const RULE: &str = "------------------------------------------";

/// One credentials option as it is loaded. The password is never shown.
pub fn format_credential_option(option: &str, value: &str) -> String {
    let label = match option {
        USER_OPTION => "Coverity Username",
        PASSWORD_OPTION => "Coverity Password",
        SERVER_OPTION => "Coverity Server",
        PORT_OPTION => "Coverity Port",
        other => other,
    };
    let shown = if option == PASSWORD_OPTION {
        "*".repeat(8)
    } else {
        value.to_string()
    };
    format!("      * {:<17} : {}", label, shown)
}

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

pub fn format_user_record(user: &UserRecord) -> String {
    let mut lines = vec![format!("   Username : {}", user.username)];

    let full_name = [user.given_name.as_deref(), user.family_name.as_deref()]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join(" ");
    if !full_name.is_empty() {
        lines.push(format!("   Name     : {}", full_name));
    }

    lines.push(format!(
        "   Domain   : {}",
        user.domain.as_deref().unwrap_or("-")
    ));
    lines.push(format!(
        "   Email    : {}",
        user.email.as_deref().unwrap_or("-")
    ));
    lines.push(format!(
        "   Groups   : {}",
        if user.groups.is_empty() {
            "-".to_string()
        } else {
            user.groups.iter().cloned().collect::<Vec<_>>().join(", ")
        }
    ));
    lines.push(format!("   Disabled : {}", yes_no(user.disabled)));
    lines.push(format!("   Locked   : {}", yes_no(user.locked)));

    if let Some(created) = &user.date_created {
        let by = user
            .created_by
            .as_ref()
            .map(|c| format!(" by {}", c))
            .unwrap_or_default();
        lines.push(format!("   Created  : {}{}", created, by));
    }
    if let Some(last_login) = &user.last_login {
        lines.push(format!("   Last login : {}", last_login));
    }

    lines.join("\n")
}

pub fn format_ambiguous_users(total: u64, candidates: &[UserRecord]) -> String {
    let mut lines = vec![
        RULE.to_string(),
        format!("Total Users Found: {}", total),
        RULE.to_string(),
        "WARNING: Multiple Users were found as follows:".to_string(),
    ];
    for user in candidates {
        let email = user
            .email
            .as_ref()
            .map(|e| format!(" <{}>", e))
            .unwrap_or_default();
        lines.push(format!("   Username: [{}]{}", user.username, email));
    }
    let shown = candidates.len() as u64;
    if total > shown {
        lines.push(format!("   ... and {} more", total - shown));
    }
    lines.join("\n")
}

/// Lays the roles out column-major, each entry prefixed with the index the
/// user types to pick it.
pub fn format_role_table(roles: &[String], width: usize) -> String {
    if roles.is_empty() {
        return "   (no optional roles available)".to_string();
    }

    let index_width = (roles.len() - 1).to_string().len();
    let name_width = roles.iter().map(|r| r.chars().count()).max().unwrap_or(0);
    // "[idx] name" plus two spaces of gutter
    let cell_width = index_width + 3 + name_width + 2;
    let columns = (width.saturating_sub(3) / cell_width).clamp(1, 4);
    let rows = roles.len().div_ceil(columns);

    let mut lines = Vec::with_capacity(rows);
    for row in 0..rows {
        let mut line = String::from("   ");
        for col in 0..columns {
            let index = col * rows + row;
            let Some(role) = roles.get(index) else {
                continue;
            };
            let cell = format!("[{:>w$}] {}", index, role, w = index_width);
            line.push_str(&format!("{:<cw$}", cell, cw = cell_width));
        }
        lines.push(line.trim_end().to_string());
    }
    lines.join("\n")
}

pub fn format_selection(selected: &[String]) -> String {
    let mut lines = vec!["Roles to assign:".to_string()];
    for role in selected {
        lines.push(format!("   * {}", role));
    }
    lines.join("\n")
}

pub fn format_scan_progress(scanned: u64, total: u64) -> String {
    format!("   Scanned {} of {} users...", scanned, total)
}
