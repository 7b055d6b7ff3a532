use covadmin_types::{
    GroupFilterSpec, GroupSearchResult, PageSpec, UserFilterSpec, UserRecord, UserSearchResult,
    UserSpec,
};
use roxmltree::Node;

use crate::protocol::{
    child, child_bool, child_text, child_u64, children, decode_envelope, SoapError, XmlBody,
};

pub const GET_USERS: &str = "getUsers";
pub const GET_USER: &str = "getUser";
pub const GET_GROUPS: &str = "getGroups";
pub const CREATE_USER: &str = "createUser";

// ============================================================================
// Requests
// ============================================================================

fn encode_page_spec(body: &mut XmlBody, page: &PageSpec) {
    body.open("pageSpec");
    body.text("pageSize", &page.page_size.to_string());
    if let Some(ascending) = page.sort_ascending {
        body.text("sortAscending", if ascending { "true" } else { "false" });
    }
    if let Some(field) = &page.sort_field {
        body.text("sortField", field);
    }
    body.text("startIndex", &page.start_index.to_string());
    body.close("pageSpec");
}

pub fn encode_get_users(filter: &UserFilterSpec, page: &PageSpec) -> String {
    let mut body = XmlBody::new();
    body.open("filterSpec")
        .text("namePattern", &filter.name_pattern)
        .close("filterSpec");
    encode_page_spec(&mut body, page);
    body.into_string()
}

pub fn encode_get_user(username: &str) -> String {
    let mut body = XmlBody::new();
    body.text("username", username);
    body.into_string()
}

pub fn encode_get_groups(filter: &GroupFilterSpec, page: &PageSpec) -> String {
    let mut body = XmlBody::new();
    body.open("filterSpec")
        .text("namePattern", &filter.name_pattern)
        .close("filterSpec");
    encode_page_spec(&mut body, page);
    body.into_string()
}

pub fn encode_create_user(spec: &UserSpec) -> String {
    let mut body = XmlBody::new();
    body.open("userSpec");
    body.open("domain").text("name", &spec.domain).close("domain");
    for group in &spec.group_names {
        body.text("groupNames", group);
    }
    body.text("username", &spec.username);
    body.close("userSpec");
    body.into_string()
}

// ============================================================================
// Responses
// ============================================================================

/// Group ids arrive either as `<name>X</name>` or nested as
/// `<name><name>X</name><displayName>..</displayName></name>`.
fn group_name(node: Node) -> Option<String> {
    match child(node, "name") {
        Some(inner) => group_name(inner),
        None => node
            .text()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty()),
    }
}

fn decode_user(node: Node, operation: &str) -> Result<UserRecord, SoapError> {
    let username = child_text(node, "username").ok_or_else(|| SoapError::Malformed {
        operation: operation.to_string(),
        message: "user without username".to_string(),
    })?;

    Ok(UserRecord {
        username,
        domain: child(node, "domain").and_then(|d| child_text(d, "name")),
        email: child_text(node, "email"),
        given_name: child_text(node, "givenName"),
        family_name: child_text(node, "familyName"),
        groups: children(node, "groups").filter_map(group_name).collect(),
        disabled: child_bool(node, "disabled"),
        locked: child_bool(node, "locked"),
        local: child_bool(node, "local"),
        super_user: child_bool(node, "superUser"),
        date_created: child_text(node, "dateCreated"),
        created_by: child_text(node, "createdBy"),
        last_login: child_text(node, "lastLogin"),
    })
}

fn missing_return(operation: &str) -> SoapError {
    SoapError::Malformed {
        operation: operation.to_string(),
        message: "missing return".to_string(),
    }
}

pub fn decode_get_users(xml: &str) -> Result<UserSearchResult, SoapError> {
    decode_envelope(xml, GET_USERS, |ret| {
        let ret = ret.ok_or_else(|| missing_return(GET_USERS))?;
        let users = children(ret, "users")
            .map(|u| decode_user(u, GET_USERS))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(UserSearchResult {
            total_count: child_u64(ret, "totalNumberOfRecords", GET_USERS)?,
            users,
        })
    })
}

pub fn decode_get_user(xml: &str) -> Result<UserRecord, SoapError> {
    decode_envelope(xml, GET_USER, |ret| {
        let ret = ret.ok_or_else(|| missing_return(GET_USER))?;
        decode_user(ret, GET_USER)
    })
}

pub fn decode_get_groups(xml: &str) -> Result<GroupSearchResult, SoapError> {
    decode_envelope(xml, GET_GROUPS, |ret| {
        let ret = ret.ok_or_else(|| missing_return(GET_GROUPS))?;
        Ok(GroupSearchResult {
            total_count: child_u64(ret, "totalNumberOfRecords", GET_GROUPS)?,
            groups: children(ret, "groups").filter_map(group_name).collect(),
        })
    })
}

pub fn decode_create_user(xml: &str) -> Result<(), SoapError> {
    decode_envelope(xml, CREATE_USER, |_| Ok(()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::SOAP_ENV_NS;

    fn response(operation: &str, inner: &str) -> String {
        format!(
            r#"<soap:Envelope xmlns:soap="{}"><soap:Body><ns2:{op}Response xmlns:ns2="http://ws.coverity.com/v9">{}</ns2:{op}Response></soap:Body></soap:Envelope>"#,
            SOAP_ENV_NS,
            inner,
            op = operation
        )
    }

    #[test]
    fn test_encode_get_users_orders_page_fields() {
        let page = PageSpec::new(1, 0).sorted_by("email", true);
        let body = encode_get_users(&UserFilterSpec::new("*"), &page);
        assert_eq!(
            body,
            "<filterSpec><namePattern>*</namePattern></filterSpec>\
             <pageSpec><pageSize>1</pageSize><sortAscending>true</sortAscending>\
             <sortField>email</sortField><startIndex>0</startIndex></pageSpec>"
        );
    }

    #[test]
    fn test_encode_create_user() {
        let spec = UserSpec {
            username: "jdoe".to_string(),
            domain: "corpzone".to_string(),
            group_names: vec!["Users".to_string(), "Developers".to_string()],
        };
        assert_eq!(
            encode_create_user(&spec),
            "<userSpec><domain><name>corpzone</name></domain>\
             <groupNames>Users</groupNames><groupNames>Developers</groupNames>\
             <username>jdoe</username></userSpec>"
        );
    }

    #[test]
    fn test_decode_users() {
        let xml = response(
            GET_USERS,
            r#"<return><totalNumberOfRecords>2</totalNumberOfRecords>
            <users><username>jdoe</username><email>JDoe@example.com</email>
              <domain><name>corpzone</name></domain>
              <groups><name>Users</name></groups><groups><name>Developers</name></groups>
              <disabled>false</disabled><locked>true</locked>
              <dateCreated>2020-01-02T03:04:05Z</dateCreated><createdBy>admin</createdBy></users>
            <users><username>asmith</username></users></return>"#,
        );
        let result = decode_get_users(&xml).unwrap();
        assert_eq!(result.total_count, 2);
        assert_eq!(result.users.len(), 2);
        let jdoe = &result.users[0];
        assert_eq!(jdoe.domain.as_deref(), Some("corpzone"));
        assert!(jdoe.groups.contains("Developers"));
        assert!(!jdoe.disabled);
        assert!(jdoe.locked);
        assert_eq!(jdoe.created_by.as_deref(), Some("admin"));
        assert_eq!(result.users[1].email, None);
    }

    #[test]
    fn test_decode_users_without_page() {
        let xml = response(
            GET_USERS,
            "<return><totalNumberOfRecords>7</totalNumberOfRecords></return>",
        );
        let result = decode_get_users(&xml).unwrap();
        assert_eq!(result.total_count, 7);
        assert!(result.users.is_empty());
    }

    #[test]
    fn test_decode_nested_group_names() {
        let xml = response(
            GET_GROUPS,
            r#"<return><totalNumberOfRecords>2</totalNumberOfRecords>
            <groups><name><name>Users</name><displayName>Users</displayName></name></groups>
            <groups><name><name>Admins</name></name></groups></return>"#,
        );
        let result = decode_get_groups(&xml).unwrap();
        assert_eq!(result.groups, vec!["Users", "Admins"]);
    }

    #[test]
    fn test_decode_user_requires_username() {
        let xml = response(GET_USER, "<return><email>x@y.z</email></return>");
        assert!(matches!(
            decode_get_user(&xml),
            Err(SoapError::Malformed { .. })
        ));
    }
}
