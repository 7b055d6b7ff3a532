use roxmltree::{Document, Node};
use thiserror::Error;

pub const SOAP_ENV_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const COVERITY_NS: &str = "http://ws.coverity.com/v9";
pub const WSSE_NS: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-wssecurity-secext-1.0.xsd";
pub const PASSWORD_TEXT_TYPE: &str =
    "http://docs.oasis-open.org/wss/2004/01/oasis-200401-wss-username-token-profile-1.0#PasswordText";

#[derive(Error, Debug)]
pub enum SoapError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Unable to reach {url}: {message}")]
    Connection { url: String, message: String },
    #[error("Unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
    #[error("XML parse error: {0}")]
    Xml(#[from] roxmltree::Error),
    #[error("Malformed {operation} response: {message}")]
    Malformed { operation: String, message: String },
    #[error("{0}")]
    Fault(SoapFault),
}

impl SoapError {
    fn malformed(operation: &str, message: impl Into<String>) -> Self {
        SoapError::Malformed {
            operation: operation.to_string(),
            message: message.into(),
        }
    }

    pub fn as_fault(&self) -> Option<&SoapFault> {
        match self {
            SoapError::Fault(fault) => Some(fault),
            _ => None,
        }
    }
}

/// A `soap:Fault` returned by the server, with the service-specific error
/// code from the fault detail when present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SoapFault {
    pub code: String,
    pub message: String,
    pub error_code: Option<String>,
}

impl std::fmt::Display for SoapFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.error_code {
            Some(error_code) => write!(f, "SOAP fault {} ({}): {}", self.code, error_code, self.message),
            None => write!(f, "SOAP fault {}: {}", self.code, self.message),
        }
    }
}

impl std::error::Error for SoapFault {}

const NOT_FOUND_PHRASES: &[&str] = &["not found", "no user", "does not exist", "cannot find"];

impl SoapFault {
    /// The server has no dedicated fault for a missing account, so this is a
    /// best-effort match: the message must name the user and carry one of
    /// the known "not found" phrasings.
    pub fn is_no_such_user(&self, username: &str) -> bool {
        let message = self.message.to_lowercase();
        let username = username.to_lowercase();
        !username.is_empty()
            && message.contains(&username)
            && NOT_FOUND_PHRASES.iter().any(|p| message.contains(p))
    }
}

// ============================================================================
// Encoding
// ============================================================================

/// Minimal builder for the unqualified child elements of a request body.
#[derive(Debug, Default)]
pub struct XmlBody {
    buf: String,
}

impl XmlBody {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, name: &str) -> &mut Self {
        self.buf.push('<');
        self.buf.push_str(name);
        self.buf.push('>');
        self
    }

    pub fn close(&mut self, name: &str) -> &mut Self {
        self.buf.push_str("</");
        self.buf.push_str(name);
        self.buf.push('>');
        self
    }

    pub fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.open(name);
        self.buf.push_str(&escape(value));
        self.close(name)
    }

    pub fn into_string(self) -> String {
        self.buf
    }
}

pub fn escape(value: &str) -> String {
    xml::escape::escape_str_attribute(value).to_string()
}

/// Wraps an operation body in a SOAP 1.1 envelope carrying a WS-Security
/// `UsernameToken` header.
pub fn encode_envelope(operation: &str, username: &str, password: &str, body: &str) -> String {
    format!(
        concat!(
            r#"<?xml version="1.0" encoding="UTF-8"?>"#,
            r#"<soapenv:Envelope xmlns:soapenv="{env}" xmlns:ws="{ws}">"#,
            r#"<soapenv:Header>"#,
            r#"<wsse:Security xmlns:wsse="{wsse}" soapenv:mustUnderstand="1">"#,
            r#"<wsse:UsernameToken>"#,
            r#"<wsse:Username>{username}</wsse:Username>"#,
            r#"<wsse:Password Type="{password_type}">{password}</wsse:Password>"#,
            r#"</wsse:UsernameToken>"#,
            r#"</wsse:Security>"#,
            r#"</soapenv:Header>"#,
            r#"<soapenv:Body><ws:{operation}>{body}</ws:{operation}></soapenv:Body>"#,
            r#"</soapenv:Envelope>"#,
        ),
        env = SOAP_ENV_NS,
        ws = COVERITY_NS,
        wsse = WSSE_NS,
        username = escape(username),
        password_type = PASSWORD_TEXT_TYPE,
        password = escape(password),
        operation = operation,
        body = body,
    )
}

// ============================================================================
// Decoding
// ============================================================================

fn find_body<'a, 'input>(doc: &'a Document<'input>) -> Option<Node<'a, 'input>> {
    doc.root_element().children().find(|n| {
        n.is_element()
            && n.tag_name().name() == "Body"
            && n.tag_name().namespace().is_some_and(|ns| ns == SOAP_ENV_NS)
    })
}

fn decode_fault(fault: Node) -> SoapFault {
    SoapFault {
        code: child_text(fault, "faultcode").unwrap_or_default(),
        message: child_text(fault, "faultstring").unwrap_or_default(),
        error_code: fault
            .descendants()
            .find(|n| n.is_element() && n.tag_name().name() == "errorCode")
            .and_then(|n| n.text())
            .map(|t| t.trim().to_string()),
    }
}

/// Extracts a fault from a response body, if it holds one.
pub fn parse_fault(xml: &str) -> Option<SoapFault> {
    let doc = Document::parse(xml).ok()?;
    let body = find_body(&doc)?;
    body.children()
        .find(|n| n.is_element() && n.tag_name().name() == "Fault")
        .map(decode_fault)
}

/// Parses a response envelope and hands the `<return>` element of
/// `<{operation}Response>` to `decode`. Operations without a return value
/// receive `None`.
pub fn decode_envelope<T>(
    xml: &str,
    operation: &str,
    decode: impl FnOnce(Option<Node>) -> Result<T, SoapError>,
) -> Result<T, SoapError> {
    let doc = Document::parse(xml)?;
    let body = find_body(&doc).ok_or_else(|| SoapError::malformed(operation, "missing Body"))?;

    if let Some(fault) = body
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == "Fault")
    {
        return Err(SoapError::Fault(decode_fault(fault)));
    }

    let response_name = format!("{}Response", operation);
    let response = body
        .children()
        .find(|n| n.is_element() && n.tag_name().name() == response_name)
        .ok_or_else(|| SoapError::malformed(operation, format!("missing {}", response_name)))?;

    decode(child(response, "return"))
}

pub fn child<'a, 'input>(node: Node<'a, 'input>, name: &str) -> Option<Node<'a, 'input>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

pub fn children<'a, 'input: 'a>(
    node: Node<'a, 'input>,
    name: &'a str,
) -> impl Iterator<Item = Node<'a, 'input>> + 'a {
    node.children()
        .filter(move |n| n.is_element() && n.tag_name().name() == name)
}

pub fn child_text(node: Node, name: &str) -> Option<String> {
    child(node, name)
        .and_then(|n| n.text())
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

pub fn child_bool(node: Node, name: &str) -> bool {
    child_text(node, name).is_some_and(|t| t.eq_ignore_ascii_case("true"))
}

pub fn child_u64(node: Node, name: &str, operation: &str) -> Result<u64, SoapError> {
    let text = child_text(node, name)
        .ok_or_else(|| SoapError::malformed(operation, format!("missing {}", name)))?;
    text.parse()
        .map_err(|_| SoapError::malformed(operation, format!("invalid {}: {}", name, text)))
}
