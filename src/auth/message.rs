//! Sign-In with Ethereum message parsing
//!
//! Parses the line-oriented EIP-4361 text that wallets sign into a claim set.
//! Parsing is lenient past the header: unknown keys are ignored and lines
//! without a `": "` separator are skipped.

use std::fmt;

use thiserror::Error;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const RESOURCES_HEADER: &str = "Resources:";
const MIN_LINES: usize = 4;

/// Errors produced while parsing a sign-in message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MessageParseError {
    #[error("Expected at least 4 lines, got {0}")]
    TooFewLines(usize),

    #[error("First line is not a sign-in request header")]
    MissingHeader,
}

/// Parsed EIP-4361 claim set
///
/// Optional fields hold the raw text from the message; timestamps are
/// interpreted by the auth service, not here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SiweMessage {
    pub domain: String,
    pub address: String,
    pub statement: String,
    pub uri: String,
    pub version: String,
    pub chain_id: String,
    pub nonce: String,
    pub issued_at: String,
    pub expiration_time: Option<String>,
    pub not_before: Option<String>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

impl SiweMessage {
    /// Parse a raw sign-in message
    pub fn parse(raw: &str) -> Result<Self, MessageParseError> {
        let lines: Vec<&str> = raw
            .split('\n')
            .map(|line| line.strip_suffix('\r').unwrap_or(line))
            .collect();

        if lines.len() < MIN_LINES {
            return Err(MessageParseError::TooFewLines(lines.len()));
        }

        let domain = lines[0]
            .trim_end()
            .strip_suffix(HEADER_SUFFIX)
            .filter(|d| !d.is_empty())
            .ok_or(MessageParseError::MissingHeader)?;

        let mut message = SiweMessage {
            domain: domain.to_string(),
            address: lines[1].trim().to_string(),
            ..Default::default()
        };

        // lines[2] is the blank separator after the address
        let statement_start = 3;
        let statement_end = lines[statement_start..]
            .iter()
            .position(|line| line.trim().is_empty() || line.starts_with("URI:"))
            .map(|offset| statement_start + offset)
            .unwrap_or(statement_start);

        if statement_end > statement_start {
            message.statement = lines[statement_start..statement_end].join("\n");
        }

        let mut in_resources = false;
        for line in &lines[statement_end..] {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            if line == RESOURCES_HEADER {
                in_resources = true;
                continue;
            }
            if in_resources {
                if let Some(resource) = line.strip_prefix("- ") {
                    message.resources.push(resource.to_string());
                    continue;
                }
                in_resources = false;
            }

            let Some((key, value)) = line.split_once(": ") else {
                continue;
            };

            match key {
                "URI" => message.uri = value.to_string(),
                "Version" => message.version = value.to_string(),
                "Chain ID" => message.chain_id = value.to_string(),
                "Nonce" => message.nonce = value.to_string(),
                "Issued At" => message.issued_at = value.to_string(),
                "Expiration Time" => message.expiration_time = Some(value.to_string()),
                "Not Before" => message.not_before = Some(value.to_string()),
                "Request ID" => message.request_id = Some(value.to_string()),
                _ => {}
            }
        }

        Ok(message)
    }
}

/// Renders the canonical EIP-4361 text for this claim set
impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}{}", self.domain, HEADER_SUFFIX)?;
        writeln!(f, "{}", self.address)?;
        writeln!(f)?;
        if !self.statement.is_empty() {
            writeln!(f, "{}", self.statement)?;
            writeln!(f)?;
        }
        writeln!(f, "URI: {}", self.uri)?;
        writeln!(f, "Version: {}", self.version)?;
        writeln!(f, "Chain ID: {}", self.chain_id)?;
        writeln!(f, "Nonce: {}", self.nonce)?;
        write!(f, "Issued At: {}", self.issued_at)?;
        if let Some(expiration_time) = &self.expiration_time {
            write!(f, "\nExpiration Time: {}", expiration_time)?;
        }
        if let Some(not_before) = &self.not_before {
            write!(f, "\nNot Before: {}", not_before)?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\nRequest ID: {}", request_id)?;
        }
        if !self.resources.is_empty() {
            write!(f, "\n{}", RESOURCES_HEADER)?;
            for resource in &self.resources {
                write!(f, "\n- {}", resource)?;
            }
        }
        Ok(())
    }
}
