//! URI decomposition
//!
//! Splits a URI reference into its parts following the RFC 3986 grammar.
//! Opaque URIs (`mailto:a@b.com`) only carry a scheme, a scheme-specific
//! part and an optional fragment; hierarchical ones are split further into
//! authority, path and query.

use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;
use thiserror::Error;

/// RFC 3986 appendix B
static URI_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:([^:/?#]+):)?(?://([^/?#]*))?([^?#]*)(?:\?([^#]*))?(?:#(.*))?$")
        .expect("URI reference grammar is a valid regex")
});

static SCHEME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*$").expect("scheme grammar is a valid regex")
});

/// Why a string is not a URI
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("illegal character '{ch}' at index {position}")]
    IllegalCharacter { ch: char, position: usize },

    #[error("malformed escape sequence at index {0}")]
    MalformedEscape(usize),

    #[error("illegal scheme name '{0}'")]
    IllegalScheme(String),

    #[error("expected scheme-specific part after '{0}:'")]
    MissingSchemeSpecificPart(String),

    #[error("malformed authority '{0}'")]
    MalformedAuthority(String),

    #[error("illegal port '{0}'")]
    IllegalPort(String),
}

/// The parts of a parsed URI reference
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecomposedUri {
    pub scheme: Option<String>,
    pub scheme_specific_part: Option<String>,
    pub authority: Option<String>,
    pub user_info: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub path: Option<String>,
    pub query: Option<String>,
    pub fragment: Option<String>,
}

impl DecomposedUri {
    pub fn parse(input: &str) -> Result<Self, UriError> {
        check_characters(input)?;

        let caps = URI_REFERENCE
            .captures(input)
            .ok_or_else(|| UriError::MalformedAuthority(input.to_string()))?;
        let group = |i: usize| caps.get(i).map(|m| m.as_str());

        let scheme = group(1);
        let fragment = group(5);

        if let Some(fragment) = fragment {
            no_brackets(input, fragment)?;
            if let Some(pos) = fragment.find('#') {
                return Err(UriError::IllegalCharacter {
                    ch: '#',
                    position: input.len() - fragment.len() + pos,
                });
            }
        }

        let before_fragment = match input.find('#') {
            Some(idx) => &input[..idx],
            None => input,
        };
        let ssp = match scheme {
            Some(s) => {
                if !SCHEME.is_match(s) {
                    return Err(UriError::IllegalScheme(s.to_string()));
                }
                &before_fragment[s.len() + 1..]
            }
            None => before_fragment,
        };

        let mut uri = DecomposedUri {
            scheme: scheme.map(String::from),
            scheme_specific_part: non_empty(ssp),
            fragment: fragment.map(String::from),
            ..Default::default()
        };

        if let Some(s) = scheme {
            if ssp.is_empty() {
                return Err(UriError::MissingSchemeSpecificPart(s.to_string()));
            }
            if !ssp.starts_with('/') {
                no_brackets(input, ssp)?;
                return Ok(uri);
            }
        }

        let path = group(3).unwrap_or_default();
        no_brackets(input, path)?;
        uri.path = Some(path.to_string());

        if let Some(query) = group(4) {
            no_brackets(input, query)?;
            uri.query = Some(query.to_string());
        }

        if let Some(authority) = group(2).filter(|a| !a.is_empty()) {
            uri.parse_authority(authority)?;
        }

        Ok(uri)
    }

    /// Split `[userinfo@]host[:port]`
    fn parse_authority(&mut self, authority: &str) -> Result<(), UriError> {
        let malformed = || UriError::MalformedAuthority(authority.to_string());

        let (user_info, host_port) = match authority.split_once('@') {
            Some((user_info, rest)) => (Some(user_info), rest),
            None => (None, authority),
        };
        if user_info.is_some_and(|u| u.contains(['[', ']'])) {
            return Err(malformed());
        }

        let (host, port) = if let Some(bracketed) = host_port.strip_prefix('[') {
            let end = bracketed.find(']').ok_or_else(malformed)?;
            let host = &host_port[..end + 2];
            let rest = &bracketed[end + 1..];
            if end == 0 || (!rest.is_empty() && !rest.starts_with(':')) {
                return Err(malformed());
            }
            (host, rest.strip_prefix(':'))
        } else {
            match host_port.rsplit_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (host_port, None),
            }
        };

        let ip_literal = host.starts_with('[');
        let stray_bracket = host
            .char_indices()
            .any(|(i, c)| (c == '[' && i > 0) || (c == ']' && !ip_literal));
        if host.is_empty() || host.contains('@') || stray_bracket {
            return Err(malformed());
        }

        self.port = match port.filter(|p| !p.is_empty()) {
            Some(p) if p.bytes().all(|b| b.is_ascii_digit()) => Some(
                p.parse::<u16>()
                    .map_err(|_| UriError::IllegalPort(p.to_string()))?,
            ),
            Some(p) => return Err(UriError::IllegalPort(p.to_string())),
            None => None,
        };
        self.authority = Some(authority.to_string());
        self.user_info = user_info.map(String::from);
        self.host = Some(host.to_string());
        Ok(())
    }

    /// Opaque URIs have a scheme and no hierarchical structure
    pub fn is_opaque(&self) -> bool {
        self.scheme.is_some() && self.path.is_none()
    }

    pub fn is_absolute(&self) -> bool {
        self.scheme.is_some()
    }
}

impl FromStr for DecomposedUri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Whether `s` is a syntactically valid scheme name
pub fn is_valid_scheme(s: &str) -> bool {
    SCHEME.is_match(s)
}

fn non_empty(s: &str) -> Option<String> {
    (!s.is_empty()).then(|| s.to_string())
}

fn check_characters(input: &str) -> Result<(), UriError> {
    let bytes = input.as_bytes();

    for (position, ch) in input.char_indices() {
        let allowed = match ch {
            '%' => {
                let escape = bytes.get(position + 1..position + 3);
                if !escape.is_some_and(|e| e.iter().all(u8::is_ascii_hexdigit)) {
                    return Err(UriError::MalformedEscape(position));
                }
                true
            }
            c if c.is_ascii_alphanumeric() => true,
            '-' | '.' | '_' | '~' => true,
            ':' | '/' | '?' | '#' | '[' | ']' | '@' => true,
            '!' | '$' | '&' | '\'' | '(' | ')' | '*' | '+' | ',' | ';' | '=' => true,
            c if c.is_ascii() => false,
            c => !c.is_control() && !c.is_whitespace(),
        };
        if !allowed {
            return Err(UriError::IllegalCharacter { ch, position });
        }
    }
    Ok(())
}

/// Brackets are only legal around an IPv6 host
fn no_brackets(input: &str, part: &str) -> Result<(), UriError> {
    match part.find(['[', ']']) {
        Some(idx) => {
            let offset = part.as_ptr() as usize - input.as_ptr() as usize;
            Err(UriError::IllegalCharacter {
                ch: part[idx..].chars().next().unwrap_or('['),
                position: offset + idx,
            })
        }
        None => Ok(()),
    }
}
