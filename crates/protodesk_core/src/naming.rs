//! Protocol naming conventions derived from the server table.
//!
//! Protocol units are prefixed with the short names of their two endpoints:
//! single-letter client short names when the client is one endpoint
//! (`CG_Login`), four-letter server short names otherwise (`GameAuth_Sync`).

use crate::config::ServerAlias;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamingError {
    /// Full or short name is not in the server table.
    UnknownServer(String),
    /// No server is marked as the client.
    MissingClient,
    /// Name has no `<prefix>_` part of the expected length.
    MalformedProtoName(String),
}

impl Display for NamingError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownServer(name) => write!(f, "server `{name}` is not configured"),
            Self::MissingClient => write!(f, "no server is marked as the client"),
            Self::MalformedProtoName(name) => write!(f, "cannot derive servers from `{name}`"),
        }
    }
}

impl Error for NamingError {}

/// Short name of the client endpoint.
pub fn client_short_name(servers: &[ServerAlias]) -> Result<&str, NamingError> {
    servers
        .iter()
        .find(|server| server.is_client)
        .map(|server| server.client_short.as_str())
        .ok_or(NamingError::MissingClient)
}

/// Full server name for a client or server short name.
pub fn full_server_name<'a>(
    servers: &'a [ServerAlias],
    short_name: &str,
    client_short: bool,
) -> Result<&'a str, NamingError> {
    servers
        .iter()
        .find(|server| {
            let candidate = if client_short {
                &server.client_short
            } else {
                &server.server_short
            };
            !candidate.is_empty() && candidate == short_name
        })
        .map(|server| server.full_name.as_str())
        .ok_or_else(|| NamingError::UnknownServer(short_name.to_string()))
}

/// Prefix `<source><target>_` for a protocol between two servers.
pub fn proto_prefix(servers: &[ServerAlias], source: &str, target: &str) -> Result<String, NamingError> {
    let involves_client = servers
        .iter()
        .any(|server| server.is_client && (server.full_name == source || server.full_name == target));
    let short_of = |full_name: &str| {
        servers
            .iter()
            .find(|server| server.full_name == full_name)
            .map(|server| {
                if involves_client {
                    server.client_short.as_str()
                } else {
                    server.server_short.as_str()
                }
            })
            .ok_or_else(|| NamingError::UnknownServer(full_name.to_string()))
    };
    Ok(format!("{}{}_", short_of(source)?, short_of(target)?))
}

/// Rewrites `name` to carry the prefix for `source -> target`.
///
/// Every `_`-separated segment after the first is kept and concatenated;
/// a name without `_` collapses to the bare prefix.
pub fn normalize_proto_name(
    servers: &[ServerAlias],
    source: &str,
    target: &str,
    name: &str,
) -> Result<String, NamingError> {
    let mut normalized = proto_prefix(servers, source, target)?;
    for segment in name.split('_').skip(1) {
        normalized.push_str(segment);
    }
    info!(
        "event=proto_name_normalize module=naming status=ok source={} target={} input={} output={}",
        source, target, name, normalized
    );
    Ok(normalized)
}

/// Full names of both endpoints encoded in a protocol name prefix.
pub fn detect_servers<'a>(
    servers: &'a [ServerAlias],
    proto_name: &str,
) -> Result<(&'a str, &'a str), NamingError> {
    let malformed = || NamingError::MalformedProtoName(proto_name.to_string());
    let (prefix, _) = proto_name.split_once('_').ok_or_else(malformed)?;
    if prefix.is_empty() || !prefix.is_ascii() {
        return Err(malformed());
    }

    let client = client_short_name(servers)?;
    let (first, second) = prefix.split_at(prefix.len() / 2);
    let client_proto = prefix.len() == 2 && (first == client || second == client);
    let expected_len = if client_proto { 2 } else { 4 };
    if prefix.len() != expected_len {
        warn!(
            "event=proto_name_detect module=naming status=rejected name={} prefix_len={}",
            proto_name,
            prefix.len()
        );
        return Err(malformed());
    }

    Ok((
        full_server_name(servers, first, client_proto)?,
        full_server_name(servers, second, client_proto)?,
    ))
}

#[cfg(test)]
mod tests {
    use super::{detect_servers, normalize_proto_name, proto_prefix, NamingError};
    use crate::config::ServerAlias;

    fn servers() -> Vec<ServerAlias> {
        let alias = |full: &str, client: &str, server: &str, is_client: bool| ServerAlias {
            full_name: full.to_string(),
            client_short: client.to_string(),
            server_short: server.to_string(),
            is_client,
        };
        vec![
            alias("Client", "C", "Clnt", true),
            alias("GameServer", "G", "Game", false),
            alias("AuthServer", "A", "Auth", false),
        ]
    }

    #[test]
    fn prefix_uses_client_short_names_when_client_involved() {
        let servers = servers();
        assert_eq!(proto_prefix(&servers, "Client", "GameServer").unwrap(), "CG_");
        assert_eq!(proto_prefix(&servers, "GameServer", "AuthServer").unwrap(), "GameAuth_");
        assert_eq!(
            proto_prefix(&servers, "GameServer", "Nowhere").unwrap_err(),
            NamingError::UnknownServer("Nowhere".into())
        );
    }

    #[test]
    fn normalize_replaces_prefix_and_joins_segments() {
        let servers = servers();
        assert_eq!(
            normalize_proto_name(&servers, "Client", "GameServer", "XY_Login_Req").unwrap(),
            "CG_LoginReq"
        );
        assert_eq!(
            normalize_proto_name(&servers, "GameServer", "AuthServer", "Plain").unwrap(),
            "GameAuth_"
        );
    }

    #[test]
    fn detect_servers_from_prefix() {
        let servers = servers();
        assert_eq!(
            detect_servers(&servers, "CG_Login").unwrap(),
            ("Client", "GameServer")
        );
        assert_eq!(
            detect_servers(&servers, "GameAuth_Sync").unwrap(),
            ("GameServer", "AuthServer")
        );
        assert!(matches!(
            detect_servers(&servers, "Login"),
            Err(NamingError::MalformedProtoName(_))
        ));
        assert!(matches!(
            detect_servers(&servers, "GAX_Login"),
            Err(NamingError::MalformedProtoName(_))
        ));
    }

    #[test]
    fn detect_requires_a_client() {
        let servers = servers()
            .into_iter()
            .filter(|server| !server.is_client)
            .collect::<Vec<_>>();
        assert_eq!(
            detect_servers(&servers, "GameAuth_Sync").unwrap_err(),
            NamingError::MissingClient
        );
    }
}
