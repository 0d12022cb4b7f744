//! Origin trust decisions for inbound messages.
//!
//! Matching is exact: an origin is trusted only if `https://<host>` appears in
//! the built-in host list or verbatim in the caller-supplied list. Subdomains
//! and look-alike suffixes of a trusted host are rejected.

use std::collections::HashSet;
use tracing::warn;

/// The only scheme accepted for any trusted origin.
pub const TRUSTED_SCHEME: &str = "https://";

/// Production, government and sovereign-cloud host domains.
pub const PRODUCTION_HOSTS: &[&str] = &[
    "teams.microsoft.com",
    "teams.microsoft.us",
    "gov.teams.microsoft.us",
    "dod.teams.microsoft.us",
    "retailservices.teams.microsoft.com",
    "teams.live.com",
    "teams.cloud.microsoft",
    "microsoft.sharepoint.com",
    "microsoft.sharepointonline.com",
    "outlook.office.com",
    "outlook.office365.com",
    "outlook.office365.us",
    "outlook.live.com",
    "www.office.com",
    "word.office.com",
    "excel.office.com",
    "powerpoint.office.com",
    "www.microsoft365.com",
    "teams.microsoftonline.cn",
    "outlook.office365.cn",
];

/// Pre-production and test host domains.
pub const PRE_PRODUCTION_HOSTS: &[&str] = &[
    "int.teams.microsoft.com",
    "devspaces.skype.com",
    "ssauth.skype.com",
    "local.teams.live.com",
    "local.teams.live.com:8080",
    "local.teams.office.com",
    "local.teams.office.com:8080",
    "msft.spoppe.com",
    "microsoft.sharepoint-df.com",
    "outlook-sdf.office.com",
    "outlook-sdf.office365.com",
    "www.officeppe.com",
];

/// Resolved set of trusted origins for one session.
///
/// Built once from the built-in hosts plus any extra origins; immutable
/// afterwards.
#[derive(Debug, Clone)]
pub struct OriginValidator {
    trusted: HashSet<String>,
}

impl OriginValidator {
    /// Validator trusting only the built-in hosts.
    pub fn builtin(include_pre_production: bool) -> Self {
        let mut hosts: Vec<&str> = PRODUCTION_HOSTS.to_vec();
        if include_pre_production {
            hosts.extend_from_slice(PRE_PRODUCTION_HOSTS);
        }
        let trusted = hosts
            .into_iter()
            .map(|host| format!("{TRUSTED_SCHEME}{host}"))
            .collect();
        Self { trusted }
    }

    /// Validator trusting the built-in hosts plus `extra` origins.
    ///
    /// Extra entries must be full `https://host[:port]` origins. Anything else
    /// is ignored.
    pub fn with_extra<I, S>(include_pre_production: bool, extra: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut validator = Self::builtin(include_pre_production);
        for origin in extra {
            let origin = origin.as_ref();
            if is_well_formed(origin) {
                validator.trusted.insert(origin.to_string());
            } else {
                warn!(origin = %origin, "Ignoring malformed or non-https trusted origin");
            }
        }
        validator
    }

    /// Whether `origin` is in the resolved allow-list.
    pub fn is_trusted(&self, origin: &str) -> bool {
        self.trusted.contains(origin)
    }

    pub fn len(&self) -> usize {
        self.trusted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trusted.is_empty()
    }
}

/// `https://` followed by a non-empty authority with no path, query or
/// fragment.
fn is_well_formed(origin: &str) -> bool {
    match origin.strip_prefix(TRUSTED_SCHEME) {
        Some(authority) => {
            !authority.is_empty()
                && !authority.contains(['/', '?', '#', ' ', '@'])
                && !authority.starts_with(':')
        }
        None => false,
    }
}
