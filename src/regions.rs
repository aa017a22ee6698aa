//! LibreLinkUp regional API hosts
//!
//! Accounts live on one regional host. A login against the global host
//! answers with a redirect naming the region code to use instead.

/// Host used for the first login attempt
pub const DEFAULT_HOST: &str = "https://api.libreview.io";

/// Region code -> regional API host
pub const REGIONS: &[(&str, &str)] = &[
    ("AE", "https://api-ae.libreview.io"),
    ("AP", "https://api-ap.libreview.io"),
    ("AU", "https://api-au.libreview.io"),
    ("CA", "https://api-ca.libreview.io"),
    ("DE", "https://api-de.libreview.io"),
    ("EU", "https://api-eu.libreview.io"),
    ("EU2", "https://api-eu2.libreview.io"),
    ("FR", "https://api-fr.libreview.io"),
    ("JP", "https://api-jp.libreview.io"),
    ("US", "https://api-us.libreview.io"),
];

/// Canonical form of a region code as the service may send it ("eu2" -> "EU2")
pub fn normalize_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

/// Look up the host for a region code, case-insensitively
pub fn host_for(code: &str) -> Option<&'static str> {
    let code = normalize_code(code);
    REGIONS
        .iter()
        .find(|(region, _)| *region == code)
        .map(|(_, host)| *host)
}
