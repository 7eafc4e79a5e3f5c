pub mod credential_utils;
pub mod manifest_utils;
pub mod url_policy_utils;
