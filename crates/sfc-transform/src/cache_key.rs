//! Cache keys for transformed files.

use sha2::{Digest, Sha256};

use crate::config::PipelineConfig;

/// Digest over everything that changes a transform's output.
///
/// The serialized project configuration is hashed as well as the host's
/// config string, since hosts may leave the string empty.
fn host_digest(file_data: &str, filename: &str, config: &PipelineConfig) -> [u8; 32] {
    let project = serde_json::to_string(&config.config)
        .unwrap_or_else(|_| format!("{:?}", config.config));

    let mut hasher = Sha256::new();
    for part in [
        env!("CARGO_PKG_VERSION"),
        file_data,
        filename,
        config.config_string.as_str(),
        project.as_str(),
        if config.instrument { "instrument" } else { "" },
        if config.supports_static_esm { "esm" } else { "cjs" },
    ] {
        hasher.update(part.as_bytes());
        hasher.update([0]);
    }
    hasher.finalize().into()
}

/// The cache key reported to the host: the MD5 of the content digest.
pub fn cache_key(file_data: &str, filename: &str, config: &PipelineConfig) -> String {
    format!("{:x}", md5::compute(host_digest(file_data, filename, config)))
}
