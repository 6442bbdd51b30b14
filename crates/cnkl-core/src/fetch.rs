//! Chunklist retrieval over HTTP(S).
//!
//! Uses the curl crate (libcurl). A missing chunklist is not an error: Apple
//! serves none for some installers, so 404/410 and empty bodies map to
//! `Ok(None)` and the caller's `VerifyPolicy` decides what that means.

use std::time::Duration;
use thiserror::Error;

use crate::config::FetchConfig;

/// Chunklists are a few KiB; anything far larger is not a chunklist.
const MAX_CHUNKLIST_BYTES: usize = 16 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("chunklist request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: curl::Error,
    },

    #[error("chunklist request to {url} returned HTTP {code}")]
    Http { url: String, code: u32 },

    #[error("chunklist at {url} exceeds {} bytes", MAX_CHUNKLIST_BYTES)]
    TooLarge { url: String },
}

/// GET `url` and return the body, or `None` when no chunklist exists there.
///
/// Follows redirects. Runs in the current thread; call from `spawn_blocking`
/// if used from async code.
pub fn fetch_chunklist(url: &str, cfg: &FetchConfig) -> Result<Option<Vec<u8>>, FetchError> {
    let transport = |source| FetchError::Transport {
        url: url.to_string(),
        source,
    };

    let mut body: Vec<u8> = Vec::new();
    let mut overflow = false;

    let mut easy = curl::easy::Easy::new();
    easy.url(url).map_err(transport)?;
    easy.follow_location(true).map_err(transport)?;
    easy.connect_timeout(Duration::from_secs(cfg.connect_timeout_secs))
        .map_err(transport)?;
    easy.timeout(Duration::from_secs(cfg.timeout_secs))
        .map_err(transport)?;

    let performed = {
        let mut transfer = easy.transfer();
        transfer
            .write_function(|data| {
                if body.len() + data.len() > MAX_CHUNKLIST_BYTES {
                    overflow = true;
                    // short count aborts the transfer
                    return Ok(0);
                }
                body.extend_from_slice(data);
                Ok(data.len())
            })
            .map_err(transport)?;
        transfer.perform()
    };
    if let Err(e) = performed {
        if overflow {
            return Err(FetchError::TooLarge {
                url: url.to_string(),
            });
        }
        return Err(transport(e));
    }

    let code = easy.response_code().map_err(transport)?;
    match code {
        404 | 410 => {
            tracing::info!(url, code, "no chunklist published");
            Ok(None)
        }
        200..=299 if body.is_empty() => {
            tracing::info!(url, "chunklist response was empty");
            Ok(None)
        }
        200..=299 => {
            tracing::debug!(url, bytes = body.len(), "fetched chunklist");
            Ok(Some(body))
        }
        // file:// and similar report 0
        0 if !body.is_empty() => Ok(Some(body)),
        0 => Ok(None),
        code => Err(FetchError::Http {
            url: url.to_string(),
            code,
        }),
    }
}
