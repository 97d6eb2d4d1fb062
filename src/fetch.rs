use crate::config::Config;
use crate::content_type::is_image_content_type;
use crate::dedupe::Deduper;
use crate::filename::{content_hash, resolve_filename};
use log::{debug, trace, warn};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum FetchError {
    /// Request failed: DNS, connect, TLS, timeout or a non-2xx status
    Connection(String, String),
    /// Response arrived but the body could not be read
    Body(String, String),
    Io(PathBuf, std::io::Error),
}

impl std::fmt::Display for FetchError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FetchError::Connection(url, reason) => {
                write!(f, "Failed to fetch '{}': {}", url, reason)
            }
            FetchError::Body(url, reason) => {
                write!(f, "Failed to read response from '{}': {}", url, reason)
            }
            FetchError::Io(path, e) => write!(f, "I/O error on '{}': {}", path.display(), e),
        }
    }
}

impl std::error::Error for FetchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FetchError::Io(_, e) => Some(e),
            _ => None,
        }
    }
}

impl FetchError {
    pub fn is_connection(&self) -> bool {
        matches!(self, FetchError::Connection(..))
    }
}

/// Result of processing one URL
#[derive(Debug)]
pub enum Outcome {
    Fetched {
        filename: String,
        path: PathBuf,
    },
    SkippedNotImage {
        content_type: String,
    },
    SkippedDuplicate {
        /// Name the image would have been saved under
        filename: String,
        /// Stored file holding the same content
        existing: String,
    },
    SkippedError(FetchError),
}

impl Outcome {
    pub fn is_fetched(&self) -> bool {
        matches!(self, Outcome::Fetched { .. })
    }
}

/// Downloads images into one save directory, skipping non-images and
/// content that is already stored there.
pub struct Fetcher {
    agent: ureq::Agent,
    save_dir: PathBuf,
    user_agent: String,
    max_bytes: u64,
    deduper: Deduper,
    quiet: bool,
}

impl Fetcher {
    pub fn new(config: &Config) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
            .build()
            .into();
        Self {
            agent,
            save_dir: config.save_dir.clone(),
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            deduper: Deduper::new(&config.save_dir, config.dedupe),
            quiet: false,
        }
    }

    /// Suppress per-URL status lines on stdout
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Fetch one URL and save it if it is a new image. Never fails: every
    /// error is reported and turned into `Outcome::SkippedError`.
    pub fn fetch(&mut self, url: &str) -> Outcome {
        let outcome = self.try_fetch(url).unwrap_or_else(Outcome::SkippedError);
        self.report(url, &outcome);
        outcome
    }

    fn try_fetch(&mut self, url: &str) -> Result<Outcome, FetchError> {
        debug!("Fetching {}", url);
        let mut response = self
            .agent
            .get(url)
            .header("User-Agent", self.user_agent.as_str())
            .call()
            .map_err(|e| FetchError::Connection(url.to_string(), e.to_string()))?;

        trace!("HTTP {} for {}", response.status(), url);

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|h| h.to_str().ok())
            .unwrap_or("")
            .to_string();
        if !is_image_content_type(&content_type) {
            return Ok(Outcome::SkippedNotImage { content_type });
        }

        let data = response
            .body_mut()
            .with_config()
            .limit(self.max_bytes)
            .read_to_vec()
            .map_err(|e| FetchError::Body(url.to_string(), e.to_string()))?;
        trace!("Fetched {} bytes, content-type: {}", data.len(), content_type);

        fs::create_dir_all(&self.save_dir)
            .map_err(|e| FetchError::Io(self.save_dir.clone(), e))?;

        let filename = resolve_filename(url, &data);
        let hash = content_hash(&data);

        if let Some(existing) = self
            .deduper
            .find(&hash)
            .map_err(|e| FetchError::Io(self.save_dir.clone(), e))?
        {
            return Ok(Outcome::SkippedDuplicate { filename, existing });
        }

        let path = self.save_dir.join(&filename);
        if path.exists() {
            debug!("Overwriting {:?} with different content", path);
        }
        fs::write(&path, &data).map_err(|e| FetchError::Io(path.clone(), e))?;

        // The image is on disk; a stale index only costs a later rescan
        if let Err(e) = self.deduper.record(&hash, &filename) {
            warn!("Failed to update hash index in {:?}: {}", self.save_dir, e);
        }

        Ok(Outcome::Fetched { filename, path })
    }

    fn report(&self, url: &str, outcome: &Outcome) {
        match outcome {
            Outcome::Fetched { filename, path } => {
                debug!("Saved {} to {:?}", url, path);
                if !self.quiet {
                    println!("✓ Successfully fetched: {}", filename);
                    println!("✓ Image saved to {}", path.display());
                }
            }
            Outcome::SkippedNotImage { content_type } => {
                debug!("{} has content type {:?}", url, content_type);
                if !self.quiet {
                    println!("Skipped (Not an image): {}", url);
                }
            }
            Outcome::SkippedDuplicate { filename, existing } => {
                debug!("{} duplicates stored file {}", url, existing);
                if !self.quiet {
                    println!("Duplicate skipped: {}", filename);
                }
            }
            Outcome::SkippedError(e) => {
                warn!("{}", e);
                if !self.quiet {
                    if e.is_connection() {
                        println!("✗ Connection error: {}", e);
                    } else {
                        println!("✗ An error occurred: {}", e);
                    }
                }
            }
        }
    }
}
