use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result, anyhow};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ETAG, IF_MODIFIED_SINCE, IF_NONE_MATCH, LAST_MODIFIED};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

const CACHE_VERSION: u32 = 1;
const INDEX_FILE: &str = "index.json";

// Serializes index read-modify-write across fetch threads.
static INDEX_LOCK: Mutex<()> = Mutex::new(());

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
struct CacheIndex {
    version: u32,
    entries: HashMap<String, CacheEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheEntry {
    file: String,
    etag: Option<String>,
    last_modified: Option<String>,
    fetched_at: u64,
}

#[derive(Debug, Clone)]
pub struct CachedFile {
    pub path: PathBuf,
    /// True when no body was downloaded (fresh entry or 304).
    pub from_cache: bool,
}

/// Download `url` into `dir`, reusing the stored copy while it is younger
/// than `ttl` and revalidating it with ETag / Last-Modified afterwards.
pub fn fetch_cached(client: &Client, dir: &Path, url: &str, ttl: Duration) -> Result<CachedFile> {
    let cached_entry = {
        let _guard = INDEX_LOCK.lock().expect("http cache lock poisoned");
        load_index(dir).entries.get(url).cloned()
    };
    let now = system_time_to_secs(SystemTime::now()).unwrap_or_default();

    if let Some(entry) = cached_entry.as_ref() {
        let path = dir.join(&entry.file);
        let age = now.saturating_sub(entry.fetched_at);
        if path.exists() && age < ttl.as_secs() {
            debug!(url, age, "cache hit");
            return Ok(CachedFile {
                path,
                from_cache: true,
            });
        }
    }

    let mut req = client.get(url);
    if let Some(entry) = cached_entry.as_ref() {
        if dir.join(&entry.file).exists() {
            if let Some(etag) = entry.etag.as_ref() {
                req = req.header(IF_NONE_MATCH, etag);
            }
            if let Some(last_modified) = entry.last_modified.as_ref() {
                req = req.header(IF_MODIFIED_SINCE, last_modified);
            }
        }
    }

    let resp = req.send().with_context(|| format!("request {url}"))?;
    let status = resp.status();
    let headers = resp.headers().clone();
    if status == StatusCode::NOT_MODIFIED {
        let Some(mut entry) = cached_entry else {
            return Err(anyhow!("received 304 without cached body for {url}"));
        };
        entry.fetched_at = now;
        let path = dir.join(&entry.file);
        store_entry(dir, url, entry);
        return Ok(CachedFile {
            path,
            from_cache: true,
        });
    }
    if !status.is_success() {
        return Err(anyhow!("http {status} for {url}"));
    }

    let body = resp.bytes().with_context(|| format!("read body {url}"))?;
    let file = cache_file_name(url);
    let path = dir.join(&file);
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let tmp = path.with_extension("part");
    fs::write(&tmp, &body).with_context(|| format!("write {}", tmp.display()))?;
    fs::rename(&tmp, &path).with_context(|| format!("swap {}", path.display()))?;

    let etag = headers
        .get(ETAG)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let last_modified = headers
        .get(LAST_MODIFIED)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    store_entry(
        dir,
        url,
        CacheEntry {
            file,
            etag,
            last_modified,
            fetched_at: now,
        },
    );

    debug!(url, bytes = body.len(), "downloaded");
    Ok(CachedFile {
        path,
        from_cache: false,
    })
}

/// SHA-256 of the URL, keeping the URL's file extension so readers can
/// pick a format from the path.
pub fn cache_file_name(url: &str) -> String {
    let digest = Sha256::digest(url.as_bytes());
    let mut name = String::with_capacity(digest.len() * 2 + 8);
    for b in digest.iter() {
        let _ = write!(name, "{b:02x}");
    }
    let last = url.rsplit('/').next().unwrap_or("");
    let ext = last
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()));
    name.push('.');
    name.push_str(ext.as_deref().unwrap_or("bin"));
    name
}

fn store_entry(dir: &Path, url: &str, entry: CacheEntry) {
    let _guard = INDEX_LOCK.lock().expect("http cache lock poisoned");
    let mut index = load_index(dir);
    index.version = CACHE_VERSION;
    index.entries.insert(url.to_string(), entry);
    if let Err(err) = save_index(dir, &index) {
        warn!(%err, "failed to persist http cache index");
    }
}

fn load_index(dir: &Path) -> CacheIndex {
    let Ok(raw) = fs::read_to_string(dir.join(INDEX_FILE)) else {
        return CacheIndex::default();
    };
    let index = serde_json::from_str::<CacheIndex>(&raw).unwrap_or_default();
    if index.version != CACHE_VERSION {
        return CacheIndex::default();
    }
    index
}

fn save_index(dir: &Path, index: &CacheIndex) -> Result<()> {
    fs::create_dir_all(dir).with_context(|| format!("create {}", dir.display()))?;
    let path = dir.join(INDEX_FILE);
    let tmp = path.with_extension("json.tmp");
    let json = serde_json::to_string(index).context("serialize http cache index")?;
    fs::write(&tmp, json).context("write http cache index")?;
    fs::rename(&tmp, &path).context("swap http cache index")?;
    Ok(())
}

fn system_time_to_secs(time: SystemTime) -> Option<u64> {
    time.duration_since(UNIX_EPOCH).ok().map(|d| d.as_secs())
}
