//! Opening external links.
//!
//! Links are handed to an external opener (the platform browser launcher by
//! default) which is spawned without waiting, so the companion keeps running
//! and the page opens in its own browsing context. A background thread reaps
//! each opener once it exits.

use std::io;
use std::process::{Command, ExitStatus, Stdio};
use std::thread::{self, JoinHandle};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::markdown::is_safe_href;

/// Spawn `opener` with `url` as its only argument.
pub fn open_link(opener: &str, url: &str) -> Result<()> {
    spawn_opener(opener, url).map(|_| ())
}

fn spawn_opener(opener: &str, url: &str) -> Result<JoinHandle<io::Result<ExitStatus>>> {
    if url.trim().is_empty() {
        return Err(Error::InvalidArgument("empty link".into()));
    }
    if !is_safe_href(url) {
        return Err(Error::InvalidArgument(format!("refusing to open '{url}'")));
    }

    let mut parts = opener.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| Error::InvalidArgument("empty link opener".into()))?;

    let mut child = Command::new(program)
        .args(parts)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| Error::Opener {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

    info!(opener = program, url, "opened external link");
    Ok(thread::spawn(move || {
        let status = child.wait();
        debug!(?status, "link opener exited");
        status
    }))
}
