//! Scripted in-process directory for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use crate::client::{DirectoryClient, DirectoryConnector};
use crate::entry::DirectoryEntry;
use crate::error::DirectoryError;

#[derive(Debug, Default)]
struct Script {
    // principal -> accepted secret
    accept: HashMap<String, String>,
    // exact rendered filter -> result entries
    responses: HashMap<String, Vec<DirectoryEntry>>,
    fail_connect: bool,
    connects: AtomicUsize,
    binds: AtomicUsize,
    searches: AtomicUsize,
    closes: AtomicUsize,
}

/// Directory fake scripted before use; counts every protocol call.
#[derive(Clone, Default)]
pub(crate) struct ScriptedDirectory {
    script: Arc<Script>,
}

#[derive(Debug)]
pub(crate) struct ScriptedSession {
    script: Arc<Script>,
}

impl ScriptedDirectory {
    pub(crate) fn builder() -> ScriptedDirectoryBuilder {
        ScriptedDirectoryBuilder {
            script: Script::default(),
        }
    }

    pub(crate) fn connects(&self) -> usize {
        self.script.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn binds(&self) -> usize {
        self.script.binds.load(Ordering::SeqCst)
    }

    pub(crate) fn searches(&self) -> usize {
        self.script.searches.load(Ordering::SeqCst)
    }

    pub(crate) fn closes(&self) -> usize {
        self.script.closes.load(Ordering::SeqCst)
    }
}

pub(crate) struct ScriptedDirectoryBuilder {
    script: Script,
}

impl ScriptedDirectoryBuilder {
    pub(crate) fn accept(mut self, principal: &str, secret: &str) -> Self {
        self.script
            .accept
            .insert(principal.to_string(), secret.to_string());
        self
    }

    pub(crate) fn respond(mut self, filter: &str, entries: Vec<DirectoryEntry>) -> Self {
        self.script.responses.insert(filter.to_string(), entries);
        self
    }

    pub(crate) fn fail_connect(mut self) -> Self {
        self.script.fail_connect = true;
        self
    }

    pub(crate) fn build(self) -> ScriptedDirectory {
        ScriptedDirectory {
            script: Arc::new(self.script),
        }
    }
}

#[async_trait]
impl DirectoryConnector for ScriptedDirectory {
    type Client = ScriptedSession;

    async fn connect(&self) -> Result<ScriptedSession, DirectoryError> {
        self.script.connects.fetch_add(1, Ordering::SeqCst);
        if self.script.fail_connect {
            return Err(DirectoryError::configuration("scripted connect failure"));
        }
        Ok(ScriptedSession {
            script: Arc::clone(&self.script),
        })
    }
}

#[async_trait]
impl DirectoryClient for ScriptedSession {
    async fn bind(&mut self, principal: &str, secret: &str) -> Result<bool, DirectoryError> {
        self.script.binds.fetch_add(1, Ordering::SeqCst);
        Ok(self.script.accept.get(principal).map(String::as_str) == Some(secret))
    }

    async fn search(
        &mut self,
        _base: &str,
        filter: &str,
        _attributes: &[&str],
    ) -> Result<Vec<DirectoryEntry>, DirectoryError> {
        self.script.searches.fetch_add(1, Ordering::SeqCst);
        Ok(self.script.responses.get(filter).cloned().unwrap_or_default())
    }

    async fn close(&mut self) {
        self.script.closes.fetch_add(1, Ordering::SeqCst);
    }
}
