//! Quest content: the authored, read-only side of the companion.
//!
//! This module defines the `Quest`, `Step` and `Reward` structures and the
//! `QuestBook` that loads them from a JSON content file. Content is trusted:
//! beyond optional-field presence nothing is validated here.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Error, Result};

pub type QuestId = u32;
pub type StepId = u32;

/// A side quest with its steps, rewards and failure conditions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Quest {
    pub id: QuestId,
    pub name: String,
    /// Markdown.
    #[serde(default)]
    pub description: String,
    pub link: String,
    /// Absent in content means no steps.
    #[serde(default)]
    pub steps: Vec<Step>,
    /// Markdown strings.
    #[serde(default, alias = "failureConditions")]
    pub failure_conditions: Option<Vec<String>>,
    #[serde(default)]
    pub rewards: Option<Vec<Reward>>,
}

/// One ordered sub-task of a quest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Step {
    pub id: StepId,
    #[serde(alias = "name")]
    pub title: String,
    /// Markdown shown when the step is expanded.
    #[serde(default, alias = "description")]
    pub details: Option<String>,
}

/// An item handed out on quest completion.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Reward {
    pub id: u32,
    pub name: String,
    pub amount: u32,
    pub link: String,
}

impl Quest {
    /// Find a step by numeric id or (case-insensitive) title.
    pub fn resolve_step(&self, identifier: &str) -> Result<&Step> {
        let by_id = identifier
            .parse::<StepId>()
            .ok()
            .and_then(|id| self.steps.iter().find(|s| s.id == id));
        if let Some(step) = by_id {
            return Ok(step);
        }

        let wanted = identifier.to_lowercase();
        self.steps
            .iter()
            .find(|s| s.title.to_lowercase() == wanted)
            .ok_or_else(|| Error::StepNotFound {
                quest: self.id,
                step: identifier.to_string(),
            })
    }
}

/// The full set of quests supplied by the content file.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct QuestBook {
    pub quests: Vec<Quest>,
}

impl QuestBook {
    /// Load quests from a JSON content file.
    ///
    /// Accepts either `{ "quests": [...] }` or a bare array of quests.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::ContentNotFound(path.to_path_buf()));
        }
        let buf = fs::read_to_string(path)?;
        let book = Self::from_json(&buf)?;
        info!(path = %path.display(), quests = book.quests.len(), "loaded quest content");
        Ok(book)
    }

    /// Parse quest content from a JSON string.
    pub fn from_json(buf: &str) -> Result<Self> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Content {
            Book(QuestBook),
            List(Vec<Quest>),
        }

        Ok(match serde_json::from_str::<Content>(buf)? {
            Content::Book(book) => book,
            Content::List(quests) => QuestBook { quests },
        })
    }

    /// Get a quest by ID.
    pub fn get(&self, id: QuestId) -> Option<&Quest> {
        self.quests.iter().find(|q| q.id == id)
    }

    /// Resolve a quest identifier (either ID or name) to a quest.
    /// Returns an error if the name has multiple matches and suggests using ID instead.
    pub fn resolve(&self, identifier: &str) -> Result<&Quest> {
        if let Ok(id) = identifier.parse::<QuestId>() {
            return self
                .get(id)
                .ok_or_else(|| Error::QuestNotFound(identifier.to_string()));
        }

        let wanted = identifier.to_lowercase();
        let matches: Vec<&Quest> = self
            .quests
            .iter()
            .filter(|q| q.name.to_lowercase() == wanted)
            .collect();

        match matches.as_slice() {
            [] => Err(Error::QuestNotFound(identifier.to_string())),
            [quest] => Ok(quest),
            many => Err(Error::AmbiguousQuest {
                identifier: identifier.to_string(),
                candidates: many
                    .iter()
                    .map(|q| format!("ID {} ({})", q.id, q.name))
                    .collect::<Vec<_>>()
                    .join(", "),
            }),
        }
    }
}
