// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Claim Topics Registry: the topics every investor identity must satisfy.

use std::collections::BTreeSet;

use crate::error::{CoreError, CoreResult};
use crate::storage::Change;
use crate::types::ClaimTopic;

/// Upper bound on required topics; verification cost grows with it.
pub const MAX_CLAIM_TOPICS: usize = 15;

#[derive(Debug, Clone, Default)]
pub struct ClaimTopicsRegistry {
    topics: BTreeSet<ClaimTopic>,
}

impl ClaimTopicsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topics(&self) -> Vec<ClaimTopic> {
        self.topics.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = ClaimTopic> + '_ {
        self.topics.iter().copied()
    }

    pub fn contains(&self, topic: &ClaimTopic) -> bool {
        self.topics.contains(topic)
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }

    pub fn plan_add(&self, topic: ClaimTopic) -> CoreResult<Change> {
        if self.topics.contains(&topic) {
            return Err(CoreError::DuplicateClaimTopic(topic));
        }
        if self.topics.len() >= MAX_CLAIM_TOPICS {
            return Err(CoreError::LimitExceeded(format!(
                "at most {MAX_CLAIM_TOPICS} claim topics"
            )));
        }
        Ok(Change::AddClaimTopic(topic))
    }

    pub fn plan_remove(&self, topic: ClaimTopic) -> CoreResult<Change> {
        if !self.topics.contains(&topic) {
            return Err(CoreError::ClaimTopicNotFound(topic));
        }
        Ok(Change::RemoveClaimTopic(topic))
    }

    pub(crate) fn insert(&mut self, topic: ClaimTopic) {
        self.topics.insert(topic);
    }

    pub(crate) fn remove(&mut self, topic: &ClaimTopic) {
        self.topics.remove(topic);
    }
}
