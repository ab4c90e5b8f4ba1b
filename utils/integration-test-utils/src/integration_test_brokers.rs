/********************************************************************************
 * Copyright (c) 2024 Contributors to the Eclipse Foundation
 *
 * See the NOTICE file(s) distributed with this work for additional
 * information regarding copyright ownership.
 *
 * This program and the accompanying materials are made available under the
 * terms of the Apache License Version 2.0 which is available at
 * https://www.apache.org/licenses/LICENSE-2.0
 *
 * SPDX-License-Identifier: Apache-2.0
 ********************************************************************************/

use async_trait::async_trait;
use fhir_streamer::{BrokerClient, BrokerError, PublishRecord};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;
use tracing::debug;

/// Keeps every published record in memory.
#[derive(Default)]
pub struct RecordingBroker {
    records: Mutex<Vec<PublishRecord>>,
}

impl RecordingBroker {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn records(&self) -> Vec<PublishRecord> {
        self.records.lock().await.clone()
    }

    pub async fn records_for(&self, topic: &str) -> Vec<PublishRecord> {
        self.records
            .lock()
            .await
            .iter()
            .filter(|record| record.topic == topic)
            .cloned()
            .collect()
    }

    pub async fn count_for(&self, topic: &str) -> usize {
        self.records
            .lock()
            .await
            .iter()
            .filter(|record| record.topic == topic)
            .count()
    }
}

#[async_trait]
impl BrokerClient for RecordingBroker {
    async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError> {
        debug!("recording publish to {}", record.topic);
        self.records.lock().await.push(record);
        Ok(())
    }
}

/// How [`FailingBroker`] fails the topics it targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BrokerFailureMode {
    Unavailable,
    Rejected,
}

/// Fails publishes to the configured topics and records everything else.
pub struct FailingBroker {
    failing_topics: HashSet<String>,
    mode: BrokerFailureMode,
    failed: AtomicUsize,
    inner: RecordingBroker,
}

impl FailingBroker {
    pub fn new(failing_topics: &[&str], mode: BrokerFailureMode) -> Self {
        Self {
            failing_topics: failing_topics.iter().map(|topic| topic.to_string()).collect(),
            mode,
            failed: AtomicUsize::new(0),
            inner: RecordingBroker::new(),
        }
    }

    pub fn failed_publishes(&self) -> usize {
        self.failed.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> &RecordingBroker {
        &self.inner
    }
}

#[async_trait]
impl BrokerClient for FailingBroker {
    async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError> {
        if !self.failing_topics.contains(&record.topic) {
            return self.inner.publish(record).await;
        }

        self.failed.fetch_add(1, Ordering::SeqCst);
        debug!("failing publish to {}", record.topic);
        Err(match self.mode {
            BrokerFailureMode::Unavailable => {
                BrokerError::Unavailable("connection refused".to_string())
            }
            BrokerFailureMode::Rejected => BrokerError::Rejected {
                topic: record.topic,
                reason: "topic authorization failed".to_string(),
            },
        })
    }
}

/// Never completes publishes to the configured topics; records everything else.
pub struct StallingBroker {
    stalled_topics: HashSet<String>,
    stalled: AtomicUsize,
    inner: RecordingBroker,
}

impl StallingBroker {
    pub fn new(stalled_topics: &[&str]) -> Self {
        Self {
            stalled_topics: stalled_topics.iter().map(|topic| topic.to_string()).collect(),
            stalled: AtomicUsize::new(0),
            inner: RecordingBroker::new(),
        }
    }

    /// Publishes that entered the stall, including ones later abandoned by a timeout.
    pub fn stalled_publishes(&self) -> usize {
        self.stalled.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> &RecordingBroker {
        &self.inner
    }
}

#[async_trait]
impl BrokerClient for StallingBroker {
    async fn publish(&self, record: PublishRecord) -> Result<(), BrokerError> {
        if !self.stalled_topics.contains(&record.topic) {
            return self.inner.publish(record).await;
        }

        self.stalled.fetch_add(1, Ordering::SeqCst);
        std::future::pending::<()>().await;
        Ok(())
    }
}
