use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use crate::config::AnalysisConfig;
use crate::models::DatasetStreams;
use crate::pipeline::{run_analysis, Analysis};
use crate::result::AnalysisResult;

/// One completed analysis, owned by a [`SessionStore`].
#[derive(Debug, Clone)]
pub struct AnalysisSession {
    id: Uuid,
    dataset: PathBuf,
    config: AnalysisConfig,
    created_at: DateTime<Utc>,
    analysis: Analysis,
}

impl AnalysisSession {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn dataset(&self) -> &Path {
        &self.dataset
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// The aligned streams the result was computed from.
    pub fn streams(&self) -> &DatasetStreams {
        self.analysis.streams()
    }

    pub fn result(&self) -> &AnalysisResult {
        self.analysis.result()
    }
}

/// Completed analyses keyed by session id.
///
/// A session lives from [`SessionStore::analyze`] until it is removed,
/// replaced by [`SessionStore::reanalyze`] or the store is cleared.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: HashMap<Uuid, AnalysisSession>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn analyze(&mut self, dataset: &Path, config: &AnalysisConfig) -> anyhow::Result<Uuid> {
        let analysis = run_analysis(dataset, config)
            .with_context(|| format!("failed to analyze {}", dataset.display()))?;
        let session = AnalysisSession {
            id: Uuid::new_v4(),
            dataset: dataset.to_path_buf(),
            config: config.clone(),
            created_at: Utc::now(),
            analysis,
        };
        let id = session.id;
        info!("session {id} created for {}", dataset.display());
        self.sessions.insert(id, session);
        Ok(id)
    }

    pub fn get(&self, id: Uuid) -> Option<&AnalysisSession> {
        self.sessions.get(&id)
    }

    /// Re-runs the analysis behind `id`. The old id is invalidated and the new
    /// session's id is returned. If the re-run fails the old session is kept.
    pub fn reanalyze(&mut self, id: Uuid) -> anyhow::Result<Uuid> {
        let (dataset, config) = self
            .sessions
            .get(&id)
            .map(|s| (s.dataset.clone(), s.config.clone()))
            .with_context(|| format!("no session {id}"))?;
        let new_id = self.analyze(&dataset, &config)?;
        self.sessions.remove(&id);
        Ok(new_id)
    }

    pub fn remove(&mut self, id: Uuid) -> Option<AnalysisSession> {
        self.sessions.remove(&id)
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn dataset() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let sender = dir.path().join("sender");
        let receiver = dir.path().join("receiver");
        fs::create_dir_all(&sender).unwrap();
        fs::create_dir_all(&receiver).unwrap();
        fs::write(
            sender.join("udp_sender_1.csv"),
            "timestamp,seq_num,packet_size\n100,0,1000\n101,1,1000\n102,2,1000\n",
        )
        .unwrap();
        fs::write(
            receiver.join("udp_receiver_1.csv"),
            "send_timestamp,recv_timestamp,seq_num,delay\n100,100.5,0,0.5\n101,101.5,1,0.5\n",
        )
        .unwrap();
        dir
    }

    #[test]
    fn sessions_have_an_explicit_lifecycle() {
        let data = dataset();
        let config = AnalysisConfig::default();
        let mut store = SessionStore::new();

        let first = store.analyze(data.path(), &config).unwrap();
        let second = store.analyze(data.path(), &config).unwrap();
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);

        let session = store.get(first).unwrap();
        assert_eq!(session.dataset(), data.path());
        assert!(session.result().udp.is_some());
        assert_eq!(session.streams().udp_receiver.len(), 2);

        let renewed = store.reanalyze(first).unwrap();
        assert!(store.get(first).is_none());
        assert!(store.get(renewed).is_some());
        assert_eq!(store.len(), 2);

        assert!(store.remove(second).is_some());
        assert!(store.remove(second).is_none());
        store.clear();
        assert!(store.is_empty());
    }

    #[test]
    fn unknown_or_missing_inputs_are_errors() {
        let mut store = SessionStore::new();
        assert!(store.reanalyze(Uuid::new_v4()).is_err());
        assert!(store
            .analyze(Path::new("/definitely/not/here"), &AnalysisConfig::default())
            .is_err());
        assert!(store.is_empty());
    }
}
