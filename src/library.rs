//! Template sources and the shared template library.
//!
//! The library hands out immutable snapshots. A refresh lists the source
//! again and swaps the snapshot wholesale; passes holding an older snapshot
//! keep reading it undisturbed.

use std::{
    path::{Path, PathBuf},
    sync::{Arc, RwLock},
};

use async_trait::async_trait;
use tracing::{debug, info};

use crate::{ActformError, Result, ShareLock, model::Template};

/// Supplies the ordered template collection.
#[async_trait]
pub trait TemplateSource: Send + Sync {
    async fn list(&self) -> Result<Vec<Template>>;
}

/// Templates held in memory.
#[derive(Clone, Default)]
pub struct MemTemplateSource {
    templates: ShareLock<Vec<Template>>,
}

impl MemTemplateSource {
    pub fn new(templates: Vec<Template>) -> Self {
        Self {
            templates: Arc::new(RwLock::new(templates)),
        }
    }

    /// Replaces the held templates; visible on the next refresh.
    pub fn set(
        &self,
        templates: Vec<Template>,
    ) {
        match self.templates.write() {
            Ok(mut held) => *held = templates,
            Err(poisoned) => *poisoned.into_inner() = templates,
        }
    }
}

#[async_trait]
impl TemplateSource for MemTemplateSource {
    async fn list(&self) -> Result<Vec<Template>> {
        let templates = match self.templates.read() {
            Ok(held) => held.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        };
        Ok(templates)
    }
}

/// Loads every `*.json` file of a directory, in file-name order.
///
/// A file holds either one template or an array of templates.
#[derive(Debug, Clone)]
pub struct DirTemplateSource {
    dir: PathBuf,
}

impl DirTemplateSource {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl TemplateSource for DirTemplateSource {
    async fn list(&self) -> Result<Vec<Template>> {
        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ActformError::Source(format!("failed to read template dir {}: {}", self.dir.display(), e)))?;

        let mut files = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == "json") && entry.file_type().await?.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut templates = Vec::new();
        for path in files {
            let data = tokio::fs::read_to_string(&path).await?;
            let loaded = Template::list_from_json(&data).map_err(|e| ActformError::Source(format!("{}: {}", path.display(), e)))?;
            debug!(file = %path.display(), count = loaded.len(), "templates loaded");
            templates.extend(loaded);
        }
        Ok(templates)
    }
}

/// The current template snapshot plus the source it is refreshed from.
pub struct TemplateLibrary {
    source: Arc<dyn TemplateSource>,
    current: ShareLock<Arc<Vec<Template>>>,
}

impl TemplateLibrary {
    /// Creates an empty library; call [`refresh`](Self::refresh) to load it.
    pub fn new(source: Arc<dyn TemplateSource>) -> Self {
        Self {
            source,
            current: Arc::new(RwLock::new(Arc::new(Vec::new()))),
        }
    }

    /// The current snapshot. Never changes once handed out.
    pub fn snapshot(&self) -> Arc<Vec<Template>> {
        match self.current.read() {
            Ok(current) => current.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Swaps in a new snapshot.
    pub fn replace(
        &self,
        templates: Vec<Template>,
    ) {
        let templates = Arc::new(templates);
        match self.current.write() {
            Ok(mut current) => *current = templates,
            Err(poisoned) => *poisoned.into_inner() = templates,
        }
    }

    /// Lists the source again and swaps the snapshot, returning its size.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn refresh(&self) -> Result<usize> {
        let templates = self.source.list().await?;
        let count = templates.len();
        self.replace(templates);
        info!(count, "template library refreshed");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GraphModel, NodeModel};

    fn template(id: &str) -> Template {
        let detector = GraphModel::single(NodeModel::new("D", "quantme:DataPreparationTask"));
        let replacement = GraphModel::single(NodeModel::new("R", "bpmn:ServiceTask"));
        Template::new(id, &detector, &replacement).unwrap()
    }

    #[tokio::test]
    async fn test_refresh_swaps_snapshot() {
        let source = MemTemplateSource::new(vec![template("a")]);
        let library = TemplateLibrary::new(Arc::new(source.clone()));
        assert!(library.snapshot().is_empty());

        assert_eq!(library.refresh().await.unwrap(), 1);
        let first = library.snapshot();

        source.set(vec![template("b"), template("c")]);
        assert_eq!(library.refresh().await.unwrap(), 2);

        assert_eq!(first.iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["a"]);
        assert_eq!(library.snapshot().iter().map(|t| t.id.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    }

    struct FailingSource;

    #[async_trait]
    impl TemplateSource for FailingSource {
        async fn list(&self) -> Result<Vec<Template>> {
            Err(ActformError::Source("unavailable".to_string()))
        }
    }

    #[tokio::test]
    async fn test_failed_refresh_keeps_snapshot() {
        let library = TemplateLibrary::new(Arc::new(FailingSource));
        library.replace(vec![template("a")]);

        assert!(library.refresh().await.is_err());
        assert_eq!(library.snapshot().len(), 1);
    }

    #[tokio::test]
    async fn test_dir_source_reads_sorted_json_files() {
        let dir = std::env::temp_dir().join(format!("actform-templates-{}", crate::utils::longid()));
        tokio::fs::create_dir_all(&dir).await.unwrap();

        let many = serde_json::to_string(&vec![template("b1"), template("b2")]).unwrap();
        tokio::fs::write(dir.join("b.json"), many).await.unwrap();
        tokio::fs::write(dir.join("a.json"), serde_json::to_string(&template("a")).unwrap()).await.unwrap();
        tokio::fs::write(dir.join("notes.txt"), "ignored").await.unwrap();

        let source = DirTemplateSource::new(&dir);
        let ids: Vec<String> = source.list().await.unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["a", "b1", "b2"]);

        tokio::fs::write(dir.join("c.json"), "{ not json").await.unwrap();
        assert!(matches!(source.list().await, Err(ActformError::Source(_))));

        tokio::fs::remove_dir_all(&dir).await.unwrap();
    }

    #[tokio::test]
    async fn test_dir_source_missing_dir() {
        let source = DirTemplateSource::new("/nonexistent/actform/templates");
        assert!(matches!(source.list().await, Err(ActformError::Source(_))));
    }
}
