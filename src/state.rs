use crate::{config::Settings, inference_service::InferenceService, model_service::ModelService};
use std::{
    fs::File,
    io::{self, BufRead},
    path::{Path, PathBuf},
    sync::Arc,
};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelsError {
    #[error("Failed to read labels file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Router state handed to every handler.
pub struct SharedState<M: ModelService> {
    pub inference_service: InferenceService<M>,
    pub growth_stages: Arc<Vec<String>>,
    pub include_traceback: bool,
}

impl<M: ModelService> Clone for SharedState<M> {
    fn clone(&self) -> Self {
        Self {
            inference_service: self.inference_service.clone(),
            growth_stages: self.growth_stages.clone(),
            include_traceback: self.include_traceback,
        }
    }
}

impl<M: ModelService> SharedState<M> {
    pub fn new(
        inference_service: InferenceService<M>,
        growth_stages: Vec<String>,
        include_traceback: bool,
    ) -> Self {
        Self {
            inference_service,
            growth_stages: Arc::new(growth_stages),
            include_traceback,
        }
    }

    pub fn from_settings(model_service: M, settings: &Settings) -> Result<Self, LabelsError> {
        let growth_stages = match settings.model.get_labels_path() {
            Some(path) => load_growth_stages(&path)?,
            None => Vec::new(),
        };
        tracing::info!("Loaded {} growth stage labels", growth_stages.len());

        let inference_service =
            InferenceService::new(model_service, settings.uploads.get_directory());

        Ok(Self::new(
            inference_service,
            growth_stages,
            settings.server.include_traceback,
        ))
    }
}

/// One label per line, in class index order. Blank lines are skipped.
pub fn load_growth_stages(filepath: &Path) -> Result<Vec<String>, LabelsError> {
    let read_error = |source| LabelsError::Read {
        path: filepath.to_path_buf(),
        source,
    };

    let file = File::open(filepath).map_err(read_error)?;
    let reader = io::BufReader::new(file);
    let mut labels = Vec::new();

    for line_result in reader.lines() {
        let line = line_result.map_err(read_error)?;
        let label = line.trim();
        if !label.is_empty() {
            labels.push(label.to_string());
        }
    }

    Ok(labels)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_growth_stages() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("growth_stages.txt");
        std::fs::write(&path, "Seedling (Week 0)\n  Early Growth (Week 1)  \n\nVegetative (Week 2)\n")
            .unwrap();

        let labels = load_growth_stages(&path).unwrap();

        assert_eq!(
            labels,
            vec![
                "Seedling (Week 0)",
                "Early Growth (Week 1)",
                "Vegetative (Week 2)"
            ]
        );
    }

    #[test]
    fn test_missing_labels_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.txt");

        let err = load_growth_stages(&path).unwrap_err();

        assert!(err.to_string().contains("nope.txt"));
    }
}
