//! Parsing of configuration documents (JSON or YAML)

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cfg::{Config, ParameterSet};

/// The shapes a configuration document can take
#[derive(Deserialize, Debug)]
#[serde(untagged)]
pub enum ConfigDocument {
    /// A list of population configurations
    List(Vec<Config>),
    /// A parameter set to expand into a configuration list
    Set(ParameterSet),
    /// A single population configuration
    Single(Box<Config>),
}

impl ConfigDocument {
    /// Flatten into a configuration list, expanding parameter sets with
    /// `replicates` copies per parameter combination
    pub fn into_configs(self, replicates: usize) -> Vec<Config> {
        match self {
            ConfigDocument::List(configs) => configs,
            ConfigDocument::Set(set) => set.expand(replicates),
            ConfigDocument::Single(config) => vec![*config],
        }
    }
}

/// Read a configuration document, choosing the format by file extension
///
/// `.yaml` and `.yml` parse as YAML, anything else as JSON.
pub fn read_config_document(path: &Path) -> Result<ConfigDocument> {
    parse(path).with_context(|| format!("failed to read config file {}", path.display()))
}

/// Read a parameter set document for expansion
pub fn read_parameter_set(path: &Path) -> Result<ParameterSet> {
    let document =
        parse(path).with_context(|| format!("failed to read parameter set {}", path.display()))?;
    match document {
        ConfigDocument::Set(set) => Ok(set),
        _ => anyhow::bail!(
            "{} does not contain a parameter set document",
            path.display()
        ),
    }
}

fn parse(path: &Path) -> Result<ConfigDocument> {
    let reader = BufReader::new(File::open(path)?);
    let is_yaml = matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    );

    let document = if is_yaml {
        serde_yaml::from_reader(reader)?
    } else {
        serde_json::from_reader(reader)?
    };
    Ok(document)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_config_documents_parse() {
        let text = r#"{"size": 10, "length": 100, "mutation": {"rate": 0.01}}"#;
        let document: ConfigDocument = serde_json::from_str(text).unwrap();
        let configs = document.into_configs(1);
        assert_eq!(configs.len(), 1);
        assert_eq!(configs[0].size, 10);
        assert_eq!(configs[0].mutation.rate, 0.01);
    }

    #[test]
    fn config_list_documents_parse() {
        let text = r#"[{"size": 10, "length": 100}, {"size": 20, "length": 100}]"#;
        let document: ConfigDocument = serde_json::from_str(text).unwrap();
        let configs = document.into_configs(5);
        // replicate count does not duplicate explicit lists
        assert_eq!(configs.len(), 2);
    }

    #[test]
    fn parameter_set_documents_expand() {
        let text = r#"{
            "sizes": [10],
            "lengths": [100, 200],
            "mutation_rates": [0.001],
            "transfer_in_rates": [0.0],
            "transfer_in_frags": [10],
            "transfer_out_rates": [0.0],
            "transfer_out_frags": [10],
            "alphabet": "ACGT",
            "beneficial_mutation_rates": [0.0],
            "fitness_effects": [0.0]
        }"#;
        let document: ConfigDocument = serde_json::from_str(text).unwrap();
        let configs = document.into_configs(2);
        assert_eq!(configs.len(), 4);
    }

    #[test]
    fn yaml_documents_parse() {
        let text = "size: 10\nlength: 100\nsample_method: WrightFisher\n";
        let document: ConfigDocument = serde_yaml::from_str(text).unwrap();
        let configs = document.into_configs(1);
        assert_eq!(configs.len(), 1);
        assert_eq!(
            configs[0].sample_method,
            crate::cfg::SampleMethod::WrightFisher
        );
    }
}
