//! Layered analysis configuration: defaults, optional file, `DETECTOR_*` env

use std::path::Path;

use config::{Config, ConfigError, Environment, File, Map};
use plagiarism_domain::AnalysisConfig;

use crate::errors::{DetectorError, Result};

pub const ENV_PREFIX: &str = "DETECTOR";

/// Load configuration from defaults, an optional file and the process
/// environment (`DETECTOR_SAMPLING__MAX_COMMITS=100`)
pub fn load_analysis_config(file: Option<&Path>) -> Result<AnalysisConfig> {
    build(file, None)
}

fn build(file: Option<&Path>, env: Option<Map<String, String>>) -> Result<AnalysisConfig> {
    let config_error = |e: ConfigError| DetectorError::configuration_error_with_source("analysis", e);

    let defaults = Config::try_from(&AnalysisConfig::default()).map_err(config_error)?;
    let mut builder = Config::builder().add_source(defaults);
    if let Some(path) = file {
        builder = builder.add_source(File::from(path));
    }
    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true)
            .source(env),
    );

    builder
        .build()
        .and_then(|settings| settings.try_deserialize::<AnalysisConfig>())
        .map_err(config_error)
}
