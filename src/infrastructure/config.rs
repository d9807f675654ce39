use crate::application::pipeline::PipelineSettings;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardConfig {
    pub server: ServerSettings,
    pub dataset: DatasetSettings,
    pub pipeline: PipelineConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub bind_addr: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatasetSettings {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    pub histogram_bins: usize,
    pub value_min: f64,
    pub value_max: f64,
    pub max_series_points: usize,
    #[serde(default)]
    pub default_excluded_metrics: Vec<String>,
}

impl PipelineConfig {
    pub fn to_settings(&self) -> PipelineSettings {
        PipelineSettings {
            histogram_bins: self.histogram_bins,
            value_min: self.value_min,
            value_max: self.value_max,
            max_series_points: self.max_series_points,
            default_excluded_metrics: self.default_excluded_metrics.clone(),
        }
    }
}

/// Load settings: built-in defaults, then `config/dashboard.*` if present,
/// then `DASHBOARD__SECTION__KEY` environment variables.
pub fn load_dashboard_config() -> anyhow::Result<DashboardConfig> {
    let builder = with_defaults(config::Config::builder())?
        .add_source(config::File::with_name("config/dashboard").required(false))
        .add_source(
            config::Environment::with_prefix("DASHBOARD")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("pipeline.default_excluded_metrics")
                .try_parsing(true),
        );

    let settings: DashboardConfig = builder.build()?.try_deserialize()?;
    validate(&settings)?;
    Ok(settings)
}

fn with_defaults(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> anyhow::Result<config::ConfigBuilder<config::builder::DefaultState>> {
    let defaults = PipelineSettings::default();
    Ok(builder
        .set_default("server.bind_addr", "0.0.0.0:8080")?
        .set_default("dataset.path", "data/greenhouse_timeseries_processed.json")?
        .set_default("pipeline.histogram_bins", defaults.histogram_bins as u64)?
        .set_default("pipeline.value_min", defaults.value_min)?
        .set_default("pipeline.value_max", defaults.value_max)?
        .set_default("pipeline.max_series_points", defaults.max_series_points as u64)?
        .set_default(
            "pipeline.default_excluded_metrics",
            defaults.default_excluded_metrics,
        )?)
}

fn validate(settings: &DashboardConfig) -> anyhow::Result<()> {
    let pipeline = &settings.pipeline;
    if pipeline.histogram_bins == 0 {
        anyhow::bail!("pipeline.histogram_bins must be at least 1");
    }
    if pipeline.value_min >= pipeline.value_max {
        anyhow::bail!(
            "pipeline.value_min ({}) must be below pipeline.value_max ({})",
            pipeline.value_min,
            pipeline.value_max
        );
    }
    if pipeline.max_series_points == 1 {
        anyhow::bail!("pipeline.max_series_points must be 0 (no downsampling) or at least 2");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn defaults_only() -> DashboardConfig {
        with_defaults(config::Config::builder())
            .unwrap()
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let settings = defaults_only();

        assert_eq!(settings.server.bind_addr, "0.0.0.0:8080");
        assert_eq!(settings.dataset.path, "data/greenhouse_timeseries_processed.json");
        assert_eq!(settings.pipeline.to_settings(), PipelineSettings::default());
        assert!(validate(&settings).is_ok());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let builder = with_defaults(config::Config::builder())
            .unwrap()
            .add_source(config::File::from_str(
                "[pipeline]\nhistogram_bins = 10\ndefault_excluded_metrics = [\"current\"]\n",
                config::FileFormat::Toml,
            ));
        let settings: DashboardConfig = builder.build().unwrap().try_deserialize().unwrap();

        assert_eq!(settings.pipeline.histogram_bins, 10);
        assert_eq!(settings.pipeline.default_excluded_metrics, ["current"]);
        assert_eq!(settings.pipeline.value_max, 100.0);
    }

    #[test]
    fn test_validate_rejects_bad_scale() {
        let mut settings = defaults_only();
        settings.pipeline.value_min = 100.0;
        assert!(validate(&settings).is_err());

        let mut settings = defaults_only();
        settings.pipeline.histogram_bins = 0;
        assert!(validate(&settings).is_err());

        let mut settings = defaults_only();
        settings.pipeline.max_series_points = 1;
        assert!(validate(&settings).is_err());
    }

    #[test]
    fn test_downsampling_is_off_by_default() {
        let settings = defaults_only();

        assert_eq!(settings.pipeline.max_series_points, 0);
    }
}
