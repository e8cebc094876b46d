use std::{fmt::Write, path::Path};

use serde::Deserialize;
use toml::Value;

use crate::{Config, Error};

pub(crate) fn load<P: AsRef<Path>>(path: P) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())?;
    parse(&content, |name| std::env::var(name).ok())
}

pub(crate) fn parse<F>(content: &str, lookup: F) -> crate::Result<Config>
where
    F: Fn(&str) -> Option<String>,
{
    let mut raw_config: Value = toml::from_str(content)?;

    expand_dynamic_strings(&mut Vec::new(), &mut raw_config, &lookup)?;

    let mut config = Config::deserialize(raw_config)?;
    config.telemetry.apply_env(&lookup)?;

    validate(&config)?;

    if config.openai.api_key.is_none() {
        log::warn!("No OpenAI API key configured; upstream calls will be sent without credentials");
    }

    Ok(config)
}

fn validate(config: &Config) -> crate::Result<()> {
    config.telemetry.validate()?;
    config.instrumentation.validate()?;
    config.pricing.validate()?;

    if !(0.0..=1.0).contains(&config.evaluation.pass_threshold) {
        return Err(Error::Validation(format!(
            "evaluation.pass_threshold must be between 0 and 1, got {}",
            config.evaluation.pass_threshold
        )));
    }

    if let Some(prometheus) = config.telemetry.prometheus()
        && config.server.health.enabled
        && prometheus.path == config.server.health.path
    {
        return Err(Error::Validation(format!(
            "metrics and health endpoints cannot share the same path ({})",
            prometheus.path
        )));
    }

    Ok(())
}

fn expand_dynamic_strings<'a, F>(
    path: &mut Vec<Result<&'a str, usize>>,
    value: &'a mut Value,
    lookup: &F,
) -> crate::Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    match value {
        Value::String(s) => match serde_dynamic_string::expand_with(s, lookup) {
            Ok(out) => *s = out,
            Err(err) => {
                return Err(Error::EnvVarSubstitution {
                    path: display_path(path),
                    reason: err.to_string(),
                });
            }
        },
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_dynamic_strings(path, value, lookup)?;
                path.pop();
            }
        }
        Value::Table(map) => {
            for (key, value) in map {
                path.push(Ok(key.as_str()));
                expand_dynamic_strings(path, value, lookup)?;
                path.pop();
            }
        }
        Value::Integer(_) | Value::Float(_) | Value::Boolean(_) | Value::Datetime(_) => (),
    }

    Ok(())
}

/// Dotted keys with bracketed array indices, e.g. `headers[0].value`.
fn display_path(path: &[Result<&str, usize>]) -> String {
    let mut p = String::new();

    for segment in path {
        match segment {
            Ok(key) => {
                if !p.is_empty() {
                    p.push('.');
                }

                p.push_str(key);
            }
            Err(i) => {
                let _ = write!(p, "[{i}]");
            }
        }
    }

    p
}

#[cfg(test)]
mod tests {
    use indoc::indoc;
    use secrecy::ExposeSecret;

    use super::display_path;
    use crate::Config;

    #[test]
    fn api_key_from_environment() {
        let config = Config::from_toml_with_env(
            indoc! {r#"
                [openai]
                api_key = "{{ env.OPENAI_API_KEY }}"
            "#},
            |name| (name == "OPENAI_API_KEY").then(|| "sk-test".to_string()),
        )
        .unwrap();

        let key = config.openai.api_key.unwrap();
        assert_eq!(key.expose_secret(), "sk-test");
    }

    #[test]
    fn missing_variable_reports_path() {
        let error = Config::from_toml_with_env(
            indoc! {r#"
                [telemetry.exporters.otlp]
                headers = [{ name = "authorization", value = "{{ env.GRAFANA_TOKEN }}" }]
            "#},
            |_| None,
        )
        .unwrap_err();

        insta::assert_snapshot!(error, @"At telemetry.exporters.otlp.headers[0].value failed substituing environment variable: environment variable not found: `GRAFANA_TOKEN`");
    }

    #[test]
    fn nested_array_paths() {
        assert_eq!(
            display_path(&[Ok("telemetry"), Ok("headers"), Err(0), Ok("value")]),
            "telemetry.headers[0].value"
        );
        assert_eq!(display_path(&[Ok("matrix"), Err(1), Err(2)]), "matrix[1][2]");
        assert_eq!(display_path(&[Err(3), Ok("name")]), "[3].name");
        assert_eq!(display_path(&[]), "");
    }

    #[test]
    fn load_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("lantern.toml");
        std::fs::write(&path, "[server]\nlisten_address = \"0.0.0.0:8000\"\n").unwrap();

        let config = temp_env::with_vars_unset(
            [
                "OTEL_SERVICE_NAME",
                "OTEL_RESOURCE_ATTRIBUTES",
                "OTEL_EXPORTER_OTLP_ENDPOINT",
                "OTEL_EXPORTER_OTLP_PROTOCOL",
                "OTEL_EXPORTER_OTLP_HEADERS",
            ],
            || Config::load(&path),
        )
        .unwrap();

        assert_eq!(config.server.listen_address, Some("0.0.0.0:8000".parse().unwrap()));
    }

    #[test]
    fn duplicate_origins_are_rejected() {
        let error = Config::from_toml_with_env(
            indoc! {r#"
                [instrumentation.semconv]
                origin = "openlit"

                [instrumentation.legacy]
                origin = "openlit"
            "#},
            |_| None,
        )
        .unwrap_err();

        insta::assert_snapshot!(error, @"Invalid configuration: both instrumentation paths use origin 'openlit'; enabled paths must be distinguishable");
    }

    #[test]
    fn negative_prices_are_rejected() {
        let error = Config::from_toml_with_env(
            indoc! {r#"
                [pricing.models.cheap]
                input = -0.1
            "#},
            |_| None,
        )
        .unwrap_err();

        insta::assert_snapshot!(error, @"Invalid configuration: pricing for model 'cheap' has an invalid input price: -0.1");
    }

    #[test]
    fn all_paths_disabled_is_rejected() {
        let error = Config::from_toml_with_env(
            indoc! {r#"
                [instrumentation.semconv]
                enabled = false
            "#},
            |_| None,
        )
        .unwrap_err();

        assert!(error.to_string().contains("at least one of"), "{error}");
    }
}
