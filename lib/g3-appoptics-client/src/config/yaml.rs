/*
 * SPDX-License-Identifier: Apache-2.0
 * Copyright 2025 ByteDance and/or its affiliates.
 */

use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, anyhow};
use humanize_rs::ParseError;
use yaml_rust::{Yaml, yaml};

use super::{AppopticsClientConfig, RetryConfig};

fn normalize_key(k: &str) -> String {
    k.to_lowercase().replace('-', "_")
}

/// Entries of a yaml map, in document order. Non-string keys are errors.
fn map_entries(map: &yaml::Hash) -> impl Iterator<Item = anyhow::Result<(&str, &Yaml)>> {
    map.iter().map(|(k, v)| match k {
        Yaml::String(key) => Ok((key.as_str(), v)),
        _ => Err(anyhow!("map key {k:?} is not a string")),
    })
}

fn as_duration(v: &Yaml) -> anyhow::Result<Duration> {
    match v {
        Yaml::String(value) => match humanize_rs::duration::parse(value) {
            Ok(v) => Ok(v),
            Err(ParseError::MissingUnit) => u64::from_str(value)
                .map(Duration::from_secs)
                .map_err(|_| anyhow!("invalid duration string")),
            Err(e) => Err(anyhow!("invalid humanize duration string: {e}")),
        },
        Yaml::Integer(value) => u64::try_from(*value)
            .map(Duration::from_secs)
            .map_err(|_| anyhow!("unsupported duration value")),
        _ => Err(anyhow!(
            "yaml value type for duration should be 'string' or 'integer'"
        )),
    }
}

fn as_usize(v: &Yaml) -> anyhow::Result<usize> {
    match v {
        Yaml::String(s) => usize::from_str(s).map_err(|e| anyhow!("invalid usize string: {e}")),
        Yaml::Integer(i) => usize::try_from(*i).map_err(|e| anyhow!("out of range usize: {e}")),
        _ => Err(anyhow!(
            "yaml value type for 'usize' should be 'string' or 'integer'"
        )),
    }
}

fn as_bool(v: &Yaml) -> anyhow::Result<bool> {
    match v {
        Yaml::Boolean(b) => Ok(*b),
        Yaml::String(s) => match s.to_lowercase().as_str() {
            "on" | "true" | "yes" | "1" => Ok(true),
            "off" | "false" | "no" | "0" => Ok(false),
            _ => Err(anyhow!("invalid yaml string value for 'bool': {s}")),
        },
        _ => Err(anyhow!("invalid yaml value type for 'bool'")),
    }
}

fn as_label_value(v: &Yaml) -> anyhow::Result<String> {
    match v {
        Yaml::String(s) => Ok(s.clone()),
        Yaml::Integer(i) => Ok(i.to_string()),
        _ => Err(anyhow!("yaml value type for label value should be 'string'")),
    }
}

impl RetryConfig {
    fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = RetryConfig::default();
            for entry in map_entries(map) {
                let (k, v) = entry?;
                match normalize_key(k).as_str() {
                    "max" | "max_retry" => {
                        config.max =
                            as_usize(v).context(format!("invalid usize value for key {k}"))?;
                    }
                    "delay" | "retry_delay" => {
                        config.delay = as_duration(v)
                            .context(format!("invalid duration value for key {k}"))?;
                    }
                    "stop_on_group_failure" => {
                        config.stop_on_group_failure =
                            as_bool(v).context(format!("invalid bool value for key {k}"))?;
                    }
                    _ => return Err(anyhow!("invalid key {k}")),
                }
            }
            Ok(config)
        } else {
            Err(anyhow!("yaml value type for 'retry config' should be 'map'"))
        }
    }
}

impl AppopticsClientConfig {
    pub fn parse_yaml(v: &Yaml) -> anyhow::Result<Self> {
        if let Yaml::Hash(map) = v {
            let mut config = AppopticsClientConfig::default();
            for entry in map_entries(map) {
                let (k, v) = entry?;
                config.set_by_yaml_kv(k, v)?;
            }
            config.check()?;
            Ok(config)
        } else {
            Err(anyhow!(
                "yaml value type for 'appoptics client config' should be 'map'"
            ))
        }
    }

    fn set_by_yaml_kv(&mut self, k: &str, v: &Yaml) -> anyhow::Result<()> {
        match normalize_key(k).as_str() {
            "label_values" | "labels" => {
                let Yaml::Hash(map) = v else {
                    return Err(anyhow!("yaml value type for key {k} should be 'map'"));
                };
                self.label_values = map_entries(map)
                    .map(|entry| -> anyhow::Result<(String, String)> {
                        let (name, value) = entry?;
                        let value = as_label_value(value)
                            .context(format!("invalid value for label {name}"))?;
                        Ok((name.to_string(), value))
                    })
                    .collect::<anyhow::Result<_>>()?;
            }
            "period" | "emit_interval" => {
                self.period =
                    as_duration(v).context(format!("invalid duration value for key {k}"))?;
            }
            "batch_size" => {
                self.batch_size = as_usize(v).context(format!("invalid usize value for key {k}"))?;
            }
            "retry" => {
                self.retry =
                    RetryConfig::parse_yaml(v).context(format!("invalid value for key {k}"))?;
            }
            "request_timeout" => {
                self.request_timeout =
                    as_duration(v).context(format!("invalid duration value for key {k}"))?;
            }
            _ => return Err(anyhow!("invalid key {k}")),
        }
        Ok(())
    }
}
