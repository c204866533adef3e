//! Text cleaning for scraped samples.
//!
//! Each sample goes through line-ending normalization, header stripping, and
//! comment redaction in that order. Samples left empty are dropped and the
//! survivors renumbered from zero.

mod cleanup;
mod header;

use std::collections::BTreeMap;

use tracing::{debug, info, instrument};

use repocorpus_shared::{CleaningConfig, Result};

pub use cleanup::{Redactor, normalize_line_endings};
pub use header::{HeaderState, strip_header};

/// Explicit cleaning configuration.
#[derive(Debug, Clone, Default)]
pub struct CleanConfig {
    /// Proper names removed from comment lines.
    pub redact_names: Vec<String>,
}

impl From<&CleaningConfig> for CleanConfig {
    fn from(cfg: &CleaningConfig) -> Self {
        Self {
            redact_names: cfg.redact_names.clone(),
        }
    }
}

/// Clean one sample.
pub fn clean_sample(sample: &str, redactor: &Redactor) -> String {
    let sample = normalize_line_endings(sample);
    let sample = strip_header(&sample);
    redactor.redact(&sample)
}

/// Clean every sample, dropping those that end up blank, keyed by new index.
#[instrument(skip_all, fields(redact_names = config.redact_names.len()))]
pub fn clean_samples<I, S>(samples: I, config: &CleanConfig) -> Result<BTreeMap<usize, String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let redactor = Redactor::new(config)?;
    let mut total = 0;

    let cleaned: BTreeMap<usize, String> = samples
        .into_iter()
        .enumerate()
        .filter_map(|(i, sample)| {
            total += 1;
            let cleaned = clean_sample(sample.as_ref(), &redactor);
            if cleaned.trim().is_empty() {
                debug!(sample = i, "sample empty after cleaning");
                None
            } else {
                Some(cleaned)
            }
        })
        .enumerate()
        .collect();

    info!("kept {}/{} samples after cleaning", cleaned.len(), total);
    Ok(cleaned)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_pass_renumbers() {
        let samples = [
            "# header only\r\n# nothing else\r\n",
            "####\r\n# File: x.nlp\r\n####\r\n@CODE\r\n# tweak by amnon 3/4/2001\r\n@@CODE",
            "   \n\t",
            "rule();",
        ];
        let config = CleanConfig {
            redact_names: vec!["amnon".into()],
        };

        let cleaned = clean_samples(samples, &config).unwrap();
        assert_eq!(cleaned.len(), 2);
        assert_eq!(cleaned[&0], "@CODE\n@@CODE");
        assert_eq!(cleaned[&1], "rule();");
    }

    #[test]
    fn from_app_config() {
        let cfg = CleaningConfig {
            redact_names: vec!["elvis".into()],
        };
        assert_eq!(CleanConfig::from(&cfg).redact_names, vec!["elvis"]);
    }

    #[test]
    fn empty_input() {
        let cleaned = clean_samples(Vec::<String>::new(), &CleanConfig::default()).unwrap();
        assert!(cleaned.is_empty());
    }
}
