//! Model tier selection
//!
//! Pure lookup of the caller's country code against a fixed set. Callers in the
//! set get the premium model, everyone else (including unknown or empty codes)
//! gets the standard one.

use std::collections::HashSet;

use crate::config::ScoringConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelTier {
    Premium,
    Standard,
}

/// Country code to model mapping
#[derive(Debug, Clone)]
pub struct ModelSelector {
    premium_countries: HashSet<String>,
    premium_model: String,
    standard_model: String,
}

impl ModelSelector {
    pub fn new<I, S>(premium_countries: I, premium_model: &str, standard_model: &str) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            premium_countries: premium_countries
                .into_iter()
                .map(|c| c.as_ref().trim().to_ascii_uppercase())
                .collect(),
            premium_model: premium_model.to_string(),
            standard_model: standard_model.to_string(),
        }
    }

    pub fn from_config(config: &ScoringConfig) -> Self {
        Self::new(
            &config.premium_countries,
            &config.premium_model,
            &config.standard_model,
        )
    }

    pub fn tier_for(&self, country_code: &str) -> ModelTier {
        let code = country_code.trim().to_ascii_uppercase();
        if !code.is_empty() && self.premium_countries.contains(&code) {
            ModelTier::Premium
        } else {
            ModelTier::Standard
        }
    }

    pub fn model(&self, tier: ModelTier) -> &str {
        match tier {
            ModelTier::Premium => &self.premium_model,
            ModelTier::Standard => &self.standard_model,
        }
    }

    /// Model identifier to call for a request from `country_code`
    pub fn model_for(&self, country_code: &str) -> &str {
        self.model(self.tier_for(country_code))
    }
}

impl Default for ModelSelector {
    fn default() -> Self {
        Self::from_config(&ScoringConfig::default())
    }
}
