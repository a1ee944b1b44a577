use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Sampling parameters handed to the generation backend on every call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub do_sample: bool,
    pub temperature: f64,
    pub repetition_penalty: f64,
    pub top_k: u32,
    pub top_p: f64,
    pub max_new_tokens: u32,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            do_sample: true,
            temperature: 0.7,
            repetition_penalty: 1.2,
            top_k: 50,
            top_p: 0.95,
            max_new_tokens: 200,
        }
    }
}

/// Numeric fields of [`GenerationConfig`] that can be adjusted at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigField {
    Temperature,
    RepetitionPenalty,
    TopK,
    TopP,
    MaxNewTokens,
}

impl ConfigField {
    pub fn name(&self) -> &'static str {
        match self {
            ConfigField::Temperature => "temperature",
            ConfigField::RepetitionPenalty => "repetition_penalty",
            ConfigField::TopK => "top_k",
            ConfigField::TopP => "top_p",
            ConfigField::MaxNewTokens => "max_new_tokens",
        }
    }
}

impl FromStr for ConfigField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "temperature" => Ok(ConfigField::Temperature),
            "repetition_penalty" => Ok(ConfigField::RepetitionPenalty),
            "top_k" => Ok(ConfigField::TopK),
            "top_p" => Ok(ConfigField::TopP),
            "max_new_tokens" => Ok(ConfigField::MaxNewTokens),
            other => Err(format!("'{}' is not an adjustable generation field", other)),
        }
    }
}

/// A field value tagged with its numeric kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigValue {
    Integer(i64),
    Float(f64),
}

impl ConfigValue {
    /// Multiply by `factor`, keeping the kind: integers round to the nearest
    /// whole number (half away from zero), floats to two decimals.
    pub fn scaled(self, factor: f64) -> Self {
        match self {
            ConfigValue::Integer(v) => ConfigValue::Integer((v as f64 * factor).round() as i64),
            ConfigValue::Float(v) => ConfigValue::Float((v * factor * 100.0).round() / 100.0),
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigValue::Integer(v) => write!(f, "{}", v),
            ConfigValue::Float(v) => write!(f, "{}", v),
        }
    }
}

impl GenerationConfig {
    pub fn get(&self, field: ConfigField) -> ConfigValue {
        match field {
            ConfigField::Temperature => ConfigValue::Float(self.temperature),
            ConfigField::RepetitionPenalty => ConfigValue::Float(self.repetition_penalty),
            ConfigField::TopK => ConfigValue::Integer(i64::from(self.top_k)),
            ConfigField::TopP => ConfigValue::Float(self.top_p),
            ConfigField::MaxNewTokens => ConfigValue::Integer(i64::from(self.max_new_tokens)),
        }
    }

    /// Write `value` into `field`, converting to the field's own kind.
    pub fn set(&mut self, field: ConfigField, value: ConfigValue) {
        match field {
            ConfigField::Temperature => self.temperature = value.as_f64(),
            ConfigField::RepetitionPenalty => self.repetition_penalty = value.as_f64(),
            ConfigField::TopP => self.top_p = value.as_f64(),
            ConfigField::TopK => self.top_k = value.as_u32(),
            ConfigField::MaxNewTokens => self.max_new_tokens = value.as_u32(),
        }
    }
}

impl ConfigValue {
    fn as_f64(self) -> f64 {
        match self {
            ConfigValue::Integer(v) => v as f64,
            ConfigValue::Float(v) => v,
        }
    }

    // u32 fields saturate at the type bounds.
    fn as_u32(self) -> u32 {
        let v = match self {
            ConfigValue::Integer(v) => v,
            ConfigValue::Float(v) => v.round() as i64,
        };
        v.clamp(0, i64::from(u32::MAX)) as u32
    }
}

impl fmt::Display for GenerationConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "do_sample: {}", self.do_sample)?;
        writeln!(f, "temperature: {}", self.temperature)?;
        writeln!(f, "repetition_penalty: {}", self.repetition_penalty)?;
        writeln!(f, "top_k: {}", self.top_k)?;
        writeln!(f, "top_p: {}", self.top_p)?;
        write!(f, "max_new_tokens: {}", self.max_new_tokens)
    }
}
