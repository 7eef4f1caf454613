use crate::config::DeckConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct CliOverrides {
    pub config: Option<PathBuf>,
    pub trace: Option<PathBuf>,
    brightness: Option<f32>,
    scale: Option<f32>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Use --config/--trace/--brightness/--scale with values.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "trace" => overrides.trace = Some(PathBuf::from(value)),
                "brightness" => {
                    overrides.brightness = Some(parse_positive("brightness", &value)?);
                }
                "scale" => {
                    overrides.scale = Some(parse_positive("scale", &value)?);
                }
                _ => bail!("Unknown flag '{flag}'. Supported flags: --config, --trace, --brightness, --scale."),
            }
        }
        Ok(overrides)
    }

    pub fn config_overrides(&self) -> DeckConfigOverrides {
        DeckConfigOverrides { brightness: self.brightness, character_scale: self.scale }
    }
}

fn parse_positive(flag: &str, value: &str) -> Result<f32> {
    let parsed = value.parse::<f32>().with_context(|| format!("Invalid {flag} '{value}'"))?;
    if !parsed.is_finite() || parsed < 0.0 {
        bail!("Invalid {flag} '{value}'. Expected a non-negative number.");
    }
    Ok(parsed)
}
