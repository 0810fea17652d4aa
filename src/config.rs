use crate::review::DEFAULT_RETIRED_BUCKET;
use crate::scheduler::MAX_BUCKET;

pub const DEFAULT_PORT: u16 = 3001;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub paths: Vec<String>,
    pub port: u16,
    pub retired_bucket: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrillConfig {
    pub paths: Vec<String>,
    pub day: u64,
    pub retired_bucket: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("{flag} expects a value")]
    MissingValue { flag: String },
    #[error("invalid {what}: {value}")]
    Invalid { what: &'static str, value: String },
    #[error("no deck paths given")]
    NoPaths,
}

fn parse_value<T: std::str::FromStr>(what: &'static str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::Invalid {
        what,
        value: value.to_string(),
    })
}

fn parse_retired(value: &str) -> Result<u32, ConfigError> {
    let bucket: u32 = parse_value("retired bucket", value)?;
    if bucket > MAX_BUCKET {
        return Err(ConfigError::Invalid {
            what: "retired bucket",
            value: value.to_string(),
        });
    }
    Ok(bucket)
}

// Splits `args` into positional paths and `-x VALUE` flags, rejecting flags
// outside `known`.
fn split_args<'a>(
    args: &'a [String],
    known: &[&str],
) -> Result<(Vec<String>, Vec<(&'a str, &'a str)>), ConfigError> {
    let mut paths = Vec::new();
    let mut flags = Vec::new();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if known.contains(&arg.as_str()) {
            let value = iter.next().ok_or_else(|| ConfigError::MissingValue {
                flag: arg.clone(),
            })?;
            flags.push((arg.as_str(), value.as_str()));
        } else {
            paths.push(arg.clone());
        }
    }
    Ok((paths, flags))
}

impl ServeConfig {
    // Without `-p` the port comes from `env_port`, then DEFAULT_PORT.
    pub fn from_args(args: &[String], env_port: Option<&str>) -> Result<ServeConfig, ConfigError> {
        let (paths, flags) = split_args(args, &["-p", "-r"])?;
        let mut port = match env_port {
            Some(value) => parse_value("PORT", value)?,
            None => DEFAULT_PORT,
        };
        let mut retired_bucket = DEFAULT_RETIRED_BUCKET;
        for (flag, value) in flags {
            match flag {
                "-p" => port = parse_value("port", value)?,
                _ => retired_bucket = parse_retired(value)?,
            }
        }
        Ok(ServeConfig {
            paths,
            port,
            retired_bucket,
        })
    }
}

impl DrillConfig {
    pub fn from_args(args: &[String]) -> Result<DrillConfig, ConfigError> {
        let (paths, flags) = split_args(args, &["-d", "-r"])?;
        if paths.is_empty() {
            return Err(ConfigError::NoPaths);
        }
        let mut day = 0;
        let mut retired_bucket = DEFAULT_RETIRED_BUCKET;
        for (flag, value) in flags {
            match flag {
                "-d" => day = parse_value("day", value)?,
                _ => retired_bucket = parse_retired(value)?,
            }
        }
        Ok(DrillConfig {
            paths,
            day,
            retired_bucket,
        })
    }
}
