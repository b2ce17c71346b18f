use std::fs;
use std::path::Path;
use std::time::Duration;

use rentscan_backend::BackendConfig;
use rentscan_protocol::DEFAULT_RENTAL_DURATION_SECS;
use serde::Deserialize;

pub const DEFAULT_BAUD_RATE: u32 = 115_200;
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub transport: TransportConfig,
    pub rental: RentalConfig,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LinkMode {
    #[default]
    Serial,
    Tcp,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum DataBits {
    Five,
    Six,
    Seven,
    #[default]
    Eight,
}

impl TryFrom<u8> for DataBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            5 => Ok(Self::Five),
            6 => Ok(Self::Six),
            7 => Ok(Self::Seven),
            8 => Ok(Self::Eight),
            _ => Err(format!("data_bits must be one of: 5, 6, 7, 8 (got {bits})")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(try_from = "u8")]
pub enum StopBits {
    #[default]
    One,
    Two,
}

impl TryFrom<u8> for StopBits {
    type Error = String;

    fn try_from(bits: u8) -> Result<Self, Self::Error> {
        match bits {
            1 => Ok(Self::One),
            2 => Ok(Self::Two),
            _ => Err(format!("stop_bits must be one of: 1, 2 (got {bits})")),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parity {
    #[default]
    None,
    Even,
    Odd,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlowControl {
    #[default]
    None,
    Software,
    Hardware,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TransportConfig {
    pub mode: LinkMode,
    /// Serial device path, or `host:port` to listen on in TCP mode.
    pub port: Option<String>,
    pub baud_rate: u32,
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
    pub flow_control: FlowControl,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            mode: LinkMode::Serial,
            port: None,
            baud_rate: DEFAULT_BAUD_RATE,
            data_bits: DataBits::default(),
            parity: Parity::default(),
            stop_bits: StopBits::default(),
            flow_control: FlowControl::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RentalConfig {
    pub default_duration_secs: u64,
    pub sweep_interval_secs: u64,
}

impl Default for RentalConfig {
    fn default() -> Self {
        Self {
            default_duration_secs: DEFAULT_RENTAL_DURATION_SECS,
            sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
        }
    }
}

impl DaemonConfig {
    pub fn from_toml(input: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(input)
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
            .map_err(|err| std::io::Error::new(std::io::ErrorKind::InvalidData, err))
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.rental.default_duration_secs == 0 {
            return Err("rental.default_duration_secs must be greater than zero".into());
        }
        if self.rental.sweep_interval_secs == 0 {
            return Err("rental.sweep_interval_secs must be greater than zero".into());
        }
        if self.transport.baud_rate == 0 {
            return Err("transport.baud_rate must be greater than zero".into());
        }
        Ok(())
    }

    pub fn backend_config(&self) -> BackendConfig {
        BackendConfig {
            default_duration_secs: self.rental.default_duration_secs,
            sweep_interval: Duration::from_secs(self.rental.sweep_interval_secs),
            ..BackendConfig::default()
        }
    }
}
