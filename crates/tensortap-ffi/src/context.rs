use tensortap_core::{Error, Result};

/// Capture behavior options
#[derive(Debug, Clone)]
pub struct CaptureOptions {
    /// Dump full element data from `tensortap_print`, not just shapes
    pub print_values: bool,
    /// Maximum records the store accepts, 0 = unlimited
    pub max_records: usize,
}

impl CaptureOptions {
    pub const fn new() -> Self {
        Self { print_values: false, max_records: 0 }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| Error::ParseError(format!("Invalid options JSON: {}", e)))
    }
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de> serde::Deserialize<'de> for CaptureOptions {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(serde::Deserialize)]
        struct OptionsHelper {
            print_values: Option<bool>,
            max_records: Option<usize>,
        }

        let helper = OptionsHelper::deserialize(deserializer)?;
        Ok(Self {
            print_values: helper.print_values.unwrap_or(false),
            max_records: helper.max_records.unwrap_or(0),
        })
    }
}
