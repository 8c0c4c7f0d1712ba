use base64::{engine::general_purpose, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// An image held in memory as a `data:<mime>;base64,<payload>` URI.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedImage {
    pub data_uri: String,
    pub mime_type: String,
    pub source_size: usize,
    pub captured_at: DateTime<Utc>,
}

impl CapturedImage {
    pub fn from_bytes(mime_type: &str, bytes: &[u8]) -> Self {
        let payload = general_purpose::STANDARD.encode(bytes);
        Self {
            data_uri: format!("data:{};base64,{}", mime_type, payload),
            mime_type: mime_type.to_string(),
            source_size: bytes.len(),
            captured_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Healthiness {
    Good,
    Okay,
    Bad,
    /// Anything the model produced outside the closed set.
    #[default]
    Unknown,
}

impl Healthiness {
    pub fn from_value(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "good" => Healthiness::Good,
            "okay" => Healthiness::Okay,
            "bad" => Healthiness::Bad,
            _ => Healthiness::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Healthiness::Good => "good",
            Healthiness::Okay => "okay",
            Healthiness::Bad => "bad",
            Healthiness::Unknown => "unknown",
        }
    }

    /// Display label: the wire value with its first letter upper-cased.
    pub fn label(&self) -> String {
        let value = self.as_str();
        let mut chars = value.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

impl std::fmt::Display for Healthiness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

impl Serialize for Healthiness {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Healthiness {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(match value {
            Some(serde_json::Value::String(s)) => Healthiness::from_value(&s),
            _ => Healthiness::Unknown,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Nutrition {
    #[serde(default, deserialize_with = "lenient_number")]
    pub carbs: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fat: Option<f64>,
}

/// Nutrition summary as returned by the bridge.
///
/// Calories and macros are independent estimates; nothing ties them together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_nutrition")]
    pub nutrition: Nutrition,
    #[serde(default)]
    pub healthiness: Healthiness,
    #[serde(default, deserialize_with = "lenient_suggestions")]
    pub suggestions: Vec<String>,
}

// Models sometimes quote numbers ("95"), append units ("95 kcal") or give
// ranges ("300-400 kcal"); only the first numeric run is taken.
fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Number(n)) => n.as_f64(),
        Some(serde_json::Value::String(s)) => {
            let first_run = s
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect::<String>();
            first_run.trim_end_matches('.').parse::<f64>().ok()
        }
        _ => None,
    })
}

fn lenient_nutrition<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Nutrition, D::Error> {
    Ok(Option::<Nutrition>::deserialize(deserializer)?.unwrap_or_default())
}

fn lenient_suggestions<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                serde_json::Value::String(s) => Some(s),
                serde_json::Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(serde_json::Value::String(s)) => vec![s],
        _ => Vec::new(),
    })
}
