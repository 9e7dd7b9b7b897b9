//! AQI severity classification and marker colouring.
//!
//! Maps an air quality index value to a severity band and display colour
//! using the fixed breakpoint table. Bands are inclusive on their lower
//! bound with no gaps or overlaps; the function is total over all
//! non-negative values.

use serde::Deserialize;
use tracing::warn;

use crate::coord::LonLat;

/// An air quality sample supplied by the external data source.
///
/// The core consumes snapshots of these; it does not poll or diff them.
#[derive(Debug, Clone, PartialEq)]
pub struct AqiSample {
    /// Stable sample identifier.
    pub id: String,
    /// Sample location.
    pub position: LonLat,
    /// Air quality index value.
    pub value: u32,
}

/// Raw sample record as supplied by the data source (for JSON snapshots).
#[derive(Debug, Clone, Deserialize)]
pub struct AqiRecord {
    pub id: String,
    pub lon: f64,
    pub lat: f64,
    pub aqi: u32,
}

impl From<AqiRecord> for AqiSample {
    fn from(record: AqiRecord) -> Self {
        Self {
            id: record.id,
            position: LonLat::new(record.lon, record.lat),
            value: record.aqi,
        }
    }
}

/// Parses a JSON snapshot of [`AqiRecord`]s into samples.
///
/// Records with out-of-range coordinates are dropped with a warning; a
/// bad station entry must not poison the whole snapshot.
pub fn samples_from_json(json: &str) -> Result<Vec<AqiSample>, serde_json::Error> {
    let records: Vec<AqiRecord> = serde_json::from_str(json)?;
    Ok(records
        .into_iter()
        .filter(|record| {
            let valid = LonLat::validated(record.lon, record.lat).is_ok();
            if !valid {
                warn!(
                    id = %record.id,
                    lon = record.lon,
                    lat = record.lat,
                    "dropping sample with out-of-range coordinates"
                );
            }
            valid
        })
        .map(AqiSample::from)
        .collect())
}

/// Severity bands of the AQI breakpoint table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// AQI 0-50.
    Good,
    /// AQI 51-100.
    Moderate,
    /// AQI 101-150.
    UnhealthySensitive,
    /// AQI 151-200.
    Unhealthy,
    /// AQI 201-300.
    VeryUnhealthy,
    /// AQI 301 and above.
    Hazardous,
}

impl Severity {
    /// Classifies an AQI value.
    pub fn from_aqi(value: u32) -> Self {
        match value {
            0..=50 => Severity::Good,
            51..=100 => Severity::Moderate,
            101..=150 => Severity::UnhealthySensitive,
            151..=200 => Severity::Unhealthy,
            201..=300 => Severity::VeryUnhealthy,
            _ => Severity::Hazardous,
        }
    }

    /// Display colour for this band.
    pub fn color(&self) -> Rgb {
        match self {
            Severity::Good => Rgb::new(0x00, 0xe4, 0x00),
            Severity::Moderate => Rgb::new(0xff, 0xff, 0x00),
            Severity::UnhealthySensitive => Rgb::new(0xff, 0x7e, 0x00),
            Severity::Unhealthy => Rgb::new(0xff, 0x00, 0x00),
            Severity::VeryUnhealthy => Rgb::new(0x8f, 0x3f, 0x97),
            Severity::Hazardous => Rgb::new(0x7e, 0x00, 0x23),
        }
    }

    /// Human-readable band label.
    pub fn label(&self) -> &'static str {
        match self {
            Severity::Good => "Good",
            Severity::Moderate => "Moderate",
            Severity::UnhealthySensitive => "Unhealthy for Sensitive Groups",
            Severity::Unhealthy => "Unhealthy",
            Severity::VeryUnhealthy => "Very Unhealthy",
            Severity::Hazardous => "Hazardous",
        }
    }
}

/// Marker colour for an AQI value.
pub fn color_for(value: u32) -> Rgb {
    Severity::from_aqi(value).color()
}

/// An RGB display colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// CSS-style hex form, e.g. `#00e400`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_lower_bounds() {
        assert_eq!(Severity::from_aqi(0), Severity::Good);
        assert_eq!(Severity::from_aqi(51), Severity::Moderate);
        assert_eq!(Severity::from_aqi(101), Severity::UnhealthySensitive);
        assert_eq!(Severity::from_aqi(151), Severity::Unhealthy);
        assert_eq!(Severity::from_aqi(201), Severity::VeryUnhealthy);
        assert_eq!(Severity::from_aqi(301), Severity::Hazardous);
    }

    #[test]
    fn test_band_upper_bounds() {
        assert_eq!(Severity::from_aqi(50), Severity::Good);
        assert_eq!(Severity::from_aqi(100), Severity::Moderate);
        assert_eq!(Severity::from_aqi(150), Severity::UnhealthySensitive);
        assert_eq!(Severity::from_aqi(200), Severity::Unhealthy);
        assert_eq!(Severity::from_aqi(300), Severity::VeryUnhealthy);
    }

    #[test]
    fn test_50_and_51_map_to_adjacent_bands() {
        let below = Severity::from_aqi(50);
        let above = Severity::from_aqi(51);
        assert_ne!(below, above);
        assert_eq!(below, Severity::Good);
        assert_eq!(above, Severity::Moderate);
    }

    #[test]
    fn test_extreme_values_are_hazardous() {
        assert_eq!(Severity::from_aqi(999), Severity::Hazardous);
        assert_eq!(Severity::from_aqi(u32::MAX), Severity::Hazardous);
    }

    #[test]
    fn test_colors_match_legend() {
        assert_eq!(color_for(40).to_hex(), "#00e400");
        assert_eq!(color_for(80).to_hex(), "#ffff00");
        assert_eq!(color_for(130).to_hex(), "#ff7e00");
        assert_eq!(color_for(180).to_hex(), "#ff0000");
        assert_eq!(color_for(250).to_hex(), "#8f3f97");
        assert_eq!(color_for(400).to_hex(), "#7e0023");
    }

    #[test]
    fn test_json_snapshot_parses_to_samples() {
        let json = r#"[
            {"id": "blr-01", "lon": 77.5946, "lat": 12.9716, "aqi": 150},
            {"id": "del-01", "lon": 77.1025, "lat": 28.7041, "aqi": 200}
        ]"#;
        let samples = samples_from_json(json).unwrap();
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].id, "blr-01");
        assert_eq!(samples[1].value, 200);
    }

    #[test]
    fn test_json_snapshot_drops_out_of_range_records() {
        let json = r#"[
            {"id": "bad", "lon": 200.0, "lat": 12.9716, "aqi": 150},
            {"id": "good", "lon": 77.5946, "lat": 12.9716, "aqi": 150}
        ]"#;
        let samples = samples_from_json(json).unwrap();
        assert_eq!(samples.len(), 1);
        assert_eq!(samples[0].id, "good");
    }

    #[test]
    fn test_malformed_json_snapshot_is_an_error() {
        assert!(samples_from_json("not json").is_err());
    }

    #[test]
    fn test_record_converts_to_sample() {
        let record = AqiRecord {
            id: "blr-01".to_string(),
            lon: 77.5946,
            lat: 12.9716,
            aqi: 150,
        };
        let sample: AqiSample = record.into();
        assert_eq!(sample.position, LonLat::new(77.5946, 12.9716));
        assert_eq!(sample.value, 150);
    }

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn test_classification_total_and_monotonic(a in 0u32..2000, b in 0u32..2000) {
                let (low, high) = if a <= b { (a, b) } else { (b, a) };
                prop_assert!(Severity::from_aqi(low) <= Severity::from_aqi(high));
            }

            #[test]
            fn test_adjacent_values_never_skip_a_band(value in 0u32..1000) {
                let here = Severity::from_aqi(value);
                let next = Severity::from_aqi(value + 1);
                // Bands are contiguous: stepping by one moves at most one band.
                prop_assert!(next == here || next as u8 == here as u8 + 1);
            }
        }
    }
}
