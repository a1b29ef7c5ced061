//! Audio filter entities sent with the `filters` and `equalizer` commands.
//!
//! Every field is optional and omitted from the JSON when unset; the node
//! treats a missing filter as "off".

use serde::{Deserialize, Serialize};

use crate::ProtocolError;

/// Number of equalizer bands the node exposes (25 Hz to 16 kHz).
pub const EQUALIZER_BANDS: u8 = 15;

/// Lowest accepted band gain.
pub const MIN_GAIN: f32 = -0.25;

/// Highest accepted band gain.
pub const MAX_GAIN: f32 = 1.0;

/// One equalizer band adjustment.
///
/// A gain of `0.0` leaves the band unchanged; `-0.25` mutes it and `1.0`
/// doubles it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EqualizerBand {
    /// Band index, `0..15`.
    pub band: u8,
    /// Gain multiplier offset, `-0.25..=1.0`.
    pub gain: f32,
}

impl EqualizerBand {
    /// Creates a band, validating index and gain.
    pub fn new(band: u8, gain: f32) -> Result<Self, ProtocolError> {
        let b = Self { band, gain };
        b.validate()?;
        Ok(b)
    }

    /// Checks index and gain ranges.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        // `contains` is false for NaN, so NaN gains are rejected too.
        if self.band >= EQUALIZER_BANDS || !(MIN_GAIN..=MAX_GAIN).contains(&self.gain) {
            return Err(ProtocolError::InvalidBand {
                band: self.band,
                gain: self.gain,
            });
        }
        Ok(())
    }
}

/// Vocal elimination by band-limited phase cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Karaoke {
    pub level: f32,
    pub mono_level: f32,
    pub filter_band: f32,
    pub filter_width: f32,
}

/// Speed, pitch and rate changes. All three must be positive.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timescale {
    pub speed: f64,
    pub pitch: f64,
    pub rate: f64,
}

/// Volume oscillation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tremolo {
    pub frequency: f32,
    pub depth: f32,
}

/// Pitch oscillation. Frequency is capped at 14 Hz by the node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vibrato {
    pub frequency: f32,
    pub depth: f32,
}

/// Stereo panning around the listener.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rotation {
    pub rotation_hz: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Distortion {
    pub sin_offset: f32,
    pub sin_scale: f32,
    pub cos_offset: f32,
    pub cos_scale: f32,
    pub tan_offset: f32,
    pub tan_scale: f32,
    pub offset: f32,
    pub scale: f32,
}

/// Mixes the two channels into each other.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelMix {
    pub left_to_left: f32,
    pub left_to_right: f32,
    pub right_to_left: f32,
    pub right_to_right: f32,
}

/// Suppresses high frequencies. Smoothing above 1.0 takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LowPass {
    pub smoothing: f32,
}

/// The full filter set of a player.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Filters {
    /// Filter-stage volume, `0.0..=5.0` (1.0 = unchanged).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volume: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equalizer: Option<Vec<EqualizerBand>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub karaoke: Option<Karaoke>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timescale: Option<Timescale>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tremolo: Option<Tremolo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vibrato: Option<Vibrato>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Rotation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub distortion: Option<Distortion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_mix: Option<ChannelMix>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_pass: Option<LowPass>,
}

impl Filters {
    /// Checks every set filter against the node's accepted ranges.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if let Some(volume) = self.volume {
            if !(0.0..=5.0).contains(&volume) {
                return Err(ProtocolError::InvalidFilter(format!(
                    "volume {volume} outside 0.0..=5.0"
                )));
            }
        }
        if let Some(bands) = &self.equalizer {
            bands.iter().try_for_each(EqualizerBand::validate)?;
        }
        if let Some(t) = &self.timescale {
            if t.speed <= 0.0 || t.pitch <= 0.0 || t.rate <= 0.0 {
                return Err(ProtocolError::InvalidFilter(
                    "timescale values must be positive".into(),
                ));
            }
        }
        if let Some(t) = &self.tremolo {
            if t.frequency <= 0.0 || !(t.depth > 0.0 && t.depth <= 1.0) {
                return Err(ProtocolError::InvalidFilter(format!(
                    "tremolo frequency {} / depth {} out of range",
                    t.frequency, t.depth
                )));
            }
        }
        if let Some(v) = &self.vibrato {
            if !(v.frequency > 0.0 && v.frequency <= 14.0)
                || !(v.depth > 0.0 && v.depth <= 1.0)
            {
                return Err(ProtocolError::InvalidFilter(format!(
                    "vibrato frequency {} / depth {} out of range",
                    v.frequency, v.depth
                )));
            }
        }
        Ok(())
    }

    /// Returns `true` if no filter is set.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_band_accepts_range_edges() {
        assert!(EqualizerBand::new(0, -0.25).is_ok());
        assert!(EqualizerBand::new(14, 1.0).is_ok());
    }

    #[test]
    fn test_band_rejects_index_fifteen() {
        assert!(matches!(
            EqualizerBand::new(15, 0.0),
            Err(ProtocolError::InvalidBand { band: 15, .. })
        ));
    }

    #[test]
    fn test_band_rejects_gain_out_of_range_and_nan() {
        assert!(EqualizerBand::new(3, -0.26).is_err());
        assert!(EqualizerBand::new(3, 1.01).is_err());
        assert!(EqualizerBand::new(3, f32::NAN).is_err());
    }

    #[test]
    fn test_empty_filters_serialize_to_empty_object() {
        let json = serde_json::to_value(Filters::default()).unwrap();
        assert_eq!(json, serde_json::json!({}));
        assert!(Filters::default().is_empty());
    }

    #[test]
    fn test_filters_use_camel_case_names() {
        let filters = Filters {
            channel_mix: Some(ChannelMix {
                left_to_left: 1.0,
                left_to_right: 0.0,
                right_to_left: 0.0,
                right_to_right: 1.0,
            }),
            low_pass: Some(LowPass { smoothing: 20.0 }),
            ..Filters::default()
        };
        let json = serde_json::to_value(&filters).unwrap();
        assert_eq!(json["channelMix"]["leftToLeft"], 1.0);
        assert_eq!(json["lowPass"]["smoothing"], 20.0);
        assert!(json.get("volume").is_none());
    }

    #[test]
    fn test_validate_rejects_loud_volume() {
        let filters = Filters {
            volume: Some(5.5),
            ..Filters::default()
        };
        assert!(matches!(
            filters.validate(),
            Err(ProtocolError::InvalidFilter(_))
        ));
    }

    #[test]
    fn test_validate_rejects_bad_equalizer_band() {
        let filters = Filters {
            equalizer: Some(vec![EqualizerBand { band: 20, gain: 0.1 }]),
            ..Filters::default()
        };
        assert!(matches!(
            filters.validate(),
            Err(ProtocolError::InvalidBand { band: 20, .. })
        ));
    }

    #[test]
    fn test_validate_rejects_fast_vibrato() {
        let filters = Filters {
            vibrato: Some(Vibrato {
                frequency: 20.0,
                depth: 0.5,
            }),
            ..Filters::default()
        };
        assert!(filters.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_nightcore_timescale() {
        let filters = Filters {
            timescale: Some(Timescale {
                speed: 1.2,
                pitch: 1.2,
                rate: 1.0,
            }),
            ..Filters::default()
        };
        assert!(filters.validate().is_ok());
    }
}
