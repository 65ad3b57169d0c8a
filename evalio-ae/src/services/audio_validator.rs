//! Audio upload sanity checks
//!
//! The declared duration must be plausible for the uploaded byte count at the
//! codec's typical bitrate. This rejects near-empty clips and spoofed
//! durations before any provider is called.

use super::EvaluationError;

/// Hard ceiling on answer length
pub const MAX_DURATION_SEC: f64 = 180.0;

/// Lower bound on accepted file size regardless of duration
pub const MIN_FILE_BYTES: f64 = 4000.0;

/// Accepted deviation from the expected size, in both directions
const SIZE_TOLERANCE_FACTOR: f64 = 4.0;

/// Typical bitrate for the declared MIME type
///
/// Unknown and compressed voice codecs (webm/opus) fall back to 48 kbps.
pub fn estimated_bitrate_kbps(mime_type: &str) -> u32 {
    let value = mime_type.to_ascii_lowercase();
    if value.contains("wav") {
        768
    } else if ["mpeg", "mp3", "mp4", "m4a", "aac"]
        .iter()
        .any(|codec| value.contains(codec))
    {
        128
    } else {
        48
    }
}

/// Accepted `[min, max]` byte range for a clip
pub fn expected_size_range(duration_sec: f64, mime_type: &str) -> (f64, f64) {
    let expected = duration_sec * estimated_bitrate_kbps(mime_type) as f64 * 1000.0 / 8.0;
    let min = (expected / SIZE_TOLERANCE_FACTOR).max(MIN_FILE_BYTES);
    let max = expected * SIZE_TOLERANCE_FACTOR;
    (min, max)
}

/// Validate declared duration against file size
///
/// `max_duration_sec` is the configured ceiling. Configuration loading
/// rejects values above `MAX_DURATION_SEC`.
pub fn validate_audio(
    duration_sec: f64,
    file_size: u64,
    mime_type: &str,
    max_duration_sec: f64,
) -> Result<(), EvaluationError> {
    if !duration_sec.is_finite() || duration_sec <= 0.0 || duration_sec > max_duration_sec {
        return Err(EvaluationError::InvalidAudioMetadata(format!(
            "durationSec must be a number greater than 0 and at most {} seconds",
            max_duration_sec
        )));
    }

    let (min, max) = expected_size_range(duration_sec, mime_type);
    let size = file_size as f64;
    if size < min || size > max {
        tracing::debug!(
            duration_sec,
            file_size,
            mime_type,
            min_bytes = min as u64,
            max_bytes = max as u64,
            "Audio size outside expected range"
        );
        return Err(EvaluationError::InvalidAudioMetadata(
            "Audio duration is inconsistent with uploaded file size".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitrate_table() {
        assert_eq!(estimated_bitrate_kbps("audio/wav"), 768);
        assert_eq!(estimated_bitrate_kbps("audio/x-wav"), 768);
        assert_eq!(estimated_bitrate_kbps("audio/mpeg"), 128);
        assert_eq!(estimated_bitrate_kbps("audio/MP4"), 128);
        assert_eq!(estimated_bitrate_kbps("audio/aac"), 128);
        assert_eq!(estimated_bitrate_kbps("audio/webm;codecs=opus"), 48);
        assert_eq!(estimated_bitrate_kbps(""), 48);
    }

    #[test]
    fn test_plausible_webm_is_accepted() {
        // 30 s at 48 kbps = 180000 bytes expected
        assert!(validate_audio(30.0, 180_000, "audio/webm", MAX_DURATION_SEC).is_ok());
        assert!(validate_audio(30.0, 45_000, "audio/webm", MAX_DURATION_SEC).is_ok());
        assert!(validate_audio(30.0, 720_000, "audio/webm", MAX_DURATION_SEC).is_ok());
    }

    #[test]
    fn test_size_out_of_range_is_rejected() {
        assert!(matches!(
            validate_audio(30.0, 44_999, "audio/webm", MAX_DURATION_SEC),
            Err(EvaluationError::InvalidAudioMetadata(_))
        ));
        assert!(matches!(
            validate_audio(30.0, 720_001, "audio/webm", MAX_DURATION_SEC),
            Err(EvaluationError::InvalidAudioMetadata(_))
        ));
    }

    #[test]
    fn test_min_size_floor() {
        // 1 s webm expects 6000 bytes, quarter would be 1500; floor is 4000
        assert!(validate_audio(1.0, 3_999, "audio/webm", MAX_DURATION_SEC).is_err());
        assert!(validate_audio(1.0, 4_000, "audio/webm", MAX_DURATION_SEC).is_ok());
    }

    #[test]
    fn test_duration_bounds() {
        for duration in [0.0, -1.0, 180.5, f64::NAN, f64::INFINITY] {
            assert!(
                validate_audio(duration, 100_000, "audio/webm", MAX_DURATION_SEC).is_err(),
                "duration {} should be rejected",
                duration
            );
        }
        // 180 s of mp3 is 2.88 MB expected
        assert!(validate_audio(180.0, 2_880_000, "audio/mpeg", MAX_DURATION_SEC).is_ok());
    }

    #[test]
    fn test_configured_ceiling() {
        assert!(validate_audio(90.0, 540_000, "audio/webm", 60.0).is_err());
    }
}
