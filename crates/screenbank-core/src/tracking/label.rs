use crate::error::LabelError;

/// Parse the cumulative minute out of a threshold label such as `minute_12`.
pub fn parse_threshold_label(label: &str, prefix: &str) -> Result<u32, LabelError> {
    let digits = label
        .strip_prefix(prefix)
        .ok_or_else(|| LabelError::MissingPrefix {
            label: label.to_string(),
            prefix: prefix.to_string(),
        })?;

    // u32::from_str accepts a leading '+'; labels never carry one.
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(LabelError::InvalidMinute {
            label: label.to_string(),
        });
    }
    digits.parse().map_err(|_| LabelError::InvalidMinute {
        label: label.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_minute() {
        assert_eq!(parse_threshold_label("minute_0", "minute_"), Ok(0));
        assert_eq!(parse_threshold_label("minute_45", "minute_"), Ok(45));
    }

    #[test]
    fn rejects_malformed() {
        assert!(matches!(
            parse_threshold_label("minutes_4", "minute_"),
            Err(LabelError::MissingPrefix { .. })
        ));
        for bad in ["minute_", "minute_-3", "minute_+3", "minute_4x", "minute_99999999999"] {
            assert!(
                matches!(parse_threshold_label(bad, "minute_"), Err(LabelError::InvalidMinute { .. })),
                "{bad}"
            );
        }
    }

    #[test]
    fn custom_prefix() {
        assert_eq!(parse_threshold_label("m12", "m"), Ok(12));
    }
}
