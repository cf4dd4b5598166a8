use time::Duration;

use super::FilesConfig;
use crate::database::types::DTimestamp;

#[derive(Debug, thiserror::Error)]
pub enum PolicyError {
    #[error("max_file_size must be greater than zero")]
    ZeroMaxFileSize,

    #[error("min expiration ({min}) exceeds max expiration ({max})")]
    InvertedBounds { min: Duration, max: Duration },
}

/// Size-scaled retention.
///
/// Small files live close to `max_expiration`, files at the size limit get
/// `min_expiration`, and retention falls linearly in between.
#[derive(Debug, Clone)]
pub struct ExpirationPolicy {
    max_file_size: u64,
    min_expiration: Duration,
    max_expiration: Duration,
}

impl ExpirationPolicy {
    pub fn new(config: &FilesConfig) -> Result<Self, PolicyError> {
        if config.max_file_size == 0 {
            return Err(PolicyError::ZeroMaxFileSize);
        }
        if config.min_expiration > config.max_expiration {
            return Err(PolicyError::InvertedBounds {
                min: config.min_expiration,
                max: config.max_expiration,
            });
        }

        Ok(Self {
            max_file_size: config.max_file_size,
            min_expiration: config.min_expiration,
            max_expiration: config.max_expiration,
        })
    }

    pub fn max_lifespan(&self, size_bytes: u64) -> Duration {
        let ratio = (size_bytes as f64 / self.max_file_size as f64).clamp(0.0, 1.0);
        self.min_expiration + (self.max_expiration - self.min_expiration) * (1.0 - ratio)
    }

    /// Expiry for an upload of `size_bytes` made at `now`.
    ///
    /// A requested duration is honored only when it ends strictly before the
    /// size-derived ceiling.
    pub fn expires_at(
        &self,
        size_bytes: u64,
        requested_hours: Option<u64>,
        now: DTimestamp,
    ) -> DTimestamp {
        let ceiling = now.saturating_add(self.max_lifespan(size_bytes));

        let requested = requested_hours
            .and_then(|hours| i64::try_from(hours).ok())
            .and_then(|hours| hours.checked_mul(3600))
            .and_then(|secs| now.checked_add(Duration::seconds(secs)));

        match requested {
            Some(requested) if requested < ceiling => DTimestamp::from(requested),
            _ => DTimestamp::from(ceiling),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MIB: u64 = 1024 * 1024;

    fn policy() -> ExpirationPolicy {
        ExpirationPolicy::new(&FilesConfig {
            max_file_size: MIB,
            min_expiration: Duration::days(30),
            max_expiration: Duration::days(365),
            ..FilesConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_small_file_scenario() {
        let lifespan = policy().max_lifespan(1024);
        let days = lifespan.as_seconds_f64() / 86_400.0;
        assert!((days - 364.67).abs() < 0.01, "got {days} days");
    }

    #[test]
    fn test_bounds() {
        let p = policy();
        assert_eq!(p.max_lifespan(0), Duration::days(365));
        assert_eq!(p.max_lifespan(MIB), Duration::days(30));
        assert_eq!(p.max_lifespan(10 * MIB), Duration::days(30));
    }

    #[test]
    fn test_lifespan_is_monotonic() {
        let p = policy();
        let mut previous = p.max_lifespan(0);
        for size in (0..=MIB).step_by(4096) {
            let current = p.max_lifespan(size);
            assert!(current <= previous, "size {size} grew retention");
            previous = current;
        }
    }

    #[test]
    fn test_requested_below_ceiling_is_honored() {
        let now = DTimestamp::now();
        let expires = policy().expires_at(1024, Some(24), now);
        assert_eq!(expires.unix_timestamp() - now.unix_timestamp(), 24 * 3600);
    }

    #[test]
    fn test_requested_never_exceeds_ceiling() {
        let p = policy();
        let now = DTimestamp::now();
        let ceiling = now.unix_timestamp() + p.max_lifespan(MIB / 2).whole_seconds();

        for hours in [0, 1, 24 * 365, 24 * 400, u64::MAX] {
            let expires = p.expires_at(MIB / 2, Some(hours), now);
            assert!(expires.unix_timestamp() <= ceiling, "hours {hours}");
        }
        assert_eq!(p.expires_at(MIB / 2, None, now).unix_timestamp(), ceiling);
    }

    #[test]
    fn test_rejects_bad_config() {
        let zero = FilesConfig {
            max_file_size: 0,
            ..FilesConfig::default()
        };
        assert!(matches!(
            ExpirationPolicy::new(&zero),
            Err(PolicyError::ZeroMaxFileSize)
        ));

        let inverted = FilesConfig {
            min_expiration: Duration::days(400),
            max_expiration: Duration::days(30),
            ..FilesConfig::default()
        };
        assert!(matches!(
            ExpirationPolicy::new(&inverted),
            Err(PolicyError::InvertedBounds { .. })
        ));
    }
}
