use std::time::{SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch, the unit execution-log queries use.
/// A clock set before the epoch reads as 0.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as u64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_epoch_millis_moves_forward() {
        let first = epoch_millis();
        let second = epoch_millis();
        assert!(first > 1_600_000_000_000);
        assert!(second >= first);
    }
}
