//! Utility functions for id generation and timestamp handling.

mod ids;
pub mod timestamps;

pub use ids::generate_id;
pub use timestamps::{duration_seconds, now_utc, parse_timestamp, Timestamp};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_uuid_v4() {
        let id = generate_id();
        let parsed = uuid::Uuid::parse_str(&id).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }
}
