use uuid::Uuid;

/// Generate a key for tables that used to rely on `AUTO_INCREMENT`.
///
/// Spanner has no sequences the framework can lean on, so rows get a random version 4 UUID
/// in uppercase hyphenated form, e.g. `9F1C2E4A-0B6D-4E8F-A1B2-C3D4E5F60718`.
#[must_use]
pub fn get_auto_increment() -> String {
    Uuid::new_v4().hyphenated().to_string().to_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_uppercase_v4_uuids() {
        let token = get_auto_increment();
        assert_eq!(token.len(), 36);
        assert_eq!(token, token.to_uppercase());
        let parsed = Uuid::parse_str(&token).unwrap();
        assert_eq!(parsed.get_version_num(), 4);
    }

    #[test]
    fn tokens_differ() {
        assert_ne!(get_auto_increment(), get_auto_increment());
    }
}
