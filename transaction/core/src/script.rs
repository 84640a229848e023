// Copyright (c) 2024 The Veil Foundation

//! Time-lock scripts of the form `"<lock_time> OP_CHECKLOCKTIMEVERIFY"`.

const CHECKLOCKTIMEVERIFY: &str = "OP_CHECKLOCKTIMEVERIFY";

/// The script locking an output until `lock_time` (unix seconds).
pub fn lock_script(lock_time: i64) -> String {
    format!("{lock_time} {CHECKLOCKTIMEVERIFY}")
}

/// The lock time encoded in `script`, if it is a well-formed time lock.
pub fn parse_lock_script(script: &str) -> Option<i64> {
    let mut parts = script.split_whitespace();
    let lock_time = parts.next()?.parse().ok()?;
    match (parts.next(), parts.next()) {
        (Some(CHECKLOCKTIMEVERIFY), None) => Some(lock_time),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lock_script_roundtrip() {
        let script = lock_script(1_700_000_000);
        assert_eq!(script, "1700000000 OP_CHECKLOCKTIMEVERIFY");
        assert_eq!(parse_lock_script(&script), Some(1_700_000_000));
    }

    #[test]
    fn test_malformed_scripts() {
        assert_eq!(parse_lock_script(""), None);
        assert_eq!(parse_lock_script("OP_CHECKLOCKTIMEVERIFY"), None);
        assert_eq!(parse_lock_script("12 OP_DROP"), None);
        assert_eq!(parse_lock_script("12 OP_CHECKLOCKTIMEVERIFY OP_DROP"), None);
    }
}
