/// Replace `${ENV_VAR}` placeholders in raw config text.
///
/// Unresolvable or malformed placeholders are left as-is so the parse error
/// (if any) points at the original text.
pub fn substitute_env(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) if end > 0 => {
                let name = &after[..end];
                match std::env::var(name) {
                    Ok(value) => result.push_str(&value),
                    Err(_) => {
                        result.push_str("${");
                        result.push_str(name);
                        result.push('}');
                    },
                }
                rest = &after[end + 1..];
            },
            _ => {
                // No closing brace (or empty name): emit literally and stop
                // scanning this fragment.
                result.push_str("${");
                rest = after;
            },
        }
    }

    result.push_str(rest);
    result
}

#[cfg(test)]
// set_var is unsafe in edition 2024; fine in single-purpose test code.
#[allow(unsafe_code)]
mod tests {
    use super::*;

    #[test]
    fn substitutes_known_var() {
        unsafe { std::env::set_var("RAGSWITCH_TEST_VAR", "hello") };
        assert_eq!(substitute_env("key=${RAGSWITCH_TEST_VAR}"), "key=hello");
        unsafe { std::env::remove_var("RAGSWITCH_TEST_VAR") };
    }

    #[test]
    fn leaves_unknown_var() {
        assert_eq!(
            substitute_env("${RAGSWITCH_NONEXISTENT_XYZ}"),
            "${RAGSWITCH_NONEXISTENT_XYZ}"
        );
    }

    #[test]
    fn leaves_unclosed_placeholder() {
        assert_eq!(substitute_env("prefix ${UNCLOSED"), "prefix ${UNCLOSED");
    }

    #[test]
    fn no_placeholders() {
        assert_eq!(substitute_env("plain text"), "plain text");
    }

    #[test]
    fn multiple_placeholders() {
        unsafe {
            std::env::set_var("RAGSWITCH_TEST_A", "1");
            std::env::set_var("RAGSWITCH_TEST_B", "2");
        }
        assert_eq!(
            substitute_env("${RAGSWITCH_TEST_A}:${RAGSWITCH_TEST_B}"),
            "1:2"
        );
        unsafe {
            std::env::remove_var("RAGSWITCH_TEST_A");
            std::env::remove_var("RAGSWITCH_TEST_B");
        }
    }
}
