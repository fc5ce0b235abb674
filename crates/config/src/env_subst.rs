/// Replace `${VAR}` and `${VAR:-default}` placeholders in raw config text.
///
/// Unset variables without a default are left as-is. A variable that is set
/// but empty takes the default.
pub fn substitute_env(input: &str) -> String {
    substitute_env_with(input, |name| std::env::var(name).ok())
}

/// [`substitute_env`] with a custom lookup, so tests need not touch the
/// process environment.
pub(crate) fn substitute_env_with(input: &str, lookup: impl Fn(&str) -> Option<String>) -> String {
    let mut result = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && chars.peek() == Some(&'{') {
            chars.next(); // consume '{'
            let mut body = String::new();
            let mut closed = false;
            for c in chars.by_ref() {
                if c == '}' {
                    closed = true;
                    break;
                }
                body.push(c);
            }
            if !closed || body.is_empty() {
                // Malformed, emit literally.
                result.push_str("${");
                result.push_str(&body);
                if closed {
                    result.push('}');
                }
                continue;
            }

            let (name, default) = match body.split_once(":-") {
                Some((name, default)) => (name, Some(default)),
                None => (body.as_str(), None),
            };
            match (lookup(name).filter(|v| !v.is_empty() || default.is_none()), default) {
                (Some(value), _) => result.push_str(&value),
                (None, Some(default)) => result.push_str(default),
                (None, None) => {
                    result.push_str("${");
                    result.push_str(&body);
                    result.push('}');
                },
            }
        } else {
            result.push(ch);
        }
    }

    result
}
