//! Command text rendering.

/// Replaces each `{key}` in `template` with `resolve(key)`.
///
/// Placeholders the resolver does not know are kept verbatim, as is an
/// unterminated `{`.
pub fn render_command<'v>(template: &str, resolve: impl Fn(&str) -> Option<&'v str>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return out;
        };
        let key = &after[..close];
        match resolve(key) {
            Some(value) => out.push_str(value),
            None => {
                out.push('{');
                out.push_str(key);
                out.push('}');
            }
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lookup(key: &str) -> Option<&'static str> {
        match key {
            "container" => Some("oak chest"),
            "key" => Some("brass key"),
            _ => None,
        }
    }

    #[test]
    fn substitutes_known_slots() {
        assert_eq!(
            render_command("unlock {container} with {key}", lookup),
            "unlock oak chest with brass key"
        );
    }

    #[test]
    fn keeps_unknown_and_unterminated_placeholders() {
        assert_eq!(render_command("give {item} to {key", lookup), "give {item} to {key");
        assert_eq!(render_command("wait", lookup), "wait");
    }
}
