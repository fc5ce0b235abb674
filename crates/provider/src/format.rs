//! Text formatting helpers.
//!
//! Plain chat has no markup, so most helpers return their input unchanged.
//! Links and images degrade to `text (url)`.

/// Permalinks do not exist for chat lines.
pub fn url_for_post(_post_id: u64) -> String {
    String::new()
}

pub fn url_for_topic(_topic_id: &str) -> String {
    String::new()
}

pub fn quote_text(text: &str, _quoted_user: Option<&str>) -> String {
    text.to_string()
}

pub fn link(url: &str, text: &str) -> String {
    format!("{text} ({url})")
}

pub fn image(url: &str, title: &str) -> String {
    format!("{title} ({url})")
}

pub fn spoiler(body: &str, _title: Option<&str>) -> String {
    body.to_string()
}

pub fn bold(text: &str) -> String {
    text.to_string()
}

pub fn italic(text: &str) -> String {
    text.to_string()
}

pub fn bold_italic(text: &str) -> String {
    text.to_string()
}

/// Header of level 1 to 6. Chat has no headers; the level is ignored.
pub fn header(_level: u8, text: &str) -> String {
    text.to_string()
}

pub fn header1(text: &str) -> String {
    header(1, text)
}

pub fn header2(text: &str) -> String {
    header(2, text)
}

pub fn header3(text: &str) -> String {
    header(3, text)
}

pub fn header4(text: &str) -> String {
    header(4, text)
}

pub fn header5(text: &str) -> String {
    header(5, text)
}

pub fn header6(text: &str) -> String {
    header(6, text)
}

pub fn preformat(text: &str) -> String {
    text.to_string()
}

pub fn strikethrough(text: &str) -> String {
    text.to_string()
}

/// Items on one line, comma separated.
pub fn list<S: AsRef<str>>(items: &[S]) -> String {
    items
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use {super::*, rstest::rstest};

    #[test]
    fn links_and_images_degrade_to_text() {
        assert_eq!(link("https://example.org", "example"), "example (https://example.org)");
        assert_eq!(image("https://example.org/cat.png", "cat"), "cat (https://example.org/cat.png)");
    }

    #[rstest]
    #[case(bold)]
    #[case(italic)]
    #[case(bold_italic)]
    #[case(header1)]
    #[case(header6)]
    #[case(preformat)]
    #[case(strikethrough)]
    fn markup_helpers_are_identity(#[case] helper: fn(&str) -> String) {
        assert_eq!(helper("some *text*"), "some *text*");
    }

    #[test]
    fn urls_are_empty() {
        assert_eq!(url_for_post(3), "");
        assert_eq!(url_for_topic("#room"), "");
    }

    #[test]
    fn quote_and_spoiler_keep_body() {
        assert_eq!(quote_text("hi", Some("alice")), "hi");
        assert_eq!(spoiler("ending", Some("title")), "ending");
    }

    #[test]
    fn list_joins_items() {
        assert_eq!(list(&["a", "b", "c"]), "a, b, c");
        assert_eq!(list::<&str>(&[]), "");
    }
}
